//! Get command - Materialize a remote file locally

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::output::{OutputFormat, OutputFormatter};
use crate::session::Session;

#[derive(Debug, Args)]
pub struct GetCommand {
    /// Remote file to fetch
    #[arg(value_name = "REMOTE_PATH")]
    pub path: String,

    /// Copy the file here instead of printing its cache location
    #[arg(short, long, value_name = "LOCAL_PATH")]
    pub output: Option<PathBuf>,
}

impl GetCommand {
    pub async fn execute(
        &self,
        session: &Session,
        format: OutputFormat,
        formatter: &dyn OutputFormatter,
    ) -> Result<()> {
        let (path, id) = session.resolve(&self.path).await?;
        let cached = session.adapter.materialize(id).await?;

        let delivered = match &self.output {
            Some(output) => {
                tokio::fs::copy(&cached, output)
                    .await
                    .with_context(|| format!("Failed to copy to {}", output.display()))?;
                output.clone()
            }
            None => cached,
        };
        tracing::info!(item_id = %id, path = %path, local = %delivered.display(), "Fetched");

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "path": path.as_str(),
                "item_id": id,
                "local_path": delivered.display().to_string(),
            }));
        } else if self.output.is_some() {
            formatter.success(&format!("{path} -> {}", delivered.display()));
        } else {
            println!("{}", delivered.display());
        }
        Ok(())
    }
}
