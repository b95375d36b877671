//! Rm command - Delete remote items

use anyhow::Result;
use clap::Args;

use crate::output::{OutputFormat, OutputFormatter};
use crate::session::Session;

#[derive(Debug, Args)]
pub struct RmCommand {
    /// Remote paths to delete (folders are deleted with their contents)
    #[arg(required = true, value_name = "REMOTE_PATH")]
    pub paths: Vec<String>,
}

impl RmCommand {
    pub async fn execute(
        &self,
        session: &Session,
        format: OutputFormat,
        formatter: &dyn OutputFormatter,
    ) -> Result<()> {
        let mut deleted = Vec::new();
        let mut errors = Vec::new();

        for raw in &self.paths {
            let result = async {
                let (path, id) = session.resolve(raw).await?;
                if let Some(completion) = session.adapter.delete_item(id).await? {
                    completion.await?;
                }
                anyhow::Ok(path)
            }
            .await;
            match result {
                Ok(path) => {
                    formatter.success(&format!("Deleted {path}"));
                    deleted.push(path.to_string());
                }
                Err(e) => {
                    formatter.error(&format!("{raw}: {e:#}"));
                    errors.push(format!("{raw}: {e:#}"));
                }
            }
        }

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": errors.is_empty(),
                "deleted": deleted,
                "errors": errors,
            }));
        }
        if !errors.is_empty() {
            anyhow::bail!("{} of {} deletions failed", errors.len(), self.paths.len());
        }
        Ok(())
    }
}
