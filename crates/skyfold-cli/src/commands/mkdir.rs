//! Mkdir command - Create a remote folder

use anyhow::{Context, Result};
use clap::Args;
use skyfold_core::domain::RemotePath;

use crate::output::{to_json, OutputFormat, OutputFormatter};
use crate::session::Session;

#[derive(Debug, Args)]
pub struct MkdirCommand {
    /// Remote path of the new folder
    #[arg(value_name = "REMOTE_PATH")]
    pub path: String,
}

impl MkdirCommand {
    pub async fn execute(
        &self,
        session: &Session,
        format: OutputFormat,
        formatter: &dyn OutputFormatter,
    ) -> Result<()> {
        let path: RemotePath = self
            .path
            .parse()
            .with_context(|| format!("Invalid remote path '{}'", self.path))?;
        let (parent, name) = path
            .parent()
            .zip(path.file_name())
            .context("The root folder already exists")?;
        let (_, parent_id) = session.resolve(parent.as_str()).await?;

        let view = session
            .adapter
            .create_folder(parent_id, name)
            .await?
            .completion
            .await?;

        if format.is_json() {
            formatter.print_json(&to_json(&view));
        } else if view.item.remote_path.matches(&path) {
            formatter.success(&format!("Created {}", view.item.remote_path));
        } else {
            formatter.warn(&format!(
                "{path} was taken remotely, created {} instead",
                view.item.remote_path
            ));
        }
        Ok(())
    }
}
