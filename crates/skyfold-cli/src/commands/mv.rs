//! Mv command - Move or rename a remote item

use anyhow::Result;
use clap::Args;

use crate::output::{to_json, OutputFormat, OutputFormatter};
use crate::session::Session;

#[derive(Debug, Args)]
pub struct MvCommand {
    /// Remote item to move
    #[arg(value_name = "REMOTE_PATH")]
    pub source: String,

    /// Remote folder receiving the item
    #[arg(value_name = "REMOTE_FOLDER")]
    pub folder: String,

    /// New name for the item
    #[arg(long)]
    pub name: Option<String>,
}

impl MvCommand {
    pub async fn execute(
        &self,
        session: &Session,
        format: OutputFormat,
        formatter: &dyn OutputFormatter,
    ) -> Result<()> {
        let (source, id) = session.resolve(&self.source).await?;
        let (_, folder) = session.resolve(&self.folder).await?;

        let scheduled = session
            .adapter
            .move_item(id, folder, self.name.as_deref())
            .await?;
        formatter.info(&format!("Moving {source} to {}", scheduled.view.item.remote_path));
        let view = scheduled.completion.await?;

        if format.is_json() {
            formatter.print_json(&to_json(&view));
        } else {
            formatter.success(&format!("Moved {source} to {}", view.item.remote_path));
        }
        Ok(())
    }
}
