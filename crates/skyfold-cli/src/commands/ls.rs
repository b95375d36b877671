//! Ls command - List a remote folder or describe a remote file

use anyhow::Result;
use clap::Args;

use crate::output::{item_line, to_json, OutputFormat, OutputFormatter};
use crate::session::Session;

#[derive(Debug, Args)]
pub struct LsCommand {
    /// Remote path to list
    #[arg(default_value = "/", value_name = "REMOTE_PATH")]
    pub path: String,
}

impl LsCommand {
    pub async fn execute(
        &self,
        session: &Session,
        format: OutputFormat,
        formatter: &dyn OutputFormatter,
    ) -> Result<()> {
        let (path, id) = session.resolve(&self.path).await?;
        let item = session.adapter.item(id).await?;

        let mut views = if item.item.is_folder() {
            session.adapter.enumerate_all(id).await?
        } else {
            session.adapter.enumerate(id, None).await?.items
        };
        views.sort_by(|a, b| {
            b.item
                .is_folder()
                .cmp(&a.item.is_folder())
                .then_with(|| a.item.name.to_lowercase().cmp(&b.item.name.to_lowercase()))
        });

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "path": path.as_str(),
                "items": to_json(&views),
            }));
            return Ok(());
        }

        if views.is_empty() {
            formatter.info(&format!("{path} is empty"));
        }
        for view in &views {
            println!("{}", item_line(view));
        }
        Ok(())
    }
}
