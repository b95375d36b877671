//! Retry command - Re-queue failed uploads

use anyhow::{bail, Result};
use clap::Args;
use skyfold_core::domain::{ItemId, ItemStatus};

use crate::output::{OutputFormat, OutputFormatter};
use crate::session::Session;

#[derive(Debug, Args)]
pub struct RetryCommand {
    /// Remote file to retry (defaults to every failed upload)
    #[arg(value_name = "REMOTE_PATH")]
    pub path: Option<String>,
}

impl RetryCommand {
    pub async fn execute(
        &self,
        session: &Session,
        format: OutputFormat,
        formatter: &dyn OutputFormatter,
    ) -> Result<()> {
        let ids: Vec<ItemId> = match &self.path {
            Some(path) => vec![session.resolve(path).await?.1],
            None => session
                .adapter
                .context()
                .uploads
                .list_uploads()
                .await?
                .into_iter()
                .filter(|r| r.has_failed())
                .map(|r| r.item_id)
                .collect(),
        };
        if ids.is_empty() {
            formatter.info("No failed uploads");
        }

        let mut uploaded = Vec::new();
        let mut failed = Vec::new();
        for id in ids {
            let view = session.adapter.retry_upload(id).await?.completion.await?;
            let path = view.item.remote_path.to_string();
            if view.item.status == ItemStatus::UploadError {
                let reason = view
                    .upload_error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "unknown error".to_string());
                formatter.warn(&format!("{path}: {reason}"));
                failed.push(serde_json::json!({"path": path, "error": reason}));
            } else {
                formatter.success(&format!("Uploaded {path}"));
                uploaded.push(path);
            }
        }

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "uploaded": uploaded,
                "failed": failed,
            }));
        }
        if !failed.is_empty() {
            bail!("{} upload(s) failed again", failed.len());
        }
        Ok(())
    }
}
