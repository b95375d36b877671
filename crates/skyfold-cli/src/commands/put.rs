//! Put command - Upload a local file into a remote folder
//!
//! An existing remote file at the target path is overwritten in place;
//! otherwise the file is imported as a new item.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use skyfold_core::domain::ItemStatus;

use crate::output::{to_json, OutputFormat, OutputFormatter};
use crate::session::Session;

#[derive(Debug, Args)]
pub struct PutCommand {
    /// Local file to upload
    #[arg(value_name = "LOCAL_PATH")]
    pub source: PathBuf,

    /// Remote folder receiving the file
    #[arg(default_value = "/", value_name = "REMOTE_FOLDER")]
    pub folder: String,

    /// Name of the remote file (defaults to the local file name)
    #[arg(long)]
    pub name: Option<String>,
}

impl PutCommand {
    pub async fn execute(
        &self,
        session: &Session,
        format: OutputFormat,
        formatter: &dyn OutputFormatter,
    ) -> Result<()> {
        if !self.source.is_file() {
            bail!("Not a file: {}", self.source.display());
        }
        let (folder_path, folder) = session.resolve(&self.folder).await?;
        let name = match &self.name {
            Some(name) => name.clone(),
            None => self
                .source
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
                .with_context(|| format!("No file name in {}", self.source.display()))?,
        };

        // enumerate_all refreshes the folder so an existing file is found
        let existing = session
            .adapter
            .enumerate_all(folder)
            .await?
            .into_iter()
            .find(|v| v.item.name.eq_ignore_ascii_case(&name));

        let scheduled = match existing {
            Some(view) if view.item.is_file() => {
                session
                    .adapter
                    .write_document(view.item.id, &self.source)
                    .await?
            }
            Some(_) => bail!("{} is a folder", folder_path.join(&name)?),
            None => {
                session
                    .adapter
                    .import_document(&self.source, folder, Some(&name))
                    .await?
            }
        };
        let view = scheduled.completion.await?;

        if format.is_json() {
            formatter.print_json(&to_json(&view));
        } else if view.item.status == ItemStatus::UploadError {
            let reason = view
                .upload_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string());
            formatter.warn(&format!(
                "Upload of {} failed: {reason}. Run 'skyfold retry' to try again.",
                view.item.remote_path
            ));
        } else {
            formatter.success(&format!("Uploaded {}", view.item.remote_path));
        }
        Ok(())
    }
}
