//! Status command - Show pending local changes and cache usage
//!
//! Lists the task records still open in the database: uploads (pending and
//! failed), deletions and moves, plus the size of the evictable file cache.

use anyhow::Result;
use clap::Args;
use skyfold_core::ports::RemoteError;

use crate::output::{format_bytes, OutputFormat, OutputFormatter};
use crate::session::Session;

#[derive(Debug, Args)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(
        &self,
        session: &Session,
        format: OutputFormat,
        formatter: &dyn OutputFormatter,
    ) -> Result<()> {
        let ctx = session.adapter.context();

        let mut pending_uploads = Vec::new();
        let mut failed_uploads = Vec::new();
        for record in ctx.uploads.list_uploads().await? {
            let Some(item) = ctx.metadata.get(record.item_id).await? else {
                continue;
            };
            match record.failure {
                Some(failure) => {
                    let reason = RemoteError::from_code(failure.code)
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| format!("{} error {}", failure.domain, failure.code));
                    failed_uploads.push(serde_json::json!({
                        "item_id": item.id,
                        "path": item.remote_path.as_str(),
                        "failed_at": failure.date.to_rfc3339(),
                        "error": reason,
                    }));
                }
                None => pending_uploads.push(item.remote_path.to_string()),
            }
        }
        let deletions: Vec<String> = ctx
            .deletions
            .list_deletions()
            .await?
            .into_iter()
            .map(|d| d.remote_path.to_string())
            .collect();
        let moves: Vec<serde_json::Value> = ctx
            .reparents
            .list_reparents()
            .await?
            .into_iter()
            .map(|r| {
                serde_json::json!({
                    "from": r.source_path.as_str(),
                    "to": r.target_path.as_str(),
                })
            })
            .collect();
        let cache_bytes = session.adapter.cache_size().await?;
        let cache_limit = session.config.cache.max_size_mb * 1024 * 1024;

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "remote_root": session.config.remote.root.display().to_string(),
                "pending_uploads": pending_uploads,
                "failed_uploads": failed_uploads,
                "pending_deletions": deletions,
                "pending_moves": moves,
                "cache": {
                    "size_bytes": cache_bytes,
                    "limit_bytes": cache_limit,
                },
            }));
            return Ok(());
        }

        println!("Remote root: {}", session.config.remote.root.display());
        println!(
            "Cache:       {} of {}",
            format_bytes(cache_bytes),
            format_bytes(cache_limit)
        );
        println!();

        if pending_uploads.is_empty()
            && failed_uploads.is_empty()
            && deletions.is_empty()
            && moves.is_empty()
        {
            formatter.success("Everything is up to date");
            return Ok(());
        }
        for path in &pending_uploads {
            println!("  upload   {path}");
        }
        for path in &deletions {
            println!("  delete   {path}");
        }
        for entry in &moves {
            println!(
                "  move     {} -> {}",
                entry["from"].as_str().unwrap_or_default(),
                entry["to"].as_str().unwrap_or_default()
            );
        }
        for failed in &failed_uploads {
            println!(
                "  FAILED   {} ({})",
                failed["path"].as_str().unwrap_or_default(),
                failed["error"].as_str().unwrap_or_default()
            );
        }
        if !failed_uploads.is_empty() {
            formatter.warn(&format!(
                "{} upload(s) failed. Run 'skyfold retry' to try again.",
                failed_uploads.len()
            ));
        }
        Ok(())
    }
}
