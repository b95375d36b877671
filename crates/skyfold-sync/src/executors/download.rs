//! Download executor
//!
//! Replacing downloads land in the slot's `.partial` sibling and are renamed
//! over the existing copy only once complete, so a failed or cancelled
//! download never damages the copy the host may be reading.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use skyfold_core::domain::{ItemId, LocalCachedFileInfo};
use skyfold_core::ports::{RemoteError, RemoteItem};

use super::{DownloadTask, ExecutorContext, TaskExecutor};
use crate::error::SyncError;
use crate::transfer::TransferKind;
use crate::view::ItemView;

pub struct DownloadTaskExecutor {
    ctx: Arc<ExecutorContext>,
}

impl DownloadTaskExecutor {
    pub fn new(ctx: Arc<ExecutorContext>) -> Self {
        Self { ctx }
    }

    async fn transfer(
        &self,
        id: ItemId,
        remote: &RemoteItem,
        destination: &Path,
    ) -> Result<(), SyncError> {
        let guard = self
            .ctx
            .transfers
            .begin(id, TransferKind::Download, destination.to_path_buf());
        let token = guard.token().clone();

        tokio::select! {
            result = self.ctx.remote.download(&remote.path, destination, &token) => Ok(result?),
            _ = token.cancelled() => Err(SyncError::TransferCancelled(id)),
        }
    }
}

#[async_trait]
impl TaskExecutor for DownloadTaskExecutor {
    type Task = DownloadTask;
    type Output = ItemView;

    fn kind(&self) -> &'static str {
        "download"
    }

    async fn execute(&self, task: &DownloadTask) -> Result<ItemView, SyncError> {
        let ctx = &self.ctx;
        let item = ctx.require_item(task.item_id).await?;
        if item.is_folder() {
            return Err(RemoteError::ItemTypeMismatch.into());
        }

        let location = ctx.remote_location(&item).await?;
        let remote = ctx.remote.fetch_metadata(&location).await?;
        let slot = ctx.local_cache.prepare(item.id).await?;
        let destination = if task.replace_existing {
            ctx.local_cache.partial_path(item.id)
        } else {
            slot.clone()
        };

        tracing::info!(item_id = %item.id, path = %item.remote_path, "Downloading");
        let fetched = match self.transfer(item.id, &remote, &destination).await {
            Ok(()) if destination != slot => tokio::fs::rename(&destination, &slot)
                .await
                .map_err(SyncError::from),
            other => other,
        };
        if let Err(e) = fetched {
            if let Err(cleanup) = tokio::fs::remove_file(&destination).await {
                tracing::trace!(path = %destination.display(), error = %cleanup, "Nothing to clean up");
            }
            tracing::warn!(item_id = %item.id, error = %e, "Download failed");
            return Err(e);
        }

        ctx.cached_files
            .put(&LocalCachedFileInfo {
                item_id: item.id,
                local_path: slot,
                local_last_modified: Utc::now(),
                remote_last_modified: remote.last_modified,
            })
            .await?;
        ctx.metadata
            .mark_uploaded(item.id, remote.size, remote.last_modified)
            .await?;

        tracing::info!(item_id = %item.id, size = ?remote.size, "Download finished");
        ctx.view_of(item.id).await
    }
}
