//! Upload executor
//!
//! Uploads the item's cached bytes. A size mismatch between what was sent and
//! what the remote store reports back means a third party modified the remote
//! object concurrently: the upload still counts as done, but the cached copy
//! is evicted so the next access downloads the remote version.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use skyfold_core::domain::{Item, ItemStatus, LocalCachedFileInfo, UploadFailure};
use skyfold_core::ports::RemoteItem;

use super::{ExecutorContext, TaskExecutor, UploadTask};
use crate::collision::with_collision_retry;
use crate::error::SyncError;
use crate::transfer::TransferKind;
use crate::view::ItemView;

pub struct UploadTaskExecutor {
    ctx: Arc<ExecutorContext>,
}

impl UploadTaskExecutor {
    pub fn new(ctx: Arc<ExecutorContext>) -> Self {
        Self { ctx }
    }

    async fn transfer(&self, item: Item, source: PathBuf) -> Result<RemoteItem, SyncError> {
        let guard = self
            .ctx
            .transfers
            .begin(item.id, TransferKind::Upload, source.clone());
        let token = guard.token().clone();
        // Placeholders do not exist remotely yet and must not overwrite anything.
        let replace_existing = !item.is_placeholder;
        // A pending move runs after this upload and carries the new bytes along.
        let target = self.ctx.remote_location(&item).await?;

        tokio::select! {
            result = self.ctx.remote.upload(&source, &target, replace_existing, &token) => {
                Ok(result?)
            }
            _ = token.cancelled() => Err(SyncError::TransferCancelled(item.id)),
        }
    }

    async fn reconcile_success(
        &self,
        item: &Item,
        uploaded: &LocalCachedFileInfo,
        remote: RemoteItem,
    ) -> Result<(), SyncError> {
        let ctx = &self.ctx;
        ctx.metadata
            .mark_uploaded(item.id, remote.size, remote.last_modified)
            .await?;

        let current = ctx.cached_files.get(item.id).await?;
        if current.as_ref().map(|c| c.local_last_modified) != Some(uploaded.local_last_modified) {
            // Rewritten while uploading; the queued upload sends the new bytes.
            ctx.metadata.set_status(item.id, ItemStatus::Uploading).await?;
            tracing::debug!(item_id = %item.id, "Local copy changed during upload, keeping upload record");
            return Ok(());
        }

        ctx.uploads.remove_upload(item.id).await?;
        if ctx.reparents.get_reparent(item.id).await?.is_some() {
            // The queued move confirms the item.
            ctx.metadata.set_status(item.id, ItemStatus::Uploading).await?;
        }

        let local_size = tokio::fs::metadata(&uploaded.local_path)
            .await
            .ok()
            .map(|m| m.len());
        let consistent = match remote.size {
            Some(remote_size) => local_size == Some(remote_size),
            None => true,
        };

        if consistent {
            ctx.cached_files
                .put(&LocalCachedFileInfo {
                    remote_last_modified: remote.last_modified,
                    ..uploaded.clone()
                })
                .await?;
        } else {
            tracing::warn!(
                item_id = %item.id,
                path = %item.remote_path,
                local_size = ?local_size,
                remote_size = ?remote.size,
                "Remote copy differs from uploaded bytes, evicting cached file"
            );
            ctx.cached_files.remove(item.id).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl TaskExecutor for UploadTaskExecutor {
    type Task = UploadTask;
    type Output = ItemView;

    fn kind(&self) -> &'static str {
        "upload"
    }

    async fn execute(&self, task: &UploadTask) -> Result<ItemView, SyncError> {
        let ctx = &self.ctx;
        let item = ctx.require_item(task.item_id).await?;

        if ctx.uploads.get_upload(item.id).await?.is_none() {
            // An earlier upload of the same item already sent the latest bytes.
            tracing::debug!(item_id = %item.id, "No pending upload");
            return ctx.view(item).await;
        }
        let Some(cached) = ctx.cached_files.get(item.id).await? else {
            tracing::error!(item_id = %item.id, "Pending upload without a cached file");
            return Err(SyncError::MissingCachedFile(item.id));
        };

        tracing::info!(item_id = %item.id, path = %item.remote_path, "Uploading");
        let source = cached.local_path.clone();
        let attempt = with_collision_retry(ctx, item, |item| self.transfer(item, source.clone())).await;

        match attempt {
            Ok((item, remote)) => {
                self.reconcile_success(&item, &cached, remote).await?;
                tracing::info!(item_id = %item.id, path = %item.remote_path, "Upload finished");
            }
            Err(SyncError::Remote(error)) => {
                let failure = UploadFailure {
                    date: Utc::now(),
                    code: error.code(),
                    domain: error.domain().to_string(),
                };
                ctx.uploads.record_upload_failure(task.item_id, &failure).await?;
                ctx.metadata
                    .set_status(task.item_id, ItemStatus::UploadError)
                    .await?;
                tracing::warn!(item_id = %task.item_id, %error, "Upload failed");
            }
            Err(other) => return Err(other),
        }

        ctx.view_of(task.item_id).await
    }
}
