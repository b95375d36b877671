//! Reparent executor
//!
//! Moves the remote entry from the record's source path to the item's
//! current path. A collision at the target renames the item, rewrites the
//! record's target and retries once. A plain failed attempt leaves the
//! record as it was.

use std::sync::Arc;

use async_trait::async_trait;
use skyfold_core::domain::{Item, ItemStatus, RemotePath, ReparentTaskRecord};
use skyfold_core::ports::RemoteItem;

use super::{ExecutorContext, ReparentTask, TaskExecutor};
use crate::collision::with_collision_retry;
use crate::error::SyncError;
use crate::view::ItemView;

pub struct ReparentTaskExecutor {
    ctx: Arc<ExecutorContext>,
}

impl ReparentTaskExecutor {
    pub fn new(ctx: Arc<ExecutorContext>) -> Self {
        Self { ctx }
    }

    async fn move_remote(
        &self,
        record: &ReparentTaskRecord,
        item: Item,
        renamed: bool,
    ) -> Result<RemoteItem, SyncError> {
        let ctx = &self.ctx;
        if renamed {
            ctx.reparents
                .update_reparent_target(item.id, &item.remote_path)
                .await?;
        }

        let moved = if item.is_folder() {
            ctx.remote
                .move_folder(&record.source_path, &item.remote_path)
                .await?
        } else {
            ctx.remote
                .move_file(&record.source_path, &item.remote_path)
                .await?
        };
        Ok(moved)
    }

    /// Pending moves inside a folder that just moved remotely now start from
    /// the folder's new location
    async fn rebase_nested_moves(
        &self,
        folder: &Item,
        from: &RemotePath,
    ) -> Result<(), SyncError> {
        let ctx = &self.ctx;
        for nested in ctx.reparents.list_reparents().await? {
            if nested.item_id == folder.id {
                continue;
            }
            let Some(source_path) = nested.source_path.rebase(from, &folder.remote_path) else {
                continue;
            };
            let target_path = nested
                .target_path
                .rebase(from, &folder.remote_path)
                .unwrap_or_else(|| nested.target_path.clone());
            ctx.reparents.remove_reparent(nested.item_id).await?;
            ctx.reparents
                .create_reparent(&ReparentTaskRecord {
                    source_path,
                    target_path,
                    ..nested
                })
                .await?;
            tracing::debug!(item_id = %nested.item_id, folder_id = %folder.id, "Rebased pending move");
        }
        Ok(())
    }
}

#[async_trait]
impl TaskExecutor for ReparentTaskExecutor {
    type Task = ReparentTask;
    type Output = ItemView;

    fn kind(&self) -> &'static str {
        "reparent"
    }

    async fn execute(&self, task: &ReparentTask) -> Result<ItemView, SyncError> {
        let ctx = &self.ctx;
        let item = ctx.require_item(task.item_id).await?;
        let Some(record) = ctx.reparents.get_reparent(item.id).await? else {
            // A later move of the same item was coalesced into an earlier run.
            tracing::debug!(item_id = %item.id, "No pending move");
            return ctx.view(item).await;
        };

        tracing::info!(
            item_id = %item.id,
            from = %record.source_path,
            to = %item.remote_path,
            "Moving"
        );
        let requested = item.remote_path.clone();
        let (item, _) = with_collision_retry(ctx, item, |item| {
            let renamed = !item.remote_path.matches(&requested);
            self.move_remote(&record, item, renamed)
        })
        .await?;
        if item.is_folder() {
            self.rebase_nested_moves(&item, &record.source_path).await?;
        }

        let current = ctx.require_item(item.id).await?;
        if !current.remote_path.matches(&item.remote_path) {
            // Moved again while the remote move ran; the next run starts from here.
            ctx.reparents.remove_reparent(item.id).await?;
            ctx.reparents
                .create_reparent(&ReparentTaskRecord {
                    item_id: item.id,
                    source_path: item.remote_path.clone(),
                    target_path: current.remote_path.clone(),
                    old_parent_id: item.parent_id,
                    new_parent_id: current.parent_id,
                })
                .await?;
            tracing::debug!(item_id = %item.id, path = %current.remote_path, "Move superseded");
            return ctx.view(current).await;
        }

        if ctx.uploads.get_upload(item.id).await?.is_none() {
            ctx.metadata.set_status(item.id, ItemStatus::Uploaded).await?;
        }
        ctx.reparents.remove_reparent(item.id).await?;

        tracing::info!(item_id = %item.id, path = %item.remote_path, "Move finished");
        ctx.view_of(item.id).await
    }
}
