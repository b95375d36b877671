//! Deletion executor

use std::sync::Arc;

use async_trait::async_trait;
use skyfold_core::domain::ItemType;
use skyfold_core::ports::RemoteError;

use super::{DeletionTask, ExecutorContext, TaskExecutor};
use crate::error::SyncError;

/// Deletes the remote entry snapshotted in the deletion record, then drops
/// the local subtree
pub struct DeletionTaskExecutor {
    ctx: Arc<ExecutorContext>,
}

impl DeletionTaskExecutor {
    pub fn new(ctx: Arc<ExecutorContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl TaskExecutor for DeletionTaskExecutor {
    type Task = DeletionTask;
    type Output = ();

    fn kind(&self) -> &'static str {
        "deletion"
    }

    async fn execute(&self, task: &DeletionTask) -> Result<(), SyncError> {
        let ctx = &self.ctx;
        let Some(record) = ctx.deletions.get_deletion(task.item_id).await? else {
            tracing::debug!(item_id = %task.item_id, "No pending deletion");
            return Ok(());
        };

        let item = ctx.metadata.get(record.item_id).await?;

        tracing::info!(item_id = %record.item_id, path = %record.remote_path, "Deleting");
        let deleted = match record.item_type {
            ItemType::File => ctx.remote.delete_file(&record.remote_path).await,
            ItemType::Folder => ctx.remote.delete_folder(&record.remote_path).await,
        };
        match deleted {
            Ok(()) => {}
            // Never created remotely, e.g. its creation or upload failed.
            Err(RemoteError::ItemNotFound) if item.as_ref().is_some_and(|i| i.is_placeholder) => {
                tracing::debug!(item_id = %record.item_id, "Placeholder has no remote entry");
            }
            Err(e) => return Err(e.into()),
        }

        if let Some(item) = item {
            let subtree = ctx.collect_subtree(item).await?;
            // Deletion records of descendants are moot once the folder is gone.
            for descendant in subtree.iter().skip(1) {
                ctx.deletions.remove_deletion(descendant.id).await?;
            }
            ctx.purge(&subtree).await?;
        }
        ctx.deletions.remove_deletion(record.item_id).await?;

        tracing::info!(item_id = %record.item_id, path = %record.remote_path, "Deletion finished");
        Ok(())
    }
}
