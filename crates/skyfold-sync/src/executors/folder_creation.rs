//! Folder creation executor

use std::sync::Arc;

use async_trait::async_trait;

use super::{ExecutorContext, FolderCreationTask, TaskExecutor};
use crate::collision::with_collision_retry;
use crate::error::SyncError;
use crate::view::ItemView;

/// Creates the remote folder for a placeholder folder item
pub struct FolderCreationTaskExecutor {
    ctx: Arc<ExecutorContext>,
}

impl FolderCreationTaskExecutor {
    pub fn new(ctx: Arc<ExecutorContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl TaskExecutor for FolderCreationTaskExecutor {
    type Task = FolderCreationTask;
    type Output = ItemView;

    fn kind(&self) -> &'static str {
        "folder_creation"
    }

    async fn execute(&self, task: &FolderCreationTask) -> Result<ItemView, SyncError> {
        let ctx = &self.ctx;
        let item = ctx.require_item(task.item_id).await?;
        if !item.is_placeholder {
            return ctx.view(item).await;
        }

        tracing::info!(item_id = %item.id, path = %item.remote_path, "Creating folder");
        let (item, created) = with_collision_retry(ctx, item, |item| async move {
            let location = ctx.remote_location(&item).await?;
            Ok(ctx.remote.create_folder(&location).await?)
        })
        .await?;

        ctx.metadata
            .mark_uploaded(item.id, None, created.last_modified)
            .await?;
        tracing::info!(item_id = %item.id, path = %item.remote_path, "Folder created");
        ctx.view_of(item.id).await
    }
}
