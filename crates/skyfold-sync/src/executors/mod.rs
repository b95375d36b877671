//! Task executors
//!
//! Each executor performs exactly one kind of task against the remote store
//! and reconciles the local stores afterwards. Executors read the state they
//! need from the stores when they run, not when the task was submitted, and
//! only mutate local state once the remote store confirmed the operation, so
//! running the same task again after a failure is always safe.
//!
//! Uploads are the exception to "errors pass through": a failed upload is
//! recorded on the upload record and reported as an advisory on the returned
//! [`ItemView`].

use std::sync::Arc;

use async_trait::async_trait;
use skyfold_core::domain::{Item, ItemId, PageToken, RemotePath};
use skyfold_core::ports::{
    ICachedFileRegistry, IDeletionTaskStore, IItemEnumerationTaskStore, IMetadataStore,
    IRemoteStore, IReparentTaskStore, IUploadTaskStore,
};

use crate::error::SyncError;
use crate::local_cache::LocalFileCache;
use crate::transfer::TransferRegistry;
use crate::view::ItemView;

mod deletion;
mod download;
mod enumeration;
mod folder_creation;
mod reparent;
mod upload;

pub use deletion::DeletionTaskExecutor;
pub use download::DownloadTaskExecutor;
pub use enumeration::ItemEnumerationTaskExecutor;
pub use folder_creation::FolderCreationTaskExecutor;
pub use reparent::ReparentTaskExecutor;
pub use upload::UploadTaskExecutor;

// ============================================================================
// Tasks
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadTask {
    pub item_id: ItemId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadTask {
    pub item_id: ItemId,
    /// Download next to the existing copy and swap it in afterwards
    pub replace_existing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletionTask {
    pub item_id: ItemId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReparentTask {
    pub item_id: ItemId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FolderCreationTask {
    pub item_id: ItemId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemEnumerationTask {
    pub item_id: ItemId,
    /// `None` requests the first page
    pub page_token: Option<PageToken>,
}

/// Executes one kind of task
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    type Task: Send + Sync;
    type Output: Send;

    /// Short name used in logs and workflow kinds
    fn kind(&self) -> &'static str;

    async fn execute(&self, task: &Self::Task) -> Result<Self::Output, SyncError>;
}

// ============================================================================
// Shared context
// ============================================================================

/// Stores and services shared by every executor
///
/// Passed explicitly at construction; the stores are the single source of
/// truth and executors never hold items across await points longer than one
/// reconciliation step.
#[derive(Clone)]
pub struct ExecutorContext {
    pub metadata: Arc<dyn IMetadataStore>,
    pub uploads: Arc<dyn IUploadTaskStore>,
    pub deletions: Arc<dyn IDeletionTaskStore>,
    pub reparents: Arc<dyn IReparentTaskStore>,
    pub enumerations: Arc<dyn IItemEnumerationTaskStore>,
    pub cached_files: Arc<dyn ICachedFileRegistry>,
    pub remote: Arc<dyn IRemoteStore>,
    pub local_cache: LocalFileCache,
    pub transfers: Arc<TransferRegistry>,
}

impl ExecutorContext {
    /// Loads an item that a task refers to
    pub async fn require_item(&self, id: ItemId) -> Result<Item, SyncError> {
        match self.metadata.get(id).await? {
            Some(item) => Ok(item),
            None => {
                tracing::error!(item_id = %id, "Task refers to an item missing from the metadata store");
                Err(SyncError::MissingItem(id))
            }
        }
    }

    /// Renders an item together with its cache and upload state
    pub async fn view(&self, item: Item) -> Result<ItemView, SyncError> {
        let cached = self.cached_files.get(item.id).await?;
        let upload = self.uploads.get_upload(item.id).await?;
        Ok(ItemView::new(item, cached.as_ref(), upload.as_ref()))
    }

    pub async fn view_of(&self, id: ItemId) -> Result<ItemView, SyncError> {
        let item = self.require_item(id).await?;
        self.view(item).await
    }

    /// The item and every descendant known locally, parents first
    pub async fn collect_subtree(&self, root: Item) -> Result<Vec<Item>, SyncError> {
        let mut subtree = vec![root];
        let mut next = 0;
        while next < subtree.len() {
            if subtree[next].is_folder() {
                let children = self.metadata.list_children(subtree[next].id).await?;
                subtree.extend(children);
            }
            next += 1;
        }
        Ok(subtree)
    }

    /// Drops cached files and metadata of the given items
    pub async fn purge(&self, items: &[Item]) -> Result<(), SyncError> {
        for item in items {
            self.cached_files.remove(item.id).await?;
        }
        let ids: Vec<ItemId> = items.iter().map(|i| i.id).collect();
        self.metadata.remove(&ids).await?;
        tracing::debug!(count = ids.len(), "Purged items from local stores");
        Ok(())
    }

    /// Where the item's remote entry lives right now
    ///
    /// Differs from the item's path while a move of the item, or of its
    /// nearest moved ancestor, has not reached the remote store yet.
    pub async fn remote_location(&self, item: &Item) -> Result<RemotePath, SyncError> {
        if let Some(record) = self.reparents.get_reparent(item.id).await? {
            return Ok(record.source_path);
        }
        let mut ancestor_id = item.parent_id;
        while !ancestor_id.is_root() {
            let Some(ancestor) = self.metadata.get(ancestor_id).await? else {
                break;
            };
            if let Some(record) = self.reparents.get_reparent(ancestor.id).await? {
                if let Some(location) = item
                    .remote_path
                    .rebase(&ancestor.remote_path, &record.source_path)
                {
                    return Ok(location);
                }
                break;
            }
            ancestor_id = ancestor.parent_id;
        }
        Ok(item.remote_path.clone())
    }

    /// Whether an open task record protects the item's local state
    pub async fn is_task_protected(&self, id: ItemId) -> Result<bool, SyncError> {
        Ok(self.deletions.get_deletion(id).await?.is_some()
            || self.reparents.get_reparent(id).await?.is_some()
            || self.uploads.get_upload(id).await?.is_some())
    }
}
