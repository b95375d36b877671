//! Error types for the sync engine.

use std::path::PathBuf;

use skyfold_core::domain::{DomainError, ItemId, RemotePath};
use skyfold_core::ports::RemoteError;
use thiserror::Error;

/// Errors surfaced by the scheduler, the executors and the adapter.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The remote store failed; carried unchanged.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Domain(#[from] DomainError),

    // --- store preconditions (fatal) ---
    #[error("item {0} is missing from the metadata store")]
    MissingItem(ItemId),

    #[error("no {kind} task record for item {item_id}")]
    MissingTaskRecord { kind: &'static str, item_id: ItemId },

    #[error("no cached file for item {0}")]
    MissingCachedFile(ItemId),

    // --- validation (raised before any task record exists) ---
    #[error("invalid name: {0}")]
    InvalidName(DomainError),

    #[error("parent item {0} does not exist")]
    ParentNotFound(ItemId),

    #[error("parent item {0} is not a folder")]
    ParentNotAFolder(ItemId),

    #[error("an item already exists at {0}")]
    NameCollision(RemotePath),

    #[error("the root folder cannot be modified")]
    RootNotModifiable,

    #[error("item {item_id} cannot be moved into {parent_id}")]
    InvalidDestination { item_id: ItemId, parent_id: ItemId },

    #[error("item {0} is not a file")]
    NotAFile(ItemId),

    #[error("source file {0} has no usable name")]
    UnnamedSource(PathBuf),

    // --- lifecycle ---
    #[error("transfer of item {0} was cancelled")]
    TransferCancelled(ItemId),

    #[error("workflow aborted: {0}")]
    WorkflowAborted(String),
}

impl SyncError {
    /// The remote store error, if that is what failed.
    pub fn remote(&self) -> Option<RemoteError> {
        match self {
            SyncError::Remote(e) => Some(*e),
            _ => None,
        }
    }

    /// Store-precondition violations indicate corruption, not a retryable condition.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::MissingItem(_)
                | SyncError::MissingTaskRecord { .. }
                | SyncError::MissingCachedFile(_)
        )
    }
}
