//! Durable task records
//!
//! A task record is written at the moment of a local mutation, before any
//! remote call, and removed by the matching executor only when the remote
//! store has confirmed the operation. Its existence is what protects the
//! item's local state from stale enumeration results.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::item::ItemType;
use super::newtypes::{ItemId, PageToken, RemotePath};

/// Details of the last failed upload attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadFailure {
    pub date: DateTime<Utc>,
    pub code: i64,
    pub domain: String,
}

/// Pending upload of an item's local bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTaskRecord {
    pub item_id: ItemId,
    /// Present only after a failed attempt
    pub failure: Option<UploadFailure>,
}

impl UploadTaskRecord {
    pub fn new(item_id: ItemId) -> Self {
        Self {
            item_id,
            failure: None,
        }
    }

    pub fn has_failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// Pending remote deletion
///
/// Snapshot of the item taken at deletion time, so the remote call can
/// proceed even if the item disappears from the metadata store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionTaskRecord {
    pub item_id: ItemId,
    pub remote_path: RemotePath,
    pub parent_id: ItemId,
    pub item_type: ItemType,
}

/// Pending remote move/rename
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReparentTaskRecord {
    pub item_id: ItemId,
    pub source_path: RemotePath,
    pub target_path: RemotePath,
    pub old_parent_id: ItemId,
    pub new_parent_id: ItemId,
}

/// Pending enumeration of one page of a folder, or a file refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemEnumerationTaskRecord {
    pub item_id: ItemId,
    /// `None` requests the first page
    pub page_token: Option<PageToken>,
}

/// Locally materialized copy of an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalCachedFileInfo {
    pub item_id: ItemId,
    pub local_path: PathBuf,
    pub local_last_modified: DateTime<Utc>,
    /// Remote timestamp the cached bytes correspond to
    pub remote_last_modified: Option<DateTime<Utc>>,
}

impl LocalCachedFileInfo {
    /// Whether the cached bytes correspond to `remote_last_modified`
    ///
    /// Remote stores report timestamps at varying sub-second precision, so
    /// the comparison is made at whole seconds.
    pub fn is_current_version(&self, remote_last_modified: Option<DateTime<Utc>>) -> bool {
        match (self.remote_last_modified, remote_last_modified) {
            (Some(cached), Some(remote)) => cached.timestamp() == remote.timestamp(),
            _ => false,
        }
    }
}
