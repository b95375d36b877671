//! Task record store ports (driven/secondary ports)
//!
//! One trait per task record kind. A single adapter may implement all four
//! over one database.
//!
//! Records are keyed by item id: at most one record of each kind exists per
//! item.

use async_trait::async_trait;

use crate::domain::{
    DeletionTaskRecord, ItemEnumerationTaskRecord, ItemId, RemotePath, ReparentTaskRecord,
    UploadFailure, UploadTaskRecord,
};

// ============================================================================
// Upload
// ============================================================================

#[async_trait]
pub trait IUploadTaskStore: Send + Sync {
    /// Creates the record, or resets the failure of an existing one
    async fn create_upload(&self, id: ItemId) -> anyhow::Result<UploadTaskRecord>;

    async fn get_upload(&self, id: ItemId) -> anyhow::Result<Option<UploadTaskRecord>>;

    /// Stores the failure of the last attempt, keeping the record
    async fn record_upload_failure(
        &self,
        id: ItemId,
        failure: &UploadFailure,
    ) -> anyhow::Result<()>;

    async fn remove_upload(&self, id: ItemId) -> anyhow::Result<()>;

    async fn list_uploads(&self) -> anyhow::Result<Vec<UploadTaskRecord>>;
}

// ============================================================================
// Deletion
// ============================================================================

#[async_trait]
pub trait IDeletionTaskStore: Send + Sync {
    /// Creates or replaces the record for `record.item_id`
    async fn create_deletion(&self, record: &DeletionTaskRecord) -> anyhow::Result<()>;

    async fn get_deletion(&self, id: ItemId) -> anyhow::Result<Option<DeletionTaskRecord>>;

    async fn remove_deletion(&self, id: ItemId) -> anyhow::Result<()>;

    /// Deletions of items which were in `parent`
    async fn list_deletions_in(&self, parent: ItemId) -> anyhow::Result<Vec<DeletionTaskRecord>>;

    async fn list_deletions(&self) -> anyhow::Result<Vec<DeletionTaskRecord>>;
}

// ============================================================================
// Reparent
// ============================================================================

#[async_trait]
pub trait IReparentTaskStore: Send + Sync {
    /// Creates the record, or retargets an existing one
    ///
    /// An existing record keeps its original source path and old parent so
    /// the remote move still starts from where the remote entry really is.
    ///
    /// # Returns
    /// The record as stored
    async fn create_reparent(&self, record: &ReparentTaskRecord)
        -> anyhow::Result<ReparentTaskRecord>;

    async fn get_reparent(&self, id: ItemId) -> anyhow::Result<Option<ReparentTaskRecord>>;

    /// Replaces the target of an existing record
    async fn update_reparent_target(
        &self,
        id: ItemId,
        target_path: &RemotePath,
    ) -> anyhow::Result<()>;

    async fn remove_reparent(&self, id: ItemId) -> anyhow::Result<()>;

    /// Moves of items which were in `parent`
    async fn list_reparents_from(&self, parent: ItemId)
        -> anyhow::Result<Vec<ReparentTaskRecord>>;

    /// Moves of items which are soon in `parent`
    async fn list_reparents_into(&self, parent: ItemId)
        -> anyhow::Result<Vec<ReparentTaskRecord>>;

    async fn list_reparents(&self) -> anyhow::Result<Vec<ReparentTaskRecord>>;
}

// ============================================================================
// Item enumeration
// ============================================================================

#[async_trait]
pub trait IItemEnumerationTaskStore: Send + Sync {
    /// Creates or replaces the record for `record.item_id`
    async fn create_enumeration(&self, record: &ItemEnumerationTaskRecord) -> anyhow::Result<()>;

    async fn get_enumeration(&self, id: ItemId)
        -> anyhow::Result<Option<ItemEnumerationTaskRecord>>;

    async fn remove_enumeration(&self, id: ItemId) -> anyhow::Result<()>;

    /// Drops every enumeration record
    ///
    /// # Returns
    /// Number of dropped records
    async fn clear_enumerations(&self) -> anyhow::Result<u64>;
}
