//! Metadata store port (driven/secondary port)
//!
//! Durable map from item id to item attributes, also queryable by remote
//! path and by parent id.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific.
//! - A *live* item is one without a pending deletion record. Path lookups,
//!   `upsert` and collision checks only consider live items, which keeps
//!   `remote_path` unique among them.
//! - Every read-check-write operation (`upsert`, `insert_placeholder`,
//!   `move_item`) must be atomic with respect to every other writer.
//! - `remove` does not cascade to task records or cached files; callers own
//!   that cleanup.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Item, ItemId, ItemStatus, NewItem, RemotePath};

/// Port trait for item metadata persistence
#[async_trait]
pub trait IMetadataStore: Send + Sync {
    /// Retrieves an item by id
    async fn get(&self, id: ItemId) -> anyhow::Result<Option<Item>>;

    /// Retrieves the live item at `path` (case-insensitive)
    async fn get_by_path(&self, path: &RemotePath) -> anyhow::Result<Option<Item>>;

    /// Lists every direct child of `parent`, including children pending
    /// deletion
    async fn list_children(&self, parent: ItemId) -> anyhow::Result<Vec<Item>>;

    /// Inserts or refreshes an item, resolving identity by remote path
    ///
    /// If a live item exists at `item.remote_path` it keeps its id, status,
    /// placeholder flag and host metadata; its remote attributes are
    /// refreshed and its maybe-outdated flag cleared. Otherwise a new item is
    /// created.
    async fn upsert(&self, item: &NewItem) -> anyhow::Result<Item>;

    /// [`IMetadataStore::upsert`] for a batch, in one transaction
    async fn upsert_many(&self, items: &[NewItem]) -> anyhow::Result<Vec<Item>>;

    /// Inserts a new item unless a live item already holds its path
    ///
    /// # Returns
    /// `None` when the path is occupied
    async fn insert_placeholder(&self, item: &NewItem) -> anyhow::Result<Option<Item>>;

    /// Renames and/or reparents an item, rewriting every descendant's path
    ///
    /// # Returns
    /// The updated item, or `None` when another live item holds `new_path`
    async fn move_item(
        &self,
        id: ItemId,
        new_parent: ItemId,
        new_name: &str,
        new_path: &RemotePath,
    ) -> anyhow::Result<Option<Item>>;

    async fn set_status(&self, id: ItemId, status: ItemStatus) -> anyhow::Result<()>;

    /// Records remote confirmation: status `uploaded`, placeholder cleared,
    /// size and remote timestamp refreshed
    async fn mark_uploaded(
        &self,
        id: ItemId,
        size: Option<u64>,
        remote_last_modified: Option<DateTime<Utc>>,
    ) -> anyhow::Result<()>;

    /// Flags every non-placeholder child of `parent` as maybe outdated
    ///
    /// # Returns
    /// Number of flagged children
    async fn flag_maybe_outdated(&self, parent: ItemId) -> anyhow::Result<u64>;

    async fn list_maybe_outdated(&self, parent: ItemId) -> anyhow::Result<Vec<Item>>;

    async fn clear_maybe_outdated(&self, parent: ItemId) -> anyhow::Result<()>;

    /// Lists the placeholder children of `parent`
    async fn list_placeholders(&self, parent: ItemId) -> anyhow::Result<Vec<Item>>;

    async fn set_favorite_rank(&self, id: ItemId, rank: Option<i64>) -> anyhow::Result<()>;

    async fn set_tag_data(&self, id: ItemId, data: Option<&[u8]>) -> anyhow::Result<()>;

    /// Items carrying host metadata (favorite rank or tag data)
    async fn list_working_set(&self) -> anyhow::Result<Vec<Item>>;

    /// Removes items by id; unknown ids are ignored
    async fn remove(&self, ids: &[ItemId]) -> anyhow::Result<()>;
}
