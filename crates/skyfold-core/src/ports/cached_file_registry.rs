//! Cached file registry port (driven/secondary port)
//!
//! Maps an item id to its locally materialized copy and the remote
//! timestamp that copy corresponds to. Eviction policy is the caller's
//! concern; the registry only offers the primitives.

use async_trait::async_trait;

use crate::domain::{ItemId, LocalCachedFileInfo};

#[async_trait]
pub trait ICachedFileRegistry: Send + Sync {
    async fn get(&self, id: ItemId) -> anyhow::Result<Option<LocalCachedFileInfo>>;

    /// Creates or replaces the entry for `info.item_id`
    async fn put(&self, info: &LocalCachedFileInfo) -> anyhow::Result<()>;

    /// Removes the entry and deletes its local file
    ///
    /// A file that is already gone is not an error.
    async fn remove(&self, id: ItemId) -> anyhow::Result<()>;

    /// Bytes on disk used by entries without a pending upload
    async fn total_size_bytes(&self) -> anyhow::Result<u64>;

    /// Evicts every entry without a pending upload
    ///
    /// # Returns
    /// Number of evicted entries
    async fn clear(&self) -> anyhow::Result<u64>;
}
