//! SQLite implementation of ICachedFileRegistry
//!
//! Entries whose item still has an upload record hold local edits that
//! exist nowhere else; `total_size_bytes` and `clear` leave them alone.

use std::io::ErrorKind;
use std::path::Path;

use skyfold_core::domain::{ItemId, LocalCachedFileInfo};
use skyfold_core::ports::ICachedFileRegistry;

use crate::rows::{cached_file_from_row, format_optional_datetime};
use crate::DatabasePool;

const EVICTABLE: &str = "item_id NOT IN (SELECT item_id FROM upload_tasks)";

/// SQLite-based implementation of the cached file registry port
#[derive(Clone)]
pub struct SqliteCachedFileRegistry {
    db: DatabasePool,
}

impl SqliteCachedFileRegistry {
    /// Creates a new registry sharing the given pool and its write lock
    pub fn new(db: DatabasePool) -> Self {
        Self { db }
    }

    async fn evictable(&self) -> anyhow::Result<Vec<LocalCachedFileInfo>> {
        let rows = sqlx::query(&format!(
            "SELECT * FROM cached_files WHERE {EVICTABLE} ORDER BY item_id"
        ))
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows
            .iter()
            .map(cached_file_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }
}

/// Deletes a cached file; a file that is already gone is not an error
async fn delete_local_file(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[async_trait::async_trait]
impl ICachedFileRegistry for SqliteCachedFileRegistry {
    async fn get(&self, id: ItemId) -> anyhow::Result<Option<LocalCachedFileInfo>> {
        let row = sqlx::query("SELECT * FROM cached_files WHERE item_id = ?")
            .bind(id.value())
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.as_ref().map(cached_file_from_row).transpose()?)
    }

    async fn put(&self, info: &LocalCachedFileInfo) -> anyhow::Result<()> {
        let _guard = self.db.write().await;
        sqlx::query(
            "INSERT OR REPLACE INTO cached_files \
             (item_id, local_path, local_last_modified, remote_last_modified) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(info.item_id.value())
        .bind(info.local_path.to_string_lossy().into_owned())
        .bind(info.local_last_modified.to_rfc3339())
        .bind(format_optional_datetime(info.remote_last_modified))
        .execute(self.db.pool())
        .await?;

        tracing::trace!(item_id = %info.item_id, path = %info.local_path.display(), "Cached file registered");
        Ok(())
    }

    async fn remove(&self, id: ItemId) -> anyhow::Result<()> {
        let Some(info) = self.get(id).await? else {
            return Ok(());
        };

        {
            let _guard = self.db.write().await;
            sqlx::query("DELETE FROM cached_files WHERE item_id = ?")
                .bind(id.value())
                .execute(self.db.pool())
                .await?;
        }

        delete_local_file(&info.local_path).await?;
        tracing::debug!(item_id = %id, path = %info.local_path.display(), "Evicted cached file");
        Ok(())
    }

    async fn total_size_bytes(&self) -> anyhow::Result<u64> {
        let mut total = 0u64;
        for info in self.evictable().await? {
            match tokio::fs::metadata(&info.local_path).await {
                Ok(meta) => total += meta.len(),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    tracing::warn!(item_id = %info.item_id, "Cached file missing on disk");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(total)
    }

    async fn clear(&self) -> anyhow::Result<u64> {
        let entries = self.evictable().await?;
        let mut evicted = 0u64;
        for info in entries {
            {
                let _guard = self.db.write().await;
                // re-check under the lock: an upload may have been queued meanwhile
                let removed = sqlx::query(&format!(
                    "DELETE FROM cached_files WHERE item_id = ? AND {EVICTABLE}"
                ))
                .bind(info.item_id.value())
                .execute(self.db.pool())
                .await?
                .rows_affected();
                if removed == 0 {
                    continue;
                }
            }
            delete_local_file(&info.local_path).await?;
            evicted += 1;
        }

        tracing::info!(evicted, "Cleared file cache");
        Ok(evicted)
    }
}
