//! SQLite implementation of IMetadataStore
//!
//! Identity is resolved by remote path among *live* items, that is items
//! without a deletion record. Every mutation takes the pool's write lock;
//! read-check-write sequences additionally run in one transaction.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use skyfold_core::domain::{Item, ItemId, ItemStatus, NewItem, RemotePath};
use skyfold_core::ports::IMetadataStore;

use crate::rows::{format_optional_datetime, item_from_row, items_from_rows, size_to_sql, ITEM_COLUMNS};
use crate::{CacheError, DatabasePool};

const LIVE: &str = "id NOT IN (SELECT item_id FROM deletion_tasks)";

/// SQLite-based implementation of the metadata store port
#[derive(Clone)]
pub struct SqliteMetadataStore {
    db: DatabasePool,
}

impl SqliteMetadataStore {
    /// Creates a new store sharing the given pool and its write lock
    pub fn new(db: DatabasePool) -> Self {
        Self { db }
    }
}

// ============================================================================
// Connection-level helpers (run inside a transaction)
// ============================================================================

async fn fetch_item(conn: &mut SqliteConnection, id: ItemId) -> Result<Option<Item>, CacheError> {
    let row = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?"))
        .bind(id.value())
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(item_from_row).transpose()
}

async fn live_id_at(
    conn: &mut SqliteConnection,
    path: &RemotePath,
) -> Result<Option<ItemId>, CacheError> {
    let id: Option<i64> = sqlx::query_scalar(&format!(
        "SELECT id FROM items WHERE remote_path = ? AND {LIVE} ORDER BY id LIMIT 1"
    ))
    .bind(path.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    Ok(id.map(ItemId::new))
}

async fn insert_item(conn: &mut SqliteConnection, item: &NewItem) -> Result<ItemId, CacheError> {
    let result = sqlx::query(
        "INSERT INTO items \
         (name, item_type, size, parent_id, remote_last_modified, status, remote_path, \
          is_placeholder, is_maybe_outdated) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0)",
    )
    .bind(&item.name)
    .bind(item.item_type.as_str())
    .bind(size_to_sql(item.size)?)
    .bind(item.parent_id.value())
    .bind(format_optional_datetime(item.remote_last_modified))
    .bind(item.status.as_str())
    .bind(item.remote_path.as_str())
    .bind(item.is_placeholder)
    .execute(&mut *conn)
    .await?;
    Ok(ItemId::new(result.last_insert_rowid()))
}

async fn upsert_in(conn: &mut SqliteConnection, item: &NewItem) -> Result<Item, CacheError> {
    let id = match live_id_at(conn, &item.remote_path).await? {
        Some(id) => {
            sqlx::query(
                "UPDATE items SET name = ?, item_type = ?, size = ?, parent_id = ?, \
                 remote_last_modified = ?, remote_path = ?, is_maybe_outdated = 0 \
                 WHERE id = ?",
            )
            .bind(&item.name)
            .bind(item.item_type.as_str())
            .bind(size_to_sql(item.size)?)
            .bind(item.parent_id.value())
            .bind(format_optional_datetime(item.remote_last_modified))
            .bind(item.remote_path.as_str())
            .bind(id.value())
            .execute(&mut *conn)
            .await?;
            id
        }
        None => insert_item(conn, item).await?,
    };

    fetch_item(conn, id)
        .await?
        .ok_or_else(|| CacheError::NotFound(format!("item {id} vanished during upsert")))
}

// ============================================================================
// IMetadataStore implementation
// ============================================================================

#[async_trait::async_trait]
impl IMetadataStore for SqliteMetadataStore {
    async fn get(&self, id: ItemId) -> anyhow::Result<Option<Item>> {
        let row = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?"))
            .bind(id.value())
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.as_ref().map(item_from_row).transpose()?)
    }

    async fn get_by_path(&self, path: &RemotePath) -> anyhow::Result<Option<Item>> {
        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE remote_path = ? AND {LIVE} ORDER BY id LIMIT 1"
        ))
        .bind(path.as_str())
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.as_ref().map(item_from_row).transpose()?)
    }

    async fn list_children(&self, parent: ItemId) -> anyhow::Result<Vec<Item>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE parent_id = ? AND id != parent_id \
             ORDER BY name COLLATE NOCASE"
        ))
        .bind(parent.value())
        .fetch_all(self.db.pool())
        .await?;
        Ok(items_from_rows(&rows)?)
    }

    async fn upsert(&self, item: &NewItem) -> anyhow::Result<Item> {
        let _guard = self.db.write().await;
        let mut tx = self.db.pool().begin().await?;
        let stored = upsert_in(&mut tx, item).await?;
        tx.commit().await?;

        tracing::trace!(item_id = %stored.id, path = %stored.remote_path, "Upserted item");
        Ok(stored)
    }

    async fn upsert_many(&self, items: &[NewItem]) -> anyhow::Result<Vec<Item>> {
        let _guard = self.db.write().await;
        let mut tx = self.db.pool().begin().await?;
        let mut stored = Vec::with_capacity(items.len());
        for item in items {
            stored.push(upsert_in(&mut tx, item).await?);
        }
        tx.commit().await?;

        tracing::trace!(count = stored.len(), "Upserted items");
        Ok(stored)
    }

    async fn insert_placeholder(&self, item: &NewItem) -> anyhow::Result<Option<Item>> {
        let _guard = self.db.write().await;
        let mut tx = self.db.pool().begin().await?;

        if live_id_at(&mut tx, &item.remote_path).await?.is_some() {
            return Ok(None);
        }
        let id = insert_item(&mut tx, item).await?;
        let stored = fetch_item(&mut tx, id).await?;
        tx.commit().await?;

        tracing::trace!(item_id = %id, path = %item.remote_path, "Inserted placeholder");
        Ok(stored)
    }

    async fn move_item(
        &self,
        id: ItemId,
        new_parent: ItemId,
        new_name: &str,
        new_path: &RemotePath,
    ) -> anyhow::Result<Option<Item>> {
        let _guard = self.db.write().await;
        let mut tx = self.db.pool().begin().await?;

        let item = fetch_item(&mut tx, id)
            .await?
            .ok_or_else(|| CacheError::NotFound(format!("item {id}")))?;

        if let Some(occupant) = live_id_at(&mut tx, new_path).await? {
            if occupant != id {
                return Ok(None);
            }
        }

        sqlx::query("UPDATE items SET name = ?, parent_id = ?, remote_path = ? WHERE id = ?")
            .bind(new_name)
            .bind(new_parent.value())
            .bind(new_path.as_str())
            .bind(id.value())
            .execute(&mut *tx)
            .await?;

        if item.is_folder() && !item.remote_path.is_root() {
            // substr() counts characters, not bytes
            let old_prefix = format!("{}/", item.remote_path);
            let new_prefix = format!("{}/", new_path);
            let prefix_chars = old_prefix.chars().count() as i64;
            let rewritten = sqlx::query(
                "UPDATE items SET remote_path = ? || substr(remote_path, ? + 1) \
                 WHERE lower(substr(remote_path, 1, ?)) = lower(?) AND id != ?",
            )
            .bind(&new_prefix)
            .bind(prefix_chars)
            .bind(prefix_chars)
            .bind(&old_prefix)
            .bind(id.value())
            .execute(&mut *tx)
            .await?
            .rows_affected();

            tracing::debug!(item_id = %id, descendants = rewritten, "Rewrote descendant paths");
        }

        let moved = fetch_item(&mut tx, id).await?;
        tx.commit().await?;

        tracing::debug!(
            item_id = %id,
            from = %item.remote_path,
            to = %new_path,
            "Moved item"
        );
        Ok(moved)
    }

    async fn set_status(&self, id: ItemId, status: ItemStatus) -> anyhow::Result<()> {
        let _guard = self.db.write().await;
        sqlx::query("UPDATE items SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id.value())
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    async fn mark_uploaded(
        &self,
        id: ItemId,
        size: Option<u64>,
        remote_last_modified: Option<DateTime<Utc>>,
    ) -> anyhow::Result<()> {
        let _guard = self.db.write().await;
        sqlx::query(
            "UPDATE items SET status = 'uploaded', is_placeholder = 0, size = ?, \
             remote_last_modified = ? WHERE id = ?",
        )
        .bind(size_to_sql(size)?)
        .bind(format_optional_datetime(remote_last_modified))
        .bind(id.value())
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    async fn flag_maybe_outdated(&self, parent: ItemId) -> anyhow::Result<u64> {
        let _guard = self.db.write().await;
        let flagged = sqlx::query(
            "UPDATE items SET is_maybe_outdated = 1 \
             WHERE parent_id = ? AND id != parent_id AND is_placeholder = 0",
        )
        .bind(parent.value())
        .execute(self.db.pool())
        .await?
        .rows_affected();
        Ok(flagged)
    }

    async fn list_maybe_outdated(&self, parent: ItemId) -> anyhow::Result<Vec<Item>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM items \
             WHERE parent_id = ? AND id != parent_id AND is_maybe_outdated = 1"
        ))
        .bind(parent.value())
        .fetch_all(self.db.pool())
        .await?;
        Ok(items_from_rows(&rows)?)
    }

    async fn clear_maybe_outdated(&self, parent: ItemId) -> anyhow::Result<()> {
        let _guard = self.db.write().await;
        sqlx::query("UPDATE items SET is_maybe_outdated = 0 WHERE parent_id = ?")
            .bind(parent.value())
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    async fn list_placeholders(&self, parent: ItemId) -> anyhow::Result<Vec<Item>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM items \
             WHERE parent_id = ? AND id != parent_id AND is_placeholder = 1 \
             ORDER BY name COLLATE NOCASE"
        ))
        .bind(parent.value())
        .fetch_all(self.db.pool())
        .await?;
        Ok(items_from_rows(&rows)?)
    }

    async fn set_favorite_rank(&self, id: ItemId, rank: Option<i64>) -> anyhow::Result<()> {
        let _guard = self.db.write().await;
        sqlx::query("UPDATE items SET favorite_rank = ? WHERE id = ?")
            .bind(rank)
            .bind(id.value())
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    async fn set_tag_data(&self, id: ItemId, data: Option<&[u8]>) -> anyhow::Result<()> {
        let _guard = self.db.write().await;
        sqlx::query("UPDATE items SET tag_data = ? WHERE id = ?")
            .bind(data)
            .bind(id.value())
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    async fn list_working_set(&self) -> anyhow::Result<Vec<Item>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM items \
             WHERE favorite_rank IS NOT NULL OR tag_data IS NOT NULL ORDER BY id"
        ))
        .fetch_all(self.db.pool())
        .await?;
        Ok(items_from_rows(&rows)?)
    }

    async fn remove(&self, ids: &[ItemId]) -> anyhow::Result<()> {
        let _guard = self.db.write().await;
        let mut tx = self.db.pool().begin().await?;
        for id in ids {
            if id.is_root() {
                tracing::warn!("Refusing to remove the root item");
                continue;
            }
            sqlx::query("DELETE FROM items WHERE id = ?")
                .bind(id.value())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        tracing::trace!(count = ids.len(), "Removed items");
        Ok(())
    }
}
