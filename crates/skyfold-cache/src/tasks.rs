//! SQLite implementation of the task record store ports
//!
//! One struct implements all four record kinds; each kind has its own table
//! keyed by item id.

use sqlx::Row;

use skyfold_core::domain::{
    DeletionTaskRecord, ItemEnumerationTaskRecord, ItemId, PageToken, RemotePath,
    ReparentTaskRecord, UploadFailure, UploadTaskRecord,
};
use skyfold_core::ports::{
    IDeletionTaskStore, IItemEnumerationTaskStore, IReparentTaskStore, IUploadTaskStore,
};

use crate::rows::{deletion_from_row, reparent_from_row, upload_from_row};
use crate::{CacheError, DatabasePool};

/// SQLite-based implementation of the task record stores
#[derive(Clone)]
pub struct SqliteTaskStore {
    db: DatabasePool,
}

impl SqliteTaskStore {
    /// Creates a new store sharing the given pool and its write lock
    pub fn new(db: DatabasePool) -> Self {
        Self { db }
    }
}

// ============================================================================
// Upload
// ============================================================================

#[async_trait::async_trait]
impl IUploadTaskStore for SqliteTaskStore {
    async fn create_upload(&self, id: ItemId) -> anyhow::Result<UploadTaskRecord> {
        let _guard = self.db.write().await;
        sqlx::query(
            "INSERT INTO upload_tasks (item_id, last_failed_date, error_code, error_domain) \
             VALUES (?, NULL, NULL, NULL) \
             ON CONFLICT (item_id) DO UPDATE SET \
             last_failed_date = NULL, error_code = NULL, error_domain = NULL",
        )
        .bind(id.value())
        .execute(self.db.pool())
        .await?;

        tracing::trace!(item_id = %id, "Created upload record");
        Ok(UploadTaskRecord::new(id))
    }

    async fn get_upload(&self, id: ItemId) -> anyhow::Result<Option<UploadTaskRecord>> {
        let row = sqlx::query("SELECT * FROM upload_tasks WHERE item_id = ?")
            .bind(id.value())
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.as_ref().map(upload_from_row).transpose()?)
    }

    async fn record_upload_failure(
        &self,
        id: ItemId,
        failure: &UploadFailure,
    ) -> anyhow::Result<()> {
        let _guard = self.db.write().await;
        let updated = sqlx::query(
            "UPDATE upload_tasks SET last_failed_date = ?, error_code = ?, error_domain = ? \
             WHERE item_id = ?",
        )
        .bind(failure.date.to_rfc3339())
        .bind(failure.code)
        .bind(&failure.domain)
        .bind(id.value())
        .execute(self.db.pool())
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(CacheError::NotFound(format!("upload record for item {id}")).into());
        }
        Ok(())
    }

    async fn remove_upload(&self, id: ItemId) -> anyhow::Result<()> {
        let _guard = self.db.write().await;
        sqlx::query("DELETE FROM upload_tasks WHERE item_id = ?")
            .bind(id.value())
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    async fn list_uploads(&self) -> anyhow::Result<Vec<UploadTaskRecord>> {
        let rows = sqlx::query("SELECT * FROM upload_tasks ORDER BY item_id")
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows
            .iter()
            .map(upload_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }
}

// ============================================================================
// Deletion
// ============================================================================

#[async_trait::async_trait]
impl IDeletionTaskStore for SqliteTaskStore {
    async fn create_deletion(&self, record: &DeletionTaskRecord) -> anyhow::Result<()> {
        let _guard = self.db.write().await;
        sqlx::query(
            "INSERT OR REPLACE INTO deletion_tasks (item_id, remote_path, parent_id, item_type) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(record.item_id.value())
        .bind(record.remote_path.as_str())
        .bind(record.parent_id.value())
        .bind(record.item_type.as_str())
        .execute(self.db.pool())
        .await?;

        tracing::trace!(item_id = %record.item_id, path = %record.remote_path, "Created deletion record");
        Ok(())
    }

    async fn get_deletion(&self, id: ItemId) -> anyhow::Result<Option<DeletionTaskRecord>> {
        let row = sqlx::query("SELECT * FROM deletion_tasks WHERE item_id = ?")
            .bind(id.value())
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.as_ref().map(deletion_from_row).transpose()?)
    }

    async fn remove_deletion(&self, id: ItemId) -> anyhow::Result<()> {
        let _guard = self.db.write().await;
        sqlx::query("DELETE FROM deletion_tasks WHERE item_id = ?")
            .bind(id.value())
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    async fn list_deletions_in(&self, parent: ItemId) -> anyhow::Result<Vec<DeletionTaskRecord>> {
        let rows = sqlx::query("SELECT * FROM deletion_tasks WHERE parent_id = ? ORDER BY item_id")
            .bind(parent.value())
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows
            .iter()
            .map(deletion_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn list_deletions(&self) -> anyhow::Result<Vec<DeletionTaskRecord>> {
        let rows = sqlx::query("SELECT * FROM deletion_tasks ORDER BY item_id")
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows
            .iter()
            .map(deletion_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }
}

// ============================================================================
// Reparent
// ============================================================================

#[async_trait::async_trait]
impl IReparentTaskStore for SqliteTaskStore {
    async fn create_reparent(
        &self,
        record: &ReparentTaskRecord,
    ) -> anyhow::Result<ReparentTaskRecord> {
        let _guard = self.db.write().await;
        let mut tx = self.db.pool().begin().await?;

        // An earlier, still pending move keeps its source: the remote entry
        // has not left it yet.
        sqlx::query(
            "INSERT INTO reparent_tasks \
             (item_id, source_path, target_path, old_parent_id, new_parent_id) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT (item_id) DO UPDATE SET \
             target_path = excluded.target_path, new_parent_id = excluded.new_parent_id",
        )
        .bind(record.item_id.value())
        .bind(record.source_path.as_str())
        .bind(record.target_path.as_str())
        .bind(record.old_parent_id.value())
        .bind(record.new_parent_id.value())
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query("SELECT * FROM reparent_tasks WHERE item_id = ?")
            .bind(record.item_id.value())
            .fetch_one(&mut *tx)
            .await?;
        let stored = reparent_from_row(&row)?;
        tx.commit().await?;

        tracing::trace!(
            item_id = %stored.item_id,
            source = %stored.source_path,
            target = %stored.target_path,
            "Stored reparent record"
        );
        Ok(stored)
    }

    async fn get_reparent(&self, id: ItemId) -> anyhow::Result<Option<ReparentTaskRecord>> {
        let row = sqlx::query("SELECT * FROM reparent_tasks WHERE item_id = ?")
            .bind(id.value())
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.as_ref().map(reparent_from_row).transpose()?)
    }

    async fn update_reparent_target(
        &self,
        id: ItemId,
        target_path: &RemotePath,
    ) -> anyhow::Result<()> {
        let _guard = self.db.write().await;
        let updated = sqlx::query("UPDATE reparent_tasks SET target_path = ? WHERE item_id = ?")
            .bind(target_path.as_str())
            .bind(id.value())
            .execute(self.db.pool())
            .await?
            .rows_affected();

        if updated == 0 {
            return Err(CacheError::NotFound(format!("reparent record for item {id}")).into());
        }
        Ok(())
    }

    async fn remove_reparent(&self, id: ItemId) -> anyhow::Result<()> {
        let _guard = self.db.write().await;
        sqlx::query("DELETE FROM reparent_tasks WHERE item_id = ?")
            .bind(id.value())
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    async fn list_reparents_from(
        &self,
        parent: ItemId,
    ) -> anyhow::Result<Vec<ReparentTaskRecord>> {
        let rows =
            sqlx::query("SELECT * FROM reparent_tasks WHERE old_parent_id = ? ORDER BY item_id")
                .bind(parent.value())
                .fetch_all(self.db.pool())
                .await?;
        Ok(rows
            .iter()
            .map(reparent_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn list_reparents_into(
        &self,
        parent: ItemId,
    ) -> anyhow::Result<Vec<ReparentTaskRecord>> {
        let rows =
            sqlx::query("SELECT * FROM reparent_tasks WHERE new_parent_id = ? ORDER BY item_id")
                .bind(parent.value())
                .fetch_all(self.db.pool())
                .await?;
        Ok(rows
            .iter()
            .map(reparent_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn list_reparents(&self) -> anyhow::Result<Vec<ReparentTaskRecord>> {
        let rows = sqlx::query("SELECT * FROM reparent_tasks ORDER BY item_id")
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows
            .iter()
            .map(reparent_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }
}

// ============================================================================
// Item enumeration
// ============================================================================

#[async_trait::async_trait]
impl IItemEnumerationTaskStore for SqliteTaskStore {
    async fn create_enumeration(&self, record: &ItemEnumerationTaskRecord) -> anyhow::Result<()> {
        let _guard = self.db.write().await;
        sqlx::query("INSERT OR REPLACE INTO enumeration_tasks (item_id, page_token) VALUES (?, ?)")
            .bind(record.item_id.value())
            .bind(record.page_token.as_ref().map(PageToken::as_str))
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    async fn get_enumeration(
        &self,
        id: ItemId,
    ) -> anyhow::Result<Option<ItemEnumerationTaskRecord>> {
        let row = sqlx::query("SELECT item_id, page_token FROM enumeration_tasks WHERE item_id = ?")
            .bind(id.value())
            .fetch_optional(self.db.pool())
            .await?;

        match row {
            Some(ref r) => {
                let token: Option<String> = r.try_get("page_token")?;
                Ok(Some(ItemEnumerationTaskRecord {
                    item_id: ItemId::new(r.try_get("item_id")?),
                    page_token: token.map(PageToken::new),
                }))
            }
            None => Ok(None),
        }
    }

    async fn remove_enumeration(&self, id: ItemId) -> anyhow::Result<()> {
        let _guard = self.db.write().await;
        sqlx::query("DELETE FROM enumeration_tasks WHERE item_id = ?")
            .bind(id.value())
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    async fn clear_enumerations(&self) -> anyhow::Result<u64> {
        let _guard = self.db.write().await;
        let cleared = sqlx::query("DELETE FROM enumeration_tasks")
            .execute(self.db.pool())
            .await?
            .rows_affected();
        Ok(cleared)
    }
}
