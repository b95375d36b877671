//! Engine wiring shared by every command
//!
//! Opens the SQLite database and local file cache named in the
//! configuration, points a [`DirectoryRemoteStore`] at `remote.root` and
//! builds the [`SyncAdapter`] on top.

use std::sync::Arc;

use anyhow::{Context, Result};
use skyfold_cache::{DatabasePool, SqliteCachedFileRegistry, SqliteMetadataStore, SqliteTaskStore};
use skyfold_core::config::Config;
use skyfold_core::domain::{ItemId, RemotePath};
use skyfold_sync::{
    DirectoryRemoteStore, ExecutorContext, ItemView, LocalFileCache, SyncAdapter,
    TransferRegistry, WorkflowHandle, WorkflowScheduler,
};

pub struct Session {
    pub adapter: SyncAdapter,
    pub config: Config,
}

impl Session {
    pub async fn open(config: Config) -> Result<Self> {
        std::fs::create_dir_all(&config.remote.root).with_context(|| {
            format!(
                "Failed to create remote root {}",
                config.remote.root.display()
            )
        })?;
        let pool = DatabasePool::new(&config.cache.database)
            .await
            .context("Failed to open database")?;
        let local_cache = LocalFileCache::new(&config.cache.dir).with_context(|| {
            format!("Failed to open file cache {}", config.cache.dir.display())
        })?;

        let tasks = Arc::new(SqliteTaskStore::new(pool.clone()));
        let ctx = Arc::new(ExecutorContext {
            metadata: Arc::new(SqliteMetadataStore::new(pool.clone())),
            uploads: tasks.clone(),
            deletions: tasks.clone(),
            reparents: tasks.clone(),
            enumerations: tasks,
            cached_files: Arc::new(SqliteCachedFileRegistry::new(pool)),
            remote: Arc::new(DirectoryRemoteStore::new(
                &config.remote.root,
                config.remote.page_size as usize,
            )),
            local_cache,
            transfers: Arc::new(TransferRegistry::new()),
        });
        let scheduler = WorkflowScheduler::from_config(&config.transfers);

        tracing::debug!(
            remote = %config.remote.root.display(),
            database = %config.cache.database.display(),
            "Session opened"
        );
        Ok(Self {
            adapter: SyncAdapter::new(ctx, scheduler),
            config,
        })
    }

    /// Finishes work left behind by an earlier, interrupted run
    pub async fn resume(&self) -> Result<()> {
        let report = self.adapter.resume_pending().await?;
        let mut failures = 0usize;
        for handle in report.folder_creations {
            failures += usize::from(settle(handle).await.is_none());
        }
        for handle in report.deletions {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Resumed deletion failed");
                failures += 1;
            }
        }
        for handle in report.reparents {
            failures += usize::from(settle(handle).await.is_none());
        }
        for handle in report.uploads {
            failures += usize::from(settle(handle).await.is_none());
        }
        if failures > 0 {
            tracing::warn!(failures, "Some resumed tasks failed, they stay pending");
        }
        Ok(())
    }

    /// Resolves a remote path, enumerating ancestors as needed
    pub async fn resolve(&self, path: &str) -> Result<(RemotePath, ItemId)> {
        let path: RemotePath = path
            .parse()
            .with_context(|| format!("Invalid remote path '{path}'"))?;
        let id = self
            .adapter
            .item_id_for_path(&path)
            .await?
            .with_context(|| format!("No such item: {path}"))?;
        Ok((path, id))
    }
}

async fn settle(handle: WorkflowHandle<ItemView>) -> Option<ItemView> {
    match handle.await {
        Ok(view) => Some(view),
        Err(e) => {
            tracing::warn!(error = %e, "Resumed task failed");
            None
        }
    }
}
