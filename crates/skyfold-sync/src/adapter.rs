//! Host-facing adapter
//!
//! Translates host operations into task records and scheduled workflows:
//!
//! - validation happens synchronously, before any record is written;
//! - local state is updated optimistically (placeholders, moves, status);
//! - the remote side is reconciled by the executors, in path order.
//!
//! Every mutating operation returns a [`Scheduled`] value with the
//! optimistic view and a handle to the workflow's eventual result. Dropping
//! the handle does not cancel the work.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use skyfold_core::domain::{
    collision_free_name, validate_item_name, DeletionTaskRecord, Item, ItemId, ItemStatus,
    ItemType, LocalCachedFileInfo, NewItem, PageToken, RemotePath, ReparentTaskRecord,
    UploadTaskRecord,
};
use skyfold_core::ports::RemoteError;

use crate::dependency::PathClaim;
use crate::error::SyncError;
use crate::executors::{
    DeletionTask, DeletionTaskExecutor, DownloadTask, DownloadTaskExecutor, ExecutorContext,
    FolderCreationTask, FolderCreationTaskExecutor, ItemEnumerationTask,
    ItemEnumerationTaskExecutor, ReparentTask, ReparentTaskExecutor, TaskExecutor, UploadTask,
    UploadTaskExecutor,
};
use crate::scheduler::{TaskClass, Workflow, WorkflowHandle, WorkflowScheduler};
use crate::transfer::InFlightTransfer;
use crate::view::{EnumerationPage, ItemView};

/// Optimistic result of a host operation plus the pending remote work
#[derive(Debug)]
pub struct Scheduled<T> {
    pub view: ItemView,
    pub completion: WorkflowHandle<T>,
}

/// Work re-scheduled by [`SyncAdapter::resume_pending`]
#[derive(Debug, Default)]
pub struct ResumeReport {
    pub folder_creations: Vec<WorkflowHandle<ItemView>>,
    pub deletions: Vec<WorkflowHandle<()>>,
    pub reparents: Vec<WorkflowHandle<ItemView>>,
    pub uploads: Vec<WorkflowHandle<ItemView>>,
    /// Failed uploads wait for an explicit retry
    pub failed_uploads: usize,
    pub dropped_enumerations: u64,
}

/// Entry point for host operations
#[derive(Clone)]
pub struct SyncAdapter {
    ctx: Arc<ExecutorContext>,
    scheduler: WorkflowScheduler,
    uploads: Arc<UploadTaskExecutor>,
    downloads: Arc<DownloadTaskExecutor>,
    deletions: Arc<DeletionTaskExecutor>,
    reparents: Arc<ReparentTaskExecutor>,
    folder_creations: Arc<FolderCreationTaskExecutor>,
    enumerations: Arc<ItemEnumerationTaskExecutor>,
}

impl SyncAdapter {
    pub fn new(ctx: Arc<ExecutorContext>, scheduler: WorkflowScheduler) -> Self {
        Self {
            uploads: Arc::new(UploadTaskExecutor::new(Arc::clone(&ctx))),
            downloads: Arc::new(DownloadTaskExecutor::new(Arc::clone(&ctx))),
            deletions: Arc::new(DeletionTaskExecutor::new(Arc::clone(&ctx))),
            reparents: Arc::new(ReparentTaskExecutor::new(Arc::clone(&ctx))),
            folder_creations: Arc::new(FolderCreationTaskExecutor::new(Arc::clone(&ctx))),
            enumerations: Arc::new(ItemEnumerationTaskExecutor::new(Arc::clone(&ctx))),
            ctx,
            scheduler,
        }
    }

    pub fn context(&self) -> &ExecutorContext {
        &self.ctx
    }

    pub fn scheduler(&self) -> &WorkflowScheduler {
        &self.scheduler
    }

    // ========================================================================
    // Workflow construction
    // ========================================================================

    fn workflow<E>(
        executor: &Arc<E>,
        task: E::Task,
        class: TaskClass,
        claims: Vec<PathClaim>,
    ) -> Workflow<E::Output>
    where
        E: TaskExecutor + 'static,
        E::Task: 'static,
    {
        let executor = Arc::clone(executor);
        let kind = executor.kind();
        Workflow::new(kind, class, claims, async move { executor.execute(&task).await })
    }

    /// The item's path and, while a move is pending, the path its remote
    /// entry still lives at
    async fn write_claims(&self, item: &Item) -> Result<Vec<PathClaim>, SyncError> {
        let mut claims = vec![PathClaim::write(item.remote_path.clone())];
        let location = self.ctx.remote_location(item).await?;
        if !location.matches(&item.remote_path) {
            claims.push(PathClaim::write(location));
        }
        Ok(claims)
    }

    async fn schedule_upload(&self, item: &Item) -> Result<WorkflowHandle<ItemView>, SyncError> {
        Ok(self.scheduler.schedule(Self::workflow(
            &self.uploads,
            UploadTask { item_id: item.id },
            TaskClass::Upload,
            self.write_claims(item).await?,
        )))
    }

    fn schedule_download(
        &self,
        id: ItemId,
        path: &RemotePath,
        replace_existing: bool,
    ) -> WorkflowHandle<ItemView> {
        self.scheduler.schedule(Self::workflow(
            &self.downloads,
            DownloadTask {
                item_id: id,
                replace_existing,
            },
            TaskClass::Download,
            vec![PathClaim::read(path.clone())],
        ))
    }

    fn schedule_deletion(&self, record: &DeletionTaskRecord) -> WorkflowHandle<()> {
        self.scheduler.schedule(Self::workflow(
            &self.deletions,
            DeletionTask {
                item_id: record.item_id,
            },
            TaskClass::Unconstrained,
            vec![PathClaim::write(record.remote_path.clone())],
        ))
    }

    fn schedule_reparent(&self, record: &ReparentTaskRecord) -> WorkflowHandle<ItemView> {
        self.scheduler.schedule(Self::workflow(
            &self.reparents,
            ReparentTask {
                item_id: record.item_id,
            },
            TaskClass::Unconstrained,
            vec![
                PathClaim::write(record.source_path.clone()),
                PathClaim::write(record.target_path.clone()),
            ],
        ))
    }

    async fn schedule_folder_creation(
        &self,
        item: &Item,
    ) -> Result<WorkflowHandle<ItemView>, SyncError> {
        Ok(self.scheduler.schedule(Self::workflow(
            &self.folder_creations,
            FolderCreationTask { item_id: item.id },
            TaskClass::Unconstrained,
            self.write_claims(item).await?,
        )))
    }

    // ========================================================================
    // Validation helpers
    // ========================================================================

    async fn require_folder(&self, id: ItemId) -> Result<Item, SyncError> {
        let parent = self
            .ctx
            .metadata
            .get(id)
            .await?
            .ok_or(SyncError::ParentNotFound(id))?;
        if !parent.is_folder() {
            return Err(SyncError::ParentNotAFolder(id));
        }
        if self.ctx.deletions.get_deletion(id).await?.is_some() {
            return Err(SyncError::ParentNotFound(id));
        }
        Ok(parent)
    }

    async fn require_live(&self, id: ItemId) -> Result<Item, SyncError> {
        let item = self.ctx.require_item(id).await?;
        if self.ctx.deletions.get_deletion(id).await?.is_some() {
            return Err(SyncError::MissingItem(id));
        }
        Ok(item)
    }

    fn validated_name(name: &str) -> Result<(), SyncError> {
        validate_item_name(name).map_err(SyncError::InvalidName)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub async fn item(&self, id: ItemId) -> Result<ItemView, SyncError> {
        self.ctx.view_of(id).await
    }

    /// Resolves a remote path to an item id, enumerating ancestors as needed
    ///
    /// # Returns
    /// `None` if no such entry exists locally or remotely
    pub async fn item_id_for_path(&self, path: &RemotePath) -> Result<Option<ItemId>, SyncError> {
        let mut resolved = ItemId::ROOT;
        let mut lookups = path.ancestors();
        lookups.push(path.clone());

        for lookup in lookups.iter().filter(|p| !p.is_root()) {
            if let Some(item) = self.ctx.metadata.get_by_path(lookup).await? {
                resolved = item.id;
                continue;
            }
            if !self.ctx.require_item(resolved).await?.is_folder() {
                return Ok(None);
            }
            self.enumerate_all(resolved).await?;
            match self.ctx.metadata.get_by_path(lookup).await? {
                Some(item) => resolved = item.id,
                None => return Ok(None),
            }
        }
        Ok(Some(resolved))
    }

    /// Fetches one page of a folder listing, or refreshes a file
    pub async fn enumerate(
        &self,
        id: ItemId,
        page: Option<PageToken>,
    ) -> Result<EnumerationPage, SyncError> {
        let item = self.ctx.require_item(id).await?;
        let handle = self.scheduler.schedule(Self::workflow(
            &self.enumerations,
            ItemEnumerationTask {
                item_id: id,
                page_token: page,
            },
            TaskClass::Unconstrained,
            vec![PathClaim::read(item.remote_path)],
        ));
        handle.await
    }

    /// Enumerates every page of a folder
    pub async fn enumerate_all(&self, id: ItemId) -> Result<Vec<ItemView>, SyncError> {
        let mut items = Vec::new();
        let mut page = None;
        loop {
            let result = self.enumerate(id, page).await?;
            items.extend(result.items);
            match result.next_page {
                Some(next) => page = Some(next),
                None => return Ok(items),
            }
        }
    }

    pub async fn working_set(&self) -> Result<Vec<ItemView>, SyncError> {
        let mut views = Vec::new();
        for item in self.ctx.metadata.list_working_set().await? {
            views.push(self.ctx.view(item).await?);
        }
        Ok(views)
    }

    pub fn in_flight_transfers(&self) -> Vec<InFlightTransfer> {
        self.ctx.transfers.in_flight()
    }

    /// Cancels the running upload or download of an item
    pub fn cancel_transfer(&self, id: ItemId) -> bool {
        self.ctx.transfers.cancel(id)
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Creates a folder locally and schedules its remote creation
    pub async fn create_folder(
        &self,
        parent_id: ItemId,
        name: &str,
    ) -> Result<Scheduled<ItemView>, SyncError> {
        Self::validated_name(name)?;
        let parent = self.require_folder(parent_id).await?;
        let path = parent.remote_path.join(name)?;

        let item = self
            .ctx
            .metadata
            .insert_placeholder(&NewItem::placeholder(name, ItemType::Folder, parent_id, path.clone()))
            .await?
            .ok_or_else(|| SyncError::NameCollision(path.clone()))?;

        tracing::info!(item_id = %item.id, path = %path, "Folder creation scheduled");
        let completion = self.schedule_folder_creation(&item).await?;
        let view = self.ctx.view(item).await?;
        Ok(Scheduled { view, completion })
    }

    /// Imports host bytes as a new file and schedules its upload
    ///
    /// `name` defaults to the source file's name.
    pub async fn import_document(
        &self,
        source: &Path,
        parent_id: ItemId,
        name: Option<&str>,
    ) -> Result<Scheduled<ItemView>, SyncError> {
        let name = match name {
            Some(name) => name.to_string(),
            None => source
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
                .ok_or_else(|| SyncError::UnnamedSource(source.to_path_buf()))?,
        };
        Self::validated_name(&name)?;
        let parent = self.require_folder(parent_id).await?;
        let path = parent.remote_path.join(&name)?;

        let item = self
            .ctx
            .metadata
            .insert_placeholder(&NewItem::placeholder(&name, ItemType::File, parent_id, path.clone()))
            .await?
            .ok_or_else(|| SyncError::NameCollision(path.clone()))?;

        let local_path = match self.ctx.local_cache.store_from(item.id, source).await {
            Ok(local_path) => local_path,
            Err(e) => {
                self.ctx.metadata.remove(&[item.id]).await?;
                return Err(e.into());
            }
        };
        self.ctx.uploads.create_upload(item.id).await?;
        self.ctx
            .cached_files
            .put(&LocalCachedFileInfo {
                item_id: item.id,
                local_path,
                local_last_modified: Utc::now(),
                remote_last_modified: None,
            })
            .await?;

        tracing::info!(item_id = %item.id, path = %path, "Import scheduled");
        let view = self.ctx.view_of(item.id).await?;
        let completion = self.schedule_upload(&item).await?;
        Ok(Scheduled { view, completion })
    }

    /// Replaces a file's bytes and schedules the upload
    pub async fn write_document(
        &self,
        id: ItemId,
        source: &Path,
    ) -> Result<Scheduled<ItemView>, SyncError> {
        let item = self.require_live(id).await?;
        if !item.is_file() {
            return Err(SyncError::NotAFile(id));
        }
        let previous = self.ctx.cached_files.get(id).await?;
        let previous_upload = self.ctx.uploads.get_upload(id).await?;

        // The upload record exists before the slot holds unsent bytes, so cache
        // eviction never takes them.
        let staged = self.ctx.local_cache.stage_from(source).await?;
        self.ctx.uploads.create_upload(id).await?;
        let local_path = match self.ctx.local_cache.commit(id, &staged).await {
            Ok(local_path) => local_path,
            Err(e) => {
                self.restore_upload(id, previous_upload).await?;
                if let Err(cleanup) = tokio::fs::remove_file(&staged).await {
                    tracing::warn!(path = %staged.display(), error = %cleanup, "Failed to remove staged copy");
                }
                return Err(e.into());
            }
        };
        self.ctx.metadata.set_status(id, ItemStatus::Uploading).await?;
        self.ctx
            .cached_files
            .put(&LocalCachedFileInfo {
                item_id: id,
                local_path,
                local_last_modified: Utc::now(),
                remote_last_modified: previous
                    .and_then(|p| p.remote_last_modified)
                    .or(item.remote_last_modified),
            })
            .await?;

        tracing::info!(item_id = %id, path = %item.remote_path, "Upload scheduled");
        let view = self.ctx.view_of(id).await?;
        let completion = self.schedule_upload(&item).await?;
        Ok(Scheduled { view, completion })
    }

    /// Puts an upload record back the way it was before a failed write
    async fn restore_upload(
        &self,
        id: ItemId,
        previous: Option<UploadTaskRecord>,
    ) -> Result<(), SyncError> {
        match previous {
            None => self.ctx.uploads.remove_upload(id).await?,
            Some(UploadTaskRecord {
                failure: Some(failure),
                ..
            }) => self.ctx.uploads.record_upload_failure(id, &failure).await?,
            Some(_) => {}
        }
        Ok(())
    }

    /// Schedules deletion of an item and its subtree
    ///
    /// # Returns
    /// `None` when the item is unknown, in which case nothing is recorded
    pub async fn delete_item(&self, id: ItemId) -> Result<Option<WorkflowHandle<()>>, SyncError> {
        if id.is_root() {
            return Err(SyncError::RootNotModifiable);
        }
        let Some(item) = self.ctx.metadata.get(id).await? else {
            tracing::debug!(item_id = %id, "Delete of unknown item ignored");
            return Ok(None);
        };

        let record = DeletionTaskRecord {
            item_id: item.id,
            remote_path: item.remote_path,
            parent_id: item.parent_id,
            item_type: item.item_type,
        };
        self.ctx.deletions.create_deletion(&record).await?;

        tracing::info!(item_id = %id, path = %record.remote_path, "Deletion scheduled");
        Ok(Some(self.schedule_deletion(&record)))
    }

    /// Renames and/or moves an item
    ///
    /// The new path is visible locally at once; the remote move follows.
    pub async fn move_item(
        &self,
        id: ItemId,
        new_parent_id: ItemId,
        new_name: Option<&str>,
    ) -> Result<Scheduled<ItemView>, SyncError> {
        if id.is_root() {
            return Err(SyncError::RootNotModifiable);
        }
        let item = self.require_live(id).await?;
        let name = new_name.unwrap_or(&item.name).to_string();
        Self::validated_name(&name)?;
        let parent = self.require_folder(new_parent_id).await?;
        if parent.id == item.id || item.remote_path.is_ancestor_of(&parent.remote_path) {
            return Err(SyncError::InvalidDestination {
                item_id: id,
                parent_id: new_parent_id,
            });
        }
        let target = parent.remote_path.join(&name)?;

        if item.is_placeholder {
            // Not on the remote yet: the pending creation picks up the new path.
            let moved = self
                .ctx
                .metadata
                .move_item(id, new_parent_id, &name, &target)
                .await?
                .ok_or_else(|| SyncError::NameCollision(target.clone()))?;
            tracing::info!(item_id = %id, path = %target, "Moved placeholder");
            let completion = if moved.is_folder() {
                self.schedule_folder_creation(&moved).await?
            } else {
                self.schedule_upload(&moved).await?
            };
            let view = self.ctx.view(moved).await?;
            return Ok(Scheduled { view, completion });
        }

        let previous = self.ctx.reparents.get_reparent(id).await?;
        let record = self
            .ctx
            .reparents
            .create_reparent(&ReparentTaskRecord {
                item_id: id,
                source_path: item.remote_path.clone(),
                target_path: target.clone(),
                old_parent_id: item.parent_id,
                new_parent_id,
            })
            .await?;

        let moved = self
            .ctx
            .metadata
            .move_item(id, new_parent_id, &name, &target)
            .await?;
        let Some(moved) = moved else {
            match previous {
                Some(previous) => {
                    self.ctx.reparents.create_reparent(&previous).await?;
                }
                None => self.ctx.reparents.remove_reparent(id).await?,
            }
            return Err(SyncError::NameCollision(target));
        };
        self.ctx.metadata.set_status(id, ItemStatus::Uploading).await?;

        tracing::info!(
            item_id = %id,
            from = %record.source_path,
            to = %record.target_path,
            "Move scheduled"
        );
        let view = self.ctx.view_of(moved.id).await?;
        let completion = self.schedule_reparent(&record);
        Ok(Scheduled { view, completion })
    }

    /// Re-queues an item whose upload failed
    pub async fn retry_upload(&self, id: ItemId) -> Result<Scheduled<ItemView>, SyncError> {
        let item = self.require_live(id).await?;
        if self.ctx.uploads.get_upload(id).await?.is_none() {
            return Err(SyncError::MissingTaskRecord {
                kind: "upload",
                item_id: id,
            });
        }
        self.ctx.uploads.create_upload(id).await?;
        self.ctx.metadata.set_status(id, ItemStatus::Uploading).await?;

        tracing::info!(item_id = %id, path = %item.remote_path, "Upload retry scheduled");
        let view = self.ctx.view_of(id).await?;
        let completion = self.schedule_upload(&item).await?;
        Ok(Scheduled { view, completion })
    }

    pub async fn set_favorite_rank(
        &self,
        id: ItemId,
        rank: Option<i64>,
    ) -> Result<ItemView, SyncError> {
        self.ctx.require_item(id).await?;
        self.ctx.metadata.set_favorite_rank(id, rank).await?;
        self.ctx.view_of(id).await
    }

    /// Stores host tag data; empty data clears it
    pub async fn set_tag_data(&self, id: ItemId, data: Option<&[u8]>) -> Result<ItemView, SyncError> {
        self.ctx.require_item(id).await?;
        let data = data.filter(|d| !d.is_empty());
        self.ctx.metadata.set_tag_data(id, data).await?;
        self.ctx.view_of(id).await
    }

    // ========================================================================
    // Materialization
    // ========================================================================

    /// Returns a local path holding the newest bytes of a file
    ///
    /// Downloads when the cached copy is absent or stale. Local edits whose
    /// upload failed are never overwritten: they move to a new sibling item
    /// that is uploaded on its own, and the remote version is downloaded.
    pub async fn materialize(&self, id: ItemId) -> Result<PathBuf, SyncError> {
        let item = self.require_live(id).await?;
        if !item.is_file() {
            return Err(SyncError::NotAFile(id));
        }

        let cached = match self.ctx.cached_files.get(id).await? {
            Some(info) if tokio::fs::try_exists(&info.local_path).await? => Some(info),
            Some(_) => {
                tracing::warn!(item_id = %id, "Cached file missing on disk, downloading again");
                self.ctx.cached_files.remove(id).await?;
                None
            }
            None => None,
        };
        let Some(cached) = cached else {
            let view = self.schedule_download(id, &item.remote_path, false).await?;
            return view.local_path.ok_or(SyncError::MissingCachedFile(id));
        };

        if item.status == ItemStatus::Uploading {
            return Ok(cached.local_path);
        }

        let refreshed = match self.enumerate(id, None).await {
            Ok(mut page) if !page.items.is_empty() => page.items.remove(0).item,
            Ok(_) => item,
            Err(SyncError::Remote(RemoteError::NoInternetConnection)) => {
                tracing::debug!(item_id = %id, "Offline, serving cached copy");
                return Ok(cached.local_path);
            }
            Err(e) => return Err(e),
        };
        if cached.is_current_version(refreshed.remote_last_modified) {
            return Ok(cached.local_path);
        }

        if self.has_possible_versioning_conflict(&cached).await? {
            self.relocate_local_edits(&refreshed, &cached).await?;
            let view = self.schedule_download(id, &refreshed.remote_path, false).await?;
            return view.local_path.ok_or(SyncError::MissingCachedFile(id));
        }

        let view = self
            .schedule_download(id, &refreshed.remote_path, true)
            .await?;
        view.local_path.ok_or(SyncError::MissingCachedFile(id))
    }

    async fn has_possible_versioning_conflict(
        &self,
        cached: &LocalCachedFileInfo,
    ) -> Result<bool, SyncError> {
        let Some(upload) = self.ctx.uploads.get_upload(cached.item_id).await? else {
            return Ok(false);
        };
        Ok(match upload.failure {
            None => true,
            Some(failure) => failure.date > cached.local_last_modified,
        })
    }

    /// Moves unsent local bytes into a new sibling item and uploads them
    async fn relocate_local_edits(
        &self,
        item: &Item,
        cached: &LocalCachedFileInfo,
    ) -> Result<(), SyncError> {
        let staged = self.ctx.local_cache.staging_path();
        tokio::fs::rename(&cached.local_path, &staged).await?;

        let name = collision_free_name(&item.name, false);
        let imported = match self
            .import_document(&staged, item.parent_id, Some(&name))
            .await
        {
            Ok(imported) => imported,
            Err(e) => {
                tokio::fs::rename(&staged, &cached.local_path).await?;
                return Err(e);
            }
        };
        if let Err(e) = tokio::fs::remove_file(&staged).await {
            tracing::warn!(path = %staged.display(), error = %e, "Failed to remove staged copy");
        }

        self.ctx.uploads.remove_upload(item.id).await?;
        self.ctx.cached_files.remove(item.id).await?;
        self.ctx
            .metadata
            .set_status(item.id, ItemStatus::Uploaded)
            .await?;

        tracing::warn!(
            item_id = %item.id,
            relocated_to = %imported.view.item.id,
            path = %imported.view.item.remote_path,
            "Remote version changed while local edits were pending, kept edits as a new item"
        );
        Ok(())
    }

    // ========================================================================
    // Recovery and cache maintenance
    // ========================================================================

    /// Re-schedules work whose records survived a restart
    ///
    /// Failed uploads are left for [`SyncAdapter::retry_upload`]; enumeration
    /// records are dropped since enumerations are host-driven.
    pub async fn resume_pending(&self) -> Result<ResumeReport, SyncError> {
        let mut report = ResumeReport {
            dropped_enumerations: self.ctx.enumerations.clear_enumerations().await?,
            ..ResumeReport::default()
        };

        let root = self.ctx.require_item(ItemId::ROOT).await?;
        for item in self.ctx.collect_subtree(root).await? {
            if item.is_folder() && item.is_placeholder {
                report
                    .folder_creations
                    .push(self.schedule_folder_creation(&item).await?);
            }
        }
        for record in self.ctx.deletions.list_deletions().await? {
            report.deletions.push(self.schedule_deletion(&record));
        }
        for record in self.ctx.reparents.list_reparents().await? {
            report.reparents.push(self.schedule_reparent(&record));
        }
        for record in self.ctx.uploads.list_uploads().await? {
            if record.has_failed() {
                report.failed_uploads += 1;
                continue;
            }
            if let Some(item) = self.ctx.metadata.get(record.item_id).await? {
                report
                    .uploads
                    .push(self.schedule_upload(&item).await?);
            }
        }

        tracing::info!(
            folder_creations = report.folder_creations.len(),
            deletions = report.deletions.len(),
            reparents = report.reparents.len(),
            uploads = report.uploads.len(),
            failed_uploads = report.failed_uploads,
            dropped_enumerations = report.dropped_enumerations,
            "Resumed pending work"
        );
        Ok(report)
    }

    /// Bytes held by evictable cached files
    pub async fn cache_size(&self) -> Result<u64, SyncError> {
        Ok(self.ctx.cached_files.total_size_bytes().await?)
    }

    /// Evicts every cached file without pending local edits
    pub async fn clear_cache(&self) -> Result<u64, SyncError> {
        Ok(self.ctx.cached_files.clear().await?)
    }
}
