//! Item enumeration executor
//!
//! ## Folder reconciliation
//!
//! Remote listings arrive in pages. The first page flags every existing child
//! of the folder as maybe-outdated; each page upserts its entries, which
//! clears the flag on the children it matches. Only the last page sweeps the
//! children still flagged, so a partial pass never deletes anything.
//!
//! Open task records protect local intent from stale listings:
//!
//! - an entry at the source of a pending move out of (or within) the folder,
//!   or at the path of a pending deletion in the folder, is not reconciled;
//! - the sweep keeps children that have a deletion, reparent or upload
//!   record, and folders whose local subtree holds such a child.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use skyfold_core::domain::{Item, ItemEnumerationTaskRecord, ItemId, NewItem, PageToken};

use super::{ExecutorContext, ItemEnumerationTask, TaskExecutor};
use crate::error::SyncError;
use crate::view::{EnumerationPage, ItemView};

pub struct ItemEnumerationTaskExecutor {
    ctx: Arc<ExecutorContext>,
}

impl ItemEnumerationTaskExecutor {
    pub fn new(ctx: Arc<ExecutorContext>) -> Self {
        Self { ctx }
    }

    /// Refreshes a single file's remote attributes
    async fn refresh_file(&self, item: Item) -> Result<EnumerationPage, SyncError> {
        let ctx = &self.ctx;
        if ctx.deletions.get_deletion(item.id).await?.is_some()
            || ctx.reparents.get_reparent(item.id).await?.is_some()
        {
            tracing::debug!(item_id = %item.id, "Skipping refresh of item with pending deletion or move");
            return Ok(EnumerationPage {
                items: vec![ctx.view(item).await?],
                next_page: None,
            });
        }

        let remote = ctx.remote.fetch_metadata(&item.remote_path).await?;
        let refreshed = ctx
            .metadata
            .upsert(&NewItem::remote(
                remote.name,
                remote.item_type,
                item.parent_id,
                item.remote_path.clone(),
                remote.size,
                remote.last_modified,
            ))
            .await?;

        Ok(EnumerationPage {
            items: vec![ctx.view(refreshed).await?],
            next_page: None,
        })
    }

    /// Reconciles one page of a folder listing
    async fn enumerate_folder(
        &self,
        folder: Item,
        page_token: Option<PageToken>,
    ) -> Result<EnumerationPage, SyncError> {
        let ctx = &self.ctx;
        let first_page = page_token.is_none();

        let listing = ctx
            .remote
            .fetch_listing(&folder.remote_path, page_token.as_ref().map(PageToken::as_str))
            .await?;

        if first_page {
            let flagged = ctx.metadata.flag_maybe_outdated(folder.id).await?;
            tracing::debug!(folder_id = %folder.id, flagged, "Flagged children as maybe outdated");
        }

        let moving_out = ctx.reparents.list_reparents_from(folder.id).await?;
        let deleting = ctx.deletions.list_deletions_in(folder.id).await?;

        let mut entries = Vec::with_capacity(listing.items.len());
        for remote in listing.items {
            let stale = moving_out.iter().any(|r| r.source_path.matches(&remote.path))
                || deleting.iter().any(|d| d.remote_path.matches(&remote.path));
            if stale {
                tracing::debug!(path = %remote.path, "Skipping entry with pending local change");
                continue;
            }
            entries.push(NewItem::remote(
                remote.name,
                remote.item_type,
                folder.id,
                remote.path,
                remote.size,
                remote.last_modified,
            ));
        }
        let mut items = ctx.metadata.upsert_many(&entries).await?;

        if first_page {
            let mut seen: HashSet<ItemId> = items.iter().map(|i| i.id).collect();
            for placeholder in ctx.metadata.list_placeholders(folder.id).await? {
                if seen.insert(placeholder.id) {
                    items.push(placeholder);
                }
            }
            for incoming in ctx.reparents.list_reparents_into(folder.id).await? {
                if seen.contains(&incoming.item_id) {
                    continue;
                }
                if let Some(item) = ctx.metadata.get(incoming.item_id).await? {
                    seen.insert(item.id);
                    items.push(item);
                }
            }
        }

        let next_page = listing.next_page_token.map(PageToken::new);
        if next_page.is_none() {
            self.sweep(&folder).await?;
        }

        let mut views: Vec<ItemView> = Vec::with_capacity(items.len());
        for item in items {
            if ctx.deletions.get_deletion(item.id).await?.is_some() {
                continue;
            }
            views.push(ctx.view(item).await?);
        }

        tracing::debug!(
            folder_id = %folder.id,
            items = views.len(),
            last_page = next_page.is_none(),
            "Enumerated folder page"
        );
        Ok(EnumerationPage {
            items: views,
            next_page,
        })
    }

    /// Purges children not seen during the completed pass
    async fn sweep(&self, folder: &Item) -> Result<(), SyncError> {
        let ctx = &self.ctx;
        let mut purged = 0usize;

        'children: for child in ctx.metadata.list_maybe_outdated(folder.id).await? {
            let subtree = ctx.collect_subtree(child).await?;
            for item in &subtree {
                if ctx.is_task_protected(item.id).await? {
                    tracing::warn!(
                        item_id = %subtree[0].id,
                        path = %subtree[0].remote_path,
                        protected_by = %item.id,
                        "Keeping item missing from remote listing, local change pending"
                    );
                    continue 'children;
                }
            }
            purged += subtree.len();
            ctx.purge(&subtree).await?;
        }

        ctx.metadata.clear_maybe_outdated(folder.id).await?;
        if purged > 0 {
            tracing::info!(folder_id = %folder.id, purged, "Removed items gone from remote");
        }
        Ok(())
    }
}

#[async_trait]
impl TaskExecutor for ItemEnumerationTaskExecutor {
    type Task = ItemEnumerationTask;
    type Output = EnumerationPage;

    fn kind(&self) -> &'static str {
        "enumeration"
    }

    async fn execute(&self, task: &ItemEnumerationTask) -> Result<EnumerationPage, SyncError> {
        let ctx = &self.ctx;
        // Same-item enumerations are serialized; each one owns the record while it runs.
        ctx.enumerations
            .create_enumeration(&ItemEnumerationTaskRecord {
                item_id: task.item_id,
                page_token: task.page_token.clone(),
            })
            .await?;

        let result = match ctx.require_item(task.item_id).await {
            Ok(item) if item.is_folder() => {
                self.enumerate_folder(item, task.page_token.clone()).await
            }
            Ok(item) => self.refresh_file(item).await,
            Err(e) => Err(e),
        };

        if let Err(e) = ctx.enumerations.remove_enumeration(task.item_id).await {
            tracing::warn!(item_id = %task.item_id, error = %e, "Failed to remove enumeration record");
        }
        result
    }
}
