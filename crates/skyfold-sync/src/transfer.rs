//! In-flight transfer registry
//!
//! Uploads and downloads register a cancellation token per item for as long
//! as the remote call runs. The host may list the running transfers and cancel
//! one; cancelling has no effect on queued workflows.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use skyfold_core::domain::ItemId;
use tokio_util::sync::CancellationToken;

/// Direction of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferKind {
    Upload,
    Download,
}

/// Snapshot of a running transfer
#[derive(Debug, Clone, Serialize)]
pub struct InFlightTransfer {
    pub item_id: ItemId,
    pub kind: TransferKind,
    pub path: PathBuf,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Entry {
    serial: u64,
    info: InFlightTransfer,
    token: CancellationToken,
}

/// Registry of running transfers keyed by item
#[derive(Debug, Default)]
pub struct TransferRegistry {
    next_serial: AtomicU64,
    active: DashMap<ItemId, Entry>,
}

impl TransferRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a transfer and returns the guard that owns its token
    ///
    /// A later transfer of the same item replaces the earlier entry; the
    /// earlier guard then leaves the new entry alone when dropped.
    pub fn begin(self: &Arc<Self>, item_id: ItemId, kind: TransferKind, path: PathBuf) -> TransferGuard {
        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        self.active.insert(
            item_id,
            Entry {
                serial,
                info: InFlightTransfer {
                    item_id,
                    kind,
                    path,
                    started_at: Utc::now(),
                },
                token: token.clone(),
            },
        );
        tracing::trace!(item_id = %item_id, ?kind, "Transfer started");

        TransferGuard {
            registry: Arc::clone(self),
            item_id,
            serial,
            token,
        }
    }

    /// Cancels the running transfer of an item
    ///
    /// # Returns
    /// `true` if a transfer was running
    pub fn cancel(&self, item_id: ItemId) -> bool {
        match self.active.get(&item_id) {
            Some(entry) => {
                entry.token.cancel();
                tracing::info!(item_id = %item_id, kind = ?entry.info.kind, "Transfer cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self, item_id: ItemId) -> bool {
        self.active.contains_key(&item_id)
    }

    /// Running transfers, oldest first
    pub fn in_flight(&self) -> Vec<InFlightTransfer> {
        let mut transfers: Vec<(u64, InFlightTransfer)> = self
            .active
            .iter()
            .map(|e| (e.serial, e.info.clone()))
            .collect();
        transfers.sort_by_key(|(serial, _)| *serial);
        transfers.into_iter().map(|(_, info)| info).collect()
    }
}

/// Keeps a transfer registered until dropped
#[derive(Debug)]
pub struct TransferGuard {
    registry: Arc<TransferRegistry>,
    item_id: ItemId,
    serial: u64,
    token: CancellationToken,
}

impl TransferGuard {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for TransferGuard {
    fn drop(&mut self) {
        self.registry
            .active
            .remove_if(&self.item_id, |_, entry| entry.serial == self.serial);
    }
}
