//! Per-path dependency registry
//!
//! Every workflow declares the remote paths it touches. Registration is
//! synchronous and happens at submission time: the registry returns the set of
//! earlier, still-pending workflows whose claims conflict with the new ones,
//! and a guard that releases the new claims when dropped.
//!
//! ## Access levels
//!
//! - `Write`: the workflow mutates the path (upload, delete, create, move).
//! - `Read`: the workflow observes the path (download, enumeration).
//! - `Traverse`: implicit claim on every ancestor of a claimed path.
//!
//! Every pair of accesses on the same path conflicts except read/traverse and
//! traverse/traverse, so enumerating a folder never waits for work inside it
//! while deleting or creating the folder does.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use skyfold_core::domain::RemotePath;
use tokio::sync::watch;

/// How a workflow uses a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PathAccess {
    Traverse,
    Read,
    Write,
}

impl PathAccess {
    /// Whether a claim with this access must wait for an earlier `other` claim
    pub fn conflicts_with(self, other: PathAccess) -> bool {
        !matches!(
            (self, other),
            (PathAccess::Read, PathAccess::Traverse)
                | (PathAccess::Traverse, PathAccess::Read)
                | (PathAccess::Traverse, PathAccess::Traverse)
        )
    }
}

/// A path a workflow declares, with its access level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathClaim {
    pub path: RemotePath,
    pub access: PathAccess,
}

impl PathClaim {
    pub fn write(path: RemotePath) -> Self {
        Self {
            path,
            access: PathAccess::Write,
        }
    }

    pub fn read(path: RemotePath) -> Self {
        Self {
            path,
            access: PathAccess::Read,
        }
    }
}

/// Adds traverse claims for every ancestor and keeps the strongest access per path
fn expand_claims(claims: &[PathClaim]) -> HashMap<String, PathAccess> {
    let mut expanded: HashMap<String, PathAccess> = HashMap::new();
    let mut add = |key: String, access: PathAccess| {
        expanded
            .entry(key)
            .and_modify(|existing| *existing = (*existing).max(access))
            .or_insert(access);
    };

    for claim in claims {
        for ancestor in claim.path.ancestors() {
            add(ancestor.key(), PathAccess::Traverse);
        }
        add(claim.path.key(), claim.access);
    }
    expanded
}

#[derive(Debug)]
struct PendingClaim {
    workflow: u64,
    access: PathAccess,
    done: watch::Receiver<bool>,
}

/// A completion signal of an earlier workflow
#[derive(Debug, Clone)]
pub struct Predecessor {
    pub workflow_id: u64,
    done: watch::Receiver<bool>,
}

impl Predecessor {
    /// Resolves once the predecessor completed, however it completed
    pub async fn finished(mut self) {
        // A closed channel means the guard is gone, which is also completion.
        let _ = self.done.wait_for(|done| *done).await;
    }
}

/// Result of registering a workflow's claims
#[derive(Debug)]
pub struct Registration {
    pub workflow_id: u64,
    pub predecessors: Vec<Predecessor>,
    pub guard: CompletionGuard,
}

/// Registry of pending path claims, shared by all workflows of one scheduler
#[derive(Debug, Default)]
pub struct PathDependencyRegistry {
    next_id: AtomicU64,
    pending: Mutex<HashMap<String, Vec<PendingClaim>>>,
}

impl PathDependencyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<PendingClaim>>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers claims and returns the conflicting earlier workflows
    ///
    /// Claims are inserted in the same critical section that computes the
    /// predecessors, so submission order is the registration order.
    pub fn register(self: &Arc<Self>, claims: &[PathClaim]) -> Registration {
        let workflow_id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (done_tx, done_rx) = watch::channel(false);
        let expanded = expand_claims(claims);

        let mut predecessors: Vec<Predecessor> = Vec::new();
        {
            let mut pending = self.lock();
            for (key, access) in &expanded {
                if let Some(existing) = pending.get(key) {
                    for claim in existing {
                        if access.conflicts_with(claim.access)
                            && !predecessors.iter().any(|p| p.workflow_id == claim.workflow)
                        {
                            predecessors.push(Predecessor {
                                workflow_id: claim.workflow,
                                done: claim.done.clone(),
                            });
                        }
                    }
                }
                pending.entry(key.clone()).or_default().push(PendingClaim {
                    workflow: workflow_id,
                    access: *access,
                    done: done_rx.clone(),
                });
            }
        }

        tracing::trace!(
            workflow_id,
            claims = expanded.len(),
            predecessors = predecessors.len(),
            "Registered path claims"
        );

        Registration {
            workflow_id,
            predecessors,
            guard: CompletionGuard {
                registry: Arc::clone(self),
                workflow_id,
                keys: expanded.into_keys().collect(),
                done: done_tx,
            },
        }
    }

    /// Number of paths with at least one pending claim
    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }
}

/// Releases a workflow's claims and signals its successors when dropped
#[derive(Debug)]
pub struct CompletionGuard {
    registry: Arc<PathDependencyRegistry>,
    workflow_id: u64,
    keys: Vec<String>,
    done: watch::Sender<bool>,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.done.send_replace(true);

        let mut pending = self.registry.lock();
        for key in &self.keys {
            if let Some(claims) = pending.get_mut(key) {
                claims.retain(|c| c.workflow != self.workflow_id);
                if claims.is_empty() {
                    pending.remove(key);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> RemotePath {
        s.parse().unwrap()
    }

    fn ids(reg: &Registration) -> Vec<u64> {
        let mut ids: Vec<u64> = reg.predecessors.iter().map(|p| p.workflow_id).collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_access_conflicts() {
        use PathAccess::*;
        assert!(Write.conflicts_with(Write));
        assert!(Write.conflicts_with(Read));
        assert!(Write.conflicts_with(Traverse));
        assert!(Traverse.conflicts_with(Write));
        assert!(Read.conflicts_with(Read));
        assert!(!Read.conflicts_with(Traverse));
        assert!(!Traverse.conflicts_with(Read));
        assert!(!Traverse.conflicts_with(Traverse));
    }

    #[test]
    fn test_same_path_waits_for_earlier_claim() {
        let registry = Arc::new(PathDependencyRegistry::new());
        let first = registry.register(&[PathClaim::write(path("/a.txt"))]);
        let second = registry.register(&[PathClaim::write(path("/A.TXT"))]);

        assert!(first.predecessors.is_empty());
        assert_eq!(ids(&second), vec![first.workflow_id]);
    }

    #[test]
    fn test_folder_write_orders_against_work_inside() {
        let registry = Arc::new(PathDependencyRegistry::new());
        let create = registry.register(&[PathClaim::write(path("/docs"))]);
        let upload = registry.register(&[PathClaim::write(path("/docs/a.txt"))]);
        assert_eq!(ids(&upload), vec![create.workflow_id]);

        let delete = registry.register(&[PathClaim::write(path("/docs"))]);
        assert_eq!(ids(&delete), vec![create.workflow_id, upload.workflow_id]);
    }

    #[test]
    fn test_enumeration_does_not_wait_for_uploads_inside() {
        let registry = Arc::new(PathDependencyRegistry::new());
        let _upload = registry.register(&[PathClaim::write(path("/docs/a.txt"))]);
        let listing = registry.register(&[PathClaim::read(path("/docs"))]);
        assert!(listing.predecessors.is_empty());
    }

    #[test]
    fn test_unrelated_paths_are_independent() {
        let registry = Arc::new(PathDependencyRegistry::new());
        let _a = registry.register(&[PathClaim::write(path("/a/x"))]);
        let b = registry.register(&[PathClaim::write(path("/b/y"))]);
        assert!(b.predecessors.is_empty());
    }

    #[test]
    fn test_guard_drop_releases_claims() {
        let registry = Arc::new(PathDependencyRegistry::new());
        let first = registry.register(&[PathClaim::write(path("/a/b.txt"))]);
        assert_eq!(registry.pending_count(), 3);

        drop(first.guard);
        assert_eq!(registry.pending_count(), 0);

        let next = registry.register(&[PathClaim::write(path("/a/b.txt"))]);
        assert!(next.predecessors.is_empty());
    }

    #[tokio::test]
    async fn test_predecessor_resolves_on_guard_drop() {
        let registry = Arc::new(PathDependencyRegistry::new());
        let first = registry.register(&[PathClaim::write(path("/a"))]);
        let second = registry.register(&[PathClaim::write(path("/a"))]);

        let waiter = tokio::spawn(async move {
            for p in second.predecessors {
                p.finished().await;
            }
        });
        drop(first.guard);
        waiter.await.unwrap();
    }

    #[test]
    fn test_move_claims_both_paths_once() {
        let registry = Arc::new(PathDependencyRegistry::new());
        let upload = registry.register(&[PathClaim::write(path("/src/a.txt"))]);
        let other = registry.register(&[PathClaim::write(path("/dst/a.txt"))]);
        let mv = registry.register(&[
            PathClaim::write(path("/src/a.txt")),
            PathClaim::write(path("/dst/a.txt")),
        ]);
        assert_eq!(ids(&mv), vec![upload.workflow_id, other.workflow_id]);
    }
}
