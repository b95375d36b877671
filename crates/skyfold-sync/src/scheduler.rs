//! Workflow scheduler
//!
//! Accepts workflows, orders them by their path claims and bounds how many
//! uploads and downloads run at once. Submission is synchronous: claims are
//! registered before `schedule` returns, so two calls made one after the other
//! on the same path run in that order.
//!
//! A submitted workflow first waits for its predecessors, then acquires a
//! permit from its class pool, then runs. Waiting workflows never hold a
//! permit. The claims are released when the workflow's task finishes, fails,
//! panics or is aborted.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use skyfold_core::config::TransfersConfig;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::dependency::{PathClaim, PathDependencyRegistry};
use crate::error::SyncError;

/// Concurrency pool a workflow draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskClass {
    Upload,
    Download,
    /// Only path-serialized, never pool-limited
    Unconstrained,
}

type BoxedTask<T> = Pin<Box<dyn Future<Output = Result<T, SyncError>> + Send>>;

/// One unit of scheduled work wrapping a task executor invocation
pub struct Workflow<T> {
    pub kind: &'static str,
    pub class: TaskClass,
    pub claims: Vec<PathClaim>,
    future: BoxedTask<T>,
}

impl<T> Workflow<T> {
    pub fn new<F>(kind: &'static str, class: TaskClass, claims: Vec<PathClaim>, future: F) -> Self
    where
        F: Future<Output = Result<T, SyncError>> + Send + 'static,
    {
        Self {
            kind,
            class,
            claims,
            future: Box::pin(future),
        }
    }
}

/// Eventual result of a scheduled workflow
///
/// Dropping the handle does not cancel the workflow.
#[derive(Debug)]
pub struct WorkflowHandle<T> {
    pub workflow_id: u64,
    join: JoinHandle<Result<T, SyncError>>,
}

impl<T> WorkflowHandle<T> {
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

impl<T> Future for WorkflowHandle<T> {
    type Output = Result<T, SyncError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let workflow_id = self.workflow_id;
        Pin::new(&mut self.join).poll(cx).map(|joined| match joined {
            Ok(result) => result,
            Err(e) => Err(SyncError::WorkflowAborted(format!("workflow {workflow_id}: {e}"))),
        })
    }
}

/// Schedules workflows with per-path ordering and bounded transfer pools
#[derive(Clone)]
pub struct WorkflowScheduler {
    registry: Arc<PathDependencyRegistry>,
    upload_slots: Arc<Semaphore>,
    download_slots: Arc<Semaphore>,
}

impl WorkflowScheduler {
    /// Creates a scheduler with at most `max_uploads` uploads and
    /// `max_downloads` downloads in flight
    pub fn new(max_uploads: usize, max_downloads: usize) -> Self {
        Self {
            registry: Arc::new(PathDependencyRegistry::new()),
            upload_slots: Arc::new(Semaphore::new(max_uploads.max(1))),
            download_slots: Arc::new(Semaphore::new(max_downloads.max(1))),
        }
    }

    pub fn from_config(config: &TransfersConfig) -> Self {
        Self::new(
            config.max_parallel_uploads as usize,
            config.max_parallel_downloads as usize,
        )
    }

    /// Number of remote paths with a pending claim
    pub fn pending_paths(&self) -> usize {
        self.registry.pending_count()
    }

    /// Submits a workflow; must be called inside a Tokio runtime
    pub fn schedule<T: Send + 'static>(&self, workflow: Workflow<T>) -> WorkflowHandle<T> {
        let Workflow {
            kind,
            class,
            claims,
            future,
        } = workflow;

        let registration = self.registry.register(&claims);
        let workflow_id = registration.workflow_id;
        let slots = match class {
            TaskClass::Upload => Some(Arc::clone(&self.upload_slots)),
            TaskClass::Download => Some(Arc::clone(&self.download_slots)),
            TaskClass::Unconstrained => None,
        };

        tracing::debug!(
            workflow_id,
            kind,
            waiting_on = registration.predecessors.len(),
            "Workflow scheduled"
        );

        let join = tokio::spawn(async move {
            // Held until this task ends, whatever way it ends.
            let _guard = registration.guard;

            for predecessor in registration.predecessors {
                predecessor.finished().await;
            }

            let _permit = match slots {
                Some(slots) => Some(slots.acquire_owned().await.map_err(|e| {
                    SyncError::WorkflowAborted(format!("workflow {workflow_id}: {e}"))
                })?),
                None => None,
            };

            tracing::trace!(workflow_id, kind, "Workflow started");
            let result = future.await;
            match &result {
                Ok(_) => tracing::debug!(workflow_id, kind, "Workflow finished"),
                Err(e) => tracing::debug!(workflow_id, kind, error = %e, "Workflow failed"),
            }
            result
        });

        WorkflowHandle { workflow_id, join }
    }
}
