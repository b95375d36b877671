//! Skyfold Sync - Task scheduling, execution and reconciliation
//!
//! This crate is the engine between host operations and the remote store:
//!
//! - [`adapter::SyncAdapter`] turns host requests into task records and
//!   scheduled workflows
//! - [`scheduler::WorkflowScheduler`] orders workflows by the remote paths
//!   they touch and bounds concurrent uploads and downloads
//! - [`executors`] perform one task each and reconcile the local stores
//! - [`directory_store::DirectoryRemoteStore`] is a remote store backed by a
//!   local directory

pub mod adapter;
pub mod collision;
pub mod dependency;
pub mod directory_store;
pub mod error;
pub mod executors;
pub mod local_cache;
pub mod scheduler;
pub mod transfer;
pub mod view;

pub use adapter::{ResumeReport, Scheduled, SyncAdapter};
pub use directory_store::DirectoryRemoteStore;
pub use error::SyncError;
pub use executors::ExecutorContext;
pub use local_cache::LocalFileCache;
pub use scheduler::{TaskClass, Workflow, WorkflowHandle, WorkflowScheduler};
pub use transfer::{InFlightTransfer, TransferKind, TransferRegistry};
pub use view::{EnumerationPage, ItemView};
