//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the engine depends on,
//! but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteStore`] - The remote store holding the files
//! - [`IMetadataStore`] - Persistent item metadata
//! - [`IUploadTaskStore`], [`IDeletionTaskStore`], [`IReparentTaskStore`],
//!   [`IItemEnumerationTaskStore`] - Durable task records
//! - [`ICachedFileRegistry`] - Locally materialized file copies

pub mod cached_file_registry;
pub mod metadata_store;
pub mod remote_store;
pub mod task_store;

pub use cached_file_registry::ICachedFileRegistry;
pub use metadata_store::IMetadataStore;
pub use remote_store::{IRemoteStore, RemoteError, RemoteItem, RemoteListing, REMOTE_ERROR_DOMAIN};
pub use task_store::{
    IDeletionTaskStore, IItemEnumerationTaskStore, IReparentTaskStore, IUploadTaskStore,
};
