//! Domain entities and business rules
//!
//! - Newtypes for item identifiers, remote paths and page tokens
//! - The `Item` entity and its status/type enums
//! - Task records (upload, deletion, reparent, item enumeration)
//! - Local cached file bookkeeping
//! - Item name validation and collision-free renaming
//! - Domain-specific error types

pub mod errors;
pub mod item;
pub mod naming;
pub mod newtypes;
pub mod task;

// Re-export commonly used types
pub use errors::DomainError;
pub use item::{Item, ItemStatus, ItemType, NewItem};
pub use naming::{collision_free_name, validate_item_name};
pub use newtypes::*;
pub use task::{
    DeletionTaskRecord, ItemEnumerationTaskRecord, LocalCachedFileInfo, ReparentTaskRecord,
    UploadFailure, UploadTaskRecord,
};
