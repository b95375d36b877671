//! Remote store port (driven/secondary port)
//!
//! This module defines the interface to the cloud store that actually holds
//! the files. Backends are out of scope for the engine; it only relies on
//! the operations below and on the closed [`RemoteError`] set.
//!
//! ## Design Notes
//!
//! - Unlike the store ports, methods return `Result<_, RemoteError>`: the
//!   engine must be able to distinguish every failure kind (collision
//!   handling, failure recording), so the set is type-enforced.
//! - Transfers take a [`CancellationToken`] so the host can cancel a native
//!   in-flight transfer. Backends that cannot cancel may ignore it.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::{ItemType, RemotePath};

/// Domain string recorded next to [`RemoteError::code`] on failed uploads
pub const REMOTE_ERROR_DOMAIN: &str = "skyfold.remote";

// ============================================================================
// RemoteError
// ============================================================================

/// Failures a remote store may report
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteError {
    #[error("Item not found")]
    ItemNotFound,

    #[error("Item already exists")]
    ItemAlreadyExists,

    #[error("Item type mismatch")]
    ItemTypeMismatch,

    #[error("Parent folder does not exist")]
    ParentFolderDoesNotExist,

    #[error("Page token is invalid")]
    PageTokenInvalid,

    #[error("Insufficient quota")]
    QuotaInsufficient,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("No internet connection")]
    NoInternetConnection,
}

impl RemoteError {
    /// Stable numeric code, persisted on failed upload records
    pub fn code(&self) -> i64 {
        match self {
            RemoteError::ItemNotFound => 1,
            RemoteError::ItemAlreadyExists => 2,
            RemoteError::ItemTypeMismatch => 3,
            RemoteError::ParentFolderDoesNotExist => 4,
            RemoteError::PageTokenInvalid => 5,
            RemoteError::QuotaInsufficient => 6,
            RemoteError::Unauthorized => 7,
            RemoteError::NoInternetConnection => 8,
        }
    }

    /// Inverse of [`RemoteError::code`]
    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            1 => RemoteError::ItemNotFound,
            2 => RemoteError::ItemAlreadyExists,
            3 => RemoteError::ItemTypeMismatch,
            4 => RemoteError::ParentFolderDoesNotExist,
            5 => RemoteError::PageTokenInvalid,
            6 => RemoteError::QuotaInsufficient,
            7 => RemoteError::Unauthorized,
            8 => RemoteError::NoInternetConnection,
            _ => return None,
        })
    }

    /// Error domain, persisted on failed upload records
    pub fn domain(&self) -> &'static str {
        REMOTE_ERROR_DOMAIN
    }
}

// ============================================================================
// DTOs
// ============================================================================

/// Metadata of one remote entry
///
/// A port-level DTO; the enumeration executor maps it onto items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteItem {
    pub name: String,
    pub path: RemotePath,
    pub item_type: ItemType,
    pub size: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// One page of a folder listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteListing {
    pub items: Vec<RemoteItem>,
    /// `None` when this is the last page
    pub next_page_token: Option<String>,
}

// ============================================================================
// IRemoteStore trait
// ============================================================================

/// Port trait for the remote store
#[async_trait]
pub trait IRemoteStore: Send + Sync {
    /// Fetches metadata of a single entry
    async fn fetch_metadata(&self, path: &RemotePath) -> Result<RemoteItem, RemoteError>;

    /// Fetches one page of a folder listing
    ///
    /// `page_token` is `None` for the first page.
    async fn fetch_listing(
        &self,
        path: &RemotePath,
        page_token: Option<&str>,
    ) -> Result<RemoteListing, RemoteError>;

    /// Downloads a file's bytes to `destination`
    async fn download(
        &self,
        path: &RemotePath,
        destination: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), RemoteError>;

    /// Uploads the bytes at `source` to `path`
    ///
    /// With `replace_existing = false` the store fails with
    /// [`RemoteError::ItemAlreadyExists`] if `path` is taken.
    ///
    /// # Returns
    /// Metadata of the stored file as the remote store sees it
    async fn upload(
        &self,
        source: &Path,
        path: &RemotePath,
        replace_existing: bool,
        cancel: &CancellationToken,
    ) -> Result<RemoteItem, RemoteError>;

    /// Creates a folder
    async fn create_folder(&self, path: &RemotePath) -> Result<RemoteItem, RemoteError>;

    async fn delete_file(&self, path: &RemotePath) -> Result<(), RemoteError>;

    async fn delete_folder(&self, path: &RemotePath) -> Result<(), RemoteError>;

    async fn move_file(
        &self,
        source: &RemotePath,
        target: &RemotePath,
    ) -> Result<RemoteItem, RemoteError>;

    async fn move_folder(
        &self,
        source: &RemotePath,
        target: &RemotePath,
    ) -> Result<RemoteItem, RemoteError>;
}
