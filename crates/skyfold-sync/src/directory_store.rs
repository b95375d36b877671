//! Directory-backed remote store
//!
//! Maps the remote store contract onto a local directory tree. Used by the
//! CLI and as a realistic backend in tests. Listings are sorted by name and
//! paged with numeric offset tokens.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skyfold_core::domain::{ItemType, RemotePath};
use skyfold_core::ports::{IRemoteStore, RemoteError, RemoteItem, RemoteListing};
use tokio_util::sync::CancellationToken;

/// Maps local I/O failures onto the closed remote error set
fn map_io(error: std::io::Error) -> RemoteError {
    match error.kind() {
        ErrorKind::NotFound => RemoteError::ItemNotFound,
        ErrorKind::AlreadyExists => RemoteError::ItemAlreadyExists,
        ErrorKind::PermissionDenied => RemoteError::Unauthorized,
        _ => {
            tracing::debug!(error = %error, "Unmapped I/O error");
            RemoteError::NoInternetConnection
        }
    }
}

/// A remote store rooted at a local directory
#[derive(Debug, Clone)]
pub struct DirectoryRemoteStore {
    root: PathBuf,
    page_size: usize,
}

impl DirectoryRemoteStore {
    pub fn new(root: impl Into<PathBuf>, page_size: usize) -> Self {
        Self {
            root: root.into(),
            page_size: page_size.max(1),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &RemotePath) -> PathBuf {
        let relative = path.as_str().trim_start_matches('/');
        if relative.is_empty() {
            self.root.clone()
        } else {
            self.root.join(relative)
        }
    }

    async fn entry_type(&self, path: &RemotePath) -> Result<ItemType, RemoteError> {
        let meta = tokio::fs::metadata(self.resolve(path)).await.map_err(map_io)?;
        Ok(if meta.is_dir() {
            ItemType::Folder
        } else {
            ItemType::File
        })
    }

    async fn expect_type(&self, path: &RemotePath, expected: ItemType) -> Result<(), RemoteError> {
        if self.entry_type(path).await? != expected {
            return Err(RemoteError::ItemTypeMismatch);
        }
        Ok(())
    }

    async fn require_parent(&self, path: &RemotePath) -> Result<(), RemoteError> {
        let parent = path.parent().ok_or(RemoteError::ParentFolderDoesNotExist)?;
        match tokio::fs::metadata(self.resolve(&parent)).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(RemoteError::ParentFolderDoesNotExist),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(RemoteError::ParentFolderDoesNotExist),
            Err(e) => Err(map_io(e)),
        }
    }

    async fn require_vacant(&self, path: &RemotePath) -> Result<(), RemoteError> {
        if tokio::fs::try_exists(self.resolve(path)).await.map_err(map_io)? {
            return Err(RemoteError::ItemAlreadyExists);
        }
        Ok(())
    }

    async fn describe(&self, path: &RemotePath) -> Result<RemoteItem, RemoteError> {
        let meta = tokio::fs::metadata(self.resolve(path)).await.map_err(map_io)?;
        let item_type = if meta.is_dir() {
            ItemType::Folder
        } else {
            ItemType::File
        };
        Ok(RemoteItem {
            name: path.file_name().unwrap_or_default().to_string(),
            path: path.clone(),
            item_type,
            size: (item_type == ItemType::File).then(|| meta.len()),
            last_modified: meta.modified().ok().map(DateTime::<Utc>::from),
        })
    }

    async fn rename(&self, source: &RemotePath, target: &RemotePath) -> Result<RemoteItem, RemoteError> {
        self.require_parent(target).await?;
        self.require_vacant(target).await?;
        tokio::fs::rename(self.resolve(source), self.resolve(target))
            .await
            .map_err(map_io)?;
        tracing::debug!(from = %source, to = %target, "Moved remote entry");
        self.describe(target).await
    }
}

#[async_trait]
impl IRemoteStore for DirectoryRemoteStore {
    async fn fetch_metadata(&self, path: &RemotePath) -> Result<RemoteItem, RemoteError> {
        self.describe(path).await
    }

    async fn fetch_listing(
        &self,
        path: &RemotePath,
        page_token: Option<&str>,
    ) -> Result<RemoteListing, RemoteError> {
        self.expect_type(path, ItemType::Folder).await?;

        let offset = match page_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| RemoteError::PageTokenInvalid)?,
            None => 0,
        };

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(self.resolve(path)).await.map_err(map_io)?;
        while let Some(entry) = entries.next_entry().await.map_err(map_io)? {
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => tracing::warn!(name = ?raw, "Skipping entry with non UTF-8 name"),
            }
        }
        names.sort();
        if offset > names.len() {
            return Err(RemoteError::PageTokenInvalid);
        }

        let mut items = Vec::new();
        for name in names.iter().skip(offset).take(self.page_size) {
            let Ok(child) = path.join(name) else {
                tracing::warn!(%name, "Skipping entry with unusable name");
                continue;
            };
            items.push(self.describe(&child).await?);
        }

        let end = offset + self.page_size;
        Ok(RemoteListing {
            items,
            next_page_token: (end < names.len()).then(|| end.to_string()),
        })
    }

    async fn download(
        &self,
        path: &RemotePath,
        destination: &Path,
        _cancel: &CancellationToken,
    ) -> Result<(), RemoteError> {
        self.expect_type(path, ItemType::File).await?;
        tokio::fs::copy(self.resolve(path), destination)
            .await
            .map_err(map_io)?;
        Ok(())
    }

    async fn upload(
        &self,
        source: &Path,
        path: &RemotePath,
        replace_existing: bool,
        _cancel: &CancellationToken,
    ) -> Result<RemoteItem, RemoteError> {
        self.require_parent(path).await?;
        match self.entry_type(path).await {
            Ok(ItemType::Folder) => return Err(RemoteError::ItemTypeMismatch),
            Ok(ItemType::File) if !replace_existing => return Err(RemoteError::ItemAlreadyExists),
            Ok(ItemType::File) | Err(RemoteError::ItemNotFound) => {}
            Err(e) => return Err(e),
        }

        tokio::fs::copy(source, self.resolve(path))
            .await
            .map_err(map_io)?;
        self.describe(path).await
    }

    async fn create_folder(&self, path: &RemotePath) -> Result<RemoteItem, RemoteError> {
        self.require_parent(path).await?;
        tokio::fs::create_dir(self.resolve(path))
            .await
            .map_err(map_io)?;
        self.describe(path).await
    }

    async fn delete_file(&self, path: &RemotePath) -> Result<(), RemoteError> {
        self.expect_type(path, ItemType::File).await?;
        tokio::fs::remove_file(self.resolve(path))
            .await
            .map_err(map_io)
    }

    async fn delete_folder(&self, path: &RemotePath) -> Result<(), RemoteError> {
        if path.is_root() {
            return Err(RemoteError::Unauthorized);
        }
        self.expect_type(path, ItemType::Folder).await?;
        tokio::fs::remove_dir_all(self.resolve(path))
            .await
            .map_err(map_io)
    }

    async fn move_file(
        &self,
        source: &RemotePath,
        target: &RemotePath,
    ) -> Result<RemoteItem, RemoteError> {
        self.expect_type(source, ItemType::File).await?;
        self.rename(source, target).await
    }

    async fn move_folder(
        &self,
        source: &RemotePath,
        target: &RemotePath,
    ) -> Result<RemoteItem, RemoteError> {
        self.expect_type(source, ItemType::Folder).await?;
        self.rename(source, target).await
    }
}
