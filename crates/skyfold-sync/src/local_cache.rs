//! On-disk layout of locally materialized files.
//!
//! Uses a hash-based directory structure keyed by item id:
//! `{cache_dir}/content/{first_2_chars_of_hash}/{rest_of_hash}`. Downloads
//! that replace an existing copy land in a `.partial` sibling first. Host
//! bytes replacing a slot's content are staged under `{cache_dir}/staging`
//! and renamed into the slot.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use skyfold_core::domain::ItemId;

/// Maps items to their cache slot on disk.
#[derive(Debug, Clone)]
pub struct LocalFileCache {
    content_dir: PathBuf,
    staging_dir: PathBuf,
}

impl LocalFileCache {
    /// Create a new LocalFileCache, creating the content directory if needed.
    pub fn new(cache_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let cache_dir = cache_dir.into();
        let content_dir = cache_dir.join("content");
        let staging_dir = cache_dir.join("staging");
        std::fs::create_dir_all(&content_dir)?;
        std::fs::create_dir_all(&staging_dir)?;
        Ok(Self {
            content_dir,
            staging_dir,
        })
    }

    /// Compute the cache slot for an item using a SHA-256 hash of its id.
    pub fn path_for(&self, id: ItemId) -> PathBuf {
        let hash = Self::hash_item_id(id);
        let (prefix, rest) = hash.split_at(2);
        self.content_dir.join(prefix).join(rest)
    }

    /// Get the path for a partial (in-progress) download.
    pub fn partial_path(&self, id: ItemId) -> PathBuf {
        let mut path = self.path_for(id);
        path.set_extension("partial");
        path
    }

    /// A fresh, unused path under the staging directory
    pub fn staging_path(&self) -> PathBuf {
        self.staging_dir
            .join(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Create the slot's parent directory and return the slot path.
    pub async fn prepare(&self, id: ItemId) -> std::io::Result<PathBuf> {
        let path = self.path_for(id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(path)
    }

    /// Copy host bytes into the item's slot.
    pub async fn store_from(&self, id: ItemId, source: &Path) -> std::io::Result<PathBuf> {
        let path = self.prepare(id).await?;
        tokio::fs::copy(source, &path).await?;
        Ok(path)
    }

    /// Copy host bytes to a fresh staging file, leaving every slot untouched.
    pub async fn stage_from(&self, source: &Path) -> std::io::Result<PathBuf> {
        let staged = self.staging_path();
        tokio::fs::copy(source, &staged).await?;
        Ok(staged)
    }

    /// Atomically replace the item's slot with a staged file.
    pub async fn commit(&self, id: ItemId, staged: &Path) -> std::io::Result<PathBuf> {
        let path = self.prepare(id).await?;
        tokio::fs::rename(staged, &path).await?;
        Ok(path)
    }

    fn hash_item_id(id: ItemId) -> String {
        let mut hasher = Sha256::new();
        hasher.update(id.value().to_le_bytes());
        format!("{:x}", hasher.finalize())
    }
}
