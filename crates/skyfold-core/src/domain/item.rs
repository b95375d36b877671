//! Item domain entity
//!
//! An [`Item`] is the local representation of one remote file or folder.
//!
//! ## Status transitions
//!
//! ```text
//!   placeholder ──create/upload ok──► uploaded
//!        │                               ▲
//!        └──upload failed──► upload_error┘ (retry)
//!
//!   uploaded ──local move/write──► uploading ──remote ok──► uploaded
//! ```
//!
//! A placeholder is never `uploaded`: it only becomes so once the remote
//! store has confirmed the entry, at which point it stops being a
//! placeholder.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{ItemId, RemotePath};

// ============================================================================
// ItemType
// ============================================================================

/// Kind of filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    File,
    Folder,
}

impl ItemType {
    /// Storage discriminator
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::File => "file",
            ItemType::Folder => "folder",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(ItemType::File),
            "folder" => Ok(ItemType::Folder),
            other => Err(DomainError::InvalidItemType(other.to_string())),
        }
    }
}

// ============================================================================
// ItemStatus
// ============================================================================

/// Upload state of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// The remote store holds the current version
    Uploaded,
    /// A local change is on its way to the remote store
    Uploading,
    /// The last upload attempt failed; the local copy is authoritative
    UploadError,
}

impl ItemStatus {
    /// Storage discriminator
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Uploaded => "uploaded",
            ItemStatus::Uploading => "uploading",
            ItemStatus::UploadError => "upload_error",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploaded" => Ok(ItemStatus::Uploaded),
            "uploading" => Ok(ItemStatus::Uploading),
            "upload_error" => Ok(ItemStatus::UploadError),
            other => Err(DomainError::InvalidItemStatus(other.to_string())),
        }
    }
}

// ============================================================================
// Item
// ============================================================================

/// One cached filesystem entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub item_type: ItemType,
    pub size: Option<u64>,
    pub parent_id: ItemId,
    pub remote_last_modified: Option<DateTime<Utc>>,
    pub status: ItemStatus,
    pub remote_path: RemotePath,
    /// Created locally, not yet confirmed to exist remotely
    pub is_placeholder: bool,
    /// Provisional mark of the folder mark-and-sweep
    pub is_maybe_outdated: bool,
    /// Host metadata, passed through untouched
    pub favorite_rank: Option<i64>,
    /// Host metadata, passed through untouched
    pub tag_data: Option<Vec<u8>>,
}

impl Item {
    pub fn is_folder(&self) -> bool {
        self.item_type == ItemType::Folder
    }

    pub fn is_file(&self) -> bool {
        self.item_type == ItemType::File
    }

    pub fn is_root(&self) -> bool {
        self.id.is_root()
    }
}

/// Attributes of an item that does not have an id yet
///
/// Used both for remote-discovered entries (fed to `upsert`) and for local
/// placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub name: String,
    pub item_type: ItemType,
    pub size: Option<u64>,
    pub parent_id: ItemId,
    pub remote_last_modified: Option<DateTime<Utc>>,
    pub status: ItemStatus,
    pub remote_path: RemotePath,
    pub is_placeholder: bool,
}

impl NewItem {
    /// A local entry that the remote store has not confirmed yet
    pub fn placeholder(
        name: impl Into<String>,
        item_type: ItemType,
        parent_id: ItemId,
        remote_path: RemotePath,
    ) -> Self {
        Self {
            name: name.into(),
            item_type,
            size: None,
            parent_id,
            remote_last_modified: None,
            status: ItemStatus::Uploading,
            remote_path,
            is_placeholder: true,
        }
    }

    /// An entry reported by the remote store
    pub fn remote(
        name: impl Into<String>,
        item_type: ItemType,
        parent_id: ItemId,
        remote_path: RemotePath,
        size: Option<u64>,
        remote_last_modified: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            name: name.into(),
            item_type,
            size,
            parent_id,
            remote_last_modified,
            status: ItemStatus::Uploaded,
            remote_path,
            is_placeholder: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            ItemStatus::Uploaded,
            ItemStatus::Uploading,
            ItemStatus::UploadError,
        ] {
            assert_eq!(status.as_str().parse::<ItemStatus>().unwrap(), status);
        }
        assert!("done".parse::<ItemStatus>().is_err());
    }

    #[test]
    fn test_type_parse() {
        assert_eq!("folder".parse::<ItemType>().unwrap(), ItemType::Folder);
        assert_eq!(ItemType::File.to_string(), "file");
        assert!("symlink".parse::<ItemType>().is_err());
    }

    #[test]
    fn test_placeholder_is_uploading() {
        let item = NewItem::placeholder(
            "draft.txt",
            ItemType::File,
            ItemId::ROOT,
            "/draft.txt".parse().unwrap(),
        );
        assert!(item.is_placeholder);
        assert_eq!(item.status, ItemStatus::Uploading);
        assert!(item.size.is_none());
    }

    #[test]
    fn test_remote_item_is_uploaded() {
        let item = NewItem::remote(
            "a",
            ItemType::Folder,
            ItemId::ROOT,
            "/a".parse().unwrap(),
            None,
            None,
        );
        assert!(!item.is_placeholder);
        assert_eq!(item.status, ItemStatus::Uploaded);
    }
}
