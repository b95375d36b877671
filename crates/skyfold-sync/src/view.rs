//! Host-facing renderings of metadata entries

use std::path::PathBuf;

use serde::Serialize;
use skyfold_core::domain::{Item, ItemStatus, LocalCachedFileInfo, PageToken, UploadTaskRecord};
use skyfold_core::ports::RemoteError;

/// An item as the host sees it
#[derive(Debug, Clone, Serialize)]
pub struct ItemView {
    #[serde(flatten)]
    pub item: Item,
    /// The local copy exists and is not known to be behind the remote
    pub newest_version_locally_cached: bool,
    pub local_path: Option<PathBuf>,
    /// Advisory left by the last failed upload, if any
    pub upload_error: Option<RemoteError>,
}

impl ItemView {
    pub fn new(
        item: Item,
        cached: Option<&LocalCachedFileInfo>,
        upload: Option<&UploadTaskRecord>,
    ) -> Self {
        let newest_version_locally_cached = match cached {
            Some(info) => {
                item.status != ItemStatus::Uploaded
                    || info.is_current_version(item.remote_last_modified)
            }
            None => false,
        };
        let upload_error = if item.status == ItemStatus::UploadError {
            upload
                .and_then(|u| u.failure.as_ref())
                .and_then(|f| RemoteError::from_code(f.code))
        } else {
            None
        };

        Self {
            local_path: cached.map(|c| c.local_path.clone()),
            newest_version_locally_cached,
            upload_error,
            item,
        }
    }
}

/// One page of a folder enumeration
#[derive(Debug, Clone, Serialize)]
pub struct EnumerationPage {
    pub items: Vec<ItemView>,
    /// Token for the next page; `None` on the last page
    pub next_page: Option<PageToken>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use skyfold_core::domain::{ItemId, ItemType, UploadFailure};

    fn item(status: ItemStatus) -> Item {
        Item {
            id: ItemId::new(2),
            name: "a.txt".to_string(),
            item_type: ItemType::File,
            size: Some(3),
            parent_id: ItemId::ROOT,
            remote_last_modified: Some(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()),
            status,
            remote_path: "/a.txt".parse().unwrap(),
            is_placeholder: false,
            is_maybe_outdated: false,
            favorite_rank: None,
            tag_data: None,
        }
    }

    fn cached(remote_last_modified: Option<chrono::DateTime<Utc>>) -> LocalCachedFileInfo {
        LocalCachedFileInfo {
            item_id: ItemId::new(2),
            local_path: PathBuf::from("/cache/a"),
            local_last_modified: Utc::now(),
            remote_last_modified,
        }
    }

    #[test]
    fn test_current_copy_is_newest() {
        let item = item(ItemStatus::Uploaded);
        let info = cached(item.remote_last_modified);
        let view = ItemView::new(item, Some(&info), None);
        assert!(view.newest_version_locally_cached);
        assert_eq!(view.local_path, Some(PathBuf::from("/cache/a")));
    }

    #[test]
    fn test_stale_copy_is_not_newest() {
        let item = item(ItemStatus::Uploaded);
        let stale = item.remote_last_modified.map(|t| t - Duration::seconds(5));
        let view = ItemView::new(item, Some(&cached(stale)), None);
        assert!(!view.newest_version_locally_cached);
    }

    #[test]
    fn test_local_edit_counts_as_newest() {
        let view = ItemView::new(item(ItemStatus::Uploading), Some(&cached(None)), None);
        assert!(view.newest_version_locally_cached);
    }

    #[test]
    fn test_upload_error_is_surfaced() {
        let mut record = UploadTaskRecord::new(ItemId::new(2));
        record.failure = Some(UploadFailure {
            date: Utc::now(),
            code: RemoteError::QuotaInsufficient.code(),
            domain: RemoteError::QuotaInsufficient.domain().to_string(),
        });
        let view = ItemView::new(item(ItemStatus::UploadError), None, Some(&record));
        assert_eq!(view.upload_error, Some(RemoteError::QuotaInsufficient));
        assert!(!view.newest_version_locally_cached);
    }
}
