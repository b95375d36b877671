//! Row mapping shared by the stores
//!
//! ## Type Mapping
//!
//! | Domain Type     | SQL Type | Strategy                                   |
//! |-----------------|----------|--------------------------------------------|
//! | ItemId          | INTEGER  | `.value()` / `ItemId::new()`               |
//! | RemotePath      | TEXT     | `.as_str()` / `RemotePath::new()`          |
//! | PageToken       | TEXT     | `.as_str()` / `PageToken::new()`           |
//! | ItemType        | TEXT     | `.as_str()` / `FromStr`                    |
//! | ItemStatus      | TEXT     | `.as_str()` / `FromStr`                    |
//! | DateTime<Utc>   | TEXT     | ISO 8601 via `to_rfc3339()` / `parse_from_rfc3339()` |
//! | bool            | INTEGER  | 0 / 1                                      |

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use skyfold_core::domain::{
    DeletionTaskRecord, Item, ItemId, ItemStatus, ItemType, LocalCachedFileInfo, RemotePath,
    ReparentTaskRecord, UploadFailure, UploadTaskRecord,
};

use crate::CacheError;

pub(crate) const ITEM_COLUMNS: &str = "id, name, item_type, size, parent_id, \
     remote_last_modified, status, remote_path, is_placeholder, is_maybe_outdated, \
     favorite_rank, tag_data";

/// Parse a DateTime<Utc> from an ISO 8601 string
pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, CacheError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // SQLite's own datetime() format
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .map_err(|e| {
            CacheError::SerializationError(format!("Failed to parse datetime '{}': {}", s, e))
        })
}

/// Parse an optional DateTime<Utc> from an optional string
pub(crate) fn parse_optional_datetime(
    s: Option<String>,
) -> Result<Option<DateTime<Utc>>, CacheError> {
    match s {
        Some(ref val) if !val.is_empty() => parse_datetime(val).map(Some),
        _ => Ok(None),
    }
}

pub(crate) fn format_optional_datetime(dt: Option<DateTime<Utc>>) -> Option<String> {
    dt.map(|dt| dt.to_rfc3339())
}

fn remote_path(s: String) -> Result<RemotePath, CacheError> {
    RemotePath::new(s).map_err(|e| CacheError::SerializationError(e.to_string()))
}

fn size_from_sql(size: Option<i64>) -> Result<Option<u64>, CacheError> {
    size.map(|s| {
        u64::try_from(s)
            .map_err(|_| CacheError::SerializationError(format!("Negative item size: {s}")))
    })
    .transpose()
}

pub(crate) fn size_to_sql(size: Option<u64>) -> Result<Option<i64>, CacheError> {
    size.map(|s| {
        i64::try_from(s)
            .map_err(|_| CacheError::SerializationError(format!("Item size out of range: {s}")))
    })
    .transpose()
}

/// Reconstruct an Item from a row selected with [`ITEM_COLUMNS`]
pub(crate) fn item_from_row(row: &SqliteRow) -> Result<Item, CacheError> {
    let item_type: String = row.try_get("item_type")?;
    let status: String = row.try_get("status")?;

    Ok(Item {
        id: ItemId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        item_type: item_type
            .parse::<ItemType>()
            .map_err(|e| CacheError::SerializationError(e.to_string()))?,
        size: size_from_sql(row.try_get("size")?)?,
        parent_id: ItemId::new(row.try_get("parent_id")?),
        remote_last_modified: parse_optional_datetime(row.try_get("remote_last_modified")?)?,
        status: status
            .parse::<ItemStatus>()
            .map_err(|e| CacheError::SerializationError(e.to_string()))?,
        remote_path: remote_path(row.try_get("remote_path")?)?,
        is_placeholder: row.try_get("is_placeholder")?,
        is_maybe_outdated: row.try_get("is_maybe_outdated")?,
        favorite_rank: row.try_get("favorite_rank")?,
        tag_data: row.try_get("tag_data")?,
    })
}

pub(crate) fn items_from_rows(rows: &[SqliteRow]) -> Result<Vec<Item>, CacheError> {
    rows.iter().map(item_from_row).collect()
}

pub(crate) fn upload_from_row(row: &SqliteRow) -> Result<UploadTaskRecord, CacheError> {
    let date = parse_optional_datetime(row.try_get("last_failed_date")?)?;
    let code: Option<i64> = row.try_get("error_code")?;
    let domain: Option<String> = row.try_get("error_domain")?;

    let failure = match (date, code, domain) {
        (Some(date), Some(code), Some(domain)) => Some(UploadFailure { date, code, domain }),
        _ => None,
    };

    Ok(UploadTaskRecord {
        item_id: ItemId::new(row.try_get("item_id")?),
        failure,
    })
}

pub(crate) fn deletion_from_row(row: &SqliteRow) -> Result<DeletionTaskRecord, CacheError> {
    let item_type: String = row.try_get("item_type")?;
    Ok(DeletionTaskRecord {
        item_id: ItemId::new(row.try_get("item_id")?),
        remote_path: remote_path(row.try_get("remote_path")?)?,
        parent_id: ItemId::new(row.try_get("parent_id")?),
        item_type: item_type
            .parse::<ItemType>()
            .map_err(|e| CacheError::SerializationError(e.to_string()))?,
    })
}

pub(crate) fn reparent_from_row(row: &SqliteRow) -> Result<ReparentTaskRecord, CacheError> {
    Ok(ReparentTaskRecord {
        item_id: ItemId::new(row.try_get("item_id")?),
        source_path: remote_path(row.try_get("source_path")?)?,
        target_path: remote_path(row.try_get("target_path")?)?,
        old_parent_id: ItemId::new(row.try_get("old_parent_id")?),
        new_parent_id: ItemId::new(row.try_get("new_parent_id")?),
    })
}

pub(crate) fn cached_file_from_row(row: &SqliteRow) -> Result<LocalCachedFileInfo, CacheError> {
    let local_path: String = row.try_get("local_path")?;
    let local_last_modified: String = row.try_get("local_last_modified")?;
    Ok(LocalCachedFileInfo {
        item_id: ItemId::new(row.try_get("item_id")?),
        local_path: PathBuf::from(local_path),
        local_last_modified: parse_datetime(&local_last_modified)?,
        remote_last_modified: parse_optional_datetime(row.try_get("remote_last_modified")?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_datetime_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap();
        assert_eq!(parse_datetime("2024-03-01T10:30:00+00:00").unwrap(), expected);
        assert_eq!(parse_datetime("2024-03-01 10:30:00").unwrap(), expected);
        assert!(parse_datetime("yesterday").is_err());
    }

    #[test]
    fn test_parse_optional_datetime_empty() {
        assert_eq!(parse_optional_datetime(None).unwrap(), None);
        assert_eq!(parse_optional_datetime(Some(String::new())).unwrap(), None);
    }

    #[test]
    fn test_size_conversion() {
        assert_eq!(size_to_sql(Some(42)).unwrap(), Some(42));
        assert!(size_to_sql(Some(u64::MAX)).is_err());
        assert!(size_from_sql(Some(-1)).is_err());
    }
}
