//! Item name rules
//!
//! Validation applied by the adapter before any task record is created, and
//! the sibling-name generator used when the remote store reports that a name
//! is already taken.

use uuid::Uuid;

use super::errors::DomainError;

const FORBIDDEN_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

const SUFFIX_LEN: usize = 5;

/// Check that `name` can be used as an item name
///
/// # Errors
/// Returns [`DomainError::InvalidName`] for empty names, names containing
/// a forbidden character, or names ending with a period or a space.
pub fn validate_item_name(name: &str) -> Result<(), DomainError> {
    let reject = |reason: String| {
        Err(DomainError::InvalidName {
            name: name.to_string(),
            reason,
        })
    };

    if name.is_empty() {
        return reject("name is empty".to_string());
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return reject(format!("contains '{c}'"));
    }
    if name.ends_with('.') {
        return reject("ends with a period".to_string());
    }
    if name.ends_with(' ') {
        return reject("ends with a space".to_string());
    }
    Ok(())
}

/// Derive a sibling name unlikely to collide with `name`
///
/// `report.pdf` becomes `report (7F3A9).pdf`. Folders and names without an
/// extension get the suffix at the end.
pub fn collision_free_name(name: &str, is_folder: bool) -> String {
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .to_ascii_uppercase()
        .chars()
        .take(SUFFIX_LEN)
        .collect();

    if !is_folder {
        if let Some((stem, ext)) = split_extension(name) {
            return format!("{stem} ({suffix}).{ext}");
        }
    }
    format!("{name} ({suffix})")
}

fn split_extension(name: &str) -> Option<(&str, &str)> {
    match name.rfind('.') {
        // dotfiles have no extension
        Some(0) | None => None,
        Some(idx) if idx + 1 == name.len() => None,
        Some(idx) => Some((&name[..idx], &name[idx + 1..])),
    }
}
