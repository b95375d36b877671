//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain identifiers and values.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// Item identifiers
// ============================================================================

/// Local, stable identifier of an item
///
/// Ids are allocated by the metadata store and never reused for a different
/// remote entry. The value `1` is reserved for the root folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(i64);

impl ItemId {
    /// Identifier of the root folder
    pub const ROOT: ItemId = ItemId(1);

    /// Wrap a raw store identifier
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the raw value
    #[must_use]
    pub const fn value(&self) -> i64 {
        self.0
    }

    /// Whether this id denotes the root folder
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.0 == Self::ROOT.0
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ItemId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|e| DomainError::InvalidId(format!("Invalid item id '{s}': {e}")))
    }
}

impl From<i64> for ItemId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

// ============================================================================
// Remote paths
// ============================================================================

/// A remote store path (must start with /)
///
/// Paths are stored case-preserving and compared ASCII case-insensitively,
/// the same way the metadata store compares them. Use [`RemotePath::matches`]
/// or [`RemotePath::key`] rather than `==` when asking "is this the same
/// remote entry".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemotePath(String);

impl RemotePath {
    /// Create a new RemotePath
    ///
    /// # Errors
    /// Returns error if the path doesn't start with /, has empty components,
    /// a trailing slash, or a `.`/`..` component
    pub fn new(path: String) -> Result<Self, DomainError> {
        if !path.starts_with('/') {
            return Err(DomainError::InvalidRemotePath(format!(
                "Remote path must start with '/': {path}"
            )));
        }

        if path == "/" {
            return Ok(Self(path));
        }

        for component in path[1..].split('/') {
            if component.is_empty() {
                return Err(DomainError::InvalidRemotePath(format!(
                    "Remote path contains an empty component: {path}"
                )));
            }
            // "foo..pages" is a legal name; only whole-component traversal is not
            if component == "." || component == ".." {
                return Err(DomainError::InvalidRemotePath(format!(
                    "Remote path contains invalid traversal: {path}"
                )));
            }
        }

        Ok(Self(path))
    }

    /// Create the root path "/"
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Whether this is the root path
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercased comparison key
    #[must_use]
    pub fn key(&self) -> String {
        self.0.to_ascii_lowercase()
    }

    /// Case-insensitive equality
    #[must_use]
    pub fn matches(&self, other: &RemotePath) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }

    /// Join a path component
    ///
    /// # Errors
    /// Returns error if component is invalid
    pub fn join(&self, component: &str) -> Result<Self, DomainError> {
        if component.is_empty() || component.contains('/') || component == "." || component == ".."
        {
            return Err(DomainError::InvalidRemotePath(format!(
                "Invalid path component: {component}"
            )));
        }

        let new_path = if self.is_root() {
            format!("/{component}")
        } else {
            format!("{}/{component}", self.0)
        };

        Self::new(new_path)
    }

    /// Get the parent path
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }

        match self.0.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => None,
        }
    }

    /// Get the file name component
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }

        self.0.rsplit('/').next()
    }

    /// Replace the last component
    ///
    /// # Errors
    /// Returns error for the root path or an invalid component
    pub fn with_file_name(&self, name: &str) -> Result<Self, DomainError> {
        match self.parent() {
            Some(parent) => parent.join(name),
            None => Err(DomainError::InvalidRemotePath(
                "The root path has no file name".to_string(),
            )),
        }
    }

    /// All proper ancestors, root first
    #[must_use]
    pub fn ancestors(&self) -> Vec<RemotePath> {
        let mut result = Vec::new();
        let mut current = self.parent();
        while let Some(path) = current {
            current = path.parent();
            result.push(path);
        }
        result.reverse();
        result
    }

    /// Whether `self` is a proper ancestor of `other` (case-insensitive)
    #[must_use]
    pub fn is_ancestor_of(&self, other: &RemotePath) -> bool {
        if self.is_root() {
            return !other.is_root();
        }
        let prefix_len = self.0.len();
        other.0.len() > prefix_len
            && other.0.as_bytes()[prefix_len] == b'/'
            && other.0.is_char_boundary(prefix_len)
            && other.0[..prefix_len].eq_ignore_ascii_case(&self.0)
    }

    /// Move this path from under `from` to under `to`
    ///
    /// Returns `None` when `self` is neither `from` nor one of its
    /// descendants.
    #[must_use]
    pub fn rebase(&self, from: &RemotePath, to: &RemotePath) -> Option<RemotePath> {
        if self.matches(from) {
            return Some(to.clone());
        }
        if !from.is_ancestor_of(self) {
            return None;
        }
        let rest = if from.is_root() {
            &self.0[1..]
        } else {
            &self.0[from.0.len() + 1..]
        };
        let rebased = if to.is_root() {
            format!("/{rest}")
        } else {
            format!("{}/{rest}", to.0)
        };
        Some(Self(rebased))
    }
}

impl Display for RemotePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemotePath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for RemotePath {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemotePath> for String {
    fn from(path: RemotePath) -> Self {
        path.0
    }
}

// ============================================================================
// Page tokens
// ============================================================================

/// Opaque cursor for resuming a paginated remote listing
///
/// The host receives and returns tokens as raw bytes; the remote store sees
/// them as strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageToken(String);

impl PageToken {
    /// Wrap a token issued by the remote store
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Get the token as the remote store issued it
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Bytes handed to the host
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Rebuild a token from the bytes the host handed back
    ///
    /// # Errors
    /// Returns error if the bytes are not valid UTF-8
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DomainError> {
        std::str::from_utf8(bytes)
            .map(|s| Self(s.to_string()))
            .map_err(|_| DomainError::InvalidPageToken)
    }
}

impl Display for PageToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
