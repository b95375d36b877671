//! Domain error types
//!
//! Validation failures raised while constructing domain values. These are
//! raised synchronously, before any task record is written.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid remote path format
    #[error("Invalid remote path: {0}")]
    InvalidRemotePath(String),

    /// Item name rejected by the name validator
    #[error("Invalid item name '{name}': {reason}")]
    InvalidName {
        /// The rejected name
        name: String,
        /// Why the name was rejected
        reason: String,
    },

    /// Unknown item type discriminator
    #[error("Invalid item type: {0}")]
    InvalidItemType(String),

    /// Unknown item status discriminator
    #[error("Invalid item status: {0}")]
    InvalidItemStatus(String),

    /// Page token is not valid UTF-8
    #[error("Invalid page token")]
    InvalidPageToken,

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::InvalidRemotePath("no-slash".to_string());
        assert_eq!(err.to_string(), "Invalid remote path: no-slash");

        let err = DomainError::InvalidName {
            name: "a:b".to_string(),
            reason: "contains ':'".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid item name 'a:b': contains ':'");
    }

    #[test]
    fn test_error_equality() {
        let err1 = DomainError::InvalidId("x".to_string());
        let err2 = DomainError::InvalidId("x".to_string());
        let err3 = DomainError::InvalidId("y".to_string());

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }
}
