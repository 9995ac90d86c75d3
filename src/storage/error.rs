//! Storage Errors
//!
//! Every failure the storage engine reports is a value-level error returned to
//! the immediate caller. None of them are retried internally, and a failed call
//! never modifies the tables.

use crate::storage::value::ValueType;
use thiserror::Error;

/// Errors that can occur while reading from the storage engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The key is absent (or its deadline has passed)
    #[error("key not found: {key}")]
    NotFound { key: String },

    /// The key exists but the requested dictionary field does not
    #[error("field {field:?} not found in dictionary {key}")]
    NestedNotFound { key: String, field: String },

    /// The stored value holds a different variant than the accessor expects
    #[error("type mismatch for {key}: expected {expected}, found {found}")]
    TypeMismatch {
        key: String,
        expected: ValueType,
        found: ValueType,
    },

    /// List index is negative or past the end of the list.
    ///
    /// `len` is `None` for a negative index, which is rejected before the
    /// key is looked up.
    #[error("index {index} out of range for list {key}")]
    IndexOutOfRange {
        key: String,
        index: i64,
        len: Option<usize>,
    },
}

impl StorageError {
    pub(crate) fn not_found(key: &str) -> Self {
        StorageError::NotFound {
            key: key.to_string(),
        }
    }

    /// Returns true for both a missing key and a missing dictionary field.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::NotFound { .. } | StorageError::NestedNotFound { .. }
        )
    }

    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, StorageError::TypeMismatch { .. })
    }

    pub fn is_index_out_of_range(&self) -> bool {
        matches!(self, StorageError::IndexOutOfRange { .. })
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = StorageError::not_found("missing");
        assert_eq!(err.to_string(), "key not found: missing");

        let err = StorageError::TypeMismatch {
            key: "k".to_string(),
            expected: ValueType::List,
            found: ValueType::Dictionary,
        };
        assert_eq!(
            err.to_string(),
            "type mismatch for k: expected list, found dictionary"
        );

        let err = StorageError::IndexOutOfRange {
            key: "k".to_string(),
            index: -1,
            len: None,
        };
        assert_eq!(err.to_string(), "index -1 out of range for list k");
    }

    #[test]
    fn test_classification() {
        assert!(StorageError::not_found("k").is_not_found());
        assert!(StorageError::NestedNotFound {
            key: "k".to_string(),
            field: "f".to_string(),
        }
        .is_not_found());
        assert!(!StorageError::not_found("k").is_type_mismatch());
    }
}
