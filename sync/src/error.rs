//! Error types for the sync crate.

use crate::FieldName;
use thiserror::Error;

/// All possible errors from the sync crate.
///
/// These are decode-boundary errors: once a record or event has been decoded,
/// reconciliation itself is total and never fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Record decoding errors
    #[error("row is not an object")]
    RowNotObject,

    #[error("missing identifier field: {0}")]
    MissingIdentifier(FieldName),

    #[error("identifier field '{field}' is not a string or integer")]
    InvalidIdentifier { field: FieldName },

    #[error("missing required field: {0}")]
    MissingRequiredField(FieldName),

    #[error("type mismatch for field '{field}': expected {expected}, got {got}")]
    TypeMismatch {
        field: FieldName,
        expected: String,
        got: String,
    },

    // Change event errors
    #[error("change event for collection '{collection}' carries no row")]
    MissingRow { collection: String },

    #[error("change event targets collection '{got}', expected '{expected}'")]
    CollectionMismatch { expected: String, got: String },
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, Error>;
