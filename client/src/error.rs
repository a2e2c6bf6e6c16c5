//! Unified error handling for the client runtime.

use thiserror::Error;

/// Client error type.
///
/// `Remote` covers network/query failures from the backend, `Storage` covers
/// local cache failures (always swallowed by the cache layer, never fatal),
/// and `Decode` covers rows or events that fail schema validation.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("remote source error: {0}")]
    Remote(String),

    #[error("local storage error: {0}")]
    Storage(String),

    #[error("decode error: {0}")]
    Decode(#[from] bazaar_sync::Error),

    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("record already exists: {0}")]
    DuplicateRecord(String),
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ClientError::Remote("connection refused".into());
        assert_eq!(err.to_string(), "remote source error: connection refused");

        let err = ClientError::UnknownCollection("housings".into());
        assert_eq!(err.to_string(), "unknown collection: housings");
    }

    #[test]
    fn decode_error_converts() {
        let sync_err = bazaar_sync::Error::MissingIdentifier("id".into());
        let err: ClientError = sync_err.into();
        assert!(matches!(err, ClientError::Decode(_)));
    }
}
