//! Error types for the store.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while loading the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A snapshot source could not deliver a collection.
    #[error("snapshot of {collection} failed: {message}")]
    Snapshot {
        /// Collection being fetched.
        collection: &'static str,
        /// Error message from the source.
        message: String,
    },
}

impl StoreError {
    /// Creates a snapshot error.
    pub fn snapshot(collection: &'static str, message: impl Into<String>) -> Self {
        Self::Snapshot {
            collection,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StoreError::snapshot("requests", "HTTP 500");
        assert_eq!(err.to_string(), "snapshot of requests failed: HTTP 500");
    }
}
