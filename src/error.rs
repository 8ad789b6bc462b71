//! Error types for the tool catalog and its storage backends.

use thiserror::Error;

/// Errors reported by a vector store backend.
///
/// Absence is its own variant so callers never have to inspect message text
/// to tell "no such record" apart from a real failure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend could not be reached.
    #[error("vector store unreachable: {0}")]
    Connection(String),

    /// The requested collection or record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Backend accepted the request but failed to serve it.
    #[error("vector store error: {0}")]
    Backend(String),

    /// Embedding the documents or query texts failed.
    #[error("embedding failed: {0}")]
    Embedding(String),
}

/// Errors surfaced by the tool catalog manager.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("completion request failed: {0}")]
    Completion(String),

    /// The completion did not contain anything that looks like JSON.
    #[error("response did not contain parseable JSON: {0}")]
    GenerationFormat(String),

    /// The extracted text was not valid JSON. `raw` keeps the text for diagnosis.
    #[error("failed to parse generated JSON: {message}")]
    GenerationParse { message: String, raw: String },

    #[error("invalid tool definition: {0}")]
    Validation(String),
}

impl From<StoreError> for CatalogError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Connection(msg) => CatalogError::Connection(msg),
            other => CatalogError::Storage(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_store_error_maps_to_connection() {
        let err: CatalogError = StoreError::Connection("refused".into()).into();
        assert!(matches!(err, CatalogError::Connection(ref m) if m == "refused"));
    }

    #[test]
    fn test_other_store_errors_map_to_storage() {
        let err: CatalogError = StoreError::Backend("disk full".into()).into();
        assert_eq!(err.to_string(), "storage error: vector store error: disk full");

        let err: CatalogError = StoreError::NotFound("tools".into()).into();
        assert!(matches!(err, CatalogError::Storage(_)));
    }

    #[test]
    fn test_parse_error_display_omits_raw_text() {
        let err = CatalogError::GenerationParse {
            message: "expected value at line 1 column 1".into(),
            raw: "not json".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to parse generated JSON: expected value at line 1 column 1"
        );
    }
}
