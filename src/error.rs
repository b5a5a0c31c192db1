//! Error types for the Tamarix library.
//!
//! All fallible operations return [`Result`], whose error type is the
//! [`TamarixError`] enum. Caller mistakes (unknown fields, wrong field kinds,
//! malformed query strings) and environment failures (storage I/O) are kept
//! as distinct variants so callers can decide what is retryable.

use std::io;

use thiserror::Error;

/// The main error type for Tamarix operations.
#[derive(Error, Debug)]
pub enum TamarixError {
    /// A document or query referenced a field that is absent from the schema,
    /// or supplied a value of the wrong kind for a declared field.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Malformed textual query input, with the byte position of the problem.
    #[error("query parse error at position {position} in {input:?}: {message}")]
    QueryParse {
        /// The offending query string.
        input: String,
        /// Byte position where parsing failed.
        position: usize,
        /// What went wrong.
        message: String,
    },

    /// An operation requires a field kind the target field does not have
    /// (e.g. a range query over a text field).
    #[error("unsupported field kind: {0}")]
    UnsupportedFieldKind(String),

    /// Storage collaborator failure. A failed commit leaves the previously
    /// published snapshot intact; that snapshot is the recovery state.
    #[error("storage failure: {0}")]
    Storage(String),

    /// A second writer session was opened against an index that already has
    /// an active writer.
    #[error("concurrent writer violation: {0}")]
    ConcurrentWriter(String),

    /// Analysis-related errors (tokenization, filtering).
    #[error("analysis error: {0}")]
    Analysis(String),

    /// Index-related errors not covered by a more specific variant.
    #[error("index error: {0}")]
    Index(String),

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors (schema, manifest).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic anyhow error.
    #[error("error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with [`TamarixError`].
pub type Result<T> = std::result::Result<T, TamarixError>;

impl TamarixError {
    /// Create a new schema mismatch error.
    pub fn schema_mismatch<S: Into<String>>(msg: S) -> Self {
        TamarixError::SchemaMismatch(msg.into())
    }

    /// Create a new query parse error.
    pub fn query_parse<I, M>(input: I, position: usize, message: M) -> Self
    where
        I: Into<String>,
        M: Into<String>,
    {
        TamarixError::QueryParse {
            input: input.into(),
            position,
            message: message.into(),
        }
    }

    /// Create a new unsupported field kind error.
    pub fn unsupported_field_kind<S: Into<String>>(msg: S) -> Self {
        TamarixError::UnsupportedFieldKind(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        TamarixError::Storage(msg.into())
    }

    /// Create a new concurrent writer error.
    pub fn concurrent_writer<S: Into<String>>(msg: S) -> Self {
        TamarixError::ConcurrentWriter(msg.into())
    }

    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        TamarixError::Analysis(msg.into())
    }

    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        TamarixError::Index(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = TamarixError::schema_mismatch("unknown field 'body'");
        assert_eq!(error.to_string(), "schema mismatch: unknown field 'body'");

        let error = TamarixError::unsupported_field_kind("range over text field");
        assert_eq!(
            error.to_string(),
            "unsupported field kind: range over text field"
        );
    }

    #[test]
    fn test_query_parse_error_carries_position() {
        let error = TamarixError::query_parse("title:", 6, "missing term after ':'");
        match &error {
            TamarixError::QueryParse {
                input, position, ..
            } => {
                assert_eq!(input, "title:");
                assert_eq!(*position, 6);
            }
            _ => panic!("expected QueryParse variant"),
        }
        assert!(error.to_string().contains("position 6"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error = TamarixError::from(io_error);

        match error {
            TamarixError::Io(_) => {}
            _ => panic!("expected Io variant"),
        }
    }
}
