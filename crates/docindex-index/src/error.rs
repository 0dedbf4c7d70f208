//! Index structure error types.

use thiserror::Error;

use docindex_types::DocId;

/// Errors that can occur while mutating index structures.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A lock guarding a shared structure was poisoned
    #[error("Index is locked: {0}")]
    Locked(String),

    /// Geo value could not be parsed or is out of range
    #[error("Invalid geo value: {0}")]
    InvalidGeo(String),

    /// Document key already has a live id
    #[error("Document already exists: {0}")]
    DocumentExists(String),

    /// Document id is not in the table
    #[error("Unknown document id: {0}")]
    UnknownDocument(DocId),
}

impl<T> From<std::sync::PoisonError<T>> for IndexError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        IndexError::Locked(err.to_string())
    }
}
