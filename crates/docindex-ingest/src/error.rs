//! Error types for the ingestion pipeline.
//!
//! Per-document failures are reported through the completion callback's
//! status. [`PipelineError`] covers the failures that happen before a
//! document is handed to the pipeline or outside any one document.

use thiserror::Error;

use docindex_index::IndexError;
use docindex_storage::StorageError;
use docindex_types::{DocIndexError, IngestError};

/// Errors returned directly by [`IngestPipeline`](crate::IngestPipeline).
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Document store operation failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Index structure operation failed
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    /// Document was rejected before submission
    #[error("Document rejected: {0}")]
    Rejected(#[from] IngestError),

    /// Settings could not be loaded or are invalid
    #[error("Configuration error: {0}")]
    Config(#[from] DocIndexError),

    /// Worker runtime could not be started
    #[error("Worker pool error: {0}")]
    Runtime(#[from] std::io::Error),
}

impl PipelineError {
    /// The ingestion error carried by a rejection, if any.
    pub fn ingest_error(&self) -> Option<&IngestError> {
        match self {
            PipelineError::Rejected(err) => Some(err),
            _ => None,
        }
    }
}
