//! Ingestion status reported through the completion callback.
//!
//! Per-document failures never cross the worker/caller boundary as Rust
//! errors; they are recorded in an [`IngestStatus`] owned by the ingestion
//! context and read by the completion callback.

use std::fmt;

use thiserror::Error;

/// Error taxonomy for document ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The same schema field was named twice in one document
    DuplicateField,
    /// A numeric value could not be parsed
    ParseError,
    /// A geo value is not a "lon,lat" pair
    GeoFormat,
    /// The target of a partial update does not exist
    MissingDocument,
    /// A sortable update was attempted on a type without a metadata-only path
    UnsupportedType,
    /// Bulk indexer or commit failure
    IndexGeneric,
    /// Evaluation lookup found no such document
    NoDocument,
    /// The key is already indexed and the request does not replace it
    DocumentExists,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DuplicateField => "duplicate field",
            ErrorCode::ParseError => "parse error",
            ErrorCode::GeoFormat => "invalid geo format",
            ErrorCode::MissingDocument => "missing document",
            ErrorCode::UnsupportedType => "unsupported type",
            ErrorCode::IndexGeneric => "index error",
            ErrorCode::NoDocument => "no such document",
            ErrorCode::DocumentExists => "document exists",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A coded ingestion failure with an optional human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct IngestError {
    pub code: ErrorCode,
    pub detail: Option<String>,
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {}", self.code, detail),
            None => write!(f, "{}", self.code),
        }
    }
}

impl IngestError {
    pub fn new(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: Some(detail.into()),
        }
    }

    pub fn code(code: ErrorCode) -> Self {
        Self { code, detail: None }
    }
}

/// Mutable status object carried by an ingestion context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStatus {
    error: Option<IngestError>,
}

impl IngestStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|e| e.code)
    }

    pub fn detail(&self) -> Option<&str> {
        self.error.as_ref().and_then(|e| e.detail.as_deref())
    }

    pub fn error(&self) -> Option<&IngestError> {
        self.error.as_ref()
    }

    /// Record an error, replacing any previous one.
    pub fn set_error(&mut self, err: IngestError) {
        self.error = Some(err);
    }

    /// Record a bare code unless an error is already present.
    pub fn set_code(&mut self, code: ErrorCode) {
        if self.error.is_none() {
            self.error = Some(IngestError::code(code));
        }
    }

    pub fn clear(&mut self) {
        self.error = None;
    }

    /// Move the error out, leaving the status clear.
    pub fn take(&mut self) -> Option<IngestError> {
        self.error.take()
    }

    pub fn to_result(&self) -> Result<(), IngestError> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IngestError::new(ErrorCode::DuplicateField, "Tried to insert `title` twice");
        assert_eq!(
            err.to_string(),
            "duplicate field: Tried to insert `title` twice"
        );
        assert_eq!(IngestError::code(ErrorCode::GeoFormat).to_string(), "invalid geo format");
    }

    #[test]
    fn test_set_code_keeps_first_error() {
        let mut status = IngestStatus::new();
        assert!(status.is_ok());

        status.set_code(ErrorCode::ParseError);
        status.set_code(ErrorCode::IndexGeneric);
        assert_eq!(status.code(), Some(ErrorCode::ParseError));
        assert!(status.detail().is_none());
    }

    #[test]
    fn test_set_error_overrides() {
        let mut status = IngestStatus::new();
        status.set_code(ErrorCode::IndexGeneric);
        status.set_error(IngestError::new(ErrorCode::MissingDocument, "gone"));
        assert_eq!(status.code(), Some(ErrorCode::MissingDocument));
        assert_eq!(status.detail(), Some("gone"));
    }

    #[test]
    fn test_clear_and_result() {
        let mut status = IngestStatus::new();
        assert!(status.to_result().is_ok());

        status.set_code(ErrorCode::NoDocument);
        assert_eq!(status.to_result().unwrap_err().code, ErrorCode::NoDocument);

        status.clear();
        assert!(!status.has_error());
    }
}
