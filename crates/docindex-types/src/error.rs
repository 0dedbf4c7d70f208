//! Error types for the docindex data model.

use thiserror::Error;

/// Errors raised while building schemas or loading configuration.
#[derive(Debug, Error)]
pub enum DocIndexError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Schema definition rejected
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DocIndexError::Config("missing db_path".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing db_path");

        let err = DocIndexError::InvalidSchema("duplicate field `a`".to_string());
        assert_eq!(err.to_string(), "Invalid schema: duplicate field `a`");
    }

    #[test]
    fn test_from_serde_error() {
        let json_err = serde_json::from_str::<i32>("nope").unwrap_err();
        let err: DocIndexError = json_err.into();
        assert!(matches!(err, DocIndexError::Serialization(_)));
    }
}
