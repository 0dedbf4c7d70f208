//! Key encoding for the document store.
//!
//! Key format: `doc:{doc_key}\0{field_name}`
//! - doc_key: the external document key (must not contain NUL)
//! - field_name: the field name exactly as submitted
//!
//! All fields of one document share the prefix `doc:{doc_key}\0`, so a
//! document's existence can be checked with a single prefix scan.

use crate::error::StorageError;

const PREFIX: &str = "doc:";
const SEPARATOR: u8 = 0;

/// Key of one stored field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldKey {
    pub doc_key: String,
    pub field: String,
}

impl FieldKey {
    pub fn new(doc_key: impl Into<String>, field: impl Into<String>) -> Result<Self, StorageError> {
        let key = Self {
            doc_key: doc_key.into(),
            field: field.into(),
        };
        validate_doc_key(&key.doc_key)?;
        if key.field.as_bytes().contains(&SEPARATOR) {
            return Err(StorageError::Key(format!(
                "field name contains NUL: {:?}",
                key.field
            )));
        }
        Ok(key)
    }

    /// Encode key to bytes for storage
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Self::document_prefix_unchecked(&self.doc_key);
        bytes.extend_from_slice(self.field.as_bytes());
        bytes
    }

    /// Prefix shared by every field of `doc_key`.
    pub fn document_prefix(doc_key: &str) -> Result<Vec<u8>, StorageError> {
        validate_doc_key(doc_key)?;
        Ok(Self::document_prefix_unchecked(doc_key))
    }

    fn document_prefix_unchecked(doc_key: &str) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(PREFIX.len() + doc_key.len() + 1);
        bytes.extend_from_slice(PREFIX.as_bytes());
        bytes.extend_from_slice(doc_key.as_bytes());
        bytes.push(SEPARATOR);
        bytes
    }
}

fn validate_doc_key(doc_key: &str) -> Result<(), StorageError> {
    if doc_key.is_empty() {
        return Err(StorageError::Key("empty document key".to_string()));
    }
    if doc_key.as_bytes().contains(&SEPARATOR) {
        return Err(StorageError::Key(format!(
            "document key contains NUL: {:?}",
            doc_key
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_key_encoding() {
        let key = FieldKey::new("product:42", "title").unwrap();
        assert_eq!(key.to_bytes(), b"doc:product:42\0title".to_vec());
    }

    #[test]
    fn test_prefix_does_not_match_longer_key() {
        let prefix = FieldKey::document_prefix("a").unwrap();
        let other = FieldKey::new("ab", "f").unwrap().to_bytes();
        assert!(!other.starts_with(&prefix));
        let own = FieldKey::new("a", "f").unwrap().to_bytes();
        assert!(own.starts_with(&prefix));
    }

    #[test]
    fn test_invalid_keys() {
        assert!(FieldKey::new("", "f").is_err());
        assert!(FieldKey::new("a\0b", "f").is_err());
        assert!(FieldKey::new("a", "f\0").is_err());
    }
}
