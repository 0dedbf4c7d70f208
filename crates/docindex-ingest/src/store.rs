//! Document store collaborator used by partial updates and evaluation.

use docindex_storage::{Storage, StorageError};
use docindex_types::DocumentField;

/// Stored field values of documents, by key.
pub trait DocumentStore: Send + Sync {
    /// Load the named fields of a document.
    ///
    /// `None` means the document does not exist. Missing fields are omitted.
    fn load_fields(
        &self,
        doc_key: &str,
        names: &[&str],
    ) -> Result<Option<Vec<DocumentField>>, StorageError>;

    /// Write fields, merging by field name.
    fn save_fields(&self, doc_key: &str, fields: &[DocumentField]) -> Result<usize, StorageError>;
}

impl DocumentStore for Storage {
    fn load_fields(
        &self,
        doc_key: &str,
        names: &[&str],
    ) -> Result<Option<Vec<DocumentField>>, StorageError> {
        Storage::load_fields(self, doc_key, names)
    }

    fn save_fields(&self, doc_key: &str, fields: &[DocumentField]) -> Result<usize, StorageError> {
        Storage::save_fields(self, doc_key, fields)
    }
}
