//! RocksDB wrapper for the docindex document store.
//!
//! Provides:
//! - Database open with column family setup
//! - Hash-set style field writes (merge by field name) in one WriteBatch
//! - Field-subset reads and existence checks by key prefix

use rocksdb::{ColumnFamily, Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use tracing::{debug, info};

use crate::column_families::{build_cf_descriptors, CF_DOCUMENTS};
use crate::error::StorageError;
use crate::keys::FieldKey;
use docindex_types::DocumentField;

/// Main storage interface for docindex documents
pub struct Storage {
    db: DB,
}

impl Storage {
    /// Open storage at the given path, creating if necessary
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        info!("Opening document store at {:?}", path);

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_max_background_jobs(4);

        let db = DB::open_cf_descriptors(&db_opts, path, build_cf_descriptors())?;
        Ok(Self { db })
    }

    fn documents_cf(&self) -> Result<&ColumnFamily, StorageError> {
        self.db
            .cf_handle(CF_DOCUMENTS)
            .ok_or_else(|| StorageError::ColumnFamilyNotFound(CF_DOCUMENTS.to_string()))
    }

    /// Write field values for a document.
    ///
    /// Existing fields with the same name are overwritten, other stored
    /// fields are left untouched. Returns the number of fields written.
    pub fn save_fields(
        &self,
        doc_key: &str,
        fields: &[DocumentField],
    ) -> Result<usize, StorageError> {
        let cf = self.documents_cf()?;

        let mut batch = WriteBatch::default();
        for field in fields {
            let key = FieldKey::new(doc_key, field.name.as_str())?;
            batch.put_cf(cf, key.to_bytes(), field.value.as_bytes());
        }

        self.db.write(batch)?;
        debug!(doc_key, count = fields.len(), "Saved document fields");
        Ok(fields.len())
    }

    /// Load the named fields of a document.
    ///
    /// Returns `None` if the document has no stored fields at all. Fields
    /// that are not stored are omitted from the result; the order follows
    /// `names`.
    pub fn load_fields(
        &self,
        doc_key: &str,
        names: &[&str],
    ) -> Result<Option<Vec<DocumentField>>, StorageError> {
        let cf = self.documents_cf()?;

        let keys = names
            .iter()
            .map(|name| FieldKey::new(doc_key, *name).map(|k| k.to_bytes()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut fields = Vec::with_capacity(names.len());
        for (name, value) in names.iter().zip(self.db.multi_get_cf(keys.iter().map(|k| (cf, k)))) {
            if let Some(bytes) = value? {
                fields.push(DocumentField::new(*name, decode_value(bytes)?));
            }
        }

        if fields.is_empty() && !self.document_exists(doc_key)? {
            return Ok(None);
        }
        Ok(Some(fields))
    }

    /// Check whether any field is stored for a document.
    pub fn document_exists(&self, doc_key: &str) -> Result<bool, StorageError> {
        let cf = self.documents_cf()?;
        let prefix = FieldKey::document_prefix(doc_key)?;

        let mut iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward));
        match iter.next() {
            Some(item) => {
                let (key, _) = item?;
                Ok(key.starts_with(&prefix))
            }
            None => Ok(false),
        }
    }
}

fn decode_value(bytes: Vec<u8>) -> Result<String, StorageError> {
    String::from_utf8(bytes).map_err(|e| StorageError::Value(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::open(temp_dir.path()).unwrap();
        (storage, temp_dir)
    }

    fn fields(pairs: &[(&str, &str)]) -> Vec<DocumentField> {
        pairs
            .iter()
            .map(|(n, v)| DocumentField::new(*n, *v))
            .collect()
    }

    #[test]
    fn test_save_and_load_fields() {
        let (storage, _temp) = create_test_storage();
        storage
            .save_fields("doc:1", &fields(&[("title", "hello"), ("price", "9.5")]))
            .unwrap();

        let loaded = storage
            .load_fields("doc:1", &["price", "title", "missing"])
            .unwrap()
            .unwrap();
        assert_eq!(loaded, fields(&[("price", "9.5"), ("title", "hello")]));
    }

    #[test]
    fn test_load_missing_document() {
        let (storage, _temp) = create_test_storage();
        assert!(storage.load_fields("nope", &["title"]).unwrap().is_none());
        assert!(!storage.document_exists("nope").unwrap());
    }

    #[test]
    fn test_existing_document_without_requested_fields() {
        let (storage, _temp) = create_test_storage();
        storage.save_fields("doc:1", &fields(&[("a", "1")])).unwrap();

        let loaded = storage.load_fields("doc:1", &["b"]).unwrap();
        assert_eq!(loaded, Some(Vec::new()));
    }

    #[test]
    fn test_save_merges_by_field_name() {
        let (storage, _temp) = create_test_storage();
        storage
            .save_fields("doc:1", &fields(&[("a", "1"), ("b", "2")]))
            .unwrap();
        storage.save_fields("doc:1", &fields(&[("b", "3")])).unwrap();

        let loaded = storage.load_fields("doc:1", &["a", "b"]).unwrap().unwrap();
        assert_eq!(loaded, fields(&[("a", "1"), ("b", "3")]));
    }

    #[test]
    fn test_prefix_isolation() {
        let (storage, _temp) = create_test_storage();
        storage.save_fields("a", &fields(&[("f", "x")])).unwrap();
        storage.save_fields("ab", &fields(&[("f", "y")])).unwrap();

        assert_eq!(
            storage.load_fields("a", &["f"]).unwrap().unwrap(),
            fields(&[("f", "x")])
        );
        assert!(!storage.document_exists("a:").unwrap());
        assert!(storage.document_exists("ab").unwrap());
    }
}
