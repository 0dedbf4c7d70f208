//! Document metadata table.
//!
//! Maps external document keys to internal ids and holds the per-document
//! metadata (score, payload, sort vector, byte offsets). Ids are assigned
//! monotonically and never reused.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use docindex_types::{DocId, DocumentMetadata};

use crate::error::IndexError;

#[derive(Debug, Default)]
struct Inner {
    by_key: HashMap<String, DocId>,
    docs: HashMap<DocId, DocumentMetadata>,
    max_id: DocId,
}

/// Key -> id -> metadata table shared by one index.
#[derive(Debug, Default)]
pub struct DocTable {
    inner: RwLock<Inner>,
}

impl DocTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a new id to `key`.
    ///
    /// Fails with [`IndexError::DocumentExists`] if `key` already has a live id.
    pub fn put(&self, key: &str, score: f32, payload: Option<Vec<u8>>) -> Result<DocId, IndexError> {
        let mut inner = self.inner.write()?;
        if inner.by_key.contains_key(key) {
            return Err(IndexError::DocumentExists(key.to_string()));
        }

        inner.max_id += 1;
        let id = inner.max_id;
        let mut md = DocumentMetadata::new(id, key, score);
        md.payload = payload;
        inner.by_key.insert(key.to_string(), id);
        inner.docs.insert(id, md);
        debug!(key, id, "Assigned document id");
        Ok(id)
    }

    pub fn get_id(&self, key: &str) -> Result<Option<DocId>, IndexError> {
        Ok(self.inner.read()?.by_key.get(key).copied())
    }

    /// Metadata snapshot by id.
    pub fn get(&self, id: DocId) -> Result<Option<DocumentMetadata>, IndexError> {
        Ok(self.inner.read()?.docs.get(&id).cloned())
    }

    /// Metadata snapshot of the live document with `key`.
    pub fn get_by_key(&self, key: &str) -> Result<Option<DocumentMetadata>, IndexError> {
        let inner = self.inner.read()?;
        Ok(inner
            .by_key
            .get(key)
            .and_then(|id| inner.docs.get(id))
            .cloned())
    }

    /// Detach `key` from its id and mark the old metadata deleted.
    ///
    /// Returns the old metadata, or `None` if the key was not present.
    pub fn pop(&self, key: &str) -> Result<Option<DocumentMetadata>, IndexError> {
        let mut inner = self.inner.write()?;
        let Some(id) = inner.by_key.remove(key) else {
            return Ok(None);
        };
        Ok(inner.docs.get_mut(&id).map(|md| {
            md.deleted = true;
            md.clone()
        }))
    }

    /// Mark a document deleted and detach its key if it still points at `id`.
    pub fn delete(&self, id: DocId) -> Result<bool, IndexError> {
        let mut inner = self.inner.write()?;
        let Some(md) = inner.docs.get_mut(&id) else {
            return Ok(false);
        };
        md.deleted = true;
        let key = md.key.clone();
        if inner.by_key.get(&key) == Some(&id) {
            inner.by_key.remove(&key);
        }
        Ok(true)
    }

    /// Apply `f` to the metadata of `id` under the write lock.
    pub fn update<F, R>(&self, id: DocId, f: F) -> Result<R, IndexError>
    where
        F: FnOnce(&mut DocumentMetadata) -> R,
    {
        let mut inner = self.inner.write()?;
        let md = inner
            .docs
            .get_mut(&id)
            .filter(|md| !md.deleted)
            .ok_or(IndexError::UnknownDocument(id))?;
        Ok(f(md))
    }

    pub fn exists(&self, key: &str) -> Result<bool, IndexError> {
        Ok(self.inner.read()?.by_key.contains_key(key))
    }

    /// Number of live documents.
    pub fn len(&self) -> Result<usize, IndexError> {
        Ok(self.inner.read()?.by_key.len())
    }

    pub fn is_empty(&self) -> Result<bool, IndexError> {
        Ok(self.len()? == 0)
    }

    pub fn max_id(&self) -> Result<DocId, IndexError> {
        Ok(self.inner.read()?.max_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_assigns_increasing_ids() {
        let table = DocTable::new();
        let a = table.put("a", 1.0, None).unwrap();
        let b = table.put("b", 0.5, Some(b"p".to_vec())).unwrap();
        assert!(b > a);
        assert_eq!(table.get_id("b").unwrap(), Some(b));
        assert_eq!(table.get(b).unwrap().unwrap().payload, Some(b"p".to_vec()));
        assert_eq!(table.len().unwrap(), 2);
    }

    #[test]
    fn test_put_existing_fails() {
        let table = DocTable::new();
        table.put("a", 1.0, None).unwrap();
        assert!(matches!(
            table.put("a", 1.0, None),
            Err(IndexError::DocumentExists(_))
        ));
    }

    #[test]
    fn test_pop_then_put_gets_new_id() {
        let table = DocTable::new();
        let old = table.put("a", 1.0, None).unwrap();
        let md = table.pop("a").unwrap().unwrap();
        assert_eq!(md.id, old);
        assert!(md.deleted);
        assert!(!table.exists("a").unwrap());

        let new = table.put("a", 1.0, None).unwrap();
        assert_ne!(old, new);
        assert!(table.get(old).unwrap().unwrap().deleted);
        assert!(table.pop("missing").unwrap().is_none());
    }

    #[test]
    fn test_delete_detaches_key() {
        let table = DocTable::new();
        let id = table.put("a", 1.0, None).unwrap();
        assert!(table.delete(id).unwrap());
        assert!(table.get_by_key("a").unwrap().is_none());
        assert!(!table.delete(999).unwrap());
    }

    #[test]
    fn test_update() {
        let table = DocTable::new();
        let id = table.put("a", 1.0, None).unwrap();
        table.update(id, |md| md.score = 0.25).unwrap();
        assert_eq!(table.get(id).unwrap().unwrap().score, 0.25);

        table.delete(id).unwrap();
        assert!(matches!(
            table.update(id, |_| ()),
            Err(IndexError::UnknownDocument(_))
        ));
    }
}
