//! Document store for docindex.
//!
//! Provides RocksDB-backed storage of raw document field values with:
//! - One key per (document, field) so partial writes merge by field name
//! - Prefix scans to tell whether a document has any stored field
//! - Atomic multi-field writes via WriteBatch
//!
//! The ingestion pipeline reads this store when a partial update has to
//! reindex a document from its current stored values.

pub mod column_families;
pub mod db;
pub mod error;
pub mod keys;

pub use db::Storage;
pub use error::StorageError;
pub use keys::FieldKey;
