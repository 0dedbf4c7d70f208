//! Column family definitions for RocksDB.
//!
//! - documents: raw field values, one entry per (document key, field name)

use rocksdb::{ColumnFamilyDescriptor, Options};

/// Column family name for document field values
pub const CF_DOCUMENTS: &str = "documents";

/// Documents are rewritten on every replace; keep them compressed.
fn documents_options() -> Options {
    let mut opts = Options::default();
    opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
    opts
}

/// Build all column family descriptors
pub fn build_cf_descriptors() -> Vec<ColumnFamilyDescriptor> {
    vec![ColumnFamilyDescriptor::new(CF_DOCUMENTS, documents_options())]
}
