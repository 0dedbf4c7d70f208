//! # docindex-types
//!
//! Shared domain types for the docindex ingestion pipeline.
//!
//! This crate defines the data structures every other crate agrees on:
//! - Documents: a key, a score, an optional payload and named field values
//! - Schema: field specs with their declared type, flags and reserved slots
//! - Sort vectors and byte offsets: per-document values kept in metadata
//! - Status: the ingestion error taxonomy reported through completion callbacks
//! - Settings: layered configuration
//!
//! ## Usage
//!
//! ```rust
//! use docindex_types::{Document, FieldType, IndexSchema, SchemaDefinition, FieldDefinition};
//!
//! let schema = IndexSchema::from_definition(SchemaDefinition::new("idx")
//!     .with_field(FieldDefinition::new("title", FieldType::FullText).sortable()))
//!     .unwrap();
//! let doc = Document::new("doc:1").with_field("title", "hello world");
//! assert!(schema.field("TITLE").is_some());
//! assert_eq!(doc.fields.len(), 1);
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod metadata;
pub mod schema;
pub mod sortable;
pub mod status;

pub use config::Settings;
pub use document::{DocId, Document, DocumentField};
pub use error::DocIndexError;
pub use metadata::{ByteOffsetField, ByteOffsets, DocumentMetadata};
pub use schema::{
    FieldDefinition, FieldSpec, FieldType, IndexSchema, SchemaDefinition, MAX_FIELDS,
    MAX_TEXT_FIELDS,
};
pub use sortable::{SortVector, SortableValue};
pub use status::{ErrorCode, IngestError, IngestStatus};
