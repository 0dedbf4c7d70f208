//! # docindex-index
//!
//! Index structures written by the docindex ingestion pipeline.
//!
//! The pipeline treats these as collaborators and only relies on the
//! operations exposed here:
//! - [`Tokenizer`]: Tantivy analyzers producing terms, stems and byte offsets
//! - [`ForwardIndex`]: per-document term builder, committed once per document
//! - [`InvertedIndex`]: shared term -> postings map
//! - [`NumericRangeTree`], [`TagIndex`], [`GeoIndex`]: per-field structures
//! - [`DocTable`]: document key -> id and metadata
//! - [`SearchIndex`]: the bundle that owns all of the above for one schema

pub mod doc_table;
pub mod error;
pub mod forward_index;
pub mod geo;
pub mod index;
pub mod inverted;
pub mod numeric;
pub mod tag;
pub mod tokenizer;

pub use doc_table::DocTable;
pub use error::IndexError;
pub use forward_index::{ForwardIndex, ForwardIndexEntry};
pub use geo::GeoIndex;
pub use index::{IndexStats, SearchIndex};
pub use inverted::{InvertedIndex, Posting};
pub use numeric::NumericRangeTree;
pub use tag::TagIndex;
pub use tokenizer::{parse_language, Token, TokenizeOptions, Tokenizer, DEFAULT_STOPWORDS};
