//! # docindex-ingest
//!
//! Turns a parsed [`Document`](docindex_types::Document) into mutations of the
//! index structures in `docindex-index` and the metadata table.
//!
//! Flow for one document:
//! 1. [`ContextPool`] hands out an [`AddDocumentCtx`], which is attached to the
//!    document and resolves each field against the schema
//! 2. Partial updates go through [`partial::handle_partial_update`], which
//!    either patches metadata in place or reloads the document for reindexing
//! 3. The [`scheduler`] runs large documents on a [`WorkerPool`] and small
//!    ones inline
//! 4. The [`driver`] runs each field's preprocessor, then hands the context to
//!    the [`DocumentIndexer`] for id assignment and bulk indexing
//! 5. [`Completion`] runs the caller's callback once and returns the context
//!    to the pool
//!
//! [`IngestPipeline`] wires these together.

pub mod completion;
pub mod context;
pub mod dedup;
pub mod driver;
pub mod error;
pub mod eval;
pub mod field_type;
pub mod indexer;
pub mod partial;
pub mod pipeline;
pub mod pool;
pub mod scheduler;
pub mod store;

pub use completion::{Completion, DoneCallback, ExecutionScope};
pub use context::{AddDocumentCtx, AddOptions, FieldData, StateFlags};
pub use dedup::FieldDedup;
pub use driver::{add_to_indexes, preprocess_fields};
pub use eval::{evaluate_document, Expr, Value};
pub use error::PipelineError;
pub use field_type::{parse_numeric, BulkHandle, BulkIndexer, FieldIndexer};
pub use indexer::DocumentIndexer;
pub use partial::{handle_partial_update, PartialOutcome};
pub use pipeline::IngestPipeline;
pub use pool::{ContextPool, ObjectPool, PoolStats};
pub use scheduler::{
    indexable_payload_size, should_offload, Submission, WorkerPool, SELF_EXEC_THRESHOLD,
};
pub use store::DocumentStore;
