//! Ingestion pipeline facade.
//!
//! Owns the index, the document store, the context pool and the worker
//! pool, and routes each submitted document through partial-update
//! handling, scheduling, indexing and completion.

use std::sync::Arc;

use tracing::{debug, info};

use docindex_index::{IndexStats, SearchIndex};
use docindex_storage::Storage;
use docindex_types::{Document, ErrorCode, IndexSchema, IngestError, Settings};

use crate::completion::{Completion, DoneCallback, ExecutionScope};
use crate::context::{AddDocumentCtx, AddOptions};
use crate::driver::add_to_indexes;
use crate::error::PipelineError;
use crate::eval::evaluate_document;
use crate::indexer::DocumentIndexer;
use crate::partial::{handle_partial_update, PartialOutcome};
use crate::pool::{ContextPool, PoolStats};
use crate::scheduler::{indexable_payload_size, should_offload, Submission, WorkerJob, WorkerPool};
use crate::store::DocumentStore;

/// Ingests documents into one index.
pub struct IngestPipeline {
    index: Arc<SearchIndex>,
    store: Arc<dyn DocumentStore>,
    completion: Completion,
    indexer: DocumentIndexer,
    workers: WorkerPool,
}

impl IngestPipeline {
    pub fn new(
        index: Arc<SearchIndex>,
        store: Arc<dyn DocumentStore>,
        workers: WorkerPool,
        pool_floor: usize,
    ) -> Self {
        let pool = Arc::new(ContextPool::with_floor(pool_floor));
        Self {
            indexer: DocumentIndexer::new(Arc::clone(&index)),
            completion: Completion::new(pool),
            index,
            store,
            workers,
        }
    }

    /// Open the document store and start a worker pool from `settings`.
    pub fn open(settings: &Settings, schema: IndexSchema) -> Result<Self, PipelineError> {
        settings.validate()?;
        let db_path = settings.expanded_db_path();
        let storage = Storage::open(&db_path)?;
        let workers = WorkerPool::new(settings.worker_threads)?;
        info!(
            path = %db_path.display(),
            index = %schema.name(),
            workers = settings.worker_threads,
            "Opened ingestion pipeline"
        );
        Ok(Self::new(
            Arc::new(SearchIndex::new(Arc::new(schema))),
            Arc::new(storage),
            workers,
            settings.context_pool_floor,
        ))
    }

    pub fn index(&self) -> &Arc<SearchIndex> {
        &self.index
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.completion.pool().stats()
    }

    pub fn stats(&self) -> Result<IndexStats, PipelineError> {
        Ok(self.index.stats()?)
    }

    /// Acquire a context and attach `doc` to it.
    ///
    /// On failure the context goes straight back to the pool; no callback
    /// is involved.
    pub fn new_context(
        &self,
        doc: Document,
        options: AddOptions,
    ) -> Result<Box<AddDocumentCtx>, IngestError> {
        let pool = self.completion.pool();
        let mut ctx = pool.acquire();
        ctx.options = options;
        match ctx.attach(Arc::clone(self.index.schema()), doc) {
            Ok(()) => Ok(ctx),
            Err(err) => {
                pool.release(ctx);
                Err(err)
            }
        }
    }

    /// Run an attached context through the pipeline.
    ///
    /// `done` is called exactly once with the final status.
    pub fn submit(&self, mut ctx: Box<AddDocumentCtx>, done: DoneCallback) -> Submission {
        ctx.done = Some(done);
        ctx.state.no_block = ctx.options.no_block;

        if ctx.options.partial {
            debug!(key = %ctx.key(), reindex = ctx.state.has_indexables(), "Partial update");
            ctx = match handle_partial_update(ctx, &self.index, self.store.as_ref(), &self.completion) {
                PartialOutcome::Reindex(ctx) => ctx,
                PartialOutcome::Completed => return Submission::inline(),
            };
        }

        if should_offload(&ctx) {
            debug!(
                key = %ctx.key(),
                bytes = indexable_payload_size(&ctx),
                "Offloading document to worker pool"
            );
            let (job, rx) = WorkerJob::new(ctx, self.indexer.clone(), self.completion.clone());
            self.workers.spawn(move || job.run());
            return Submission::offloaded(rx, self.completion.clone());
        }

        add_to_indexes(&mut ctx, &self.indexer);
        self.completion.finish(ctx, ExecutionScope::Caller);
        Submission::inline()
    }

    /// Save, attach and submit one document.
    ///
    /// Partial updates are saved by the partial path once the target
    /// document is known to exist. Errors returned here mean the document was never submitted and
    /// `done` was not called.
    pub fn add_document(
        &self,
        doc: Document,
        options: AddOptions,
        done: DoneCallback,
    ) -> Result<Submission, PipelineError> {
        if !options.is_replace() && self.index.docs().exists(&doc.key)? {
            return Err(IngestError::new(ErrorCode::DocumentExists, "Document already exists").into());
        }

        let ctx = self.new_context(doc, options)?;

        if !options.no_save && !options.partial {
            if let Err(e) = self.store.save_fields(&ctx.doc.key, &ctx.doc.fields) {
                self.completion.discard(ctx);
                return Err(e.into());
            }
        }

        Ok(self.submit(ctx, done))
    }

    /// Evaluate a condition expression against the indexed document `key`.
    pub fn evaluate_condition(&self, key: &str, expr: &str) -> Result<bool, IngestError> {
        evaluate_document(expr, key, &self.index, self.store.as_ref())
    }
}

impl std::fmt::Debug for IngestPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestPipeline")
            .field("index", &self.index.schema().name())
            .field("pool", &self.pool_stats())
            .field("workers", &self.workers)
            .finish()
    }
}
