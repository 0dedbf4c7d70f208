//! Execution scheduler: inline for small documents, worker pool for large ones.

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use docindex_types::{ErrorCode, FieldType, IngestError};

use crate::completion::{Completion, ExecutionScope};
use crate::context::AddDocumentCtx;
use crate::driver::add_to_indexes;
use crate::indexer::DocumentIndexer;

/// Documents with at least this many bytes of text and tag content are
/// indexed off the calling thread.
pub const SELF_EXEC_THRESHOLD: usize = 1024;

/// Byte length of all resolved full-text and tag field values.
pub fn indexable_payload_size(ctx: &AddDocumentCtx) -> usize {
    ctx.fspecs
        .iter()
        .zip(ctx.doc.fields.iter())
        .filter_map(|(fs, field)| {
            fs.as_ref()
                .filter(|fs| matches!(fs.field_type, FieldType::FullText | FieldType::Tag))
                .map(|_| field.value.len())
        })
        .sum()
}

/// Whether a context should be handed to the worker pool.
pub fn should_offload(ctx: &AddDocumentCtx) -> bool {
    !ctx.options.no_block && indexable_payload_size(ctx) >= SELF_EXEC_THRESHOLD
}

/// Threads that index offloaded documents.
///
/// Either owns a dedicated Tokio runtime or borrows an existing one.
pub struct WorkerPool {
    runtime: Option<Runtime>,
    handle: Handle,
}

impl WorkerPool {
    /// Start a dedicated runtime with `threads` blocking workers.
    pub fn new(threads: usize) -> Result<Self, std::io::Error> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(threads.max(1))
            .thread_name("docindex-worker")
            .enable_all()
            .build()?;
        let handle = runtime.handle().clone();
        debug!(threads, "Started indexing worker pool");
        Ok(Self {
            runtime: Some(runtime),
            handle,
        })
    }

    /// Run offloaded work on an existing runtime.
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            runtime: None,
            handle,
        }
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn spawn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        // Detached; the job reports through its channel
        drop(self.handle.spawn_blocking(f));
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("owned", &self.runtime.is_some())
            .finish()
    }
}

/// One offloaded document.
///
/// If the job is dropped without running, the document is failed and
/// completed here so its callback still runs.
pub(crate) struct WorkerJob {
    ctx: Option<Box<AddDocumentCtx>>,
    tx: Option<oneshot::Sender<Box<AddDocumentCtx>>>,
    indexer: DocumentIndexer,
    completion: Completion,
}

impl WorkerJob {
    pub(crate) fn new(
        ctx: Box<AddDocumentCtx>,
        indexer: DocumentIndexer,
        completion: Completion,
    ) -> (Self, oneshot::Receiver<Box<AddDocumentCtx>>) {
        let (tx, rx) = oneshot::channel();
        let job = Self {
            ctx: Some(ctx),
            tx: Some(tx),
            indexer,
            completion,
        };
        (job, rx)
    }

    pub(crate) fn run(mut self) {
        let (Some(mut ctx), Some(tx)) = (self.ctx.take(), self.tx.take()) else {
            return;
        };
        add_to_indexes(&mut ctx, &self.indexer);

        // Hand back to the caller; if it is gone, complete here
        if let Err(ctx) = tx.send(ctx) {
            debug!(key = %ctx.key(), "Submitter gone, completing on worker");
            self.completion.finish(ctx, ExecutionScope::Worker);
        }
    }
}

impl Drop for WorkerJob {
    fn drop(&mut self) {
        if let Some(mut ctx) = self.ctx.take() {
            warn!(key = %ctx.key(), "Worker job dropped before running");
            ctx.status.set_error(IngestError::new(
                ErrorCode::IndexGeneric,
                "Worker pool shut down before indexing",
            ));
            self.completion.finish(ctx, ExecutionScope::Worker);
        }
    }
}

/// Handle to a submitted document.
///
/// Inline submissions are already complete. For offloaded ones, the
/// callback runs when the submission is waited on or dropped, or on the
/// worker if the submission was dropped first; in every case exactly once.
#[must_use = "an offloaded document completes when its submission is waited on or dropped"]
pub struct Submission {
    pending: Option<Pending>,
}

struct Pending {
    rx: oneshot::Receiver<Box<AddDocumentCtx>>,
    completion: Completion,
}

impl Submission {
    pub(crate) fn inline() -> Self {
        Self { pending: None }
    }

    pub(crate) fn offloaded(
        rx: oneshot::Receiver<Box<AddDocumentCtx>>,
        completion: Completion,
    ) -> Self {
        Self {
            pending: Some(Pending { rx, completion }),
        }
    }

    /// Whether indexing was handed to the worker pool.
    pub fn is_offloaded(&self) -> bool {
        self.pending.is_some()
    }

    /// Block the current thread until the document is complete.
    ///
    /// Must not be called from within an async context; use
    /// [`Submission::completed`] there.
    pub fn wait(mut self) {
        if let Some(pending) = self.pending.take() {
            if let Ok(ctx) = pending.rx.blocking_recv() {
                pending.completion.finish(ctx, ExecutionScope::Caller);
            }
        }
    }

    /// Wait asynchronously until the document is complete.
    pub async fn completed(mut self) {
        if let Some(pending) = self.pending.take() {
            if let Ok(ctx) = pending.rx.await {
                pending.completion.finish(ctx, ExecutionScope::Caller);
            }
        }
    }
}

impl Drop for Submission {
    fn drop(&mut self) {
        if let Some(mut pending) = self.pending.take() {
            // After close, either we receive the context or the worker's send fails
            pending.rx.close();
            if let Ok(ctx) = pending.rx.try_recv() {
                pending.completion.finish(ctx, ExecutionScope::Caller);
            }
        }
    }
}

impl std::fmt::Debug for Submission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Submission")
            .field("offloaded", &self.is_offloaded())
            .finish()
    }
}
