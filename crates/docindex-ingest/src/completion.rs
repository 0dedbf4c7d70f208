//! Completion protocol: run the done callback once, then recycle the context.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::context::AddDocumentCtx;
use crate::pool::ContextPool;

/// Where a done callback is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionScope {
    /// The thread that submitted the document, or the one waiting on it
    Caller,
    /// A worker thread, because nobody was left waiting
    Worker,
}

/// Callback invoked exactly once per submitted document.
///
/// The context is borrowed; its status carries the outcome.
pub type DoneCallback = Box<dyn FnOnce(&AddDocumentCtx, ExecutionScope) + Send + 'static>;

/// Finishes contexts and returns them to their pool.
#[derive(Debug, Clone)]
pub struct Completion {
    pool: Arc<ContextPool>,
}

impl Completion {
    pub fn new(pool: Arc<ContextPool>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Arc<ContextPool> {
        &self.pool
    }

    /// Run the context's callback, if it has not run yet, then release it.
    pub fn finish(&self, mut ctx: Box<AddDocumentCtx>, scope: ExecutionScope) {
        match ctx.done.take() {
            Some(done) => {
                debug!(
                    key = %ctx.key(),
                    ok = ctx.status().is_ok(),
                    ?scope,
                    "Completing document"
                );
                done(&ctx, scope);
            }
            None => warn!(key = %ctx.key(), "Context finished without a done callback"),
        }
        self.pool.release(ctx);
    }

    /// Return a context that never had a callback attached.
    pub fn discard(&self, ctx: Box<AddDocumentCtx>) {
        self.pool.release(ctx);
    }
}
