use crate::{ContextId, ExecutionContext, Job, current_context_id, enter};
use std::sync::Arc;
use tracing::{trace, warn};

/// A dedicated worker thread running jobs in submission order.
///
/// The worker drains an unbounded channel for the lifetime of the handle.
/// Dropping the last handle closes the channel; the worker finishes whatever
/// was already queued and exits. Suitable as the registered main context for
/// plain-threaded hosts, and as the workhorse context in tests.
pub struct ThreadContext {
    id: ContextId,
    tx: flume::Sender<Job>,
}

impl ThreadContext {
    /// Spawns the worker thread.
    pub fn spawn(name: &str) -> std::io::Result<Arc<Self>> {
        let (tx, rx) = flume::unbounded::<Job>();
        let id = ContextId::next();

        std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    enter(id, job);
                }
                trace!("thread context {id:?} drained and stopping");
            })?;

        Ok(Arc::new(Self { id, tx }))
    }

    /// Blocks until every job submitted before this call has run.
    ///
    /// # Panics
    ///
    /// Panics if called from this context's own worker thread, which could
    /// only deadlock.
    pub fn flush(&self) {
        assert_ne!(
            current_context_id(),
            Some(self.id),
            "ThreadContext::flush called from its own worker thread"
        );

        let (tx, rx) = flume::bounded::<()>(1);
        self.run(Box::new(move || {
            let _ = tx.send(());
        }));
        let _ = rx.recv();
    }
}

impl ExecutionContext for ThreadContext {
    fn context_id(&self) -> ContextId {
        self.id
    }

    fn run(&self, job: Job) {
        if self.tx.send(job).is_err() {
            // Only reachable if the worker died; the job is dropped unrun.
            warn!("job submitted to a stopped thread context");
        }
    }
}

impl std::fmt::Debug for ThreadContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadContext").field("id", &self.id).finish()
    }
}
