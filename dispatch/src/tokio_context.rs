use crate::{ContextId, ExecutionContext, Job, enter};
use std::sync::Arc;
use tracing::{trace, warn};

/// Runs jobs in submission order on a tokio runtime.
///
/// A single pump task owns the queue, so per-context ordering holds even on a
/// multi-threaded runtime. Shutdown follows the signal-then-wait pattern:
/// [`shutdown`](TokioContext::shutdown) cancels the pump, which finishes the
/// backlog already queued before exiting.
pub struct TokioContext {
    id: ContextId,
    tx: tokio::sync::mpsc::UnboundedSender<Job>,
    cancel: tokio_util::sync::CancellationToken,
    tracker: tokio_util::task::TaskTracker,
}

impl TokioContext {
    /// Spawns the pump on the current runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn new() -> Arc<Self> {
        Self::spawn_on(&tokio::runtime::Handle::current())
    }

    /// Spawns the pump on the given runtime handle.
    pub fn spawn_on(handle: &tokio::runtime::Handle) -> Arc<Self> {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Job>();
        let id = ContextId::next();
        let cancel = tokio_util::sync::CancellationToken::new();
        let tracker = tokio_util::task::TaskTracker::new();

        let pump_cancel = cancel.clone();
        let _pump = tracker.spawn_on(
            async move {
                loop {
                    tokio::select! {
                        job = rx.recv() => match job {
                            Some(job) => enter(id, job),
                            None => break,
                        },
                        _ = pump_cancel.cancelled() => break,
                    }
                }

                // Finish the backlog that was queued before shutdown
                rx.close();
                while let Ok(job) = rx.try_recv() {
                    enter(id, job);
                }
                trace!("tokio context {id:?} stopped");
            },
            handle,
        );
        tracker.close();

        Arc::new(Self {
            id,
            tx,
            cancel,
            tracker,
        })
    }

    /// Stops the pump and waits for already-queued jobs to finish.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.wait().await;
    }
}

impl ExecutionContext for TokioContext {
    fn context_id(&self) -> ContextId {
        self.id
    }

    fn run(&self, job: Job) {
        if self.tx.send(job).is_err() {
            warn!("job submitted to a stopped tokio context");
        }
    }
}

impl std::fmt::Debug for TokioContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioContext").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::current_context_id;
    use std::sync::Mutex;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn jobs_run_in_submission_order() {
        let cx = TokioContext::new();
        let id = cx.context_id();

        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..100 {
            let order = order.clone();
            cx.run(Box::new(move || {
                assert_eq!(current_context_id(), Some(id));
                order.lock().unwrap().push(i);
            }));
        }
        cx.shutdown().await;

        assert_eq!(*order.lock().unwrap(), (0..100).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn shutdown_runs_backlog() {
        let cx = TokioContext::new();

        let hits = Arc::new(Mutex::new(0));
        for _ in 0..10 {
            let hits = hits.clone();
            cx.run(Box::new(move || {
                *hits.lock().unwrap() += 1;
            }));
        }
        cx.shutdown().await;

        assert_eq!(*hits.lock().unwrap(), 10);
    }
}
