use std::cell::Cell;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one execution context for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    /// Allocates a fresh process-unique id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A unit of work submitted to an execution context.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// An opaque unit capable of running jobs.
///
/// Jobs submitted to one context run one at a time, in submission order; no
/// ordering is implied across contexts. `run` schedules and returns — it never
/// executes the job in the caller's frame.
pub trait ExecutionContext: Send + Sync {
    /// The stable identity of this context.
    fn context_id(&self) -> ContextId;

    /// Schedules `job` to run later on this context.
    fn run(&self, job: Job);
}

/// Shared handle to an execution context.
pub type Context = Arc<dyn ExecutionContext>;

thread_local! {
    static CURRENT: Cell<Option<ContextId>> = const { Cell::new(None) };
}

struct EnterGuard(Option<ContextId>);

impl Drop for EnterGuard {
    fn drop(&mut self) {
        CURRENT.with(|c| c.set(self.0));
    }
}

/// Marks the calling thread as running on `id` for the duration of `f`.
///
/// Context implementations wrap every job they execute in this, so that
/// [`current_context_id`] and the main-context affinity rule can observe
/// which context a callback is being registered from.
pub fn enter<R>(id: ContextId, f: impl FnOnce() -> R) -> R {
    let guard = EnterGuard(CURRENT.with(|c| c.replace(Some(id))));
    let r = f();
    drop(guard);
    r
}

/// The context the calling thread is currently executing a job for, if any.
pub fn current_context_id() -> Option<ContextId> {
    CURRENT.with(Cell::get)
}
