//! Execution-context dispatch for the troth primitives.
//!
//! The future and cancellation crates never create threads of their own; they
//! hand callbacks to an [`ExecutionContext`] and let the host decide where
//! work runs. This crate defines that abstraction plus the three pieces the
//! engine needs from it:
//!
//! - **Contexts**: [`InlineContext`], [`ThreadContext`] and (with the default
//!   `tokio` feature) [`TokioContext`], each running jobs one at a time in
//!   submission order.
//! - **Main-context affinity**: the host registers one distinguished context
//!   with [`set_main_context`]; [`on_main_context`] answers "is the current
//!   code running on main", which is what pins callbacks registered from main
//!   back onto main.
//! - **The trampoline**: [`run_soon`] runs a job on the calling thread through
//!   a per-thread FIFO, so chained resolutions unwind iteratively instead of
//!   growing the stack.
//!
//! # Example
//!
//! ```
//! use troth_dispatch::{ExecutionContext, ThreadContext};
//!
//! let cx = ThreadContext::spawn("worker").unwrap();
//! cx.run(Box::new(|| println!("runs on the worker thread")));
//! cx.flush();
//! ```

mod context;
mod inline;
mod registry;
mod thread;
mod trampoline;

#[cfg(feature = "tokio")]
mod tokio_context;

pub use context::{Context, ContextId, ExecutionContext, Job, current_context_id, enter};
pub use inline::InlineContext;
pub use registry::{main_context, on_main_context, set_main_context};
pub use thread::ThreadContext;
pub use trampoline::run_soon;

#[cfg(feature = "tokio")]
pub use tokio_context::TokioContext;

/// Resolves the dispatch target for a callback being registered right now.
///
/// An explicit context always wins. Otherwise, code running on the registered
/// main context is pinned back to it; callers anywhere else get `None`,
/// meaning the callback will run through the trampoline of whichever thread
/// later fires its trigger.
pub fn sticky(explicit: Option<Context>) -> Option<Context> {
    explicit.or_else(|| {
        if on_main_context() {
            main_context()
        } else {
            None
        }
    })
}

/// Submits `job` to `target`, or to the calling thread's trampoline when no
/// target was captured at registration time.
pub fn dispatch(target: Option<&Context>, job: Job) {
    match target {
        Some(cx) => cx.run(job),
        None => run_soon(job),
    }
}
