//! Per-thread FIFO drain loop for "immediate" dispatch.
//!
//! A callback whose trigger has already fired must run promptly, but running
//! it directly in the frame that fired the trigger lets chained resolutions
//! recurse — a future adopting a future adopting a future would otherwise
//! consume one stack frame per layer. The trampoline queues such jobs on the
//! calling thread and drains them from a single loop, so arbitrarily deep
//! cascades unwind iteratively.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use crate::Job;

thread_local! {
    static QUEUE: RefCell<VecDeque<Job>> = RefCell::new(VecDeque::new());
    static DRAINING: Cell<bool> = const { Cell::new(false) };
}

struct DrainGuard;

impl Drop for DrainGuard {
    fn drop(&mut self) {
        DRAINING.with(|d| d.set(false));
    }
}

/// Runs `job` on the calling thread as soon as the current call stack allows.
///
/// If no drain is active on this thread, `job` — and any jobs it submits in
/// turn — completes before `run_soon` returns. If a drain is already active
/// further up the stack, `job` is queued behind the jobs submitted before it
/// and completes before the outermost `run_soon` returns. Each job gets a
/// fresh frame off the drain loop.
///
/// A panicking job stops the current drain; jobs still queued run at the next
/// `run_soon` on this thread.
pub fn run_soon(job: Job) {
    QUEUE.with(|q| q.borrow_mut().push_back(job));

    if DRAINING.with(|d| d.replace(true)) {
        return;
    }
    let _guard = DrainGuard;

    while let Some(job) = QUEUE.with(|q| q.borrow_mut().pop_front()) {
        job();
    }
}
