//! The shared resolution cell and the producer-owned continuation list.
//!
//! Ownership is deliberately lopsided: the [`Shared`] cell holds only the
//! terminal outcome (never closures) and is strongly held by every observer
//! handle, while [`ProducerCore`] is the *sole* strong owner of the pending
//! continuations. Dropping the producer reclaims every continuation — and
//! anything those closures capture, cycles included — while leaving the cell
//! pending forever.

use std::sync::{Arc, Mutex};
use trace_err::*;
use tracing::trace;
use troth_cancel::CancelToken;
use troth_dispatch::{Context, dispatch};

pub(crate) enum State<T, E> {
    Pending,
    Resolved(Result<T, E>),
}

/// Observer-side cell: the one place the outcome lives once resolved.
pub(crate) struct Shared<T, E> {
    pub(crate) state: Mutex<State<T, E>>,
}

/// What a continuation is handed when its trigger fires.
pub(crate) enum Fired<T, E> {
    Outcome(Result<T, E>),
    /// The guard token was observed cancelled after the context switch.
    GuardCancelled,
}

pub(crate) struct Continuation<T, E> {
    /// `None` dispatches through the trampoline of the resolving thread.
    pub(crate) target: Option<Context>,
    /// Checked exactly once, after the context switch: cancelled wins.
    pub(crate) guard: Option<CancelToken>,
    pub(crate) run: Box<dyn FnOnce(Fired<T, E>) + Send>,
}

/// Schedules one continuation with the resolved outcome.
///
/// The guard check happens inside the scheduled job — that is, *after* any
/// context switch — so a main-context consumer that has observed its token as
/// cancelled can rely on no further guarded callback running there.
pub(crate) fn fire<T, E>(continuation: Continuation<T, E>, outcome: Result<T, E>)
where
    T: Send + 'static,
    E: Send + 'static,
{
    let Continuation { target, guard, run } = continuation;
    let job = Box::new(move || match guard {
        Some(token) if token.is_cancelled() => run(Fired::GuardCancelled),
        _ => run(Fired::Outcome(outcome)),
    });
    dispatch(target.as_ref(), job);
}

/// Producer-side core: resolution authority plus the continuation list.
pub(crate) struct ProducerCore<T, E> {
    pub(crate) shared: Arc<Shared<T, E>>,
    waiters: Mutex<Vec<Continuation<T, E>>>,
}

impl<T, E> ProducerCore<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::Pending),
            }),
            waiters: Mutex::new(Vec::new()),
        }
    }

    /// The one allowed `Pending → Resolved` transition.
    ///
    /// The state lock is held across the waiter drain, so a registration
    /// racing this call either lands in the drained list or observes the
    /// resolved state and self-dispatches — no continuation is ever dropped
    /// by the race.
    pub(crate) fn resolve(&self, outcome: Result<T, E>) -> bool {
        let drained = {
            let mut state = self.shared.state.lock().trace_expect("Failed to lock mutex");
            if matches!(*state, State::Resolved(_)) {
                trace!("redundant resolution attempt ignored");
                return false;
            }
            *state = State::Resolved(outcome.clone());
            std::mem::take(&mut *self.waiters.lock().trace_expect("Failed to lock mutex"))
        };

        for continuation in drained {
            fire(continuation, outcome.clone());
        }
        true
    }

    /// Adds a waiter under the state lock; the caller has already checked
    /// that the state is pending while holding that same lock.
    pub(crate) fn push_waiter(&self, continuation: Continuation<T, E>) {
        self.waiters
            .lock()
            .trace_expect("Failed to lock mutex")
            .push(continuation);
    }
}

impl<T, E> Drop for ProducerCore<T, E> {
    fn drop(&mut self) {
        let waiters = self.waiters.get_mut().trace_expect("Failed to lock mutex");
        if !waiters.is_empty() {
            // Source released unresolved: the future stays pending forever.
            trace!(count = waiters.len(), "dropping unfired continuations");
        }
    }
}
