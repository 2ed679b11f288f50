use std::sync::{Arc, Weak};
use trace_err::*;
use tracing::trace;
use troth_cancel::{CancelToken, Cancelled};

use crate::FutureSource;
use crate::core::{Continuation, Fired, ProducerCore, Shared, State, fire};

/// Observer handle for a value or failure not yet known.
///
/// A future is either `Pending` or terminally `Resolved` with exactly one of
/// a result or a failure. Handles are cheap to clone; every clone (and every
/// future derived from it) observes the same underlying resolution, each
/// observer receiving its own clone of the outcome.
///
/// Holding a future never keeps its [`FutureSource`] alive: the handle owns
/// the resolution cell strongly but the producer — and with it every pending
/// continuation — only weakly. A producer that goes away unresolved leaves
/// the future pending forever and its continuations unrun.
pub struct Future<T, E> {
    pub(crate) shared: Arc<Shared<T, E>>,
    pub(crate) producer: Weak<ProducerCore<T, E>>,
}

impl<T, E> Clone for Future<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            producer: self.producer.clone(),
        }
    }
}

impl<T, E> Future<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// An already-resolved future.
    pub fn ready(outcome: Result<T, E>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: std::sync::Mutex::new(State::Resolved(outcome)),
            }),
            producer: Weak::new(),
        }
    }

    /// An already-resolved future holding a result.
    pub fn with_value(value: T) -> Self {
        Self::ready(Ok(value))
    }

    /// An already-resolved future holding a failure.
    pub fn with_error(error: E) -> Self {
        Self::ready(Err(error))
    }

    /// A future that never resolves.
    pub fn never() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: std::sync::Mutex::new(State::Pending),
            }),
            producer: Weak::new(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(
            *self.shared.state.lock().trace_expect("Failed to lock mutex"),
            State::Resolved(_)
        )
    }

    /// The outcome, if resolved.
    pub fn result(&self) -> Option<Result<T, E>> {
        match &*self.shared.state.lock().trace_expect("Failed to lock mutex") {
            State::Pending => None,
            State::Resolved(outcome) => Some(outcome.clone()),
        }
    }

    /// The result value, if resolved with one.
    pub fn value(&self) -> Option<T> {
        self.result().and_then(Result::ok)
    }

    /// The failure, if resolved with one.
    pub fn error(&self) -> Option<E> {
        self.result().and_then(|r| r.err())
    }

    /// Registration primitive: run `continuation` when this future resolves.
    ///
    /// Registering on an already-resolved future behaves exactly as if the
    /// registration had happened before resolution: the continuation is
    /// scheduled now instead of later. Registering on an abandoned pending
    /// future drops the continuation unrun.
    pub(crate) fn register(&self, continuation: Continuation<T, E>) {
        let outcome = {
            let state = self.shared.state.lock().trace_expect("Failed to lock mutex");
            match &*state {
                State::Resolved(outcome) => outcome.clone(),
                State::Pending => {
                    match self.producer.upgrade() {
                        Some(core) => {
                            // Still holding the state lock: a racing resolve
                            // cannot drain between our check and this push.
                            core.push_waiter(continuation);
                        }
                        None => {
                            trace!("continuation registered on an abandoned future; dropping");
                        }
                    }
                    return;
                }
            }
        };
        fire(continuation, outcome);
    }

    /// A future that resolves with this future's outcome, unless `token`
    /// cancels first — in which case it resolves with `Cancelled` and any
    /// continuation chained after it never runs.
    ///
    /// Cancellation is cooperative: the underlying producer keeps running;
    /// only this observation of it is cut short.
    pub fn until(&self, token: &CancelToken) -> Future<T, E>
    where
        E: From<Cancelled>,
    {
        let source = FutureSource::new();
        let derived = source.future();

        // The link owns the derived source strongly, so a token firing after
        // the upstream producer abandoned its source still resolves this
        // future as cancelled.
        let cancel_path = source.clone();
        token.when_cancelled_inline(move || {
            cancel_path.try_set_error(Cancelled.into());
        });

        self.register(Continuation {
            target: None,
            guard: None,
            run: Box::new(move |fired| {
                if let Fired::Outcome(outcome) = fired {
                    source.try_set(outcome);
                }
            }),
        });
        derived
    }
}

impl<T, E> Future<Future<T, E>, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Collapses one level of nesting: the returned future adopts the inner
    /// future's eventual outcome.
    ///
    /// Each `flatten` peels exactly one layer and registers O(1) work;
    /// already-resolved layers unwind through the calling thread's
    /// trampoline, so even pathological nesting depths resolve iteratively
    /// rather than recursively.
    pub fn flatten(&self) -> Future<T, E> {
        let source = FutureSource::new();
        let derived = source.future();

        self.register(Continuation {
            target: None,
            guard: None,
            run: Box::new(move |fired| {
                if let Fired::Outcome(outcome) = fired {
                    match outcome {
                        Ok(inner) => {
                            source.try_adopt(inner);
                        }
                        Err(e) => {
                            source.try_set_error(e);
                        }
                    }
                }
            }),
        });
        derived
    }
}

impl<T, E> std::fmt::Debug for Future<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &*self.shared.state.lock().trace_expect("Failed to lock mutex") {
            State::Pending => "pending",
            State::Resolved(Ok(_)) => "resolved",
            State::Resolved(Err(_)) => "failed",
        };
        f.debug_struct("Future").field("state", &state).finish()
    }
}
