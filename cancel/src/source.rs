use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use trace_err::*;
use tracing::trace;
use troth_dispatch::{Context, dispatch};

use crate::CancelToken;

pub(crate) struct Waiter {
    /// `None` dispatches through the trampoline of whichever thread cancels.
    pub(crate) target: Option<Context>,
    pub(crate) callback: Box<dyn FnOnce() + Send>,
}

/// The producer-owned half of a token: the flag transition plus the sole
/// strong owner of the registered callbacks.
///
/// The flag cell is shared with every token handle so the terminal state
/// outlives this core; the callbacks die with it.
pub(crate) struct Core {
    pub(crate) flag: Arc<AtomicBool>,
    waiters: Mutex<Vec<Waiter>>,
}

impl Core {
    pub(crate) fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            waiters: Mutex::new(Vec::new()),
        }
    }

    /// Registers `waiter`, or schedules it immediately if already cancelled.
    ///
    /// The flag is only ever set while the waiter list is locked, so a
    /// registration racing a `cancel` either lands in the list the canceller
    /// drains or observes the flag and self-dispatches — never neither.
    pub(crate) fn register(&self, waiter: Waiter) {
        {
            let mut waiters = self.waiters.lock().trace_expect("Failed to lock mutex");
            if !self.flag.load(Ordering::Acquire) {
                waiters.push(waiter);
                return;
            }
        }
        let Waiter { target, callback } = waiter;
        dispatch(target.as_ref(), callback);
    }

    /// The one `Active → Cancelled` transition. Returns whether this call won.
    pub(crate) fn cancel(&self) -> bool {
        let drained = {
            let mut waiters = self.waiters.lock().trace_expect("Failed to lock mutex");
            if self.flag.swap(true, Ordering::AcqRel) {
                return false;
            }
            std::mem::take(&mut *waiters)
        };

        // No registration order guarantee; each callback fires exactly once.
        for Waiter { target, callback } in drained {
            dispatch(target.as_ref(), callback);
        }
        true
    }
}

impl Drop for Core {
    fn drop(&mut self) {
        let waiters = self.waiters.get_mut().trace_expect("Failed to lock mutex");
        if !waiters.is_empty() {
            // Source released while still active: these can never fire now.
            trace!(
                count = waiters.len(),
                "dropping unfired cancellation callbacks"
            );
        }
    }
}

/// Producer handle that triggers cancellation exactly once.
///
/// # Ownership
///
/// The source is the only strong owner of the callbacks registered on its
/// tokens. Dropping it without cancelling discards them unrun and leaves the
/// tokens permanently active. Consumers can therefore wire callbacks into
/// arbitrary cycles without leaking — the one cycle *not* broken
/// automatically is a producer capturing its own `CancelTokenSource` inside a
/// callback registered on that source's token.
pub struct CancelTokenSource {
    core: Arc<Core>,
}

impl CancelTokenSource {
    pub fn new() -> Self {
        Self {
            core: Arc::new(Core::new()),
        }
    }

    /// An observer handle for this source's signal.
    pub fn token(&self) -> CancelToken {
        CancelToken::backed(&self.core)
    }

    /// Transitions `Active → Cancelled` and fires every registered callback
    /// exactly once.
    ///
    /// Idempotent: returns whether this call took effect. Callbacks are
    /// scheduled (through their registered context, or the calling thread's
    /// trampoline), never invoked synchronously in the caller's frame.
    pub fn cancel(&self) -> bool {
        self.core.cancel()
    }

    pub fn is_cancelled(&self) -> bool {
        self.core.flag.load(Ordering::Acquire)
    }

    pub(crate) fn core(&self) -> &Arc<Core> {
        &self.core
    }
}

impl Default for CancelTokenSource {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelTokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelTokenSource")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn cancel_is_idempotent() {
        let source = CancelTokenSource::new();

        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        source.token().when_cancelled(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });

        assert!(source.cancel());
        assert!(!source.cancel());
        assert!(!source.cancel());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn racing_cancels_fire_callbacks_once() {
        for _ in 0..50 {
            let source = Arc::new(CancelTokenSource::new());

            let hits = Arc::new(AtomicUsize::new(0));
            for _ in 0..4 {
                let h = hits.clone();
                source.token().when_cancelled(move || {
                    h.fetch_add(1, Ordering::SeqCst);
                });
            }

            let winners: usize = (0..8)
                .map(|_| {
                    let source = source.clone();
                    std::thread::spawn(move || source.cancel() as usize)
                })
                .collect::<Vec<_>>()
                .into_iter()
                .map(|t| t.join().unwrap())
                .sum();

            assert_eq!(winners, 1);
            assert_eq!(hits.load(Ordering::SeqCst), 4);
        }
    }

    #[test]
    fn dropping_an_active_source_discards_callbacks() {
        let source = CancelTokenSource::new();
        let token = source.token();

        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        token.when_cancelled(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });

        drop(source);
        assert!(!token.is_cancelled());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
