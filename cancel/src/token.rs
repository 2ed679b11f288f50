use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::trace;
use troth_dispatch::{Context, dispatch, sticky};

use crate::CancelTokenSource;
use crate::source::{Core, Waiter};

/// Observer handle for a one-shot, monotonic cancellation signal.
///
/// Tokens are cheap to clone and never keep their source alive: the shared
/// flag cell outlives the source (so `is_cancelled` stays accurate after the
/// producer is gone), while the registration path goes through a weak
/// reference and simply abandons callbacks once the source has been released
/// without cancelling.
#[derive(Clone)]
pub struct CancelToken {
    inner: Inner,
}

#[derive(Clone)]
enum Inner {
    /// The "no cancellation" sentinel; never cancels.
    Immortal,
    Backed {
        flag: Arc<AtomicBool>,
        core: Weak<Core>,
    },
}

impl CancelToken {
    /// The never-cancellable sentinel token.
    pub fn immortal() -> Self {
        Self {
            inner: Inner::Immortal,
        }
    }

    pub(crate) fn backed(core: &Arc<Core>) -> Self {
        Self {
            inner: Inner::Backed {
                flag: core.flag.clone(),
                core: Arc::downgrade(core),
            },
        }
    }

    pub fn is_cancelled(&self) -> bool {
        match &self.inner {
            Inner::Immortal => false,
            Inner::Backed { flag, .. } => flag.load(Ordering::Acquire),
        }
    }

    /// Registers `callback` to run once when this token cancels.
    ///
    /// Registered from the main context, the callback is dispatched back to
    /// main; registered anywhere else, it runs through the trampoline of
    /// whichever thread cancels. Already cancelled? The callback is scheduled
    /// immediately — never invoked synchronously in this call's frame. Never
    /// cancellable (immortal token, or source already released)? The callback
    /// is dropped unrun.
    pub fn when_cancelled(&self, callback: impl FnOnce() + Send + 'static) {
        self.register(sticky(None), Box::new(callback));
    }

    /// As [`when_cancelled`](Self::when_cancelled), pinned to an explicit
    /// execution context.
    pub fn when_cancelled_on(&self, context: &Context, callback: impl FnOnce() + Send + 'static) {
        self.register(Some(context.clone()), Box::new(callback));
    }

    /// As [`when_cancelled`](Self::when_cancelled), but never pinned to the
    /// main context: the callback runs through the trampoline of whichever
    /// thread cancels.
    ///
    /// Links between primitives use this — prompt firing matters more than
    /// affinity there. Host callbacks normally want `when_cancelled`.
    pub fn when_cancelled_inline(&self, callback: impl FnOnce() + Send + 'static) {
        self.register(None, Box::new(callback));
    }

    /// Registration primitive. Internal plumbing passes `target: None` to
    /// stay off the main-context affinity path.
    pub(crate) fn register(&self, target: Option<Context>, callback: Box<dyn FnOnce() + Send>) {
        match &self.inner {
            Inner::Immortal => {
                // Never fires.
            }
            Inner::Backed { flag, core } => match core.upgrade() {
                Some(core) => core.register(Waiter { target, callback }),
                None if flag.load(Ordering::Acquire) => {
                    // Cancelled, then released: late registrations still fire.
                    dispatch(target.as_ref(), callback);
                }
                None => {
                    trace!("cancellation callback registered on a dead token; dropping");
                }
            },
        }
    }

    /// A derived token that cancels as soon as either input cancels.
    ///
    /// No new public source: each input owns a link that cancels a shared
    /// internal core, first caller wins. An immortal input contributes
    /// nothing, so the other input is returned as-is.
    pub fn first_of(a: &CancelToken, b: &CancelToken) -> CancelToken {
        match (matches!(a.inner, Inner::Immortal), matches!(b.inner, Inner::Immortal)) {
            (true, true) => CancelToken::immortal(),
            (true, false) => b.clone(),
            (false, true) => a.clone(),
            (false, false) => {
                let core = Arc::new(Core::new());
                let token = CancelToken::backed(&core);

                for input in [a, b] {
                    let link = core.clone();
                    input.register(
                        None,
                        Box::new(move || {
                            link.cancel();
                        }),
                    );
                }
                token
            }
        }
    }

    /// A derived token that cancels only once both inputs have cancelled.
    ///
    /// An immortal input can never cancel, so the conjunction is immortal.
    pub fn last_of(a: &CancelToken, b: &CancelToken) -> CancelToken {
        if matches!(a.inner, Inner::Immortal) || matches!(b.inner, Inner::Immortal) {
            return CancelToken::immortal();
        }

        let core = Arc::new(Core::new());
        let token = CancelToken::backed(&core);

        let remaining = Arc::new(AtomicUsize::new(2));
        for input in [a, b] {
            let link = core.clone();
            let remaining = remaining.clone();
            input.register(
                None,
                Box::new(move || {
                    if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                        link.cancel();
                    }
                }),
            );
        }
        token
    }

    /// A child source cancelled by this token, whose own `cancel()` does not
    /// propagate back up.
    pub fn child_source(&self) -> CancelTokenSource {
        let child = CancelTokenSource::new();
        let link = child.core().clone();
        self.register(
            None,
            Box::new(move || {
                link.cancel();
            }),
        );
        child
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.inner {
            Inner::Immortal => "immortal",
            Inner::Backed { .. } => "backed",
        };
        f.debug_struct("CancelToken")
            .field("kind", &kind)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
