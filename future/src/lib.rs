//! Thread-affine future/promise primitives with cooperative cancellation.
//!
//! A [`FutureSource`] resolves its paired [`Future`] exactly once, with a
//! result or a failure; consumers chain continuations with [`then`],
//! [`catch`] and [`finally`], collect groups with [`all`] and [`any`], and
//! bound any of it with a [`CancelToken`] via [`until`] or a guarded
//! [`Bind`]. Nested futures collapse automatically — a continuation
//! returning a future ([`then_future`]) resolves with that future's outcome,
//! never with a future as a value.
//!
//! [`then`]: Future::then
//! [`catch`]: Future::catch
//! [`finally`]: Future::finally
//! [`all`]: Future::all
//! [`any`]: Future::any
//! [`until`]: Future::until
//! [`then_future`]: Future::then_future
//!
//! # Dispatch
//!
//! Continuations registered while running on the host's registered main
//! context are dispatched back to main before they run, wherever the
//! producer resolves; continuations registered elsewhere run through the
//! trampoline of the resolving thread. Guard tokens are re-checked once,
//! after the context switch, so main-context code that has observed a token
//! as cancelled will see no further guarded continuation fire there.
//!
//! # Ownership
//!
//! Observer handles never keep producers alive. The producer core owns every
//! pending continuation, so consumer-side closure cycles are reclaimed the
//! moment the producing source goes away; see [`FutureSource`] for the one
//! cycle producers must avoid themselves.
//!
//! # Example
//!
//! ```
//! use troth_future::{Future, FutureSource};
//!
//! let source = FutureSource::<u32, String>::new();
//! let doubled = source.future().then(|n| n * 2);
//!
//! source.try_set_value(21);
//! assert_eq!(doubled.value(), Some(42));
//! ```

mod awaiting;
mod bind;
mod chain;
mod combine;
mod core;
mod future;
mod source;

pub use awaiting::Awaiting;
pub use bind::Bind;
pub use future::Future;
pub use source::FutureSource;

// Re-export the collaborator surface for convenience
pub use troth_cancel::{CancelToken, CancelTokenSource, Cancelled};
pub use troth_dispatch::{Context, ExecutionContext};

#[cfg(test)]
pub(crate) mod test_util {
    use troth_cancel::Cancelled;

    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    pub(crate) enum TestError {
        #[error("boom")]
        Boom,
        #[error(transparent)]
        Cancelled(#[from] Cancelled),
    }
}
