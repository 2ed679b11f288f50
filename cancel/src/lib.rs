//! One-shot cooperative cancellation for the troth primitives.
//!
//! A [`CancelTokenSource`] owns an `Active → Cancelled` transition and the
//! list of callbacks registered against it; its [`CancelToken`]s are cheap
//! observer handles. Cancellation is advisory: it never preempts running
//! work, it only flips the monotonic flag, fires each registered callback
//! exactly once, and lets cancellable operations decline to start.
//!
//! Tokens hold only a weak reference back to their source, so a callback
//! closure capturing tokens (even cyclically) is reclaimed as soon as the
//! source is released — see the ownership notes on [`CancelTokenSource`].
//!
//! # Example
//!
//! ```
//! use troth_cancel::CancelTokenSource;
//!
//! let source = CancelTokenSource::new();
//! let token = source.token();
//!
//! token.when_cancelled(|| println!("stop work"));
//!
//! assert!(!token.is_cancelled());
//! source.cancel();
//! assert!(token.is_cancelled());
//! ```

mod error;
mod source;
mod token;

pub use error::Cancelled;
pub use source::CancelTokenSource;
pub use token::CancelToken;
