use thiserror::Error;

/// The distinguished "operation cancelled" failure.
///
/// An operation whose cancellation token fires before it resolves fails with
/// this value, observable like any other failure. Host error enums embed it
/// with `#[from]` so cancellable operations can bound `E: From<Cancelled>`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[error("operation cancelled")]
pub struct Cancelled;
