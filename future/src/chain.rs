//! The continuation algebra: `then`, `catch`, `finally` and their
//! context-pinned and guarded variants.
//!
//! Every method here derives a new future whose source is owned by the
//! continuation registered on the receiver — so a chain's intermediate
//! sources live exactly as long as the upstream producer can still fire
//! them, and an abandoned upstream leaves the whole chain pending without
//! leaking it.

use troth_cancel::Cancelled;
use troth_dispatch::{Context, sticky};

use crate::core::{Continuation, Fired};
use crate::{Bind, Future, FutureSource};

impl<T, E> Future<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Shared shape of the unguarded chain methods: register a continuation
    /// that feeds a fresh source.
    fn derive<U, F>(&self, target: Option<Context>, apply: F) -> Future<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(Result<T, E>, FutureSource<U, E>) + Send + 'static,
    {
        let source = FutureSource::new();
        let derived = source.future();

        self.register(Continuation {
            target,
            guard: None,
            run: Box::new(move |fired| {
                if let Fired::Outcome(outcome) = fired {
                    apply(outcome, source);
                }
            }),
        });
        derived
    }

    /// Transforms a result; failures propagate without running `f`.
    ///
    /// Registered from the main context, `f` is dispatched back to main even
    /// if the future resolves on another thread.
    pub fn then<U, F>(&self, f: F) -> Future<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.then_with(sticky(None), f)
    }

    /// As [`then`](Self::then), pinned to an explicit context.
    pub fn then_on<U, F>(&self, context: &Context, f: F) -> Future<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.then_with(Some(context.clone()), f)
    }

    fn then_with<U, F>(&self, target: Option<Context>, f: F) -> Future<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.derive(target, move |outcome, source| match outcome {
            Ok(value) => {
                source.try_set_value(f(value));
            }
            Err(error) => {
                source.try_set_error(error);
            }
        })
    }

    /// As [`then`](Self::then), with full dispatch options: an explicit
    /// context and/or a guard token.
    ///
    /// If the guard cancels before `f` runs — checked once, after the
    /// context switch — `f` is skipped and the derived future resolves with
    /// `Cancelled`; if it cancels before the receiver even resolves, the
    /// derived future resolves cancelled immediately.
    pub fn then_bind<U, F>(&self, bind: Bind, f: F) -> Future<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
        E: From<Cancelled>,
    {
        let source = FutureSource::new();
        let derived = source.future();

        if let Some(token) = &bind.until {
            let cancel_path = source.clone();
            token.when_cancelled_inline(move || {
                cancel_path.try_set_error(Cancelled.into());
            });
        }

        self.register(Continuation {
            target: sticky(bind.context),
            guard: bind.until,
            run: Box::new(move |fired| match fired {
                Fired::Outcome(Ok(value)) => {
                    source.try_set_value(f(value));
                }
                Fired::Outcome(Err(error)) => {
                    source.try_set_error(error);
                }
                Fired::GuardCancelled => {
                    source.try_set_error(Cancelled.into());
                }
            }),
        });
        derived
    }

    /// Chains an asynchronous step: `f`'s returned future is adopted, so the
    /// derived future resolves with *its* outcome (collapsed, never a
    /// future-as-value).
    pub fn then_future<U, F>(&self, f: F) -> Future<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Future<U, E> + Send + 'static,
    {
        self.then_future_with(sticky(None), f)
    }

    /// As [`then_future`](Self::then_future), pinned to an explicit context.
    pub fn then_future_on<U, F>(&self, context: &Context, f: F) -> Future<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Future<U, E> + Send + 'static,
    {
        self.then_future_with(Some(context.clone()), f)
    }

    fn then_future_with<U, F>(&self, target: Option<Context>, f: F) -> Future<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Future<U, E> + Send + 'static,
    {
        self.derive(target, move |outcome, source| match outcome {
            Ok(value) => {
                source.try_adopt(f(value));
            }
            Err(error) => {
                source.try_set_error(error);
            }
        })
    }

    /// Handles a failure; results propagate without running `f`.
    ///
    /// The handler returns a `Result` so it can recover (`Ok`) or rethrow —
    /// the same failure or a new one (`Err`).
    pub fn catch<F>(&self, f: F) -> Future<T, E>
    where
        F: FnOnce(E) -> Result<T, E> + Send + 'static,
    {
        self.catch_with(sticky(None), f)
    }

    /// As [`catch`](Self::catch), pinned to an explicit context.
    pub fn catch_on<F>(&self, context: &Context, f: F) -> Future<T, E>
    where
        F: FnOnce(E) -> Result<T, E> + Send + 'static,
    {
        self.catch_with(Some(context.clone()), f)
    }

    fn catch_with<F>(&self, target: Option<Context>, f: F) -> Future<T, E>
    where
        F: FnOnce(E) -> Result<T, E> + Send + 'static,
    {
        self.derive(target, move |outcome, source| match outcome {
            Ok(value) => {
                source.try_set_value(value);
            }
            Err(error) => {
                source.try_set(f(error));
            }
        })
    }

    /// Runs `f` on either outcome, then forwards the outcome unchanged.
    pub fn finally<F>(&self, f: F) -> Future<T, E>
    where
        F: FnOnce() + Send + 'static,
    {
        self.finally_with(sticky(None), f)
    }

    /// As [`finally`](Self::finally), pinned to an explicit context.
    pub fn finally_on<F>(&self, context: &Context, f: F) -> Future<T, E>
    where
        F: FnOnce() + Send + 'static,
    {
        self.finally_with(Some(context.clone()), f)
    }

    fn finally_with<F>(&self, target: Option<Context>, f: F) -> Future<T, E>
    where
        F: FnOnce() + Send + 'static,
    {
        self.derive(target, move |outcome, source| {
            f();
            source.try_set(outcome);
        })
    }
}
