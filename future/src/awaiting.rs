//! `await` integration: an adapter from the continuation engine onto
//! `std::future::Future`, so runtime-based hosts can `.await` an observer
//! handle. The adapter registers a single continuation on first poll — it is
//! a bridge, not a scheduler.

use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Poll, Waker};
use trace_err::*;

use crate::Future;
use crate::core::{Continuation, Fired};

struct AwaitState<T, E> {
    outcome: Option<Result<T, E>>,
    waker: Option<Waker>,
}

/// The `IntoFuture` adapter for a [`Future`] handle.
///
/// Resolves to the handle's outcome. A future whose producer was abandoned
/// never resolves, so awaiting it pends forever — the same observable
/// behavior the continuation API gives.
pub struct Awaiting<T, E> {
    handle: Future<T, E>,
    state: Arc<Mutex<AwaitState<T, E>>>,
    registered: bool,
}

impl<T, E> IntoFuture for Future<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    type Output = Result<T, E>;
    type IntoFuture = Awaiting<T, E>;

    fn into_future(self) -> Awaiting<T, E> {
        Awaiting {
            handle: self,
            state: Arc::new(Mutex::new(AwaitState {
                outcome: None,
                waker: None,
            })),
            registered: false,
        }
    }
}

impl<T, E> std::future::Future for Awaiting<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if !this.registered {
            this.registered = true;
            let state = this.state.clone();
            this.handle.register(Continuation {
                target: None,
                guard: None,
                run: Box::new(move |fired| {
                    if let Fired::Outcome(outcome) = fired {
                        let waker = {
                            let mut state = state.lock().trace_expect("Failed to lock mutex");
                            state.outcome = Some(outcome);
                            state.waker.take()
                        };
                        if let Some(waker) = waker {
                            waker.wake();
                        }
                    }
                }),
            });
        }

        let mut state = this.state.lock().trace_expect("Failed to lock mutex");
        match state.outcome.take() {
            Some(outcome) => Poll::Ready(outcome),
            None => {
                state.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::FutureSource;
    use crate::test_util::TestError;
    use crate::future::Future as TrothFuture;

    #[tokio::test]
    async fn awaiting_an_already_resolved_future() {
        let ready = TrothFuture::<u32, TestError>::with_value(8);
        assert_eq!(ready.await, Ok(8));
    }

    #[tokio::test]
    async fn awaiting_a_future_resolved_from_another_thread() {
        let source = FutureSource::<u32, TestError>::new();
        let future = source.future();

        std::thread::spawn(move || {
            source.try_set_value(42);
        });

        assert_eq!(future.await, Ok(42));
    }

    #[tokio::test]
    async fn awaiting_a_failure() {
        let failed = TrothFuture::<u32, TestError>::with_error(TestError::Boom);
        assert_eq!(failed.await, Err(TestError::Boom));
    }
}
