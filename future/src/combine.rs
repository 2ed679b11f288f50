//! Collection combinators over groups of futures.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use trace_err::*;

use crate::core::{Continuation, Fired};
use crate::{Future, FutureSource};

impl<T, E> Future<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// A future of every member's result, in input order, resolved once all
    /// members resolve with results.
    ///
    /// A failing member fails the whole collection. For members that are
    /// already resolved the first failed member *in input order* wins
    /// deterministically; for members failing concurrently the first
    /// `Pending → Resolved` transition wins and the order is unspecified.
    /// Members left pending by an abandoned producer leave the collection
    /// pending. An empty input resolves immediately with an empty `Vec`.
    pub fn all(futures: Vec<Future<T, E>>) -> Future<Vec<T>, E> {
        if futures.is_empty() {
            return Future::with_value(Vec::new());
        }

        let source = FutureSource::<Vec<T>, E>::new();
        let collected = source.future();

        let slots: Arc<Mutex<Vec<Option<T>>>> =
            Arc::new(Mutex::new(futures.iter().map(|_| None).collect()));
        let remaining = Arc::new(AtomicUsize::new(futures.len()));

        for (index, future) in futures.iter().enumerate() {
            let source = source.clone();
            let slots = slots.clone();
            let remaining = remaining.clone();
            future.register(Continuation {
                target: None,
                guard: None,
                run: Box::new(move |fired| {
                    let Fired::Outcome(outcome) = fired else {
                        return;
                    };
                    match outcome {
                        Ok(value) => {
                            slots.lock().trace_expect("Failed to lock mutex")[index] = Some(value);
                            if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                                let values = slots
                                    .lock()
                                    .trace_expect("Failed to lock mutex")
                                    .iter_mut()
                                    .map(|slot| {
                                        slot.take().trace_expect("member resolved without a value")
                                    })
                                    .collect();
                                source.try_set_value(values);
                            }
                        }
                        Err(error) => {
                            source.try_set_error(error);
                        }
                    }
                }),
            });
        }
        collected
    }

    /// A future of the first member to resolve, result or failure; the other
    /// members are unaffected.
    ///
    /// An empty input never resolves.
    pub fn any(futures: Vec<Future<T, E>>) -> Future<T, E> {
        if futures.is_empty() {
            return Future::never();
        }

        let source = FutureSource::new();
        let first = source.future();

        for future in &futures {
            let source = source.clone();
            future.register(Continuation {
                target: None,
                guard: None,
                run: Box::new(move |fired| {
                    if let Fired::Outcome(outcome) = fired {
                        source.try_set(outcome);
                    }
                }),
            });
        }
        first
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::TestError;

    #[test]
    fn all_collects_in_input_order() {
        let futures = vec![
            Future::<u32, TestError>::with_value(1),
            Future::with_value(2),
            Future::with_value(3),
        ];
        assert_eq!(Future::all(futures).value(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn all_resolves_once_the_last_member_does() {
        let a = FutureSource::<u32, TestError>::new();
        let b = FutureSource::<u32, TestError>::new();
        let all = Future::all(vec![a.future(), b.future()]);

        b.try_set_value(2);
        assert!(!all.is_resolved());
        a.try_set_value(1);
        assert_eq!(all.value(), Some(vec![1, 2]));
    }

    #[test]
    fn all_fails_with_the_first_failed_member_in_input_order() {
        #[derive(Debug, Clone, PartialEq, thiserror::Error)]
        #[error("tagged {0}")]
        struct Tagged(u32);

        let futures = vec![
            Future::<u32, Tagged>::with_value(1),
            Future::with_error(Tagged(2)),
            Future::with_error(Tagged(3)),
        ];
        assert_eq!(Future::all(futures).error(), Some(Tagged(2)));
    }

    #[test]
    fn all_of_nothing_is_empty() {
        let all = Future::<u32, TestError>::all(Vec::new());
        assert_eq!(all.value(), Some(Vec::new()));
    }

    #[test]
    fn all_stays_pending_while_any_member_does() {
        let pending = FutureSource::<u32, TestError>::new();
        let all = Future::all(vec![Future::with_value(1), pending.future()]);
        assert!(!all.is_resolved());
    }

    #[test]
    fn any_takes_the_first_resolution() {
        let a = FutureSource::<u32, TestError>::new();
        let b = FutureSource::<u32, TestError>::new();
        let first = Future::any(vec![a.future(), b.future()]);

        b.try_set_value(2);
        assert_eq!(first.value(), Some(2));

        // The loser's own future is unaffected.
        a.try_set_value(1);
        assert_eq!(a.future().value(), Some(1));
        assert_eq!(first.value(), Some(2));
    }

    #[test]
    fn any_passes_a_first_failure_through() {
        let a = FutureSource::<u32, TestError>::new();
        let first = Future::any(vec![a.future(), Future::never()]);

        a.try_set_error(TestError::Boom);
        assert_eq!(first.error(), Some(TestError::Boom));
    }

    #[test]
    fn any_of_nothing_never_resolves() {
        let first = Future::<u32, TestError>::any(Vec::new());
        assert!(!first.is_resolved());
    }
}
