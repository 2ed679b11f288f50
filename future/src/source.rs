use std::sync::Arc;

use crate::Future;
use crate::core::{Continuation, Fired, ProducerCore};

/// Producer handle that resolves a paired [`Future`] exactly once.
///
/// Sources are cheap to clone so independent completion paths (a real result,
/// a timeout, a cancellation) can race; the first `try_set_*` to take effect
/// wins and the rest report `false`. The source is the sole strong owner of
/// the continuations registered on its future: dropping every handle without
/// resolving discards them unrun and leaves the future pending forever.
///
/// # Ownership
///
/// Consumers can never leak memory by wiring continuations into cycles —
/// observer handles reference the producer only weakly. The one cycle *not*
/// broken automatically is a producer capturing its own `FutureSource` inside
/// a continuation registered on that source's future.
pub struct FutureSource<T, E> {
    core: Arc<ProducerCore<T, E>>,
}

impl<T, E> Clone for FutureSource<T, E> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<T, E> FutureSource<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            core: Arc::new(ProducerCore::new()),
        }
    }

    /// An observer handle for this source's resolution.
    pub fn future(&self) -> Future<T, E> {
        Future {
            shared: self.core.shared.clone(),
            producer: Arc::downgrade(&self.core),
        }
    }

    /// Attempts the one `Pending → Resolved` transition.
    ///
    /// Returns whether this call took effect; losing a race with another
    /// completion path is not an error.
    pub fn try_set(&self, outcome: Result<T, E>) -> bool {
        self.core.resolve(outcome)
    }

    /// Attempts to resolve with a result.
    pub fn try_set_value(&self, value: T) -> bool {
        self.try_set(Ok(value))
    }

    /// Attempts to resolve with a failure.
    pub fn try_set_error(&self, error: E) -> bool {
        self.try_set(Err(error))
    }

    /// Adopts `inner`'s eventual outcome instead of storing a future as a
    /// value: whatever `inner` resolves to, this source resolves to.
    ///
    /// Returns `false` if this source is already resolved. Adoption is a
    /// subscription, not a transition — a direct `try_set_*` racing the
    /// adopted outcome can still win; first writer stands. One nesting layer
    /// is peeled per adoption, so chains collapse iteratively through the
    /// trampoline no matter how deep.
    pub fn try_adopt(&self, inner: Future<T, E>) -> bool {
        if self.is_resolved() {
            return false;
        }

        let source = self.clone();
        inner.register(Continuation {
            target: None,
            guard: None,
            run: Box::new(move |fired| {
                if let Fired::Outcome(outcome) = fired {
                    source.try_set(outcome);
                }
            }),
        });
        true
    }

    pub fn is_resolved(&self) -> bool {
        self.future().is_resolved()
    }
}

impl<T, E> Default for FutureSource<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> std::fmt::Debug for FutureSource<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FutureSource")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::TestError;
    use std::sync::{Barrier, Mutex};

    #[test]
    fn only_the_first_resolution_takes_effect() {
        let source = FutureSource::<u32, TestError>::new();
        let future = source.future();

        assert!(source.try_set_value(1));
        assert!(!source.try_set_value(2));
        assert!(!source.try_set_error(TestError::Boom));
        assert_eq!(future.value(), Some(1));
    }

    #[test]
    fn racing_producers_resolve_exactly_once() {
        for _ in 0..50 {
            let source = FutureSource::<usize, TestError>::new();
            let future = source.future();

            let barrier = Arc::new(Barrier::new(8));
            let winners: Vec<Option<usize>> = (0..8)
                .map(|i| {
                    let source = source.clone();
                    let barrier = barrier.clone();
                    std::thread::spawn(move || {
                        barrier.wait();
                        source.try_set_value(i).then_some(i)
                    })
                })
                .collect::<Vec<_>>()
                .into_iter()
                .map(|t| t.join().unwrap())
                .collect();

            let won: Vec<usize> = winners.into_iter().flatten().collect();
            assert_eq!(won.len(), 1);
            assert_eq!(future.value(), Some(won[0]));
        }
    }

    #[test]
    fn registration_after_resolution_behaves_like_before() {
        let before = Arc::new(Mutex::new(None));
        let after = Arc::new(Mutex::new(None));

        let source = FutureSource::<u32, TestError>::new();
        let future = source.future();

        let out = before.clone();
        future.then(move |n| {
            *out.lock().unwrap() = Some(n);
        });

        source.try_set_value(4);

        let out = after.clone();
        future.then(move |n| {
            *out.lock().unwrap() = Some(n);
        });

        assert_eq!(*before.lock().unwrap(), Some(4));
        assert_eq!(*after.lock().unwrap(), Some(4));
    }

    #[test]
    fn abandoned_source_leaves_the_future_pending() {
        let source = FutureSource::<u32, TestError>::new();
        let future = source.future();

        let ran = Arc::new(Mutex::new(false));
        let flag = ran.clone();
        let chained = future.then(move |_| {
            *flag.lock().unwrap() = true;
        });

        drop(source);
        assert!(!future.is_resolved());
        assert!(!chained.is_resolved());
        assert!(!*ran.lock().unwrap());
    }

    #[test]
    fn adoption_takes_the_inner_outcome() {
        let outer = FutureSource::<u32, TestError>::new();
        let inner = FutureSource::<u32, TestError>::new();

        assert!(outer.try_adopt(inner.future()));
        assert!(!outer.is_resolved());

        inner.try_set_value(11);
        assert_eq!(outer.future().value(), Some(11));
    }

    #[test]
    fn adoption_of_an_already_resolved_inner() {
        let outer = FutureSource::<u32, TestError>::new();
        assert!(outer.try_adopt(Future::with_error(TestError::Boom)));
        assert_eq!(outer.future().error(), Some(TestError::Boom));
    }

    #[test]
    fn adopting_onto_a_resolved_source_reports_failure() {
        let outer = FutureSource::<u32, TestError>::new();
        outer.try_set_value(1);
        assert!(!outer.try_adopt(Future::with_value(2)));
        assert_eq!(outer.future().value(), Some(1));
    }

    #[test]
    fn adoption_chains_collapse_iteratively() {
        // A dynamic chain of adoptions is the runtime shape of deep nesting;
        // resolving the innermost source must not consume a stack frame per
        // layer.
        let root = FutureSource::<u32, TestError>::new();
        let observed = root.future();

        let mut innermost = root;
        for _ in 0..10_000 {
            let next = FutureSource::<u32, TestError>::new();
            assert!(innermost.try_adopt(next.future()));
            innermost = next;
        }

        innermost.try_set_value(99);
        assert_eq!(observed.value(), Some(99));
    }
}
