use crate::{ContextId, ExecutionContext, Job, enter, trampoline};
use std::sync::Arc;

/// An execution context that runs jobs on whichever thread submits them.
///
/// Jobs go through the submitting thread's trampoline, so `run` still returns
/// before the job executes when called from inside another job, and chained
/// submissions stay iterative. There is no cross-thread ordering: two threads
/// submitting to the same `InlineContext` each drain their own queue.
///
/// Useful as a test stand-in for a real context, or where the host genuinely
/// wants "run here, stack-safely".
#[derive(Debug)]
pub struct InlineContext {
    id: ContextId,
}

impl InlineContext {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: ContextId::next(),
        })
    }
}

impl ExecutionContext for InlineContext {
    fn context_id(&self) -> ContextId {
        self.id
    }

    fn run(&self, job: Job) {
        let id = self.id;
        trampoline::run_soon(Box::new(move || enter(id, job)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::current_context_id;
    use std::sync::Mutex;

    #[test]
    fn runs_on_submitting_thread_with_identity() {
        let cx = InlineContext::new();
        let id = cx.context_id();

        let seen = Arc::new(Mutex::new(None));
        let out = seen.clone();
        cx.run(Box::new(move || {
            *out.lock().unwrap() = current_context_id();
        }));

        assert_eq!(*seen.lock().unwrap(), Some(id));
        assert_eq!(current_context_id(), None);
    }
}
