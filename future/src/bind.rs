use troth_cancel::CancelToken;
use troth_dispatch::{Context, ExecutionContext};

/// Dispatch options captured when a continuation is registered.
///
/// The default `Bind` applies the main-context affinity rule (pin back to
/// main when registering from main, otherwise run on the resolving thread's
/// trampoline) with no guard token.
#[derive(Default, Clone)]
pub struct Bind {
    /// Explicit target context. `None` applies the affinity rule.
    pub context: Option<Context>,
    /// Guard token: if it cancels before the continuation runs, the
    /// continuation is skipped and the derived future resolves cancelled.
    /// The check happens exactly once, after the context switch, so
    /// "observed cancelled on the target context" means no further guarded
    /// continuation will fire there.
    pub until: Option<CancelToken>,
}

impl Bind {
    /// Pin to an explicit context.
    pub fn on(context: &Context) -> Self {
        Self {
            context: Some(context.clone()),
            until: None,
        }
    }

    /// Guard with a token, affinity rule unchanged.
    pub fn until(token: &CancelToken) -> Self {
        Self {
            context: None,
            until: Some(token.clone()),
        }
    }

    /// Adds a guard token to an existing bind.
    pub fn and_until(mut self, token: &CancelToken) -> Self {
        self.until = Some(token.clone());
        self
    }
}

impl std::fmt::Debug for Bind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bind")
            .field("context", &self.context.as_ref().map(|c| c.context_id()))
            .field("guarded", &self.until.is_some())
            .finish()
    }
}
