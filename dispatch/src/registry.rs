//! The process-wide main-context slot.
//!
//! Hosts with a distinguished "main" thread (UI loops, single-threaded
//! servers) register its context here once at startup. The future and
//! cancellation crates consult [`on_main_context`] at callback registration
//! time: a callback registered from main is dispatched back to main before it
//! runs, no matter which thread later fires its trigger.

use spin::RwLock;

use crate::{Context, current_context_id};

// Set once at startup, read on every registration from a context thread.
static MAIN: RwLock<Option<Context>> = RwLock::new(None);

/// Registers `context` as the process-wide main context, replacing any
/// previous registration.
pub fn set_main_context(context: Context) {
    *MAIN.write() = Some(context);
}

/// The registered main context, if any.
pub fn main_context() -> Option<Context> {
    MAIN.read().clone()
}

/// Whether the calling code is currently running a job on the registered main
/// context.
pub fn on_main_context() -> bool {
    match current_context_id() {
        Some(current) => MAIN
            .read()
            .as_ref()
            .is_some_and(|main| main.context_id() == current),
        None => false,
    }
}
