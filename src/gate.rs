//! Enablement gate supplied by the surrounding application.

use std::sync::atomic::{AtomicBool, Ordering};

/// Answers "may the engine act right now?".
///
/// Checked when an engine starts, before each dispatched sequence and on
/// every aggregator tick.
pub trait EnableGate: Send + Sync {
    fn may_run(&self) -> bool;
}

impl<F> EnableGate for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn may_run(&self) -> bool {
        self()
    }
}

impl EnableGate for AtomicBool {
    fn may_run(&self) -> bool {
        self.load(Ordering::SeqCst)
    }
}

/// Gate that always allows running.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysEnabled;

impl EnableGate for AlwaysEnabled {
    fn may_run(&self) -> bool {
        true
    }
}
