//! One-shot cancellation signal shared between an engine and its threads.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// A flag that is fired once and can be waited on, with or without a timeout.
///
/// Every delay inside the engines is a [`Signal::wait_timeout`], so firing the
/// signal interrupts in-flight sleeps instead of waiting them out.
#[derive(Debug, Default)]
pub(crate) struct Signal {
    fired: Mutex<bool>,
    cond: Condvar,
}

impl Signal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    // A poisoned flag is still a valid bool.
    fn flag(&self) -> MutexGuard<'_, bool> {
        self.fired.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fire the signal and wake every waiter. Idempotent.
    pub(crate) fn fire(&self) {
        *self.flag() = true;
        self.cond.notify_all();
    }

    pub(crate) fn is_fired(&self) -> bool {
        *self.flag()
    }

    /// Block until the signal fires.
    pub(crate) fn wait(&self) {
        let mut fired = self.flag();
        while !*fired {
            fired = self.cond.wait(fired).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Sleep for `timeout` unless the signal fires first.
    ///
    /// Returns `true` if the signal fired.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut fired = self.flag();
        while !*fired {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            fired = self
                .cond
                .wait_timeout(fired, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }
}
