//! In-memory backend and hook used by the unit tests.

use crate::backend::InputBackend;
use crate::error::{Error, Result};
use crate::event::{HookDecision, KeyEvent};
use crate::hook::{HookHandle, KeyHandler, KeyHook};
use crate::keycode::Key;
use crate::status::Status;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// An injected input recorded by [`MockBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Press(Key),
    Release(Key),
}

/// Backend that records injections and reports a scripted physical state.
#[derive(Default)]
pub struct MockBackend {
    actions: Mutex<Vec<Action>>,
    down: Mutex<HashSet<Key>>,
    failing: AtomicBool,
    stuck: Mutex<HashSet<Key>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().unwrap().clone()
    }

    pub fn count(&self, action: Action) -> usize {
        self.actions().iter().filter(|a| **a == action).count()
    }

    /// Script whether `key` reads as physically down.
    pub fn set_down(&self, key: Key, down: bool) {
        let mut set = self.down.lock().unwrap();
        if down {
            set.insert(key);
        } else {
            set.remove(&key);
        }
    }

    /// Make every press and release fail without being recorded.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make releases of `key` fail while presses keep working.
    pub fn set_release_failing(&self, key: Key, failing: bool) {
        let mut set = self.stuck.lock().unwrap();
        if failing {
            set.insert(key);
        } else {
            set.remove(&key);
        }
    }

    /// Net presses minus releases for `key`.
    pub fn balance(&self, key: Key) -> isize {
        self.count(Action::Press(key)) as isize - self.count(Action::Release(key)) as isize
    }

    fn record(&self, action: Action) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::SimulateFailed(format!("{action:?} rejected")));
        }
        self.actions.lock().unwrap().push(action);
        Ok(())
    }
}

impl InputBackend for MockBackend {
    fn is_down(&self, key: Key) -> bool {
        self.down.lock().unwrap().contains(&key)
    }

    fn press(&self, key: Key) -> Result<()> {
        self.record(Action::Press(key))
    }

    fn release(&self, key: Key) -> Result<()> {
        if self.stuck.lock().unwrap().contains(&key) {
            return Err(Error::SimulateFailed(format!("release of {key} rejected")));
        }
        self.record(Action::Release(key))
    }
}

/// Hook that keeps the installed handler so tests can feed it events.
#[derive(Default)]
pub struct MockHook {
    handler: Arc<Mutex<Option<Arc<dyn KeyHandler>>>>,
    installs: AtomicUsize,
    uninstalls: Arc<AtomicUsize>,
    failing: AtomicBool,
}

impl MockHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn installs(&self) -> usize {
        self.installs.load(Ordering::SeqCst)
    }

    pub fn uninstalls(&self) -> usize {
        self.uninstalls.load(Ordering::SeqCst)
    }

    pub fn is_installed(&self) -> bool {
        self.handler.lock().unwrap().is_some()
    }

    /// Deliver an event to the installed handler, if any.
    pub fn send(&self, event: KeyEvent) -> Option<HookDecision> {
        let handler = self.handler.lock().unwrap().clone();
        handler.map(|h| h.handle_key(&event))
    }
}

impl KeyHook for MockHook {
    fn install(&self, handler: Arc<dyn KeyHandler>) -> Result<HookHandle> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::HookInstallFailed("mock hook refused".into()));
        }
        *self.handler.lock().unwrap() = Some(handler);
        self.installs.fetch_add(1, Ordering::SeqCst);

        let slot = self.handler.clone();
        let uninstalls = self.uninstalls.clone();
        Ok(HookHandle::new(move || {
            *slot.lock().unwrap() = None;
            uninstalls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
    }
}

/// Sink that collects every status.
pub fn collecting_sink() -> (Arc<Mutex<Vec<Status>>>, impl Fn(&Status) + Send + Sync + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    (seen, move |status: &Status| {
        seen_clone.lock().unwrap().push(status.clone());
    })
}

/// Poll `cond` until it holds or two seconds pass.
pub fn wait_until(cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}
