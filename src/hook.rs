//! Global key hook adapter.
//!
//! A [`KeyHook`] installs a process-wide keyboard callback and hands every
//! event to a [`KeyHandler`], which decides whether the event passes through
//! or is swallowed. The callback runs on an OS-managed thread with a strict
//! time budget, so handlers must never do real work inline.
//!
//! [`ActivationFilter`] is the handler the sequence engine installs: it
//! tracks a single activation key, swallows its auto-repeat and dispatches
//! first-down / up transitions to a worker.

use crate::error::{Error, Result};
use crate::event::{HookDecision, KeyEvent, Transition};
use crate::keycode::Key;
use crate::platform;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

/// Trait for deciding the fate of hooked keyboard events.
pub trait KeyHandler: Send + Sync {
    /// Called for every keyboard event. Must return quickly.
    fn handle_key(&self, event: &KeyEvent) -> HookDecision;
}

/// Implement KeyHandler for closures.
impl<F> KeyHandler for F
where
    F: Fn(&KeyEvent) -> HookDecision + Send + Sync,
{
    fn handle_key(&self, event: &KeyEvent) -> HookDecision {
        self(event)
    }
}

/// Something that can install a global keyboard hook.
pub trait KeyHook: Send + Sync {
    /// Install `handler`. The hook stays active until the returned handle is
    /// uninstalled or dropped.
    fn install(&self, handler: Arc<dyn KeyHandler>) -> Result<HookHandle>;
}

/// Owned handle to an installed hook.
///
/// [`HookHandle::uninstall`] removes the hook and reports failures; dropping
/// an installed handle removes it too and only logs them.
pub struct HookHandle {
    uninstall: Option<Box<dyn FnOnce() -> Result<()> + Send>>,
}

impl HookHandle {
    /// Wrap the teardown for an installed hook.
    pub fn new<F>(uninstall: F) -> Self
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        Self {
            uninstall: Some(Box::new(uninstall)),
        }
    }

    /// Remove the hook.
    pub fn uninstall(mut self) -> Result<()> {
        match self.uninstall.take() {
            Some(teardown) => teardown(),
            None => Ok(()),
        }
    }
}

impl Drop for HookHandle {
    fn drop(&mut self) {
        if let Some(teardown) = self.uninstall.take() {
            if let Err(e) = teardown() {
                log::warn!("failed to uninstall hook on drop: {e}");
            }
        }
    }
}

/// Only one OS hook may be installed per process.
static SYSTEM_HOOK_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Hook backed by the platform's low-level keyboard hook.
///
/// The hook and its message loop live on a dedicated thread; `install`
/// returns once the OS has accepted the hook, or with the OS error.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHook;

impl KeyHook for SystemHook {
    fn install(&self, handler: Arc<dyn KeyHandler>) -> Result<HookHandle> {
        if SYSTEM_HOOK_INSTALLED.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyRunning);
        }

        let (ready_tx, ready_rx) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("holdfast-hook".into())
            .spawn(move || {
                if let Err(e) = platform::run_key_hook(handler, ready_tx) {
                    log::warn!("key hook thread exited: {e}");
                }
            });

        let thread_handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                SYSTEM_HOOK_INSTALLED.store(false, Ordering::SeqCst);
                return Err(Error::ThreadError(format!("failed to spawn hook thread: {e}")));
            }
        };

        let ready = ready_rx.recv().unwrap_or_else(|_| {
            Err(Error::HookInstallFailed("hook thread exited before reporting".into()))
        });
        if let Err(e) = ready {
            let _ = thread_handle.join();
            SYSTEM_HOOK_INSTALLED.store(false, Ordering::SeqCst);
            return Err(e);
        }

        log::debug!("system key hook installed");
        Ok(HookHandle::new(move || {
            let stopped = platform::stop_key_hook();
            let joined = thread_handle
                .join()
                .map_err(|_| Error::ThreadError("failed to join hook thread".into()));
            SYSTEM_HOOK_INSTALLED.store(false, Ordering::SeqCst);
            log::debug!("system key hook uninstalled");
            stopped.and(joined)
        }))
    }
}

/// Handler that watches one activation key.
///
/// - first down: passed through, [`Transition::FirstDown`] dispatched
/// - repeat down: swallowed, nothing dispatched
/// - up after a tracked down: passed through, [`Transition::Up`] dispatched
/// - everything else, including injected events: passed through untouched
pub struct ActivationFilter {
    key: Key,
    held: AtomicBool,
    dispatch: Box<dyn Fn(Transition) + Send + Sync>,
}

impl ActivationFilter {
    /// Create a filter for `key`. `dispatch` runs on the hook thread and
    /// must only hand the transition off (e.g. send it on a channel).
    pub fn new<F>(key: Key, dispatch: F) -> Self
    where
        F: Fn(Transition) + Send + Sync + 'static,
    {
        Self {
            key,
            held: AtomicBool::new(false),
            dispatch: Box::new(dispatch),
        }
    }

    pub fn key(&self) -> Key {
        self.key
    }

    /// Whether the activation key is currently tracked as held.
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }

    /// Classify an event and update the held state.
    ///
    /// Returns `None` for events that do not concern the activation key.
    pub fn classify(&self, event: &KeyEvent) -> Option<Transition> {
        if event.injected || event.key != Some(self.key) {
            return None;
        }

        if event.down {
            if self.held.swap(true, Ordering::SeqCst) {
                Some(Transition::RepeatDown)
            } else {
                Some(Transition::FirstDown)
            }
        } else if self.held.swap(false, Ordering::SeqCst) {
            Some(Transition::Up)
        } else {
            None
        }
    }
}

impl KeyHandler for ActivationFilter {
    fn handle_key(&self, event: &KeyEvent) -> HookDecision {
        match self.classify(event) {
            Some(Transition::RepeatDown) => HookDecision::Swallow,
            Some(transition) => {
                (self.dispatch)(transition);
                HookDecision::PassThrough
            }
            None => HookDecision::PassThrough,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording_filter(key: Key) -> (ActivationFilter, Arc<Mutex<Vec<Transition>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let filter = ActivationFilter::new(key, move |t| seen_clone.lock().unwrap().push(t));
        (filter, seen)
    }

    #[test]
    fn test_first_down_passes_and_dispatches() {
        let (filter, seen) = recording_filter(Key::KeyE);
        let decision = filter.handle_key(&KeyEvent::down(Some(Key::KeyE), 0x45));
        assert_eq!(filter.key(), Key::KeyE);
        assert_eq!(decision, HookDecision::PassThrough);
        assert!(filter.is_held());
        assert_eq!(*seen.lock().unwrap(), vec![Transition::FirstDown]);
    }

    #[test]
    fn test_repeat_down_swallowed_without_dispatch() {
        let (filter, seen) = recording_filter(Key::KeyE);
        filter.handle_key(&KeyEvent::down(Some(Key::KeyE), 0x45));
        for _ in 0..5 {
            let decision = filter.handle_key(&KeyEvent::down(Some(Key::KeyE), 0x45));
            assert_eq!(decision, HookDecision::Swallow);
        }
        assert_eq!(*seen.lock().unwrap(), vec![Transition::FirstDown]);
    }

    #[test]
    fn test_up_passes_and_dispatches() {
        let (filter, seen) = recording_filter(Key::KeyE);
        filter.handle_key(&KeyEvent::down(Some(Key::KeyE), 0x45));
        let decision = filter.handle_key(&KeyEvent::up(Some(Key::KeyE), 0x45));
        assert_eq!(decision, HookDecision::PassThrough);
        assert!(!filter.is_held());
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Transition::FirstDown, Transition::Up]
        );
    }

    #[test]
    fn test_stray_up_ignored() {
        let (filter, seen) = recording_filter(Key::KeyE);
        let decision = filter.handle_key(&KeyEvent::up(Some(Key::KeyE), 0x45));
        assert_eq!(decision, HookDecision::PassThrough);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_other_keys_untouched() {
        let (filter, seen) = recording_filter(Key::KeyE);
        assert_eq!(
            filter.handle_key(&KeyEvent::down(Some(Key::KeyW), 0x57)),
            HookDecision::PassThrough
        );
        assert_eq!(
            filter.handle_key(&KeyEvent::down(None, 0xFF)),
            HookDecision::PassThrough
        );
        assert!(!filter.is_held());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_injected_events_ignored() {
        let (filter, seen) = recording_filter(Key::KeyE);
        let event = KeyEvent::down(Some(Key::KeyE), 0x45).as_injected();
        assert_eq!(filter.handle_key(&event), HookDecision::PassThrough);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_hook_handle_uninstalls_once() {
        let count = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let count_clone = count.clone();
        let handle = HookHandle::new(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        handle.uninstall().unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        let count_clone = count.clone();
        drop(HookHandle::new(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
