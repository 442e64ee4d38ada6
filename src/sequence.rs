//! Hook-driven key-sequence state machine.
//!
//! While running, the engine watches one activation key:
//!
//! ```text
//! activation down  ->  tap pre-hold  ->  press hold (kept down)
//! activation up    ->  release hold  ->  tap release
//! ```
//!
//! The hook callback only classifies events and queues transitions. A single
//! worker thread per run executes the choreography, so an "up" never
//! overtakes the "down" it belongs to. Every pause is interruptible, and
//! [`SequenceEngine::stop`] releases the held key before it returns.

use crate::backend::{HeldKey, InputBackend, SystemBackend, TAP_PAUSE};
use crate::config::TriggerConfig;
use crate::error::{Error, Result};
use crate::event::Transition;
use crate::gate::{AlwaysEnabled, EnableGate};
use crate::hook::{ActivationFilter, HookHandle, KeyHook, SystemHook};
use crate::keycode::Key;
use crate::signal::Signal;
use crate::status::{Component, Reporter, Status, StatusSink};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Wait after a first-down so the passed-through activation key registers
/// before the pre-hold tap.
const ACTIVATION_SETTLE: Duration = Duration::from_millis(10);

/// How often an idle worker checks for cancellation.
const WORKER_POLL: Duration = Duration::from_millis(50);

/// Where a running sequence engine is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequencePhase {
    /// Not running.
    Idle,
    /// Hook installed, nothing in flight.
    WaitingForActivation,
    /// Settling and tapping the pre-hold key.
    PreHold,
    /// About to press the hold key.
    Locking,
    /// The begin half finished; the hold key is down if one is bound.
    HoldLocked,
    /// Releasing the hold and tapping the release key.
    Ending,
}

struct SessionState {
    phase: SequencePhase,
    hold: Option<HeldKey>,
    /// Tapped keys not released yet: the tap in flight, or one whose release
    /// failed.
    taps: Vec<HeldKey>,
    cancelled: bool,
}

/// State for one `start`..`stop` run.
struct Session {
    config: TriggerConfig,
    backend: Arc<dyn InputBackend>,
    reporter: Reporter,
    gate: Arc<dyn EnableGate>,
    state: Mutex<SessionState>,
    cancel: Signal,
    finished: Signal,
}

impl Session {
    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn report(&self, status: Status) {
        self.reporter.report(status);
    }

    fn fail(&self, context: &'static str, err: impl std::fmt::Display) {
        self.report(Status::error(Component::Sequence, context, err));
    }

    /// Move to `phase` unless the run was cancelled.
    fn enter(&self, phase: SequencePhase) -> bool {
        let mut state = self.state();
        if state.cancelled {
            return false;
        }
        state.phase = phase;
        true
    }

    /// Interruptible pause. Returns `false` if the run was cancelled.
    fn pause(&self, duration: Duration) -> bool {
        if self.cancel.wait_timeout(duration) {
            self.report(Status::SequenceCancelled);
            return false;
        }
        true
    }

    /// Press, pause briefly, release.
    ///
    /// The pressed key is owned by the session state until its release
    /// succeeds, so `stop` can release it whenever it runs.
    fn tap(&self, key: Key, context: &'static str) -> bool {
        let pressed = {
            let mut state = self.state();
            if state.cancelled {
                return false;
            }
            state.taps.retain_mut(|stuck| stuck.release().is_err());
            HeldKey::press(self.backend.clone(), key).map(|held| state.taps.push(held))
        };
        if let Err(e) = pressed {
            self.fail(context, e);
            return false;
        }

        thread::sleep(TAP_PAUSE);

        let released = {
            let mut state = self.state();
            // Already released by stop.
            let Some(mut held) = state.taps.pop() else {
                return false;
            };
            let result = held.release();
            if result.is_err() {
                state.taps.push(held);
            }
            result
        };
        match released {
            Ok(()) => true,
            Err(e) => {
                self.fail(context, e);
                false
            }
        }
    }

    /// Activation key went down.
    fn begin(&self) {
        if !self.gate.may_run() {
            self.report(Status::Blocked(Component::Sequence));
            return;
        }
        if !self.enter(SequencePhase::PreHold) {
            return;
        }
        self.report(Status::SequenceStarted);

        if !self.pause(ACTIVATION_SETTLE) {
            return;
        }

        if let Some(key) = self.config.pre_hold_key.key() {
            if self.tap(key, "pre_hold.tap") {
                self.report(Status::PreHoldTapped(key));
            }
            if !self.pause(self.config.step_delay()) {
                return;
            }
        }

        if !self.enter(SequencePhase::Locking) {
            return;
        }

        let locked = {
            let mut state = self.state();
            if state.cancelled {
                return;
            }
            let locked = match self.config.hold_key.key() {
                Some(key) => match HeldKey::press(self.backend.clone(), key) {
                    Ok(held) => {
                        state.hold = Some(held);
                        Some(Ok(key))
                    }
                    Err(e) => Some(Err(e)),
                },
                None => None,
            };
            state.phase = SequencePhase::HoldLocked;
            locked
        };

        match locked {
            Some(Ok(key)) => self.report(Status::HoldLocked(key)),
            Some(Err(e)) => self.fail("hold.press", e),
            None => {}
        }
    }

    /// Activation key went up.
    fn end(&self) {
        let released = {
            let mut state = self.state();
            if state.cancelled {
                return;
            }
            // Gate refused the matching down; there is nothing to finish.
            if state.phase == SequencePhase::WaitingForActivation {
                log::debug!("activation released without a running sequence");
                return;
            }
            state.phase = SequencePhase::Ending;
            state.hold.take().map(|mut held| (held.key(), held.release()))
        };
        self.report(Status::SequenceEnding);

        if let Some((key, result)) = released {
            match result {
                Ok(()) => self.report(Status::HoldReleased(key)),
                Err(e) => self.fail("hold.release", e),
            }
            if !self.pause(self.config.step_delay()) {
                return;
            }
        }

        if let Some(key) = self.config.release_key.key() {
            if self.tap(key, "release.tap") {
                self.report(Status::ReleaseTapped(key));
            }
        }

        if self.enter(SequencePhase::WaitingForActivation) {
            self.report(Status::SequenceEnded);
        }
    }
}

fn run_worker(session: Arc<Session>, jobs: Receiver<Transition>) {
    loop {
        match jobs.recv_timeout(WORKER_POLL) {
            Ok(Transition::FirstDown) => session.begin(),
            Ok(Transition::Up) => session.end(),
            Ok(Transition::RepeatDown) | Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        if session.cancel.is_fired() {
            break;
        }
    }
    log::debug!("sequence worker exited");
}

struct Running {
    session: Arc<Session>,
    hook: HookHandle,
    worker: JoinHandle<()>,
}

/// The key-sequence engine.
///
/// `start` blocks until `stop` is called from elsewhere; `start_background`
/// returns once the hook is installed. Both are no-ops while running.
///
/// Statuses are reported from inside `start` and `stop`. A sink may query the
/// engine (`phase`, `is_running`, `is_holding`) but must not start or stop it.
pub struct SequenceEngine {
    backend: Arc<dyn InputBackend>,
    hook: Arc<dyn KeyHook>,
    reporter: Reporter,
    gate: Arc<dyn EnableGate>,
    /// Serializes start and stop.
    running: Mutex<Option<Running>>,
    /// The live session, for queries.
    current: Mutex<Option<Arc<Session>>>,
}

impl SequenceEngine {
    pub fn new(
        backend: Arc<dyn InputBackend>,
        hook: Arc<dyn KeyHook>,
        sink: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            backend,
            hook,
            reporter: Reporter::new(sink),
            gate: Arc::new(AlwaysEnabled),
            running: Mutex::new(None),
            current: Mutex::new(None),
        }
    }

    /// Engine on the platform's native input and hook.
    pub fn system(sink: impl StatusSink + 'static) -> Self {
        Self::new(Arc::new(SystemBackend), Arc::new(SystemHook), Arc::new(sink))
    }

    /// Consult `gate` on start and before each sequence.
    pub fn with_gate(mut self, gate: Arc<dyn EnableGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Run until [`stop`](Self::stop) is called.
    pub fn start(&self, config: TriggerConfig) -> Result<()> {
        if let Some(session) = self.activate(config)? {
            session.finished.wait();
        }
        Ok(())
    }

    /// Install the hook and return immediately.
    pub fn start_background(&self, config: TriggerConfig) -> Result<()> {
        self.activate(config).map(|_| ())
    }

    fn current(&self) -> Option<Arc<Session>> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_current(&self, session: Option<Arc<Session>>) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = session;
    }

    fn activate(&self, config: TriggerConfig) -> Result<Option<Arc<Session>>> {
        let mut running = self.running.lock()?;
        if running.is_some() {
            self.reporter.report(Status::AlreadyRunning(Component::Sequence));
            return Ok(None);
        }
        if !config.enabled {
            self.reporter.report(Status::Disabled(Component::Sequence));
            return Ok(None);
        }
        if !self.gate.may_run() {
            self.reporter.report(Status::Blocked(Component::Sequence));
            return Ok(None);
        }
        let Some(key) = config.activation() else {
            let err = Error::InvalidConfig(format!(
                "activation key {} cannot be hooked",
                config.activation_key
            ));
            self.reporter
                .report(Status::error(Component::Sequence, "config.activation", &err));
            return Err(err);
        };

        let session = Arc::new(Session {
            config,
            backend: self.backend.clone(),
            reporter: self.reporter.clone(),
            gate: self.gate.clone(),
            state: Mutex::new(SessionState {
                phase: SequencePhase::WaitingForActivation,
                hold: None,
                taps: Vec::new(),
                cancelled: false,
            }),
            cancel: Signal::new(),
            finished: Signal::new(),
        });

        let (jobs_tx, jobs_rx) = mpsc::channel();
        let worker = thread::Builder::new()
            .name("holdfast-sequence".into())
            .spawn({
                let session = session.clone();
                move || run_worker(session, jobs_rx)
            })
            .map_err(|e| Error::ThreadError(format!("failed to spawn sequence worker: {e}")))?;

        let filter = ActivationFilter::new(key, move |transition| {
            let _ = jobs_tx.send(transition);
        });
        let hook = match self.hook.install(Arc::new(filter)) {
            Ok(hook) => hook,
            Err(e) => {
                session.cancel.fire();
                let _ = worker.join();
                self.reporter
                    .report(Status::error(Component::Sequence, "hook.install", &e));
                return Err(e);
            }
        };

        *running = Some(Running {
            session: session.clone(),
            hook,
            worker,
        });
        self.set_current(Some(session.clone()));
        self.reporter.report(Status::Started(Component::Sequence));
        self.reporter.report(Status::WaitingForActivation(key));
        Ok(Some(session))
    }

    /// Cancel, release the held key, uninstall the hook.
    ///
    /// Every key the engine pressed is released before this returns, whatever
    /// phase the worker is in. A no-op when not running.
    pub fn stop(&self) -> Result<()> {
        let mut running = self.running.lock()?;
        let Some(Running {
            session,
            hook,
            worker,
        }) = running.take()
        else {
            return Ok(());
        };
        self.reporter.report(Status::Stopping(Component::Sequence));

        session.cancel.fire();
        let (hold, taps) = {
            let mut state = session.state();
            state.cancelled = true;
            let hold = state.hold.take().map(|mut held| (held.key(), held.release()));
            let taps: Vec<_> = state
                .taps
                .drain(..)
                .map(|mut held| (held.key(), held.release()))
                .collect();
            (hold, taps)
        };
        match hold {
            Some((key, Ok(()))) => self.reporter.report(Status::HoldReleased(key)),
            Some((_, Err(e))) => self
                .reporter
                .report(Status::error(Component::Sequence, "hold.release", e)),
            None => {}
        }
        for (key, result) in taps {
            match result {
                Ok(()) => log::debug!("released tapped key {key} on stop"),
                Err(e) => self
                    .reporter
                    .report(Status::error(Component::Sequence, "tap.release", e)),
            }
        }

        let mut result = Ok(());
        if let Err(e) = hook.uninstall() {
            self.reporter
                .report(Status::error(Component::Sequence, "hook.uninstall", &e));
            result = Err(e);
        }
        if worker.join().is_err() {
            self.reporter.report(Status::error(
                Component::Sequence,
                "worker.join",
                "sequence worker panicked",
            ));
        }

        session.state().phase = SequencePhase::Idle;
        self.set_current(None);
        self.reporter.report(Status::Stopped(Component::Sequence));
        session.finished.fire();
        result
    }

    pub fn phase(&self) -> SequencePhase {
        self.current()
            .map_or(SequencePhase::Idle, |session| session.state().phase)
    }

    pub fn is_running(&self) -> bool {
        self.phase() != SequencePhase::Idle
    }

    /// Whether the engine currently holds the hold key down.
    pub fn is_holding(&self) -> bool {
        self.current()
            .is_some_and(|session| session.state().hold.is_some())
    }
}

impl Drop for SequenceEngine {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("failed to stop sequence engine on drop: {e}");
        }
    }
}
