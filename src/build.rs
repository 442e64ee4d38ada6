//! Debounced build aggregator.
//!
//! Up to four building keys are polled on a fixed tick and presented to the
//! game as continuous pressure on one place key. A gap in the building keys
//! only releases the place key after two stages: a debounce window of
//! `debounce_frames` empty ticks, then `release_confirmations` further
//! confirmed-empty ticks. With the defaults (4 + 5 at 10 ms) a released key
//! keeps the place key down for 90 ms.
//!
//! [`Debouncer`] is the pure per-tick decision; [`BuildAggregator`] runs it
//! on a poll thread against an [`InputBackend`].

use crate::backend::{HeldKey, InputBackend, SystemBackend};
use crate::config::BuildConfig;
use crate::error::{Error, Result};
use crate::gate::{AlwaysEnabled, EnableGate};
use crate::signal::Signal;
use crate::status::{Component, Reporter, Status, StatusSink};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// What the aggregator must do to the place key after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceAction {
    Press,
    Release,
}

/// Frame-based hysteresis for the place key.
#[derive(Debug, Clone)]
pub struct Debouncer {
    debounce_frames: u64,
    confirmations_needed: u32,
    frame: u64,
    last_active_frame: u64,
    confirmations: u32,
    place_held: bool,
}

impl Debouncer {
    /// A threshold of zero confirmations is treated as one.
    pub fn new(debounce_frames: u32, release_confirmations: u32) -> Self {
        Self {
            debounce_frames: u64::from(debounce_frames),
            confirmations_needed: release_confirmations.max(1),
            frame: 0,
            last_active_frame: 0,
            confirmations: 0,
            place_held: false,
        }
    }

    pub fn from_config(config: &BuildConfig) -> Self {
        Self::new(config.debounce_frames, config.release_confirmations)
    }

    /// Advance one frame with the sampled building-key state.
    ///
    /// The debounce window is exclusive: confirmations start on the first
    /// empty tick after `debounce_frames` empty ticks have passed.
    pub fn tick(&mut self, any_down: bool) -> Option<PlaceAction> {
        self.frame += 1;

        if any_down {
            self.last_active_frame = self.frame;
            self.confirmations = 0;
            if self.place_held {
                return None;
            }
            self.place_held = true;
            return Some(PlaceAction::Press);
        }

        if !self.place_held {
            return None;
        }

        let frames_since_active = self.frame - self.last_active_frame;
        if frames_since_active <= self.debounce_frames {
            return None;
        }

        self.confirmations += 1;
        if self.confirmations < self.confirmations_needed {
            return None;
        }

        self.place_held = false;
        self.confirmations = 0;
        Some(PlaceAction::Release)
    }

    /// Undo the bookkeeping of an action the OS rejected, so the next tick
    /// asks for it again.
    pub fn revert(&mut self, action: PlaceAction) {
        match action {
            PlaceAction::Press => self.place_held = false,
            PlaceAction::Release => {
                self.place_held = true;
                self.confirmations = self.confirmations_needed - 1;
            }
        }
    }

    /// Forget everything except the frame counter.
    pub fn reset(&mut self) {
        self.last_active_frame = self.frame;
        self.confirmations = 0;
        self.place_held = false;
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn is_place_held(&self) -> bool {
        self.place_held
    }
}

/// Everything the poll thread owns.
struct PollLoop {
    config: BuildConfig,
    backend: Arc<dyn InputBackend>,
    reporter: Reporter,
    gate: Arc<dyn EnableGate>,
    cancel: Arc<Signal>,
    place_held: Arc<AtomicBool>,
}

impl PollLoop {
    fn fail(&self, context: &'static str, err: Error) {
        self.reporter
            .report(Status::error(Component::Build, context, err));
    }

    fn run(self) {
        let Some(place) = self.config.place_key.key() else {
            self.cancel.wait();
            return;
        };
        let keys = self.config.building_keys();
        let interval = self.config.poll_interval();
        let mut debouncer = Debouncer::from_config(&self.config);
        let mut held: Option<HeldKey> = None;

        while !self.cancel.wait_timeout(interval) {
            // A closed gate reads as "nothing pressed" and lets the place key go.
            let any_down =
                self.gate.may_run() && keys.iter().any(|key| self.backend.is_down(*key));

            match debouncer.tick(any_down) {
                Some(PlaceAction::Press) => match HeldKey::press(self.backend.clone(), place) {
                    Ok(key) => {
                        held = Some(key);
                        self.place_held.store(true, Ordering::SeqCst);
                        self.reporter.report(Status::PlaceHeld(place));
                    }
                    Err(e) => {
                        debouncer.revert(PlaceAction::Press);
                        self.fail("place.press", e);
                    }
                },
                Some(PlaceAction::Release) => {
                    if let Some(mut key) = held.take() {
                        match key.release() {
                            Ok(()) => {
                                self.place_held.store(false, Ordering::SeqCst);
                                self.reporter.report(Status::PlaceReleased(place));
                            }
                            Err(e) => {
                                held = Some(key);
                                debouncer.revert(PlaceAction::Release);
                                self.fail("place.release", e);
                            }
                        }
                    }
                }
                None => {}
            }
            log::trace!(
                "build frame {} any_down={any_down} held={}",
                debouncer.frame(),
                debouncer.is_place_held()
            );
        }

        if let Some(mut key) = held.take() {
            match key.release() {
                Ok(()) => self.reporter.report(Status::PlaceReleased(place)),
                Err(e) => self.fail("place.release", e),
            }
        }
        self.place_held.store(false, Ordering::SeqCst);
        log::debug!("build poll loop exited");
    }
}

struct Running {
    cancel: Arc<Signal>,
    thread: JoinHandle<()>,
}

/// The debounced build aggregator.
///
/// `start` spawns the poll thread and returns; `stop` cancels it and returns
/// only after the place key has been released.
///
/// A status sink may call `is_running` and `is_place_held`, but must not
/// start or stop the aggregator.
pub struct BuildAggregator {
    backend: Arc<dyn InputBackend>,
    reporter: Reporter,
    gate: Arc<dyn EnableGate>,
    /// Serializes start and stop.
    running: Mutex<Option<Running>>,
    active: AtomicBool,
    place_held: Arc<AtomicBool>,
}

impl BuildAggregator {
    pub fn new(backend: Arc<dyn InputBackend>, sink: Arc<dyn StatusSink>) -> Self {
        Self {
            backend,
            reporter: Reporter::new(sink),
            gate: Arc::new(AlwaysEnabled),
            running: Mutex::new(None),
            active: AtomicBool::new(false),
            place_held: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Aggregator on the platform's native input.
    pub fn system(sink: impl StatusSink + 'static) -> Self {
        Self::new(Arc::new(SystemBackend), Arc::new(sink))
    }

    /// Consult `gate` on start and on every tick.
    pub fn with_gate(mut self, gate: Arc<dyn EnableGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn start(&self, config: BuildConfig) -> Result<()> {
        let mut running = self.running.lock()?;
        if running.is_some() {
            self.reporter.report(Status::AlreadyRunning(Component::Build));
            return Ok(());
        }
        if !config.enabled {
            self.reporter.report(Status::Disabled(Component::Build));
            return Ok(());
        }
        if !self.gate.may_run() {
            self.reporter.report(Status::Blocked(Component::Build));
            return Ok(());
        }
        if config.is_inert() {
            log::info!("build aggregator has no place key or no building keys; it will idle");
        }

        let cancel = Arc::new(Signal::new());
        let poll = PollLoop {
            config,
            backend: self.backend.clone(),
            reporter: self.reporter.clone(),
            gate: self.gate.clone(),
            cancel: cancel.clone(),
            place_held: self.place_held.clone(),
        };
        let thread = thread::Builder::new()
            .name("holdfast-build".into())
            .spawn(move || poll.run())
            .map_err(|e| Error::ThreadError(format!("failed to spawn build poll thread: {e}")))?;

        *running = Some(Running { cancel, thread });
        self.active.store(true, Ordering::SeqCst);
        self.reporter.report(Status::Started(Component::Build));
        Ok(())
    }

    /// Cancel the poll loop and release the place key. A no-op when not running.
    pub fn stop(&self) -> Result<()> {
        let mut running = self.running.lock()?;
        let Some(Running { cancel, thread }) = running.take() else {
            return Ok(());
        };
        self.reporter.report(Status::Stopping(Component::Build));

        cancel.fire();
        let joined = thread
            .join()
            .map_err(|_| Error::ThreadError("build poll thread panicked".into()));
        if let Err(e) = &joined {
            self.reporter
                .report(Status::error(Component::Build, "poll.join", e));
        }

        self.place_held.store(false, Ordering::SeqCst);
        self.active.store(false, Ordering::SeqCst);
        self.reporter.report(Status::Stopped(Component::Build));
        joined
    }

    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Whether the aggregator currently holds the place key down.
    pub fn is_place_held(&self) -> bool {
        self.place_held.load(Ordering::SeqCst)
    }
}

impl Drop for BuildAggregator {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("failed to stop build aggregator on drop: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BuildSettings, DEBOUNCE_FRAMES, RELEASE_CONFIRMATION_THRESHOLD};
    use crate::event::Button;
    use crate::keycode::Key;
    use crate::testing::{collecting_sink, wait_until, Action, MockBackend};
    use std::sync::mpsc;
    use std::sync::{OnceLock, Weak};
    use std::time::Duration;

    fn default_debouncer() -> Debouncer {
        Debouncer::new(DEBOUNCE_FRAMES, RELEASE_CONFIRMATION_THRESHOLD)
    }

    /// Empty ticks until the debouncer releases, or `None` within `limit`.
    fn ticks_until_release(debouncer: &mut Debouncer, limit: u32) -> Option<u32> {
        (1..=limit).find(|_| debouncer.tick(false) == Some(PlaceAction::Release))
    }

    #[test]
    fn test_single_tick_press_holds_for_window() {
        let mut debouncer = default_debouncer();
        assert_eq!(debouncer.tick(true), Some(PlaceAction::Press));

        let ticks = ticks_until_release(&mut debouncer, 100).unwrap();
        assert_eq!(ticks, DEBOUNCE_FRAMES + RELEASE_CONFIRMATION_THRESHOLD);
        // 10 ms tick: at least 90 ms of empty polls before release.
        assert!(ticks * 10 >= 90);
        assert!(!debouncer.is_place_held());
    }

    #[test]
    fn test_press_asserted_once() {
        let mut debouncer = default_debouncer();
        let actions: Vec<_> = (0..20).filter_map(|_| debouncer.tick(true)).collect();
        assert_eq!(actions, vec![PlaceAction::Press]);
    }

    #[test]
    fn test_short_gap_does_not_flicker() {
        let mut debouncer = default_debouncer();
        debouncer.tick(true);
        for _ in 0..8 {
            assert_eq!(debouncer.tick(false), None);
        }
        // Key comes back one tick before release would have fired.
        assert_eq!(debouncer.tick(true), None);
        assert!(debouncer.is_place_held());

        // The window starts over from the new activity.
        assert_eq!(ticks_until_release(&mut debouncer, 100), Some(9));
    }

    #[test]
    fn test_gap_inside_debounce_window_does_not_count() {
        let mut debouncer = default_debouncer();
        debouncer.tick(true);
        for _ in 0..6 {
            debouncer.tick(false);
        }
        debouncer.tick(true);
        for _ in 0..6 {
            debouncer.tick(false);
        }
        assert!(debouncer.is_place_held());
    }

    #[test]
    fn test_overlapping_keys_stay_asserted() {
        // Wall down for 5 ticks, stairs overlapping from tick 3 to tick 12.
        let wall = |frame: u32| frame < 5;
        let stairs = |frame: u32| (3..12).contains(&frame);
        let mut debouncer = default_debouncer();

        let mut actions = Vec::new();
        let mut frame = 0;
        while frame < 12 + 9 {
            if let Some(action) = debouncer.tick(wall(frame) || stairs(frame)) {
                actions.push((frame, action));
            }
            frame += 1;
        }

        assert_eq!(
            actions,
            vec![(0, PlaceAction::Press), (11 + 9, PlaceAction::Release)]
        );
    }

    #[test]
    fn test_idle_ticks_do_nothing() {
        let mut debouncer = default_debouncer();
        for _ in 0..50 {
            assert_eq!(debouncer.tick(false), None);
        }
        assert_eq!(debouncer.frame(), 50);
    }

    #[test]
    fn test_revert_retries_next_tick() {
        let mut debouncer = default_debouncer();
        assert_eq!(debouncer.tick(true), Some(PlaceAction::Press));
        debouncer.revert(PlaceAction::Press);
        assert_eq!(debouncer.tick(true), Some(PlaceAction::Press));

        assert!(ticks_until_release(&mut debouncer, 100).is_some());
        debouncer.revert(PlaceAction::Release);
        assert_eq!(debouncer.tick(false), Some(PlaceAction::Release));
    }

    #[test]
    fn test_custom_thresholds() {
        let mut debouncer = Debouncer::new(0, 0);
        debouncer.tick(true);
        assert_eq!(debouncer.tick(false), Some(PlaceAction::Release));

        debouncer.reset();
        assert!(!debouncer.is_place_held());
    }

    fn aggregator(backend: &Arc<MockBackend>) -> (BuildAggregator, Arc<Mutex<Vec<Status>>>) {
        let (statuses, sink) = collecting_sink();
        (BuildAggregator::new(backend.clone(), Arc::new(sink)), statuses)
    }

    fn fast_config() -> BuildConfig {
        BuildSettings::new("Q")
            .wall("F1")
            .stairs("F2")
            .floor("disabled")
            .poll_delay_ms(1)
            .resolve()
    }

    #[test]
    fn test_aggregator_press_and_release() {
        let backend = Arc::new(MockBackend::new());
        let (agg, statuses) = aggregator(&backend);
        agg.start(fast_config()).unwrap();

        backend.set_down(Key::F1, true);
        assert!(wait_until(|| agg.is_place_held()));
        backend.set_down(Key::F2, true);
        backend.set_down(Key::F1, false);
        thread::sleep(Duration::from_millis(30));
        assert!(agg.is_place_held());

        backend.set_down(Key::F2, false);
        assert!(wait_until(|| !agg.is_place_held()));

        assert_eq!(
            backend.actions(),
            vec![Action::Press(Key::KeyQ), Action::Release(Key::KeyQ)]
        );
        assert!(statuses
            .lock()
            .unwrap()
            .contains(&Status::PlaceReleased(Key::KeyQ)));
        agg.stop().unwrap();
    }

    #[test]
    fn test_stop_releases_place_key() {
        let backend = Arc::new(MockBackend::new());
        let (agg, _) = aggregator(&backend);
        agg.start(fast_config()).unwrap();

        backend.set_down(Key::F2, true);
        assert!(wait_until(|| agg.is_place_held()));
        agg.stop().unwrap();

        assert_eq!(backend.balance(Key::KeyQ), 0);
        assert!(!agg.is_place_held());
        assert!(!agg.is_running());
    }

    #[test]
    fn test_mouse_place_key() {
        let backend = Arc::new(MockBackend::new());
        let (agg, _) = aggregator(&backend);
        let config = BuildSettings::new("Left Click")
            .roof("Mouse X1")
            .poll_delay_ms(1)
            .resolve();
        agg.start(config).unwrap();

        backend.set_down(Key::Mouse(Button::X1), true);
        assert!(wait_until(|| agg.is_place_held()));
        agg.stop().unwrap();
        assert_eq!(
            backend.actions(),
            vec![
                Action::Press(Key::Mouse(Button::Left)),
                Action::Release(Key::Mouse(Button::Left)),
            ]
        );
    }

    #[test]
    fn test_inert_config_never_presses() {
        let backend = Arc::new(MockBackend::new());
        let (agg, _) = aggregator(&backend);
        let config = BuildSettings::new("").wall("F1").poll_delay_ms(1).resolve();
        agg.start(config).unwrap();

        backend.set_down(Key::F1, true);
        thread::sleep(Duration::from_millis(20));
        agg.stop().unwrap();
        assert!(backend.actions().is_empty());
    }

    #[test]
    fn test_start_twice_and_disabled() {
        let backend = Arc::new(MockBackend::new());
        let (agg, statuses) = aggregator(&backend);

        let mut disabled = fast_config();
        disabled.enabled = false;
        agg.start(disabled).unwrap();
        assert!(!agg.is_running());

        agg.start(fast_config()).unwrap();
        agg.start(fast_config()).unwrap();
        agg.stop().unwrap();
        agg.stop().unwrap();

        let statuses = statuses.lock().unwrap();
        assert!(statuses.contains(&Status::Disabled(Component::Build)));
        assert!(statuses.contains(&Status::AlreadyRunning(Component::Build)));
        assert_eq!(
            statuses
                .iter()
                .filter(|s| **s == Status::Stopped(Component::Build))
                .count(),
            1
        );
    }

    #[test]
    fn test_closed_gate_releases_place_key() {
        let backend = Arc::new(MockBackend::new());
        let gate = Arc::new(AtomicBool::new(true));
        let (statuses, sink) = collecting_sink();
        let agg = BuildAggregator::new(backend.clone(), Arc::new(sink)).with_gate(gate.clone());
        agg.start(fast_config()).unwrap();

        backend.set_down(Key::F1, true);
        assert!(wait_until(|| agg.is_place_held()));
        gate.store(false, Ordering::SeqCst);
        assert!(wait_until(|| !agg.is_place_held()));
        agg.stop().unwrap();

        assert_eq!(backend.balance(Key::KeyQ), 0);
        assert!(!statuses.lock().unwrap().is_empty());
    }

    #[test]
    fn test_press_failure_retried() {
        let backend = Arc::new(MockBackend::new());
        let (agg, statuses) = aggregator(&backend);
        backend.set_failing(true);
        agg.start(fast_config()).unwrap();

        backend.set_down(Key::F1, true);
        assert!(wait_until(|| statuses.lock().unwrap().iter().any(Status::is_error)));
        assert!(!agg.is_place_held());

        backend.set_failing(false);
        assert!(wait_until(|| agg.is_place_held()));
        agg.stop().unwrap();
        assert_eq!(backend.balance(Key::KeyQ), 0);
    }

    #[test]
    fn test_sink_may_query_aggregator() {
        let backend = Arc::new(MockBackend::new());
        let slot: Arc<OnceLock<Weak<BuildAggregator>>> = Arc::new(OnceLock::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let slot = slot.clone();
            let seen = seen.clone();
            move |status: &Status| {
                if let Some(agg) = slot.get().and_then(Weak::upgrade) {
                    let running = agg.is_running();
                    let _ = agg.is_place_held();
                    seen.lock().unwrap().push((status.clone(), running));
                }
            }
        };
        let agg = Arc::new(BuildAggregator::new(backend.clone(), Arc::new(sink)));
        slot.set(Arc::downgrade(&agg)).unwrap();

        let (done_tx, done_rx) = mpsc::channel();
        let driver = {
            let agg = agg.clone();
            thread::spawn(move || {
                agg.start(fast_config()).unwrap();
                agg.start(fast_config()).unwrap();
                backend.set_down(Key::F1, true);
                assert!(wait_until(|| agg.is_place_held()));
                agg.stop().unwrap();
                let _ = done_tx.send(());
            })
        };
        assert!(
            done_rx.recv_timeout(Duration::from_secs(5)).is_ok(),
            "aggregator calls from the sink blocked"
        );
        driver.join().unwrap();

        let seen = seen.lock().unwrap();
        for (status, running) in [
            (Status::Started(Component::Build), true),
            (Status::AlreadyRunning(Component::Build), true),
            (Status::PlaceHeld(Key::KeyQ), true),
            (Status::Stopping(Component::Build), true),
            (Status::Stopped(Component::Build), false),
        ] {
            assert!(seen.contains(&(status.clone(), running)), "{status:?}");
        }
    }
}
