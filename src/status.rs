//! Status events surfaced to whoever is watching the engine.
//!
//! The engines never return progress to their caller; they report discrete
//! [`Status`] values to a [`StatusSink`]. Sinks are called from the hook
//! thread, the poll thread and the sequence worker, so they must not block.
//!
//! # Example
//!
//! ```no_run
//! use holdfast::status::status_channel;
//! use holdfast::{SequenceEngine, TriggerSettings};
//!
//! let (sink, rx) = status_channel(64);
//! let engine = SequenceEngine::system(sink);
//! let config = TriggerSettings::new("E").hold("P").release("R").resolve();
//! engine.start_background(config).expect("failed to start");
//!
//! for status in rx.iter() {
//!     println!("{status}");
//! }
//! ```

use crate::keycode::Key;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};

/// Which sub-engine a lifecycle status belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    /// The key-sequence state machine.
    Sequence,
    /// The debounced build aggregator.
    Build,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Sequence => f.write_str("sequence"),
            Component::Build => f.write_str("build"),
        }
    }
}

/// A discrete engine status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// `start` was called while already running; nothing changed.
    AlreadyRunning(Component),
    /// The configuration is disabled, so the engine did not start.
    Disabled(Component),
    /// The enablement gate refused to let the engine act.
    Blocked(Component),
    /// The engine started.
    Started(Component),
    /// The hook is installed and the sequence engine waits for the activation key.
    WaitingForActivation(Key),
    /// The activation key went down and the sequence began.
    SequenceStarted,
    /// The pre-hold key was tapped.
    PreHoldTapped(Key),
    /// The hold key is pressed and held by the engine.
    HoldLocked(Key),
    /// The activation key went up and the end sequence began.
    SequenceEnding,
    /// The held key was released.
    HoldReleased(Key),
    /// The release key was tapped.
    ReleaseTapped(Key),
    /// The end sequence finished; back to waiting.
    SequenceEnded,
    /// Cancellation interrupted an in-flight sequence.
    SequenceCancelled,
    /// The place key is asserted by the aggregator.
    PlaceHeld(Key),
    /// The place key was released by the aggregator.
    PlaceReleased(Key),
    /// `stop` was requested.
    Stopping(Component),
    /// The engine stopped and released everything it held.
    Stopped(Component),
    /// Something failed; the engine keeps going unless it never started.
    Error {
        /// The sub-engine that failed.
        component: Component,
        /// Short machine-readable context, e.g. `"input.press"`.
        context: &'static str,
        /// Human-readable detail.
        detail: String,
    },
}

impl Status {
    pub(crate) fn error(component: Component, context: &'static str, detail: impl fmt::Display) -> Self {
        Status::Error {
            component,
            context,
            detail: detail.to_string(),
        }
    }

    /// Check if this status reports a failure.
    pub fn is_error(&self) -> bool {
        matches!(self, Status::Error { .. })
    }

    fn log(&self) {
        match self {
            Status::Error { .. } => log::warn!("{self}"),
            Status::AlreadyRunning(_)
            | Status::Disabled(_)
            | Status::Blocked(_)
            | Status::Started(_)
            | Status::WaitingForActivation(_)
            | Status::Stopping(_)
            | Status::Stopped(_) => log::info!("{self}"),
            _ => log::debug!("{self}"),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::AlreadyRunning(c) => write!(f, "{c}: already running"),
            Status::Disabled(c) => write!(f, "{c}: disabled"),
            Status::Blocked(c) => write!(f, "{c}: blocked by enablement gate"),
            Status::Started(c) => write!(f, "{c}: started"),
            Status::WaitingForActivation(key) => write!(f, "sequence: waiting for {key}"),
            Status::SequenceStarted => f.write_str("sequence: started"),
            Status::PreHoldTapped(key) => write!(f, "sequence: tapped {key}"),
            Status::HoldLocked(key) => write!(f, "sequence: holding {key}"),
            Status::SequenceEnding => f.write_str("sequence: ending"),
            Status::HoldReleased(key) => write!(f, "sequence: released {key}"),
            Status::ReleaseTapped(key) => write!(f, "sequence: tapped {key}"),
            Status::SequenceEnded => f.write_str("sequence: ended"),
            Status::SequenceCancelled => f.write_str("sequence: cancelled"),
            Status::PlaceHeld(key) => write!(f, "build: holding {key}"),
            Status::PlaceReleased(key) => write!(f, "build: released {key}"),
            Status::Stopping(c) => write!(f, "{c}: stopping"),
            Status::Stopped(c) => write!(f, "{c}: stopped"),
            Status::Error {
                component,
                context,
                detail,
            } => write!(f, "{component}: error {context}: {detail}"),
        }
    }
}

/// Receiver of engine status events.
///
/// Implemented for closures, so `|status: &Status| println!("{status}")`
/// works as a sink.
pub trait StatusSink: Send + Sync {
    /// Called for every status event. Must return quickly.
    fn report(&self, status: &Status);
}

impl<F> StatusSink for F
where
    F: Fn(&Status) + Send + Sync,
{
    fn report(&self, status: &Status) {
        self(status);
    }
}

/// A sink that drops every status (they are still logged).
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl StatusSink for Discard {
    fn report(&self, _status: &Status) {}
}

/// Sink that forwards statuses into a bounded channel.
///
/// When the channel is full the status is dropped rather than blocking the
/// reporting thread; [`ChannelSink::dropped`] counts those.
pub struct ChannelSink {
    sender: SyncSender<Status>,
    dropped: AtomicU64,
}

impl ChannelSink {
    /// Number of statuses dropped because the receiver fell behind.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl StatusSink for ChannelSink {
    fn report(&self, status: &Status) {
        if self.sender.try_send(status.clone()).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Create a bounded status channel.
pub fn status_channel(capacity: usize) -> (ChannelSink, Receiver<Status>) {
    let (sender, receiver) = mpsc::sync_channel(capacity);
    let sink = ChannelSink {
        sender,
        dropped: AtomicU64::new(0),
    };
    (sink, receiver)
}

/// Sink that forwards statuses into a bounded tokio channel.
#[cfg(feature = "tokio")]
pub struct AsyncChannelSink {
    sender: tokio::sync::mpsc::Sender<Status>,
}

#[cfg(feature = "tokio")]
impl StatusSink for AsyncChannelSink {
    fn report(&self, status: &Status) {
        let _ = self.sender.try_send(status.clone());
    }
}

/// Create a bounded tokio status channel.
///
/// ```ignore
/// let (sink, mut rx) = holdfast::status::async_status_channel(64);
/// while let Some(status) = rx.recv().await {
///     println!("{status}");
/// }
/// ```
#[cfg(feature = "tokio")]
pub fn async_status_channel(
    capacity: usize,
) -> (AsyncChannelSink, tokio::sync::mpsc::Receiver<Status>) {
    let (sender, receiver) = tokio::sync::mpsc::channel(capacity);
    (AsyncChannelSink { sender }, receiver)
}

/// Shared handle the engines report through; logs, then forwards.
#[derive(Clone)]
pub(crate) struct Reporter {
    sink: Arc<dyn StatusSink>,
}

impl Reporter {
    pub(crate) fn new(sink: Arc<dyn StatusSink>) -> Self {
        Self { sink }
    }

    pub(crate) fn report(&self, status: Status) {
        status.log();
        self.sink.report(&status);
    }
}
