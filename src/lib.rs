//! # holdfast
//!
//! Input automation engine for games: watch live input, detect a trigger and
//! answer with a timed sequence of synthetic key and button events, without
//! ever leaving a key stuck down.
//!
//! ## Components
//!
//! - [`SequenceEngine`]: a global key hook watches an activation key. Pressing
//!   it taps a pre-hold key and then holds a hold key; releasing it lets go of
//!   the hold key and taps a release key.
//! - [`BuildAggregator`]: polls up to four building keys and keeps one place
//!   key pressed while any of them is down, with frame-based hysteresis so a
//!   missed poll or a quick key switch does not flicker the place key.
//! - [`Engine`]: both of the above behind one handle, one status sink and one
//!   enablement gate.
//!
//! Stopping either engine, or dropping it, releases every key it pressed
//! before returning.
//!
//! ## Quick Start
//!
//! ```no_run
//! use holdfast::{BuildSettings, Engine, Status, TriggerSettings};
//!
//! let engine = Engine::system(|status: &Status| println!("{status}"));
//!
//! engine
//!     .start_sequence(TriggerSettings::new("E").pre_hold("O").hold("P").release("R").resolve())
//!     .expect("failed to install hook");
//! engine
//!     .start_build(BuildSettings::new("Left Click").wall("Q").floor("F3").resolve())
//!     .expect("failed to start aggregator");
//!
//! std::thread::sleep(std::time::Duration::from_secs(60));
//! engine.stop_all().expect("failed to stop");
//! ```
//!
//! ## Platforms
//!
//! Windows uses a `WH_KEYBOARD_LL` hook and `SendInput`. Linux uses XRecord
//! and XTest behind the default `x11` feature; XRecord cannot swallow events,
//! so activation auto-repeat is observed but not suppressed there. Other
//! targets build against a backend that reports `NotSupported`.

pub mod backend;
pub mod build;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod gate;
pub mod hook;
pub mod keycode;
pub mod sequence;
pub mod status;

mod platform;
mod signal;

#[cfg(test)]
mod testing;

// Re-exports
pub use backend::{HeldKey, InputBackend, SystemBackend};
pub use build::{BuildAggregator, Debouncer, PlaceAction};
pub use config::{BuildConfig, BuildSettings, TriggerConfig, TriggerSettings};
pub use engine::Engine;
pub use error::{Error, Result};
pub use event::{Button, HookDecision, KeyEvent, Transition};
pub use gate::{AlwaysEnabled, EnableGate};
pub use hook::{ActivationFilter, HookHandle, KeyHandler, KeyHook, SystemHook};
pub use keycode::{Binding, Key};
pub use sequence::{SequenceEngine, SequencePhase};
pub use status::{Component, Status, StatusSink, status_channel};
