//! Engine configuration.
//!
//! The UI collects key names as strings ([`TriggerSettings`],
//! [`BuildSettings`]); [`TriggerSettings::resolve`] and
//! [`BuildSettings::resolve`] turn them into the typed snapshots the engines
//! consume. A snapshot is fixed for the lifetime of one engine run.

use crate::error::{Error, Result};
use crate::keycode::{Binding, Key};
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default pause between sequence steps.
pub const DEFAULT_STEP_DELAY_MS: u64 = 10;
/// Largest step delay accepted by [`TriggerConfig::validate`].
pub const MAX_STEP_DELAY_MS: u64 = 10_000;
/// Default aggregator tick.
pub const DEFAULT_POLL_DELAY_MS: u64 = 10;
/// Empty ticks that must pass before release confirmation starts.
pub const DEBOUNCE_FRAMES: u32 = 4;
/// Confirmed empty ticks required before the place key is released.
pub const RELEASE_CONFIRMATION_THRESHOLD: u32 = 5;

/// Snapshot driving the key-sequence state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct TriggerConfig {
    /// Key whose press/release brackets the sequence.
    pub activation_key: Binding,
    /// Tapped once when the activation key goes down.
    pub pre_hold_key: Binding,
    /// Held from activation until the activation key goes up.
    pub hold_key: Binding,
    /// Tapped once after the hold is released.
    pub release_key: Binding,
    /// Settle time between steps, in milliseconds.
    pub inter_step_delay_ms: u64,
    /// Whether the sequence may run at all.
    pub enabled: bool,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            activation_key: Binding::Disabled,
            pre_hold_key: Binding::Disabled,
            hold_key: Binding::Disabled,
            release_key: Binding::Disabled,
            inter_step_delay_ms: DEFAULT_STEP_DELAY_MS,
            enabled: true,
        }
    }
}

impl TriggerConfig {
    /// Step delay, clamped to at least one millisecond.
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.inter_step_delay_ms.max(1))
    }

    /// The activation key, if it is a keyboard key the hook can watch.
    pub fn activation(&self) -> Option<Key> {
        self.activation_key.key().filter(|key| !key.is_mouse())
    }

    /// Strict check for the UI's "test configuration" action.
    ///
    /// `start` never calls this; it clamps the delay and skips disabled
    /// steps instead.
    pub fn validate(&self) -> Result<()> {
        if self.activation().is_none() {
            return Err(Error::InvalidConfig(format!(
                "activation key {} cannot be hooked",
                self.activation_key
            )));
        }
        if !(1..=MAX_STEP_DELAY_MS).contains(&self.inter_step_delay_ms) {
            return Err(Error::InvalidConfig(format!(
                "step delay {}ms outside 1..={MAX_STEP_DELAY_MS}ms",
                self.inter_step_delay_ms
            )));
        }
        Ok(())
    }
}

/// Snapshot driving the debounced build aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct BuildConfig {
    /// Key held while any building key is down.
    pub place_key: Binding,
    pub wall_key: Binding,
    pub stairs_key: Binding,
    pub floor_key: Binding,
    pub roof_key: Binding,
    /// Poll tick, in milliseconds.
    pub poll_delay_ms: u64,
    /// Empty ticks ignored before release confirmation starts.
    pub debounce_frames: u32,
    /// Confirmed empty ticks before the place key is released.
    pub release_confirmations: u32,
    /// Whether the aggregator may run at all.
    pub enabled: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            place_key: Binding::Disabled,
            wall_key: Binding::Disabled,
            stairs_key: Binding::Disabled,
            floor_key: Binding::Disabled,
            roof_key: Binding::Disabled,
            poll_delay_ms: DEFAULT_POLL_DELAY_MS,
            debounce_frames: DEBOUNCE_FRAMES,
            release_confirmations: RELEASE_CONFIRMATION_THRESHOLD,
            enabled: true,
        }
    }
}

impl BuildConfig {
    /// Poll tick, clamped to at least one millisecond.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_delay_ms.max(1))
    }

    /// The building keys that are not disabled.
    pub fn building_keys(&self) -> Vec<Key> {
        [self.wall_key, self.stairs_key, self.floor_key, self.roof_key]
            .iter()
            .filter_map(Binding::key)
            .collect()
    }

    /// An aggregator with this config would never press anything.
    pub fn is_inert(&self) -> bool {
        self.place_key.is_disabled() || self.building_keys().is_empty()
    }
}

/// Trigger settings as key names, the way the UI stores them.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct TriggerSettings {
    pub activation_key: String,
    pub pre_hold_key: String,
    pub hold_key: String,
    pub release_key: String,
    pub delay_ms: u64,
    pub enabled: bool,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            activation_key: String::new(),
            pre_hold_key: String::new(),
            hold_key: String::new(),
            release_key: String::new(),
            delay_ms: DEFAULT_STEP_DELAY_MS,
            enabled: true,
        }
    }
}

impl TriggerSettings {
    /// Start from an activation key name.
    pub fn new(activation_key: impl Into<String>) -> Self {
        Self {
            activation_key: activation_key.into(),
            ..Self::default()
        }
    }

    pub fn pre_hold(mut self, name: impl Into<String>) -> Self {
        self.pre_hold_key = name.into();
        self
    }

    pub fn hold(mut self, name: impl Into<String>) -> Self {
        self.hold_key = name.into();
        self
    }

    pub fn release(mut self, name: impl Into<String>) -> Self {
        self.release_key = name.into();
        self
    }

    pub fn delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Resolve every name once. Unknown names become disabled slots.
    pub fn resolve(&self) -> TriggerConfig {
        TriggerConfig {
            activation_key: Binding::parse_keyboard(&self.activation_key),
            pre_hold_key: Binding::parse_keyboard(&self.pre_hold_key),
            hold_key: Binding::parse_keyboard(&self.hold_key),
            release_key: Binding::parse_keyboard(&self.release_key),
            inter_step_delay_ms: self.delay_ms.max(1),
            enabled: self.enabled,
        }
    }
}

/// Build settings as key names, the way the UI stores them.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct BuildSettings {
    pub place_key: String,
    pub wall_key: String,
    pub stairs_key: String,
    pub floor_key: String,
    pub roof_key: String,
    pub poll_delay_ms: u64,
    pub enabled: bool,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            place_key: String::new(),
            wall_key: String::new(),
            stairs_key: String::new(),
            floor_key: String::new(),
            roof_key: String::new(),
            poll_delay_ms: DEFAULT_POLL_DELAY_MS,
            enabled: true,
        }
    }
}

impl BuildSettings {
    /// Start from a place key name.
    pub fn new(place_key: impl Into<String>) -> Self {
        Self {
            place_key: place_key.into(),
            ..Self::default()
        }
    }

    pub fn wall(mut self, name: impl Into<String>) -> Self {
        self.wall_key = name.into();
        self
    }

    pub fn stairs(mut self, name: impl Into<String>) -> Self {
        self.stairs_key = name.into();
        self
    }

    pub fn floor(mut self, name: impl Into<String>) -> Self {
        self.floor_key = name.into();
        self
    }

    pub fn roof(mut self, name: impl Into<String>) -> Self {
        self.roof_key = name.into();
        self
    }

    pub fn poll_delay_ms(mut self, poll_delay_ms: u64) -> Self {
        self.poll_delay_ms = poll_delay_ms;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Resolve every name once. Unknown names become disabled slots.
    pub fn resolve(&self) -> BuildConfig {
        BuildConfig {
            place_key: Binding::parse(&self.place_key),
            wall_key: Binding::parse(&self.wall_key),
            stairs_key: Binding::parse(&self.stairs_key),
            floor_key: Binding::parse(&self.floor_key),
            roof_key: Binding::parse(&self.roof_key),
            poll_delay_ms: self.poll_delay_ms.max(1),
            enabled: self.enabled,
            ..BuildConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Button;

    #[test]
    fn test_step_delay_is_clamped() {
        let config = TriggerConfig {
            inter_step_delay_ms: 0,
            ..TriggerConfig::default()
        };
        assert_eq!(config.step_delay(), Duration::from_millis(1));

        let resolved = TriggerSettings::new("E").delay_ms(0).resolve();
        assert_eq!(resolved.inter_step_delay_ms, 1);
    }

    #[test]
    fn test_trigger_resolve() {
        let config = TriggerSettings::new("e")
            .pre_hold("O")
            .hold("P")
            .release("R")
            .resolve();

        assert_eq!(config.activation(), Some(Key::KeyE));
        assert_eq!(config.pre_hold_key, Binding::Key(Key::KeyO));
        assert_eq!(config.hold_key, Binding::Key(Key::KeyP));
        assert_eq!(config.release_key, Binding::Key(Key::KeyR));
        assert_eq!(config.inter_step_delay_ms, DEFAULT_STEP_DELAY_MS);
        assert!(config.enabled);
    }

    #[test]
    fn test_trigger_mouse_slots_disabled() {
        let config = TriggerSettings::new("Left Click").hold("Mouse X1").resolve();
        assert!(config.activation_key.is_disabled());
        assert!(config.hold_key.is_disabled());
    }

    #[test]
    fn test_validate() {
        assert!(TriggerSettings::new("E").resolve().validate().is_ok());
        assert!(matches!(
            TriggerSettings::new("").resolve().validate(),
            Err(Error::InvalidConfig(_))
        ));

        let mut config = TriggerSettings::new("E").resolve();
        config.inter_step_delay_ms = MAX_STEP_DELAY_MS + 1;
        assert!(config.validate().is_err());
        config.inter_step_delay_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_build_resolve() {
        let config = BuildSettings::new("Left Click")
            .wall("Q")
            .stairs("disabled")
            .floor("F3")
            .roof("???")
            .resolve();

        assert_eq!(config.place_key, Binding::Key(Key::Mouse(Button::Left)));
        assert_eq!(config.building_keys(), vec![Key::KeyQ, Key::F3]);
        assert_eq!(config.debounce_frames, DEBOUNCE_FRAMES);
        assert_eq!(config.release_confirmations, RELEASE_CONFIRMATION_THRESHOLD);
        assert!(!config.is_inert());
    }

    #[test]
    fn test_build_inert() {
        assert!(BuildSettings::new("Q").resolve().is_inert());
        assert!(BuildSettings::new("").wall("Q").resolve().is_inert());
    }

    #[test]
    fn test_poll_interval_clamped() {
        let config = BuildSettings::new("Q").poll_delay_ms(0).resolve();
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_settings_deserialize_with_defaults() {
        let settings: TriggerSettings =
            serde_json::from_str(r#"{"activation_key":"E","hold_key":"P"}"#).unwrap();
        assert_eq!(settings.delay_ms, DEFAULT_STEP_DELAY_MS);
        assert_eq!(settings.resolve().hold_key, Binding::Key(Key::KeyP));
    }
}
