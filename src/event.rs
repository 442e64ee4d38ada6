//! Event types shared by the hook and the engines.

use crate::keycode::Key;
use std::time::SystemTime;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Button {
    /// Left mouse button.
    Left,
    /// Right mouse button.
    Right,
    /// Middle mouse button.
    Middle,
    /// Extra button 1 (typically back).
    X1,
    /// Extra button 2 (typically forward).
    X2,
}

/// A raw keyboard event as seen by the global hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    /// The key, if it is one the engine knows about.
    pub key: Option<Key>,
    /// The raw platform-specific keycode.
    pub raw_code: u32,
    /// `true` for key-down (including auto-repeat), `false` for key-up.
    pub down: bool,
    /// The event was generated by software rather than a physical device.
    pub injected: bool,
    /// Timestamp when the event was observed.
    pub time: SystemTime,
}

impl KeyEvent {
    /// Create a key-down event.
    pub fn down(key: Option<Key>, raw_code: u32) -> Self {
        Self {
            key,
            raw_code,
            down: true,
            injected: false,
            time: SystemTime::now(),
        }
    }

    /// Create a key-up event.
    pub fn up(key: Option<Key>, raw_code: u32) -> Self {
        Self {
            key,
            raw_code,
            down: false,
            injected: false,
            time: SystemTime::now(),
        }
    }

    /// Mark the event as injected by software.
    pub fn as_injected(mut self) -> Self {
        self.injected = true;
        self
    }
}

/// How an activation-key event relates to what the hook has already seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// The key went down and was not already tracked as held.
    FirstDown,
    /// OS auto-repeat while the key is still held.
    RepeatDown,
    /// The key was released.
    Up,
}

/// What the hook callback tells the OS to do with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookDecision {
    /// Deliver the event to applications unchanged.
    PassThrough,
    /// Consume the event.
    Swallow,
}
