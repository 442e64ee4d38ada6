//! Key definitions and name resolution.
//!
//! Configuration arrives as the key names a user picked in the UI. They are
//! resolved exactly once into a [`Binding`], so the engines never look up
//! strings while input is flowing.

use crate::event::Button;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Keys the engine can observe and synthesize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Key {
    // Letters
    KeyA,
    KeyB,
    KeyC,
    KeyD,
    KeyE,
    KeyF,
    KeyG,
    KeyH,
    KeyI,
    KeyJ,
    KeyK,
    KeyL,
    KeyM,
    KeyN,
    KeyO,
    KeyP,
    KeyQ,
    KeyR,
    KeyS,
    KeyT,
    KeyU,
    KeyV,
    KeyW,
    KeyX,
    KeyY,
    KeyZ,

    // Numbers (top row)
    Num0,
    Num1,
    Num2,
    Num3,
    Num4,
    Num5,
    Num6,
    Num7,
    Num8,
    Num9,

    // Function keys
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,

    // Navigation and editing
    Space,
    Enter,
    Escape,
    Tab,
    Backspace,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,

    // Modifiers
    Shift,
    Control,
    Alt,

    // Numpad
    Numpad0,
    Numpad1,
    Numpad2,
    Numpad3,
    Numpad4,
    Numpad5,
    Numpad6,
    Numpad7,
    Numpad8,
    Numpad9,

    /// A mouse button, usable wherever the state reader and writer are.
    Mouse(Button),
}

pub(crate) const LETTERS: [Key; 26] = [
    Key::KeyA,
    Key::KeyB,
    Key::KeyC,
    Key::KeyD,
    Key::KeyE,
    Key::KeyF,
    Key::KeyG,
    Key::KeyH,
    Key::KeyI,
    Key::KeyJ,
    Key::KeyK,
    Key::KeyL,
    Key::KeyM,
    Key::KeyN,
    Key::KeyO,
    Key::KeyP,
    Key::KeyQ,
    Key::KeyR,
    Key::KeyS,
    Key::KeyT,
    Key::KeyU,
    Key::KeyV,
    Key::KeyW,
    Key::KeyX,
    Key::KeyY,
    Key::KeyZ,
];

pub(crate) const DIGITS: [Key; 10] = [
    Key::Num0,
    Key::Num1,
    Key::Num2,
    Key::Num3,
    Key::Num4,
    Key::Num5,
    Key::Num6,
    Key::Num7,
    Key::Num8,
    Key::Num9,
];

pub(crate) const FUNCTION_KEYS: [Key; 12] = [
    Key::F1,
    Key::F2,
    Key::F3,
    Key::F4,
    Key::F5,
    Key::F6,
    Key::F7,
    Key::F8,
    Key::F9,
    Key::F10,
    Key::F11,
    Key::F12,
];

pub(crate) const NUMPAD: [Key; 10] = [
    Key::Numpad0,
    Key::Numpad1,
    Key::Numpad2,
    Key::Numpad3,
    Key::Numpad4,
    Key::Numpad5,
    Key::Numpad6,
    Key::Numpad7,
    Key::Numpad8,
    Key::Numpad9,
];

impl Key {
    /// Resolve a user-facing key name, ignoring case and surrounding space.
    ///
    /// Returns `None` for names outside the supported vocabulary.
    pub fn from_name(name: &str) -> Option<Key> {
        let upper = name.trim().to_ascii_uppercase();
        let bytes = upper.as_bytes();

        if bytes.len() == 1 {
            return match bytes[0] {
                c @ b'A'..=b'Z' => Some(LETTERS[(c - b'A') as usize]),
                c @ b'0'..=b'9' => Some(DIGITS[(c - b'0') as usize]),
                _ => None,
            };
        }

        if let Some(n) = upper.strip_prefix('F').and_then(|s| s.parse::<usize>().ok()) {
            return n.checked_sub(1).and_then(|i| FUNCTION_KEYS.get(i)).copied();
        }

        if let Some(n) = upper.strip_prefix("NUMPAD").and_then(|s| s.trim().parse::<usize>().ok()) {
            return NUMPAD.get(n).copied();
        }

        let key = match upper.as_str() {
            "SPACE" => Key::Space,
            "ENTER" | "RETURN" => Key::Enter,
            "ESCAPE" | "ESC" => Key::Escape,
            "TAB" => Key::Tab,
            "BACKSPACE" => Key::Backspace,
            "DELETE" | "DEL" => Key::Delete,
            "INSERT" | "INS" => Key::Insert,
            "HOME" => Key::Home,
            "END" => Key::End,
            "PAGEUP" | "PGUP" => Key::PageUp,
            "PAGEDOWN" | "PGDN" => Key::PageDown,
            "UP" | "ARROWUP" => Key::ArrowUp,
            "DOWN" | "ARROWDOWN" => Key::ArrowDown,
            "LEFT" | "ARROWLEFT" => Key::ArrowLeft,
            "RIGHT" | "ARROWRIGHT" => Key::ArrowRight,
            "SHIFT" => Key::Shift,
            "CTRL" | "CONTROL" => Key::Control,
            "ALT" => Key::Alt,
            "LEFT CLICK" | "MOUSE LEFT" => Key::Mouse(Button::Left),
            "RIGHT CLICK" | "MOUSE RIGHT" => Key::Mouse(Button::Right),
            "MIDDLE CLICK" | "MOUSE MIDDLE" => Key::Mouse(Button::Middle),
            "MOUSE X1" | "MOUSE4" => Key::Mouse(Button::X1),
            "MOUSE X2" | "MOUSE5" => Key::Mouse(Button::X2),
            _ => return None,
        };
        Some(key)
    }

    /// The mouse button behind this key, if it is one.
    pub fn as_button(&self) -> Option<Button> {
        match self {
            Key::Mouse(button) => Some(*button),
            _ => None,
        }
    }

    /// Check if this is a mouse button rather than a keyboard key.
    pub fn is_mouse(&self) -> bool {
        self.as_button().is_some()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(i) = LETTERS.iter().position(|k| k == self) {
            return write!(f, "{}", (b'A' + i as u8) as char);
        }
        if let Some(i) = DIGITS.iter().position(|k| k == self) {
            return write!(f, "{i}");
        }
        if let Some(i) = FUNCTION_KEYS.iter().position(|k| k == self) {
            return write!(f, "F{}", i + 1);
        }
        if let Some(i) = NUMPAD.iter().position(|k| k == self) {
            return write!(f, "NumPad{i}");
        }

        let name = match self {
            Key::Space => "Space",
            Key::Enter => "Enter",
            Key::Escape => "Escape",
            Key::Tab => "Tab",
            Key::Backspace => "Backspace",
            Key::Delete => "Delete",
            Key::Insert => "Insert",
            Key::Home => "Home",
            Key::End => "End",
            Key::PageUp => "PageUp",
            Key::PageDown => "PageDown",
            Key::ArrowUp => "Up",
            Key::ArrowDown => "Down",
            Key::ArrowLeft => "Left",
            Key::ArrowRight => "Right",
            Key::Shift => "Shift",
            Key::Control => "Ctrl",
            Key::Alt => "Alt",
            Key::Mouse(Button::Left) => "Left Click",
            Key::Mouse(Button::Right) => "Right Click",
            Key::Mouse(Button::Middle) => "Middle Click",
            Key::Mouse(Button::X1) => "Mouse X1",
            Key::Mouse(Button::X2) => "Mouse X2",
            _ => "?",
        };
        f.write_str(name)
    }
}

/// A configuration slot: either a resolved key or explicitly disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Binding {
    /// The slot is unused; every operation against it is skipped.
    #[default]
    Disabled,
    /// The slot drives this key.
    Key(Key),
}

impl Binding {
    /// Resolve a name that may refer to a keyboard key or a mouse button.
    ///
    /// Empty names, the `Disabled`/`None` sentinels and unknown names all
    /// resolve to [`Binding::Disabled`].
    pub fn parse(name: &str) -> Binding {
        let trimmed = name.trim();
        if trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("disabled")
            || trimmed.eq_ignore_ascii_case("none")
        {
            return Binding::Disabled;
        }

        match Key::from_name(trimmed) {
            Some(key) => Binding::Key(key),
            None => {
                log::debug!("unknown key name {trimmed:?}, slot disabled");
                Binding::Disabled
            }
        }
    }

    /// Resolve a name that must refer to a keyboard key.
    ///
    /// Mouse button names resolve to [`Binding::Disabled`] because the key
    /// hook only sees keyboard events.
    pub fn parse_keyboard(name: &str) -> Binding {
        match Binding::parse(name) {
            Binding::Key(key) if key.is_mouse() => {
                log::debug!("mouse binding {key} not allowed here, slot disabled");
                Binding::Disabled
            }
            other => other,
        }
    }

    /// The bound key, or `None` when disabled.
    pub fn key(&self) -> Option<Key> {
        match self {
            Binding::Key(key) => Some(*key),
            Binding::Disabled => None,
        }
    }

    /// Check if this slot is disabled.
    pub fn is_disabled(&self) -> bool {
        matches!(self, Binding::Disabled)
    }
}

impl From<Key> for Binding {
    fn from(key: Key) -> Self {
        Binding::Key(key)
    }
}

impl From<Option<Key>> for Binding {
    fn from(key: Option<Key>) -> Self {
        key.map_or(Binding::Disabled, Binding::Key)
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Key(key) => fmt::Display::fmt(key, f),
            Binding::Disabled => f.write_str("Disabled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_characters() {
        assert_eq!(Key::from_name("a"), Some(Key::KeyA));
        assert_eq!(Key::from_name("Z"), Some(Key::KeyZ));
        assert_eq!(Key::from_name("7"), Some(Key::Num7));
        assert_eq!(Key::from_name("#"), None);
    }

    #[test]
    fn test_named_keys() {
        assert_eq!(Key::from_name("F1"), Some(Key::F1));
        assert_eq!(Key::from_name("f12"), Some(Key::F12));
        assert_eq!(Key::from_name("F13"), None);
        assert_eq!(Key::from_name("F0"), None);
        assert_eq!(Key::from_name("NumPad4"), Some(Key::Numpad4));
        assert_eq!(Key::from_name("NUMPAD9"), Some(Key::Numpad9));
        assert_eq!(Key::from_name("ctrl"), Some(Key::Control));
        assert_eq!(Key::from_name(" Space "), Some(Key::Space));
        assert_eq!(Key::from_name("Left"), Some(Key::ArrowLeft));
    }

    #[test]
    fn test_mouse_names() {
        assert_eq!(Key::from_name("Left Click"), Some(Key::Mouse(Button::Left)));
        assert_eq!(Key::from_name("mouse x2"), Some(Key::Mouse(Button::X2)));
        assert!(Key::from_name("Mouse X1").is_some_and(|k| k.is_mouse()));
    }

    #[test]
    fn test_display_round_trips_through_from_name() {
        for key in [
            Key::KeyQ,
            Key::Num0,
            Key::F10,
            Key::Numpad3,
            Key::PageDown,
            Key::ArrowUp,
            Key::Control,
            Key::Mouse(Button::Middle),
        ] {
            assert_eq!(Key::from_name(&key.to_string()), Some(key));
        }
    }

    #[test]
    fn test_binding_sentinels() {
        assert_eq!(Binding::parse(""), Binding::Disabled);
        assert_eq!(Binding::parse("   "), Binding::Disabled);
        assert_eq!(Binding::parse("disabled"), Binding::Disabled);
        assert_eq!(Binding::parse("None"), Binding::Disabled);
        assert_eq!(Binding::parse("NotAKey"), Binding::Disabled);
        assert_eq!(Binding::parse("e"), Binding::Key(Key::KeyE));
    }

    #[test]
    fn test_keyboard_binding_rejects_mouse() {
        assert_eq!(Binding::parse_keyboard("Right Click"), Binding::Disabled);
        assert_eq!(Binding::parse_keyboard("P"), Binding::Key(Key::KeyP));
        assert_eq!(
            Binding::parse("Right Click"),
            Binding::Key(Key::Mouse(Button::Right))
        );
    }

    #[test]
    fn test_binding_conversions() {
        assert_eq!(Binding::from(Key::KeyR).key(), Some(Key::KeyR));
        assert!(Binding::from(None::<Key>).is_disabled());
        assert_eq!(Binding::Disabled.to_string(), "Disabled");
    }
}
