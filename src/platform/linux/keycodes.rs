//! X11 keycode mappings (X11 keycode = evdev keycode + 8, US layout).

use crate::keycode::{DIGITS, FUNCTION_KEYS, Key, LETTERS, NUMPAD};

/// X11 keycodes in [`LETTERS`] order (QWERTY positions).
const LETTER_CODES: [u32; 26] = [
    38, 56, 54, 40, 26, 41, 42, 43, 31, 44, 45, 46, 58, 57, 32, 33, 24, 27, 39, 28, 30, 55, 25,
    53, 29, 52,
];

/// X11 keycodes in [`DIGITS`] order.
const DIGIT_CODES: [u32; 10] = [19, 10, 11, 12, 13, 14, 15, 16, 17, 18];

/// X11 keycodes in [`FUNCTION_KEYS`] order.
const FUNCTION_CODES: [u32; 12] = [67, 68, 69, 70, 71, 72, 73, 74, 75, 76, 95, 96];

/// X11 keycodes in [`NUMPAD`] order.
const NUMPAD_CODES: [u32; 10] = [90, 87, 88, 89, 83, 84, 85, 79, 80, 81];

/// Everything that is not in one of the ordered groups. Modifiers map to
/// their left-hand key; the right-hand codes are accepted when decoding.
const NAMED_CODES: [(Key, u32); 18] = [
    (Key::Space, 65),
    (Key::Enter, 36),
    (Key::Escape, 9),
    (Key::Tab, 23),
    (Key::Backspace, 22),
    (Key::Delete, 119),
    (Key::Insert, 118),
    (Key::Home, 110),
    (Key::End, 115),
    (Key::PageUp, 112),
    (Key::PageDown, 117),
    (Key::ArrowUp, 111),
    (Key::ArrowDown, 116),
    (Key::ArrowLeft, 113),
    (Key::ArrowRight, 114),
    (Key::Shift, 50),
    (Key::Control, 37),
    (Key::Alt, 64),
];

const RIGHT_MODIFIERS: [(Key, u32); 3] = [(Key::Shift, 62), (Key::Control, 105), (Key::Alt, 108)];

fn groups() -> impl Iterator<Item = (Key, u32)> {
    LETTERS
        .into_iter()
        .zip(LETTER_CODES)
        .chain(DIGITS.into_iter().zip(DIGIT_CODES))
        .chain(FUNCTION_KEYS.into_iter().zip(FUNCTION_CODES))
        .chain(NUMPAD.into_iter().zip(NUMPAD_CODES))
        .chain(NAMED_CODES)
}

/// X11 keycode for a keyboard key. Mouse buttons have none.
pub fn key_to_keycode(key: Key) -> Option<u32> {
    groups().find(|(k, _)| *k == key).map(|(_, code)| code)
}

/// Key for an X11 keycode, if the engine knows it.
pub fn keycode_to_key(code: u32) -> Option<Key> {
    groups()
        .chain(RIGHT_MODIFIERS)
        .find(|(_, c)| *c == code)
        .map(|(key, _)| key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Button;

    #[test]
    fn test_letter_codes() {
        assert_eq!(key_to_keycode(Key::KeyA), Some(38));
        assert_eq!(key_to_keycode(Key::KeyE), Some(26));
        assert_eq!(key_to_keycode(Key::KeyZ), Some(52));
        assert_eq!(keycode_to_key(33), Some(Key::KeyP));
    }

    #[test]
    fn test_named_codes() {
        assert_eq!(key_to_keycode(Key::Num0), Some(19));
        assert_eq!(key_to_keycode(Key::F12), Some(96));
        assert_eq!(key_to_keycode(Key::Numpad7), Some(79));
        assert_eq!(key_to_keycode(Key::Space), Some(65));
    }

    #[test]
    fn test_right_modifiers_decode() {
        assert_eq!(keycode_to_key(62), Some(Key::Shift));
        assert_eq!(keycode_to_key(105), Some(Key::Control));
        assert_eq!(key_to_keycode(Key::Alt), Some(64));
    }

    #[test]
    fn test_unmapped() {
        assert_eq!(key_to_keycode(Key::Mouse(Button::Left)), None);
        assert_eq!(keycode_to_key(255), None);
    }
}
