//! Windows virtual-key mappings.

use crate::event::Button;
use crate::keycode::{DIGITS, FUNCTION_KEYS, Key, LETTERS, NUMPAD};

const VK_LETTER_A: u16 = 0x41;
const VK_DIGIT_0: u16 = 0x30;
const VK_F1: u16 = 0x70;
const VK_NUMPAD0: u16 = 0x60;

const NAMED_CODES: [(Key, u16); 23] = [
    (Key::Space, 0x20),
    (Key::Enter, 0x0D),
    (Key::Escape, 0x1B),
    (Key::Tab, 0x09),
    (Key::Backspace, 0x08),
    (Key::Delete, 0x2E),
    (Key::Insert, 0x2D),
    (Key::Home, 0x24),
    (Key::End, 0x23),
    (Key::PageUp, 0x21),
    (Key::PageDown, 0x22),
    (Key::ArrowUp, 0x26),
    (Key::ArrowDown, 0x28),
    (Key::ArrowLeft, 0x25),
    (Key::ArrowRight, 0x27),
    (Key::Shift, 0x10),
    (Key::Control, 0x11),
    (Key::Alt, 0x12),
    (Key::Mouse(Button::Left), 0x01),
    (Key::Mouse(Button::Right), 0x02),
    (Key::Mouse(Button::Middle), 0x04),
    (Key::Mouse(Button::X1), 0x05),
    (Key::Mouse(Button::X2), 0x06),
];

/// The low-level hook reports sided modifier codes.
const SIDED_MODIFIERS: [(Key, u16); 6] = [
    (Key::Shift, 0xA0),
    (Key::Shift, 0xA1),
    (Key::Control, 0xA2),
    (Key::Control, 0xA3),
    (Key::Alt, 0xA4),
    (Key::Alt, 0xA5),
];

fn offset_in(group: &[Key], key: Key, base: u16) -> Option<u16> {
    group
        .iter()
        .position(|k| *k == key)
        .map(|i| base + i as u16)
}

/// Virtual-key code for a key or mouse button.
pub fn key_to_vk(key: Key) -> Option<u16> {
    offset_in(&LETTERS, key, VK_LETTER_A)
        .or_else(|| offset_in(&DIGITS, key, VK_DIGIT_0))
        .or_else(|| offset_in(&FUNCTION_KEYS, key, VK_F1))
        .or_else(|| offset_in(&NUMPAD, key, VK_NUMPAD0))
        .or_else(|| {
            NAMED_CODES
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, vk)| *vk)
        })
}

/// Keyboard key for a virtual-key code reported by the hook.
pub fn vk_to_key(vk: u32) -> Option<Key> {
    let vk = u16::try_from(vk).ok()?;
    let in_range = |base: u16, group: &[Key]| {
        vk.checked_sub(base)
            .and_then(|i| group.get(usize::from(i)).copied())
    };

    in_range(VK_LETTER_A, &LETTERS)
        .or_else(|| in_range(VK_DIGIT_0, &DIGITS))
        .or_else(|| in_range(VK_F1, &FUNCTION_KEYS))
        .or_else(|| in_range(VK_NUMPAD0, &NUMPAD))
        .or_else(|| {
            NAMED_CODES
                .iter()
                .chain(SIDED_MODIFIERS.iter())
                .find(|(k, code)| *code == vk && !k.is_mouse())
                .map(|(k, _)| *k)
        })
}

/// Keys that need `KEYEVENTF_EXTENDEDKEY` when injected.
pub fn is_extended(key: Key) -> bool {
    matches!(
        key,
        Key::Delete
            | Key::Insert
            | Key::Home
            | Key::End
            | Key::PageUp
            | Key::PageDown
            | Key::ArrowUp
            | Key::ArrowDown
            | Key::ArrowLeft
            | Key::ArrowRight
    )
}
