//! Physical key state via GetAsyncKeyState.

use crate::keycode::Key;
use windows::Win32::UI::Input::KeyboardAndMouse::GetAsyncKeyState;

use super::keycodes::key_to_vk;

/// Whether the key or button is down right now. Unmapped keys read as up.
pub fn is_down(key: Key) -> bool {
    let Some(vk) = key_to_vk(key) else {
        return false;
    };
    let state = unsafe { GetAsyncKeyState(i32::from(vk)) };
    (state as u16) & 0x8000 != 0
}
