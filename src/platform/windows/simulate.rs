//! Windows input injection using SendInput.

use crate::error::{Error, Result};
use crate::event::Button;
use crate::keycode::Key;
use std::mem::size_of;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBD_EVENT_FLAGS, KEYBDINPUT,
    KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, MAPVK_VK_TO_VSC, MOUSE_EVENT_FLAGS,
    MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MIDDLEDOWN, MOUSEEVENTF_MIDDLEUP,
    MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP, MOUSEEVENTF_XDOWN, MOUSEEVENTF_XUP, MOUSEINPUT,
    MapVirtualKeyW, SendInput, VIRTUAL_KEY,
};

use super::keycodes::{is_extended, key_to_vk};

const XBUTTON1: u32 = 0x0001;
const XBUTTON2: u32 = 0x0002;

fn send(input: INPUT, what: &str) -> Result<()> {
    let inputs = [input];
    let sent = unsafe { SendInput(&inputs, size_of::<INPUT>() as i32) };
    if sent != 1 {
        Err(Error::SimulateFailed(format!("SendInput failed for {what}")))
    } else {
        Ok(())
    }
}

/// Send a keyboard event with both the virtual key and its scan code; some
/// games read only the scan code.
fn sim_keyboard_event(key: Key, up: bool) -> Result<()> {
    let vk = key_to_vk(key)
        .ok_or_else(|| Error::SimulateFailed(format!("unsupported key: {key}")))?;
    let scan = unsafe { MapVirtualKeyW(u32::from(vk), MAPVK_VK_TO_VSC) } as u16;

    let mut flags = KEYBD_EVENT_FLAGS(0);
    if up {
        flags |= KEYEVENTF_KEYUP;
    }
    if is_extended(key) {
        flags |= KEYEVENTF_EXTENDEDKEY;
    }

    send(
        INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: VIRTUAL_KEY(vk),
                    wScan: scan,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        },
        "keyboard event",
    )
}

fn sim_mouse_event(flags: MOUSE_EVENT_FLAGS, data: u32) -> Result<()> {
    send(
        INPUT {
            r#type: INPUT_MOUSE,
            Anonymous: INPUT_0 {
                mi: MOUSEINPUT {
                    dx: 0,
                    dy: 0,
                    mouseData: data,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        },
        "mouse event",
    )
}

pub fn key_press(key: Key) -> Result<()> {
    sim_keyboard_event(key, false)
}

pub fn key_release(key: Key) -> Result<()> {
    sim_keyboard_event(key, true)
}

pub fn mouse_press(button: Button) -> Result<()> {
    match button {
        Button::Left => sim_mouse_event(MOUSEEVENTF_LEFTDOWN, 0),
        Button::Right => sim_mouse_event(MOUSEEVENTF_RIGHTDOWN, 0),
        Button::Middle => sim_mouse_event(MOUSEEVENTF_MIDDLEDOWN, 0),
        Button::X1 => sim_mouse_event(MOUSEEVENTF_XDOWN, XBUTTON1),
        Button::X2 => sim_mouse_event(MOUSEEVENTF_XDOWN, XBUTTON2),
    }
}

pub fn mouse_release(button: Button) -> Result<()> {
    match button {
        Button::Left => sim_mouse_event(MOUSEEVENTF_LEFTUP, 0),
        Button::Right => sim_mouse_event(MOUSEEVENTF_RIGHTUP, 0),
        Button::Middle => sim_mouse_event(MOUSEEVENTF_MIDDLEUP, 0),
        Button::X1 => sim_mouse_event(MOUSEEVENTF_XUP, XBUTTON1),
        Button::X2 => sim_mouse_event(MOUSEEVENTF_XUP, XBUTTON2),
    }
}
