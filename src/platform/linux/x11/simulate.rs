//! X11 input injection using XTest.

use crate::error::{Error, Result};
use crate::event::Button;
use crate::keycode::Key;
use std::os::raw::{c_int, c_uint};
use x11::xlib;
use x11::xtest;

use super::state::with_display;
use crate::platform::linux::keycodes::key_to_keycode;

const TRUE: c_int = 1;
const FALSE: c_int = 0;

/// X11 button number for a mouse button.
fn button_to_code(button: Button) -> c_uint {
    match button {
        Button::Left => 1,
        Button::Middle => 2,
        Button::Right => 3,
        Button::X1 => 8,
        Button::X2 => 9,
    }
}

fn fake_key(key: Key, is_press: c_int) -> Result<()> {
    let keycode = key_to_keycode(key)
        .ok_or_else(|| Error::SimulateFailed(format!("unsupported key: {key}")))?;

    let result = with_display(|display| unsafe {
        let result = xtest::XTestFakeKeyEvent(display, keycode, is_press, 0);
        xlib::XFlush(display);
        result
    })?;

    if result == 0 {
        Err(Error::SimulateFailed("XTestFakeKeyEvent failed".into()))
    } else {
        Ok(())
    }
}

fn fake_button(button: Button, is_press: c_int) -> Result<()> {
    let code = button_to_code(button);
    let result = with_display(|display| unsafe {
        let result = xtest::XTestFakeButtonEvent(display, code, is_press, 0);
        xlib::XFlush(display);
        result
    })?;

    if result == 0 {
        Err(Error::SimulateFailed("XTestFakeButtonEvent failed".into()))
    } else {
        Ok(())
    }
}

pub fn key_press(key: Key) -> Result<()> {
    fake_key(key, TRUE)
}

pub fn key_release(key: Key) -> Result<()> {
    fake_key(key, FALSE)
}

pub fn mouse_press(button: Button) -> Result<()> {
    fake_button(button, TRUE)
}

pub fn mouse_release(button: Button) -> Result<()> {
    fake_button(button, FALSE)
}
