//! Shared X display connection and physical key state.

use crate::error::{Error, Result};
use crate::event::Button;
use crate::keycode::Key;
use std::os::raw::{c_char, c_int, c_uint};
use std::ptr::null;
use std::sync::{Mutex, PoisonError};
use x11::xlib;

use crate::platform::linux::keycodes::key_to_keycode;

/// Xlib display pointer.
struct Connection(*mut xlib::Display);

// SAFETY: the pointer is only used while `DISPLAY` is locked, so one thread
// at a time talks to the connection.
unsafe impl Send for Connection {}

/// Connection shared by state queries and injection. The aggregator polls
/// every few milliseconds, so it is opened once instead of per call.
static DISPLAY: Mutex<Option<Connection>> = Mutex::new(None);

/// Run `f` with the shared display, opening it on first use.
pub(super) fn with_display<T>(f: impl FnOnce(*mut xlib::Display) -> T) -> Result<T> {
    let mut guard = DISPLAY.lock().unwrap_or_else(PoisonError::into_inner);
    if guard.is_none() {
        let display = unsafe { xlib::XOpenDisplay(null()) };
        if display.is_null() {
            return Err(Error::Platform("failed to open X display".into()));
        }
        *guard = Some(Connection(display));
    }
    match guard.as_ref() {
        Some(conn) => Ok(f(conn.0)),
        None => Err(Error::Platform("X display unavailable".into())),
    }
}

/// Whether the key with X11 keycode `code` is down.
pub(super) fn keycode_down(code: u32) -> Result<bool> {
    with_display(|display| {
        let mut keys: [c_char; 32] = [0; 32];
        unsafe { xlib::XQueryKeymap(display, keys.as_mut_ptr()) };
        let byte = keys[(code / 8) as usize] as u8;
        byte & (1 << (code % 8)) != 0
    })
}

fn button_down(button: Button) -> Result<bool> {
    let mask: c_uint = match button {
        Button::Left => xlib::Button1Mask,
        Button::Middle => xlib::Button2Mask,
        Button::Right => xlib::Button3Mask,
        // The core protocol has no mask bits for the side buttons.
        Button::X1 | Button::X2 => return Ok(false),
    };

    with_display(|display| {
        let screen = unsafe { xlib::XDefaultScreen(display) };
        let root = unsafe { xlib::XRootWindow(display, screen) };

        let mut root_return = 0;
        let mut child_return = 0;
        let mut root_x: c_int = 0;
        let mut root_y: c_int = 0;
        let mut win_x: c_int = 0;
        let mut win_y: c_int = 0;
        let mut state: c_uint = 0;

        let found = unsafe {
            xlib::XQueryPointer(
                display,
                root,
                &mut root_return,
                &mut child_return,
                &mut root_x,
                &mut root_y,
                &mut win_x,
                &mut win_y,
                &mut state,
            )
        };
        found != 0 && state & mask != 0
    })
}

/// Whether the key or button is down right now. Failures read as up.
pub fn is_down(key: Key) -> bool {
    let result = match key.as_button() {
        Some(button) => button_down(button),
        None => match key_to_keycode(key) {
            Some(code) => keycode_down(code),
            None => Ok(false),
        },
    };
    result.unwrap_or_else(|e| {
        log::trace!("state query for {key} failed: {e}");
        false
    })
}
