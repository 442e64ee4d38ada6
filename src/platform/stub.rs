//! Fallback for targets without a native backend.
//!
//! Key state reads as up; everything else reports `NotSupported`.

use crate::error::{Error, Result};
use crate::event::Button;
use crate::hook::KeyHandler;
use crate::keycode::Key;
use std::sync::Arc;
use std::sync::mpsc::Sender;

fn unsupported() -> Error {
    Error::NotSupported("no input backend for this platform or feature set".into())
}

pub fn is_down(_key: Key) -> bool {
    false
}

pub fn key_press(_key: Key) -> Result<()> {
    Err(unsupported())
}

pub fn key_release(_key: Key) -> Result<()> {
    Err(unsupported())
}

pub fn mouse_press(_button: Button) -> Result<()> {
    Err(unsupported())
}

pub fn mouse_release(_button: Button) -> Result<()> {
    Err(unsupported())
}

pub fn run_key_hook(_handler: Arc<dyn KeyHandler>, ready: Sender<Result<()>>) -> Result<()> {
    let _ = ready.send(Err(unsupported()));
    Err(unsupported())
}

pub fn stop_key_hook() -> Result<()> {
    Ok(())
}
