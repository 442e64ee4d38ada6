//! Platform-specific implementations.
//!
//! Every backend exposes the same free functions: `is_down`, `key_press`,
//! `key_release`, `mouse_press`, `mouse_release`, `run_key_hook` and
//! `stop_key_hook`.

#[cfg(target_os = "windows")]
mod windows;
#[cfg(target_os = "windows")]
pub use windows::*;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::*;

#[cfg(any(
    not(any(target_os = "windows", target_os = "linux")),
    all(target_os = "linux", not(feature = "x11"))
))]
mod stub;
#[cfg(not(any(target_os = "windows", target_os = "linux")))]
pub use stub::*;
