//! Windows implementation.

mod keycodes;
mod listen;
mod simulate;
mod state;

pub use listen::{run_key_hook, stop_key_hook};
pub use simulate::{key_press, key_release, mouse_press, mouse_release};
pub use state::is_down;
