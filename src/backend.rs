//! Input state reader and synthetic input writer.
//!
//! [`InputBackend`] is the seam between the engines and the OS. The default
//! [`SystemBackend`] forwards to the platform layer; tests substitute a
//! recording backend.

use crate::error::Result;
use crate::keycode::Key;
use crate::platform;
use std::sync::Arc;
use std::time::Duration;

/// Pause between the down and up halves of a tap.
pub const TAP_PAUSE: Duration = Duration::from_millis(1);

/// Query and inject keyboard keys and mouse buttons.
pub trait InputBackend: Send + Sync {
    /// Whether the key or button is physically down right now.
    ///
    /// Query failures read as "not down".
    fn is_down(&self, key: Key) -> bool;

    /// Inject a key-down / button-down.
    fn press(&self, key: Key) -> Result<()>;

    /// Inject a key-up / button-up.
    fn release(&self, key: Key) -> Result<()>;
}

/// Backend using the platform's native input APIs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBackend;

impl InputBackend for SystemBackend {
    fn is_down(&self, key: Key) -> bool {
        platform::is_down(key)
    }

    fn press(&self, key: Key) -> Result<()> {
        match key.as_button() {
            Some(button) => platform::mouse_press(button),
            None => platform::key_press(key),
        }
    }

    fn release(&self, key: Key) -> Result<()> {
        match key.as_button() {
            Some(button) => platform::mouse_release(button),
            None => platform::key_release(key),
        }
    }
}

/// A key the engine pressed and has not released yet.
///
/// Dropping a `HeldKey` that is still held releases it, so a key pressed by
/// the engine cannot outlive the state that owns it.
pub struct HeldKey {
    backend: Arc<dyn InputBackend>,
    key: Key,
    held: bool,
}

impl HeldKey {
    /// Press `key` and take ownership of releasing it.
    pub fn press(backend: Arc<dyn InputBackend>, key: Key) -> Result<Self> {
        backend.press(key)?;
        Ok(Self {
            backend,
            key,
            held: true,
        })
    }

    pub fn key(&self) -> Key {
        self.key
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Release the key now. Releasing twice is a no-op.
    ///
    /// On failure the key stays marked held and drop tries once more.
    pub fn release(&mut self) -> Result<()> {
        if !self.held {
            return Ok(());
        }
        self.backend.release(self.key)?;
        self.held = false;
        Ok(())
    }
}

impl Drop for HeldKey {
    fn drop(&mut self) {
        if self.held {
            if let Err(e) = self.backend.release(self.key) {
                log::warn!("failed to release {} on drop: {e}", self.key);
            }
        }
    }
}

impl std::fmt::Debug for HeldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeldKey")
            .field("key", &self.key)
            .field("held", &self.held)
            .finish()
    }
}
