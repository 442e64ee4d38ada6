//! Error types for the automation engine.

use thiserror::Error;

/// Result type alias for holdfast operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving input.
#[derive(Debug, Error)]
pub enum Error {
    /// The engine is already running.
    #[error("engine is already running")]
    AlreadyRunning,

    /// Failed to install the global key hook.
    #[error("failed to install hook: {0}")]
    HookInstallFailed(String),

    /// Failed to remove the global key hook.
    #[error("failed to uninstall hook: {0}")]
    HookUninstallFailed(String),

    /// Failed to inject a synthetic event.
    #[error("failed to simulate input: {0}")]
    SimulateFailed(String),

    /// The configuration cannot be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Platform-specific error.
    #[error("platform error: {0}")]
    Platform(String),

    /// Thread-related error.
    #[error("thread error: {0}")]
    ThreadError(String),

    /// The requested feature is not supported on this platform.
    #[error("not supported: {0}")]
    NotSupported(String),
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Error::ThreadError("mutex poisoned".into())
    }
}
