//! Linux platform implementation.
//!
//! ## Feature Flags
//!
//! - `x11` (default): XRecord for the key hook, XTest for injection and
//!   XQueryKeymap/XQueryPointer for key state.
//!
//! Without `x11` every call reports [`Error::NotSupported`](crate::error::Error).

#[cfg(feature = "x11")]
mod keycodes;

#[cfg(feature = "x11")]
mod x11;

#[cfg(feature = "x11")]
pub use x11::*;

#[cfg(not(feature = "x11"))]
pub use super::stub::*;
