//! Unified error types for hwpkit.
//!
//! Package, filesystem, host and argument failures all surface through one
//! [`Error`] type with a flat [`ErrorKind`].

// Submodule declarations
pub mod conversions;
pub mod types;

// Re-exports
pub use types::{Error, ErrorKind, FormatError, Result};
