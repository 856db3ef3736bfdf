//! Common types and utilities shared by the package and backend layers.

// Submodule declarations
pub mod bom;
pub mod detection;
pub mod error;
pub mod xml;

// Re-exports for convenience
pub use detection::{FileFormat, detect_file_format, detect_file_format_from_bytes};
pub use error::{Error, ErrorKind, FormatError, Result};
