//! Error conversion implementations.
//!
//! This module contains From trait implementations to convert from
//! third-party error types to the unified Error type.

use super::types::{Error, FormatError};

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Error::Io(e),
            zip::result::ZipError::InvalidArchive(msg) => {
                Error::Format(FormatError::NotPackage(msg.to_string()))
            },
            other => Error::Format(FormatError::Zip(other.to_string())),
        }
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        // The temporary file is dropped along with the error, which removes it.
        Error::Io(err.error)
    }
}
