//! Unified error types for hwpkit.
//!
//! Every fallible operation in the crate returns [`Error`]. Callers that need
//! to decide between retrying, falling back to another backend, or notifying
//! the user should branch on [`Error::kind`] rather than on the variant
//! payloads.
use thiserror::Error;

use crate::backend::Operation;

/// Malformed or unsupported package content.
///
/// Format errors are never retried; they identify the offending part so the
/// caller can report it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Neither `META-INF/container.xml` nor the default manifest path names a
    /// readable manifest.
    #[error("package has no manifest")]
    MissingManifest,

    /// A part the manifest declares as mandatory is absent from the archive.
    #[error("part '{0}' is declared by the manifest but missing from the archive")]
    MissingPart(String),

    /// A mandatory content part is not well-formed XML.
    #[error("malformed XML in '{part}': {cause}")]
    MalformedXml { part: String, cause: String },

    /// A content part is not UTF-8.
    #[error("unsupported encoding in '{part}': {detail}")]
    Encoding { part: String, detail: String },

    /// The file is a legacy binary (OLE2) HWP document.
    #[error("legacy binary HWP document")]
    LegacyBinary,

    /// The file is not a ZIP archive, or the archive is not an HWPX package.
    #[error("not an HWPX package: {0}")]
    NotPackage(String),

    /// An archive entry name is not a valid part path.
    #[error("invalid part path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// The ZIP container itself is damaged.
    #[error("ZIP error: {0}")]
    Zip(String),

    /// The header part could not be mapped, so styles are read-only.
    #[error("style catalog unavailable: {0}")]
    StylesUnavailable(String),
}

impl FormatError {
    /// Shorthand for [`FormatError::MalformedXml`].
    pub fn malformed(part: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        FormatError::MalformedXml {
            part: part.into(),
            cause: cause.to_string(),
        }
    }

    /// Shorthand for [`FormatError::Encoding`].
    pub fn encoding(part: impl Into<String>, detail: impl Into<String>) -> Self {
        FormatError::Encoding {
            part: part.into(),
            detail: detail.into(),
        }
    }
}

/// Main error type for hwpkit operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or unsupported package content.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Filesystem failure. The caller may retry.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The automation host could not be reached, or dropped the session.
    #[error("automation host unavailable: {0}")]
    Connection(String),

    /// The bound backend does not implement the operation.
    #[error("operation '{operation}' is not supported by the {backend} backend")]
    Capability {
        operation: Operation,
        backend: &'static str,
    },

    /// A caller-supplied argument is out of range or otherwise invalid.
    /// No state was changed.
    #[error("invalid argument '{argument}': {reason}")]
    Validation { argument: String, reason: String },

    /// A host round trip exceeded its budget. The outcome is unknown: the host
    /// may still complete the command.
    #[error("command '{command}' (seq {seq}) timed out after {elapsed_ms} ms")]
    Timeout {
        command: String,
        seq: u64,
        elapsed_ms: u64,
    },

    /// The automation host rejected a command.
    #[error("host rejected '{command}': {detail}")]
    Host { command: String, detail: String },

    /// Engine configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Flat classification of [`Error`] for retry/fallback decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Format,
    Io,
    Connection,
    Capability,
    Validation,
    Timeout,
    Host,
    Config,
}

impl Error {
    /// Shorthand for [`Error::Validation`].
    pub fn validation(argument: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Validation {
            argument: argument.into(),
            reason: reason.into(),
        }
    }

    /// The flat kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Format(_) => ErrorKind::Format,
            Error::Io(_) => ErrorKind::Io,
            Error::Connection(_) => ErrorKind::Connection,
            Error::Capability { .. } => ErrorKind::Capability,
            Error::Validation { .. } => ErrorKind::Validation,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::Host { .. } => ErrorKind::Host,
            Error::Config(_) => ErrorKind::Config,
        }
    }

    /// Whether repeating the same call could plausibly succeed.
    ///
    /// Timeouts are excluded: the first attempt may still be running on the
    /// host.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Io | ErrorKind::Connection)
    }
}

/// Result type for hwpkit operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err: Error = FormatError::MissingManifest.into();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(!err.is_retryable());

        let err = Error::validation("row", "out of range");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "invalid argument 'row': out of range");

        let err = Error::Connection("refused".to_string());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_capability_message_names_operation() {
        let err = Error::Capability {
            operation: Operation::ExportPdf,
            backend: "direct",
        };
        assert_eq!(
            err.to_string(),
            "operation 'exportPdf' is not supported by the direct backend"
        );
    }

    #[test]
    fn test_malformed_carries_part() {
        let err = FormatError::malformed("Contents/section0.xml", "unexpected EOF");
        assert_eq!(
            err,
            FormatError::MalformedXml {
                part: "Contents/section0.xml".to_string(),
                cause: "unexpected EOF".to_string(),
            }
        );
    }
}
