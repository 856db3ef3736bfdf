//! The seam to an office application's automation interface.
//!
//! Platform bindings live outside this crate and implement
//! [`AutomationService`]. Command names and parameter schemas belong to the
//! host; the adapter only builds them and decodes the handful of result
//! fields it needs.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Named parameters of one host command.
pub type Parameters = serde_json::Map<String, Value>;

/// An established host session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionHandle(pub u64);

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// The host could not be started or attached to.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ConnectionError(pub String);

/// A command the host refused or failed to run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HostError {
    /// Host-specific status code, when it reports one.
    pub code: Option<i64>,
    pub message: String,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvokeError {
    /// The command reached the host and failed there. The session is still
    /// usable.
    #[error(transparent)]
    Rejected(#[from] HostError),
    /// The host went away. The session is dead.
    #[error("host disconnected: {0}")]
    Disconnected(String),
}

/// A running office application that accepts named commands.
///
/// Calls for one session arrive from a single worker thread, one at a time
/// and in submission order. `invoke` may block for as long as the host
/// takes.
pub trait AutomationService: Send + Sync {
    /// Cheap check for whether a host could be reached at all, such as the
    /// application being installed. Defaults to `true`, leaving the real
    /// answer to [`connect_or_attach`](Self::connect_or_attach).
    fn is_available(&self) -> bool {
        true
    }

    /// Attach to a running host or start one.
    fn connect_or_attach(&self) -> Result<SessionHandle, ConnectionError>;

    fn invoke(
        &self,
        session: &SessionHandle,
        command: &str,
        params: Parameters,
    ) -> Result<Value, InvokeError>;

    /// Release the session. Errors are the binding's to log.
    fn disconnect(&self, session: SessionHandle);
}
