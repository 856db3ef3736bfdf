//! Backend that drives a running office application.
//!
//! [`AutomationBackend`] turns each operation into named host commands
//! (see the table in `command.rs`) and runs them through a per-session FIFO
//! queue. The host binding itself is supplied by the caller as an
//! [`AutomationService`].

mod backend;
mod command;
mod queue;
mod service;

pub use backend::AutomationBackend;
pub use queue::Ticket;
pub use service::{
    AutomationService, ConnectionError, HostError, InvokeError, Parameters, SessionHandle,
};
