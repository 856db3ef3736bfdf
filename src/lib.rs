//! hwpkit - read, edit and write HWPX word-processor documents
//!
//! The crate has two ways of working on a document:
//!
//! - **Direct**: [`hwpx::PackageReader`] maps an HWPX package into a
//!   [`document::DocumentModel`], edits are applied in memory, and
//!   [`hwpx::PackageWriter`] writes the package back atomically. Parts the
//!   model does not understand are carried through unchanged.
//! - **Automation**: operations are forwarded to a running office
//!   application through a caller-supplied
//!   [`backend::AutomationService`]. This is the only way to reach
//!   host-only features such as PDF export or legacy `.hwp` files.
//!
//! Both sit behind [`backend::CapabilityBackend`], and
//! [`backend::BackendSelector`] decides per session which one to bind.
//!
//! # Example - editing a document directly
//!
//! ```no_run
//! use hwpkit::backend::{BackendSelector, Capabilities, CapabilityBackend};
//! use hwpkit::config::EngineConfig;
//! use hwpkit::document::Anchor;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let selector = BackendSelector::new(EngineConfig::default());
//! let backend = selector.select(Capabilities::OPEN | Capabilities::SAVE)?;
//!
//! backend.open("report.hwpx".as_ref())?;
//! backend.insert_text(&Anchor::DocumentEnd, "Reviewed.")?;
//! let table = backend.create_table(2, 3)?;
//! backend.set_cell(table, 0, 0, "Total")?;
//! backend.save(None)?;
//! backend.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example - reading a package
//!
//! ```no_run
//! use hwpkit::hwpx::PackageReader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let (doc, diagnostics) = PackageReader::read("report.hwpx")?;
//! for d in &diagnostics {
//!     eprintln!("warning: {d}");
//! }
//! println!("{}", doc.text(None)?);
//! # Ok(())
//! # }
//! ```
//!
//! # Errors
//!
//! Every operation returns [`Result`]. [`Error::kind`] classifies failures
//! for retry and fallback decisions; see [`ErrorKind`].

pub mod backend;
pub mod common;
pub mod config;
pub mod document;
pub mod hwpx;

pub use common::{Error, ErrorKind, FormatError, Result};
