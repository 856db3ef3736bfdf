//! HWPX (OWPML) package support.
//!
//! An HWPX file is a ZIP archive. [`PackageReader`] maps its header and
//! section parts into a [`DocumentModel`](crate::document::DocumentModel) and
//! keeps everything else as raw entries; [`PackageWriter`] rebuilds the
//! mapped parts and copies the rest back unchanged.
//!
//! # Example
//!
//! ```rust,no_run
//! use hwpkit::hwpx::{PackageReader, PackageWriter};
//!
//! let (doc, _diagnostics) = PackageReader::read("in.hwpx")?;
//! PackageWriter::write(&doc, "out.hwpx")?;
//! # Ok::<(), hwpkit::Error>(())
//! ```

pub mod constants;
mod header;
mod manifest;
pub(crate) mod package;
mod path;
mod reader;
mod section;
pub(crate) mod template;
mod writer;
mod xml;

pub use manifest::{Manifest, ManifestItem};
pub use package::{Entry, PackageState, PartRole};
pub use path::PartPath;
pub use reader::{Diagnostic, PackageReader};
pub(crate) use reader::assemble;
pub use writer::{PackageWriter, WriteStage};
