//! In-memory document model.
//!
//! A [`DocumentModel`] owns an ordered list of [`Section`]s; each section owns
//! [`Block`]s, which are either [`Paragraph`]s (a sequence of styled
//! [`Run`]s) or [`Table`]s (a fixed grid of [`Cell`]s that own blocks in
//! turn). Every structural node carries a [`NodeId`] that stays fixed for its
//! lifetime and is unique in the document.
//!
//! Runs and paragraphs reference styles in the [`StyleCatalog`] by id. Content
//! the model does not map travels along as [`Fragment`]s attached to the
//! nearest mapped node, so it survives a read-modify-write cycle.
//!
//! # Example
//!
//! ```rust,no_run
//! use hwpkit::document::{Anchor, Range};
//! use hwpkit::hwpx::PackageReader;
//!
//! let (mut doc, diagnostics) = PackageReader::read("report.hwpx")?;
//! for d in &diagnostics {
//!     eprintln!("warning: {d}");
//! }
//! doc.insert_text(&Anchor::DocumentEnd, "Appendix")?;
//! println!("{}", doc.text(Some(&Range::Document))?);
//! # Ok::<(), hwpkit::Error>(())
//! ```

mod doc;
mod element;
mod paragraph;
pub mod style;
mod table;
mod types;

pub(crate) use doc::SectionHead;
pub use doc::{BlockShape, DocumentModel, DocumentShape, Section};
pub use element::{Attr, Attrs, Block, Fragment};
pub use paragraph::{Paragraph, Run};
pub use style::{CharStyle, CharStyleId, ParaStyle, ParaStyleId, StyleCatalog};
pub use table::{Cell, Table, TableHost};
pub use types::{
    Alignment, Anchor, DocumentInfo, DocumentMetadata, FontSpec, NodeId, Range, TextMatch,
};
