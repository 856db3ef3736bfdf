//! One operation set over two backends.
//!
//! [`DirectBackend`] edits a [`DocumentModel`](crate::document::DocumentModel)
//! and writes HWPX itself. [`AutomationBackend`] forwards every call to a
//! running office application through an [`AutomationService`]. Both
//! implement [`CapabilityBackend`]; [`Backend`] is the closed handle a
//! [`BackendSelector`] hands out.
//!
//! An operation a backend does not support fails with
//! [`Error::Capability`](crate::Error::Capability) before anything happens.

use std::fmt;
use std::path::{Path, PathBuf};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::common::{Error, Result};
use crate::document::{Alignment, Anchor, DocumentInfo, FontSpec, NodeId, Range, TextMatch};
use crate::hwpx::Diagnostic;

pub mod automation;
mod direct;
mod selector;
pub(crate) mod validate;

pub use automation::{
    AutomationBackend, AutomationService, ConnectionError, HostError, InvokeError, Parameters,
    SessionHandle, Ticket,
};
pub use direct::DirectBackend;
pub use selector::BackendSelector;

/// Every operation of the backend surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Open,
    /// Opening a legacy binary HWP document.
    OpenLegacy,
    CreateNew,
    Save,
    Close,
    InsertText,
    InsertParagraph,
    GetText,
    FindText,
    ReplaceText,
    CreateTable,
    GetCell,
    SetCell,
    InsertRow,
    DeleteRow,
    SetFont,
    SetAlignment,
    ExportPdf,
    DocumentInfo,
}

impl Operation {
    pub const ALL: [Operation; 19] = [
        Operation::Open,
        Operation::OpenLegacy,
        Operation::CreateNew,
        Operation::Save,
        Operation::Close,
        Operation::InsertText,
        Operation::InsertParagraph,
        Operation::GetText,
        Operation::FindText,
        Operation::ReplaceText,
        Operation::CreateTable,
        Operation::GetCell,
        Operation::SetCell,
        Operation::InsertRow,
        Operation::DeleteRow,
        Operation::SetFont,
        Operation::SetAlignment,
        Operation::ExportPdf,
        Operation::DocumentInfo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Open => "open",
            Operation::OpenLegacy => "openLegacy",
            Operation::CreateNew => "createNew",
            Operation::Save => "save",
            Operation::Close => "close",
            Operation::InsertText => "insertText",
            Operation::InsertParagraph => "insertParagraph",
            Operation::GetText => "getText",
            Operation::FindText => "findText",
            Operation::ReplaceText => "replaceText",
            Operation::CreateTable => "createTable",
            Operation::GetCell => "getCell",
            Operation::SetCell => "setCell",
            Operation::InsertRow => "insertRow",
            Operation::DeleteRow => "deleteRow",
            Operation::SetFont => "setFont",
            Operation::SetAlignment => "setAlignment",
            Operation::ExportPdf => "exportPdf",
            Operation::DocumentInfo => "documentInfo",
        }
    }

    /// The capability flag gating this operation.
    pub fn capability(&self) -> Capabilities {
        match self {
            Operation::Open => Capabilities::OPEN,
            Operation::OpenLegacy => Capabilities::OPEN_LEGACY,
            Operation::CreateNew => Capabilities::CREATE_NEW,
            Operation::Save => Capabilities::SAVE,
            Operation::Close => Capabilities::CLOSE,
            Operation::InsertText => Capabilities::INSERT_TEXT,
            Operation::InsertParagraph => Capabilities::INSERT_PARAGRAPH,
            Operation::GetText => Capabilities::GET_TEXT,
            Operation::FindText => Capabilities::FIND_TEXT,
            Operation::ReplaceText => Capabilities::REPLACE_TEXT,
            Operation::CreateTable => Capabilities::CREATE_TABLE,
            Operation::GetCell => Capabilities::GET_CELL,
            Operation::SetCell => Capabilities::SET_CELL,
            Operation::InsertRow => Capabilities::INSERT_ROW,
            Operation::DeleteRow => Capabilities::DELETE_ROW,
            Operation::SetFont => Capabilities::SET_FONT,
            Operation::SetAlignment => Capabilities::SET_ALIGNMENT,
            Operation::ExportPdf => Capabilities::EXPORT_PDF,
            Operation::DocumentInfo => Capabilities::DOCUMENT_INFO,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    /// A set of [`Operation`]s.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Capabilities: u32 {
        const OPEN             = 1 << 0;
        const OPEN_LEGACY      = 1 << 1;
        const CREATE_NEW       = 1 << 2;
        const SAVE             = 1 << 3;
        const CLOSE            = 1 << 4;
        const INSERT_TEXT      = 1 << 5;
        const INSERT_PARAGRAPH = 1 << 6;
        const GET_TEXT         = 1 << 7;
        const FIND_TEXT        = 1 << 8;
        const REPLACE_TEXT     = 1 << 9;
        const CREATE_TABLE     = 1 << 10;
        const GET_CELL         = 1 << 11;
        const SET_CELL         = 1 << 12;
        const INSERT_ROW       = 1 << 13;
        const DELETE_ROW       = 1 << 14;
        const SET_FONT         = 1 << 15;
        const SET_ALIGNMENT    = 1 << 16;
        const EXPORT_PDF       = 1 << 17;
        const DOCUMENT_INFO    = 1 << 18;
    }
}

impl Capabilities {
    /// Operations only a live host can perform.
    pub const HOST_ONLY: Self = Self::EXPORT_PDF.union(Self::OPEN_LEGACY);

    /// The operations in this set, in declaration order.
    pub fn operations(&self) -> impl Iterator<Item = Operation> + '_ {
        Operation::ALL
            .into_iter()
            .filter(move |op| self.contains(op.capability()))
    }

    pub fn supports(&self, op: Operation) -> bool {
        self.contains(op.capability())
    }
}

impl From<Operation> for Capabilities {
    fn from(op: Operation) -> Self {
        op.capability()
    }
}

impl FromIterator<Operation> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Capabilities::empty(), |acc, op| acc | op.capability())
    }
}

fn unsupported<T>(operation: Operation, backend: &'static str) -> Result<T> {
    Err(Error::Capability { operation, backend })
}

/// The uniform operation surface.
///
/// Every method has a default that reports the operation as unsupported, so
/// an implementation only overrides what it can do and lists the same
/// operations in [`capabilities`](Self::capabilities). Methods take `&self`;
/// implementations serialize access internally and are safe to share across
/// threads.
pub trait CapabilityBackend: Send + Sync {
    /// Short name used in errors and logs.
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> Capabilities;

    /// Open a document, replacing any open one.
    fn open(&self, path: &Path) -> Result<Vec<Diagnostic>> {
        let _ = path;
        unsupported(Operation::Open, self.name())
    }

    fn create_new(&self) -> Result<()> {
        unsupported(Operation::CreateNew, self.name())
    }

    /// Save to `path`, or to where the document came from. Returns the path
    /// written.
    fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let _ = path;
        unsupported(Operation::Save, self.name())
    }

    fn close(&self) -> Result<()> {
        unsupported(Operation::Close, self.name())
    }

    fn insert_text(&self, anchor: &Anchor, text: &str) -> Result<()> {
        let _ = (anchor, text);
        unsupported(Operation::InsertText, self.name())
    }

    fn insert_paragraph(&self, anchor: &Anchor) -> Result<NodeId> {
        let _ = anchor;
        unsupported(Operation::InsertParagraph, self.name())
    }

    fn get_text(&self, range: Option<&Range>) -> Result<String> {
        let _ = range;
        unsupported(Operation::GetText, self.name())
    }

    fn find_text(&self, pattern: &str) -> Result<Vec<TextMatch>> {
        let _ = pattern;
        unsupported(Operation::FindText, self.name())
    }

    fn replace_text(&self, pattern: &str, replacement: &str) -> Result<usize> {
        let _ = (pattern, replacement);
        unsupported(Operation::ReplaceText, self.name())
    }

    fn create_table(&self, rows: usize, cols: usize) -> Result<NodeId> {
        let _ = (rows, cols);
        unsupported(Operation::CreateTable, self.name())
    }

    fn get_cell(&self, table: NodeId, row: usize, col: usize) -> Result<String> {
        let _ = (table, row, col);
        unsupported(Operation::GetCell, self.name())
    }

    fn set_cell(&self, table: NodeId, row: usize, col: usize, text: &str) -> Result<()> {
        let _ = (table, row, col, text);
        unsupported(Operation::SetCell, self.name())
    }

    fn insert_row(&self, table: NodeId, index: usize) -> Result<()> {
        let _ = (table, index);
        unsupported(Operation::InsertRow, self.name())
    }

    fn delete_row(&self, table: NodeId, index: usize) -> Result<()> {
        let _ = (table, index);
        unsupported(Operation::DeleteRow, self.name())
    }

    fn set_font(&self, range: &Range, spec: &FontSpec) -> Result<()> {
        let _ = (range, spec);
        unsupported(Operation::SetFont, self.name())
    }

    fn set_alignment(&self, range: &Range, alignment: Alignment) -> Result<()> {
        let _ = (range, alignment);
        unsupported(Operation::SetAlignment, self.name())
    }

    fn export_pdf(&self, path: &Path) -> Result<()> {
        let _ = path;
        unsupported(Operation::ExportPdf, self.name())
    }

    fn document_info(&self) -> Result<DocumentInfo> {
        unsupported(Operation::DocumentInfo, self.name())
    }
}

/// A bound backend.
///
/// Every call is checked against the variant's capability set before it is
/// dispatched.
pub enum Backend {
    Direct(DirectBackend),
    Automation(AutomationBackend),
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Backend").field(&self.name()).finish()
    }
}

impl Backend {
    fn inner(&self) -> &dyn CapabilityBackend {
        match self {
            Backend::Direct(b) => b,
            Backend::Automation(b) => b,
        }
    }

    fn gate(&self, op: Operation) -> Result<&dyn CapabilityBackend> {
        let inner = self.inner();
        if inner.capabilities().supports(op) {
            Ok(inner)
        } else {
            unsupported(op, inner.name())
        }
    }

    pub fn is_direct(&self) -> bool {
        matches!(self, Backend::Direct(_))
    }

    pub fn is_automation(&self) -> bool {
        matches!(self, Backend::Automation(_))
    }

    pub fn as_direct(&self) -> Option<&DirectBackend> {
        match self {
            Backend::Direct(b) => Some(b),
            Backend::Automation(_) => None,
        }
    }

    pub fn as_automation(&self) -> Option<&AutomationBackend> {
        match self {
            Backend::Automation(b) => Some(b),
            Backend::Direct(_) => None,
        }
    }
}

impl From<DirectBackend> for Backend {
    fn from(b: DirectBackend) -> Self {
        Backend::Direct(b)
    }
}

impl From<AutomationBackend> for Backend {
    fn from(b: AutomationBackend) -> Self {
        Backend::Automation(b)
    }
}

impl CapabilityBackend for Backend {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn capabilities(&self) -> Capabilities {
        self.inner().capabilities()
    }

    fn open(&self, path: &Path) -> Result<Vec<Diagnostic>> {
        self.gate(Operation::Open)?.open(path)
    }

    fn create_new(&self) -> Result<()> {
        self.gate(Operation::CreateNew)?.create_new()
    }

    fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        self.gate(Operation::Save)?.save(path)
    }

    fn close(&self) -> Result<()> {
        self.gate(Operation::Close)?.close()
    }

    fn insert_text(&self, anchor: &Anchor, text: &str) -> Result<()> {
        self.gate(Operation::InsertText)?.insert_text(anchor, text)
    }

    fn insert_paragraph(&self, anchor: &Anchor) -> Result<NodeId> {
        self.gate(Operation::InsertParagraph)?.insert_paragraph(anchor)
    }

    fn get_text(&self, range: Option<&Range>) -> Result<String> {
        self.gate(Operation::GetText)?.get_text(range)
    }

    fn find_text(&self, pattern: &str) -> Result<Vec<TextMatch>> {
        self.gate(Operation::FindText)?.find_text(pattern)
    }

    fn replace_text(&self, pattern: &str, replacement: &str) -> Result<usize> {
        self.gate(Operation::ReplaceText)?.replace_text(pattern, replacement)
    }

    fn create_table(&self, rows: usize, cols: usize) -> Result<NodeId> {
        self.gate(Operation::CreateTable)?.create_table(rows, cols)
    }

    fn get_cell(&self, table: NodeId, row: usize, col: usize) -> Result<String> {
        self.gate(Operation::GetCell)?.get_cell(table, row, col)
    }

    fn set_cell(&self, table: NodeId, row: usize, col: usize, text: &str) -> Result<()> {
        self.gate(Operation::SetCell)?.set_cell(table, row, col, text)
    }

    fn insert_row(&self, table: NodeId, index: usize) -> Result<()> {
        self.gate(Operation::InsertRow)?.insert_row(table, index)
    }

    fn delete_row(&self, table: NodeId, index: usize) -> Result<()> {
        self.gate(Operation::DeleteRow)?.delete_row(table, index)
    }

    fn set_font(&self, range: &Range, spec: &FontSpec) -> Result<()> {
        self.gate(Operation::SetFont)?.set_font(range, spec)
    }

    fn set_alignment(&self, range: &Range, alignment: Alignment) -> Result<()> {
        self.gate(Operation::SetAlignment)?.set_alignment(range, alignment)
    }

    fn export_pdf(&self, path: &Path) -> Result<()> {
        self.gate(Operation::ExportPdf)?.export_pdf(path)
    }

    fn document_info(&self) -> Result<DocumentInfo> {
        self.gate(Operation::DocumentInfo)?.document_info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_names_are_camel_case() {
        assert_eq!(Operation::ExportPdf.to_string(), "exportPdf");
        assert_eq!(Operation::OpenLegacy.to_string(), "openLegacy");
        let json = serde_json::to_string(&Operation::InsertParagraph).unwrap();
        assert_eq!(json, "\"insertParagraph\"");
    }

    #[test]
    fn test_every_operation_has_its_own_flag() {
        let all: Capabilities = Operation::ALL.into_iter().collect();
        assert_eq!(all, Capabilities::all());
        assert_eq!(all.operations().count(), Operation::ALL.len());
    }

    #[test]
    fn test_host_only_set() {
        let ops: Vec<_> = Capabilities::HOST_ONLY.operations().collect();
        assert_eq!(ops, [Operation::OpenLegacy, Operation::ExportPdf]);
        assert!(Capabilities::HOST_ONLY.supports(Operation::ExportPdf));
        assert!(!Capabilities::HOST_ONLY.supports(Operation::Save));
    }

    struct Nothing;

    impl CapabilityBackend for Nothing {
        fn name(&self) -> &'static str {
            "nothing"
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::empty()
        }
    }

    #[test]
    fn test_default_methods_report_capability_errors() {
        let err = Nothing.export_pdf(Path::new("x.pdf")).unwrap_err();
        assert!(matches!(
            err,
            Error::Capability {
                operation: Operation::ExportPdf,
                backend: "nothing"
            }
        ));
        assert_eq!(
            err.to_string(),
            "operation 'exportPdf' is not supported by the nothing backend"
        );
    }
}
