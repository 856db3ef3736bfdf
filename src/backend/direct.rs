//! In-process backend over [`DocumentModel`].

use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::{Capabilities, CapabilityBackend, Operation, validate};
use crate::common::{Error, FileFormat, Result, detect_file_format};
use crate::config::EngineConfig;
use crate::document::{Alignment, Anchor, DocumentInfo, DocumentModel, FontSpec, NodeId, Range, TextMatch};
use crate::hwpx::{Diagnostic, PackageReader, PackageWriter, assemble, template};

/// Edits HWPX packages without an office application.
///
/// Holds at most one open document. Calls are serialized by an internal
/// lock, so a shared `DirectBackend` sees every operation as atomic.
pub struct DirectBackend {
    config: EngineConfig,
    document: Mutex<Option<DocumentModel>>,
}

impl DirectBackend {
    pub const NAME: &'static str = "direct";

    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            document: Mutex::new(None),
        }
    }

    /// Everything except the host-only operations.
    pub fn supported() -> Capabilities {
        Capabilities::all().difference(Capabilities::HOST_ONLY)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.document.lock().is_some()
    }

    /// Run `f` against the open document.
    pub fn with_document<R>(&self, f: impl FnOnce(&DocumentModel) -> R) -> Result<R> {
        let guard = self.document.lock();
        let doc = guard.as_ref().ok_or_else(no_document)?;
        Ok(f(doc))
    }

    fn edit<R>(&self, f: impl FnOnce(&mut DocumentModel) -> Result<R>) -> Result<R> {
        let mut guard = self.document.lock();
        let doc = guard.as_mut().ok_or_else(no_document)?;
        f(doc)
    }

    fn replace(&self, doc: DocumentModel) {
        let previous = self.document.lock().replace(doc);
        if previous.is_some() {
            debug!("discarded previously open document");
        }
    }
}

impl Default for DirectBackend {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

fn no_document() -> Error {
    Error::validation("document", "no document is open")
}

impl CapabilityBackend for DirectBackend {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn capabilities(&self) -> Capabilities {
        Self::supported()
    }

    fn open(&self, path: &Path) -> Result<Vec<Diagnostic>> {
        validate::path(path)?;
        if detect_file_format(path)? == Some(FileFormat::Hwp) {
            return Err(Error::Capability {
                operation: Operation::OpenLegacy,
                backend: Self::NAME,
            });
        }
        let (doc, diagnostics) = PackageReader::read(path)?;
        info!(
            path = %path.display(),
            paragraphs = doc.paragraphs().len(),
            diagnostics = diagnostics.len(),
            "opened document"
        );
        self.replace(doc);
        Ok(diagnostics)
    }

    fn create_new(&self) -> Result<()> {
        let (doc, _) = assemble(template::entries(&self.config.document, Utc::now()))?;
        self.replace(doc);
        debug!("created blank document");
        Ok(())
    }

    fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = path {
            validate::path(path)?;
        }
        self.edit(|doc| {
            let dest = match path {
                Some(p) => p.to_path_buf(),
                None => doc.path().map(Path::to_path_buf).ok_or_else(|| {
                    Error::validation("path", "document has no path yet; pass one to save")
                })?,
            };
            PackageWriter::write(doc, &dest)?;
            doc.set_path(dest.clone());
            Ok(dest)
        })
    }

    fn close(&self) -> Result<()> {
        if self.document.lock().take().is_some() {
            debug!("closed document");
        }
        Ok(())
    }

    fn insert_text(&self, anchor: &Anchor, text: &str) -> Result<()> {
        let text = validate::text("text", text)?;
        self.edit(|doc| doc.insert_text(anchor, &text))
    }

    fn insert_paragraph(&self, anchor: &Anchor) -> Result<NodeId> {
        self.edit(|doc| doc.insert_paragraph(anchor))
    }

    fn get_text(&self, range: Option<&Range>) -> Result<String> {
        self.with_document(|doc| doc.text(range))?
    }

    fn find_text(&self, pattern: &str) -> Result<Vec<TextMatch>> {
        let pattern = validate::pattern(pattern)?;
        self.with_document(|doc| doc.find_text(&pattern))?
    }

    fn replace_text(&self, pattern: &str, replacement: &str) -> Result<usize> {
        let pattern = validate::pattern(pattern)?;
        let replacement = validate::text("replacement", replacement)?;
        self.edit(|doc| doc.replace_text(&pattern, &replacement))
    }

    fn create_table(&self, rows: usize, cols: usize) -> Result<NodeId> {
        validate::table_dims(rows, cols, &self.config.limits)?;
        self.edit(|doc| doc.create_table(rows, cols))
    }

    fn get_cell(&self, table: NodeId, row: usize, col: usize) -> Result<String> {
        self.with_document(|doc| doc.cell_text(table, row, col))?
    }

    fn set_cell(&self, table: NodeId, row: usize, col: usize, text: &str) -> Result<()> {
        let text = validate::text("text", text)?;
        self.edit(|doc| doc.set_cell_text(table, row, col, &text))
    }

    fn insert_row(&self, table: NodeId, index: usize) -> Result<()> {
        let limits = &self.config.limits;
        self.edit(|doc| {
            let rows = doc
                .table(table)
                .map(|t| t.rows())
                .ok_or_else(|| Error::validation("table", format!("no table with id {table}")))?;
            if rows >= limits.max_rows {
                return Err(Error::validation(
                    "table",
                    format!("table {table} already has the maximum of {} rows", limits.max_rows),
                ));
            }
            doc.insert_row(table, index)
        })
    }

    fn delete_row(&self, table: NodeId, index: usize) -> Result<()> {
        self.edit(|doc| doc.delete_row(table, index))
    }

    fn set_font(&self, range: &Range, spec: &FontSpec) -> Result<()> {
        validate::font(spec, &self.config.limits)?;
        self.edit(|doc| doc.apply_font(range, spec))
    }

    fn set_alignment(&self, range: &Range, alignment: Alignment) -> Result<()> {
        self.edit(|doc| doc.apply_alignment(range, alignment))
    }

    fn document_info(&self) -> Result<DocumentInfo> {
        self.with_document(DocumentModel::info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorKind;
    use crate::common::detection::OLE2_SIGNATURE;

    fn backend() -> DirectBackend {
        let b = DirectBackend::default();
        b.create_new().unwrap();
        b
    }

    #[test]
    fn test_capabilities_exclude_host_only() {
        let caps = DirectBackend::supported();
        assert!(!caps.supports(Operation::ExportPdf));
        assert!(!caps.supports(Operation::OpenLegacy));
        assert!(caps.supports(Operation::CreateTable));
        assert!(caps.supports(Operation::DocumentInfo));
    }

    #[test]
    fn test_operations_need_an_open_document() {
        let b = DirectBackend::default();
        let err = b.get_text(None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(b.close().is_ok());
    }

    #[test]
    fn test_edit_cycle() {
        let b = backend();
        b.insert_text(&Anchor::DocumentEnd, "Hello\r\nWorld").unwrap();
        assert_eq!(b.get_text(None).unwrap(), "Hello\nWorld");
        assert_eq!(b.replace_text("World", "there").unwrap(), 1);
        let found = b.find_text("there").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!((found[0].start, found[0].end), (6, 11));

        let table = b.create_table(2, 3).unwrap();
        b.set_cell(table, 1, 2, "x").unwrap();
        assert_eq!(b.get_cell(table, 1, 2).unwrap(), "x");
        b.insert_row(table, 0).unwrap();
        assert_eq!(b.get_cell(table, 2, 2).unwrap(), "x");
        b.delete_row(table, 0).unwrap();

        let info = b.document_info().unwrap();
        assert_eq!(info.tables, 1);
        assert!(info.path.is_none());
    }

    #[test]
    fn test_validation_happens_before_mutation() {
        let b = backend();
        b.insert_text(&Anchor::DocumentEnd, "keep").unwrap();
        let before = b.get_text(None).unwrap();

        assert!(b.create_table(0, 2).is_err());
        assert!(b.create_table(2, 101).is_err());
        assert!(b.insert_text(&Anchor::DocumentEnd, "bad\u{1}").is_err());
        assert!(b.set_font(&Range::Document, &FontSpec::default().size(0.0)).is_err());
        assert!(b.replace_text("", "x").is_err());

        assert_eq!(b.get_text(None).unwrap(), before);
        assert_eq!(b.document_info().unwrap().tables, 0);
    }

    #[test]
    fn test_insert_row_respects_limit() {
        let mut config = EngineConfig::default();
        config.limits.max_rows = 2;
        let b = DirectBackend::new(config);
        b.create_new().unwrap();
        let table = b.create_table(2, 1).unwrap();
        let err = b.insert_row(table, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(b.with_document(|d| d.table(table).unwrap().rows()).unwrap(), 2);
    }

    #[test]
    fn test_save_needs_a_path_for_new_documents() {
        let b = backend();
        let err = b.save(None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("new.hwpx");
        assert_eq!(b.save(Some(&dest)).unwrap(), dest);
        assert_eq!(b.save(None).unwrap(), dest);
        assert_eq!(b.document_info().unwrap().path.as_deref(), Some(dest.as_path()));
    }

    #[test]
    fn test_legacy_files_are_a_capability_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.hwp");
        let mut bytes = OLE2_SIGNATURE.to_vec();
        bytes.resize(512, 0);
        std::fs::write(&path, bytes).unwrap();

        let err = DirectBackend::default().open(&path).unwrap_err();
        assert!(matches!(
            err,
            Error::Capability {
                operation: Operation::OpenLegacy,
                backend: "direct"
            }
        ));
    }

    #[test]
    fn test_export_pdf_is_unsupported() {
        let err = backend().export_pdf(Path::new("out.pdf")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Capability);
    }
}
