mod common;

use std::path::Path;
use std::sync::Arc;

use common::MockHost;
use hwpkit::backend::{Backend, BackendSelector, Capabilities, CapabilityBackend, DirectBackend, Operation};
use hwpkit::config::{EngineConfig, SelectionPolicy};
use hwpkit::document::{Alignment, Anchor, FontSpec, Range};
use hwpkit::{Error, ErrorKind};

fn direct() -> Backend {
    let mut config = EngineConfig::default();
    config.selection.policy = SelectionPolicy::DirectOnly;
    BackendSelector::new(config).select(Capabilities::empty()).unwrap()
}

#[test]
fn test_create_edit_save_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("minutes.hwpx");

    let backend = direct();
    backend.create_new().unwrap();
    backend
        .insert_text(&Anchor::DocumentEnd, "Meeting minutes")
        .unwrap();
    let body = backend.insert_paragraph(&Anchor::DocumentEnd).unwrap();
    backend
        .insert_text(&Anchor::Paragraph { id: body, offset: 0 }, "Attendees:")
        .unwrap();
    let table = backend.create_table(2, 3).unwrap();
    backend.set_cell(table, 0, 0, "Name").unwrap();
    backend.set_cell(table, 1, 2, "Present").unwrap();
    backend
        .set_font(&Range::Document, &FontSpec::default().family("맑은 고딕").size(11.0))
        .unwrap();
    backend.set_alignment(&Range::Node(body), Alignment::Center).unwrap();
    assert_eq!(backend.save(Some(&dest)).unwrap(), dest);
    backend.close().unwrap();

    let reopened = direct();
    let diagnostics = reopened.open(&dest).unwrap();
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    let text = reopened.get_text(None).unwrap();
    assert!(text.starts_with("Meeting minutes\nAttendees:"), "{text}");
    assert_eq!(reopened.get_cell(table, 0, 0).unwrap(), "Name");
    assert_eq!(reopened.get_cell(table, 1, 2).unwrap(), "Present");
    assert_eq!(reopened.find_text("Attendees").unwrap().len(), 1);

    let info = reopened.document_info().unwrap();
    assert_eq!(info.tables, 1);
    assert_eq!(info.path.as_deref(), Some(dest.as_path()));

    let styles = reopened
        .as_direct()
        .unwrap()
        .with_document(|doc| {
            let p = doc.paragraph(body).unwrap();
            let para = doc.styles().para_style(p.style).unwrap().alignment;
            let run = doc.styles().char_style(p.runs()[0].style).unwrap().clone();
            (para, run)
        })
        .unwrap();
    assert_eq!(styles.0, Some(Alignment::Center));
    assert_eq!(styles.1.family.as_deref(), Some("맑은 고딕"));
    assert_eq!(styles.1.height, 1100);
}

#[test]
fn test_replace_then_save_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.hwpx");
    std::fs::write(&path, common::sample_package()).unwrap();

    let backend = direct();
    backend.open(&path).unwrap();
    assert_eq!(backend.replace_text("region", "market").unwrap(), 1);
    assert_eq!(backend.save(None).unwrap(), path);

    let again = direct();
    again.open(&path).unwrap();
    assert!(again.get_text(None).unwrap().contains("every market."));
}

#[test]
fn test_export_pdf_without_host_is_a_capability_error() {
    let host = Arc::new(MockHost::unreachable());
    let selector = BackendSelector::new(EngineConfig::default()).with_service(host);
    let backend = selector.select(Capabilities::EXPORT_PDF).unwrap();
    assert!(backend.is_direct());

    backend.create_new().unwrap();
    backend.insert_text(&Anchor::DocumentEnd, "body").unwrap();
    let before = backend.get_text(None).unwrap();
    let err = backend.export_pdf(Path::new("out.pdf")).unwrap_err();
    assert!(matches!(
        err,
        Error::Capability {
            operation: Operation::ExportPdf,
            ..
        }
    ));
    assert_eq!(backend.get_text(None).unwrap(), before);
    assert!(!Path::new("out.pdf").exists());
}

#[test]
fn test_host_only_request_binds_the_host_when_reachable() {
    let host = Arc::new(MockHost::new());
    let selector = BackendSelector::new(EngineConfig::default()).with_service(host.clone());
    let backend = selector
        .select(Capabilities::OPEN | Capabilities::EXPORT_PDF)
        .unwrap();
    assert!(backend.is_automation());

    backend.open(Path::new("report.hwpx")).unwrap();
    backend.export_pdf(Path::new("report.pdf")).unwrap();
    backend.close().unwrap();

    let calls = host.calls();
    assert_eq!(host.commands(), ["FileOpen", "FileSaveAs", "FileClose"]);
    assert_eq!(calls[1].params["Format"], "PDF");
    assert_eq!(calls[1].params["Path"], "report.pdf");
}

#[test]
fn test_validation_failures_change_nothing() {
    let backend = DirectBackend::default();
    backend.create_new().unwrap();
    backend.insert_text(&Anchor::DocumentEnd, "stable").unwrap();
    let table = backend.create_table(1, 1).unwrap();
    let before = backend.get_text(None).unwrap();

    let failures = [
        backend.create_table(0, 1).map(|_| ()),
        backend.create_table(1001, 1).map(|_| ()),
        backend.create_table(1, 101).map(|_| ()),
        backend.set_cell(table, 5, 0, "x"),
        backend.insert_row(table, 9),
        backend.delete_row(table, 0),
        backend.set_font(&Range::Document, &FontSpec::default().size(-2.0)),
        backend.insert_text(&Anchor::DocumentEnd, "\u{1b}[31m"),
        backend.replace_text("", "x").map(|_| ()),
    ];
    for result in failures {
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Validation);
    }
    assert_eq!(backend.get_text(None).unwrap(), before);
    assert_eq!(backend.document_info().unwrap().tables, 1);
}

#[test]
fn test_open_rejects_non_packages() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.hwpx");
    std::fs::write(&path, b"plain text, not a zip").unwrap();
    let err = direct().open(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);

    let err = direct().open(&dir.path().join("absent.hwpx")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn test_config_file_drives_selection_and_limits() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hwpkit.yaml");
    std::fs::write(
        &path,
        "selection:\n  policy: direct-only\nlimits:\n  max_rows: 3\n  max_cols: 3\n",
    )
    .unwrap();
    let config = EngineConfig::from_file(&path).unwrap();
    let selector = BackendSelector::new(config).with_service(Arc::new(MockHost::new()));
    let backend = selector.select(Capabilities::HOST_ONLY).unwrap();
    assert!(backend.is_direct());
    backend.create_new().unwrap();
    assert!(backend.create_table(3, 3).is_ok());
    assert_eq!(backend.create_table(4, 1).unwrap_err().kind(), ErrorKind::Validation);
}
