use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::command::{self, CountResult, FindResult, TextResult};
use super::queue::{HostQueue, Step, Ticket};
use super::service::{AutomationService, Parameters, SessionHandle};
use crate::backend::{Capabilities, CapabilityBackend, Operation, validate};
use crate::common::{Error, Result};
use crate::config::{AutomationConfig, Limits};
use crate::document::{Alignment, Anchor, DocumentInfo, FontSpec, NodeId, Range, TextMatch};
use crate::hwpx::Diagnostic;

/// Drives a live office application.
///
/// The host's open document is the source of truth; nothing is cached
/// locally apart from the last path opened or saved. Only whole-document
/// anchors and ranges can be expressed to the host: paragraph anchors and
/// node or span ranges fail with a capability error.
///
/// Once the host disconnects the session stays dead. Every later call fails
/// with [`Error::Connection`]; open a new session through the
/// [`BackendSelector`](crate::backend::BackendSelector) to continue.
pub struct AutomationBackend {
    queue: HostQueue,
    call_timeout: Mutex<Option<Duration>>,
    limits: Limits,
    path: Mutex<Option<PathBuf>>,
    /// Fallback ids for nodes the host creates without reporting one.
    local_ids: AtomicU64,
}

impl AutomationBackend {
    pub const NAME: &'static str = "automation";

    /// Attach to a host session through `service`.
    pub fn connect(
        service: Arc<dyn AutomationService>,
        config: &AutomationConfig,
        limits: &Limits,
    ) -> Result<Self> {
        let queue = HostQueue::connect(service, config.connect_timeout())?;
        Ok(Self {
            queue,
            call_timeout: Mutex::new(config.call_timeout()),
            limits: limits.clone(),
            path: Mutex::new(None),
            local_ids: AtomicU64::new(1),
        })
    }

    pub fn supported() -> Capabilities {
        Capabilities::all()
    }

    pub fn session(&self) -> &SessionHandle {
        self.queue.session()
    }

    /// False once the host has disconnected or the session was closed.
    pub fn is_alive(&self) -> bool {
        self.queue.is_alive()
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        *self.call_timeout.lock()
    }

    /// Override the per-call budget for this session. `None` waits forever.
    pub fn set_call_timeout(&self, timeout: Option<Duration>) {
        *self.call_timeout.lock() = timeout;
    }

    /// Queue a raw host command without waiting for it.
    pub fn enqueue(&self, command: &str, params: Parameters) -> Result<Ticket> {
        if command.trim().is_empty() {
            return Err(Error::validation("command", "must not be empty"));
        }
        self.queue.submit(vec![Step::new(command, params)])
    }

    /// Run a raw host command and wait for its result.
    pub fn invoke(&self, command: &str, params: Parameters) -> Result<Value> {
        self.enqueue(command, params)?.wait(self.call_timeout())
    }

    fn call(&self, steps: Vec<Step>) -> Result<Value> {
        self.queue.submit(steps)?.wait(self.call_timeout())
    }

    fn local_id(&self) -> NodeId {
        NodeId(self.local_ids.fetch_add(1, Ordering::Relaxed))
    }

    fn unaddressable(&self, operation: Operation) -> Error {
        debug!(%operation, "node addressing is not available on the host");
        Error::Capability {
            operation,
            backend: Self::NAME,
        }
    }

    /// `true` for the document start, `false` for its end.
    fn edge(&self, anchor: &Anchor, operation: Operation) -> Result<bool> {
        match anchor {
            Anchor::DocumentStart => Ok(true),
            Anchor::DocumentEnd => Ok(false),
            Anchor::Paragraph { .. } => Err(self.unaddressable(operation)),
        }
    }

    fn whole_document(&self, range: &Range, operation: Operation) -> Result<()> {
        match range {
            Range::Document => Ok(()),
            _ => Err(self.unaddressable(operation)),
        }
    }
}

impl CapabilityBackend for AutomationBackend {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn capabilities(&self) -> Capabilities {
        Self::supported()
    }

    fn open(&self, path: &Path) -> Result<Vec<Diagnostic>> {
        validate::path(path)?;
        self.call(command::open(path))?;
        info!(path = %path.display(), session = %self.session(), "host opened document");
        *self.path.lock() = Some(path.to_path_buf());
        Ok(Vec::new())
    }

    fn create_new(&self) -> Result<()> {
        self.call(command::create_new())?;
        *self.path.lock() = None;
        Ok(())
    }

    fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let target = match path {
            Some(p) => {
                validate::path(p)?;
                p.to_path_buf()
            },
            None => self.path.lock().clone().ok_or_else(|| {
                Error::validation("path", "document has no path yet; pass one to save")
            })?,
        };
        let result = self.call(command::save(path))?;
        let saved = command::saved_path(&result).map_or(target, PathBuf::from);
        *self.path.lock() = Some(saved.clone());
        Ok(saved)
    }

    fn close(&self) -> Result<()> {
        let result = self.call(command::close());
        self.queue.shutdown();
        *self.path.lock() = None;
        info!(session = %self.session(), "released host session");
        result.map(|_| ())
    }

    fn insert_text(&self, anchor: &Anchor, text: &str) -> Result<()> {
        let start = self.edge(anchor, Operation::InsertText)?;
        let text = validate::text("text", text)?;
        self.call(command::insert_text(start, &text))?;
        Ok(())
    }

    fn insert_paragraph(&self, anchor: &Anchor) -> Result<NodeId> {
        let start = self.edge(anchor, Operation::InsertParagraph)?;
        let result = self.call(command::insert_paragraph(start))?;
        Ok(command::node_id(&result, "paragraphId").unwrap_or_else(|| self.local_id()))
    }

    fn get_text(&self, range: Option<&Range>) -> Result<String> {
        if let Some(range) = range {
            self.whole_document(range, Operation::GetText)?;
        }
        let result = self.call(command::get_text())?;
        let text: TextResult = command::decode(command::GET_TEXT, result)?;
        Ok(text.into_string().replace("\r\n", "\n"))
    }

    fn find_text(&self, pattern: &str) -> Result<Vec<TextMatch>> {
        let pattern = validate::pattern(pattern)?;
        let result = self.call(command::find_all(&pattern))?;
        let found: FindResult = command::decode(command::FIND_ALL, result)?;
        Ok(found
            .into_ranges()
            .into_iter()
            .map(|r| TextMatch {
                paragraph: None,
                start: r.start,
                end: r.end,
            })
            .collect())
    }

    fn replace_text(&self, pattern: &str, replacement: &str) -> Result<usize> {
        let pattern = validate::pattern(pattern)?;
        let replacement = validate::text("replacement", replacement)?;
        let result = self.call(command::replace_all(&pattern, &replacement))?;
        let count: CountResult = command::decode(command::ALL_REPLACE, result)?;
        Ok(count.count())
    }

    fn create_table(&self, rows: usize, cols: usize) -> Result<NodeId> {
        validate::table_dims(rows, cols, &self.limits)?;
        let result = self.call(command::create_table(rows, cols))?;
        Ok(command::node_id(&result, "tableId").unwrap_or_else(|| self.local_id()))
    }

    fn get_cell(&self, table: NodeId, row: usize, col: usize) -> Result<String> {
        let result = self.call(command::get_cell(table, row, col))?;
        let text: TextResult = command::decode(command::TABLE_GET_CELL, result)?;
        Ok(text.into_string())
    }

    fn set_cell(&self, table: NodeId, row: usize, col: usize, text: &str) -> Result<()> {
        let text = validate::text("text", text)?;
        self.call(command::set_cell(table, row, col, &text))?;
        Ok(())
    }

    fn insert_row(&self, table: NodeId, index: usize) -> Result<()> {
        self.call(command::insert_row(table, index))?;
        Ok(())
    }

    fn delete_row(&self, table: NodeId, index: usize) -> Result<()> {
        self.call(command::delete_row(table, index))?;
        Ok(())
    }

    fn set_font(&self, range: &Range, spec: &FontSpec) -> Result<()> {
        self.whole_document(range, Operation::SetFont)?;
        validate::font(spec, &self.limits)?;
        if spec.is_empty() {
            return Ok(());
        }
        self.call(command::set_font(spec))?;
        Ok(())
    }

    fn set_alignment(&self, range: &Range, alignment: Alignment) -> Result<()> {
        self.whole_document(range, Operation::SetAlignment)?;
        self.call(command::set_alignment(alignment))?;
        Ok(())
    }

    fn export_pdf(&self, path: &Path) -> Result<()> {
        validate::path(path)?;
        self.call(command::export_pdf(path))?;
        info!(path = %path.display(), "host exported PDF");
        Ok(())
    }

    fn document_info(&self) -> Result<DocumentInfo> {
        let result = self.call(command::document_info())?;
        let mut info: DocumentInfo = command::decode(command::GET_DOCUMENT_INFO, result)?;
        if info.path.is_none() {
            info.path = self.path.lock().clone();
        }
        Ok(info)
    }
}

impl Drop for AutomationBackend {
    fn drop(&mut self) {
        if self.queue.is_alive() {
            warn!(session = %self.session(), "automation backend dropped without close");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;
    use crate::backend::automation::{ConnectionError, HostError, InvokeError};
    use crate::common::ErrorKind;

    /// Answers from a fixed table and records every command.
    #[derive(Default)]
    struct Scripted {
        answers: HashMap<&'static str, Value>,
        log: Mutex<Vec<(String, Parameters)>>,
    }

    impl AutomationService for Scripted {
        fn connect_or_attach(&self) -> std::result::Result<SessionHandle, ConnectionError> {
            Ok(SessionHandle(1))
        }

        fn invoke(
            &self,
            _session: &SessionHandle,
            command: &str,
            params: Parameters,
        ) -> std::result::Result<Value, InvokeError> {
            self.log.lock().push((command.to_string(), params));
            if command == "Explode" {
                return Err(HostError::new("no such command").with_code(-1).into());
            }
            Ok(self.answers.get(command).cloned().unwrap_or(Value::Null))
        }

        fn disconnect(&self, _session: SessionHandle) {}
    }

    fn connect(service: Arc<Scripted>) -> AutomationBackend {
        AutomationBackend::connect(service, &AutomationConfig::default(), &Limits::default()).unwrap()
    }

    #[test]
    fn test_results_are_decoded() {
        let mut scripted = Scripted::default();
        scripted.answers.insert(command::GET_TEXT, json!("line one\r\nline two"));
        scripted.answers.insert(command::ALL_REPLACE, json!({ "count": 2 }));
        scripted.answers.insert(command::TABLE_CREATE, json!({ "tableId": 40 }));
        scripted
            .answers
            .insert(command::FIND_ALL, json!({ "matches": [{ "start": 0, "end": 4 }] }));
        let backend = connect(Arc::new(scripted));

        assert_eq!(backend.get_text(None).unwrap(), "line one\nline two");
        assert_eq!(backend.replace_text("a", "b").unwrap(), 2);
        assert_eq!(backend.create_table(2, 2).unwrap(), NodeId(40));
        let found = backend.find_text("line").unwrap();
        assert_eq!(found, [TextMatch { paragraph: None, start: 0, end: 4 }]);
        backend.close().unwrap();
    }

    #[test]
    fn test_paragraph_anchors_are_not_addressable() {
        let service = Arc::new(Scripted::default());
        let backend = connect(Arc::clone(&service));
        let anchor = Anchor::Paragraph { id: NodeId(3), offset: 0 };
        let err = backend.insert_text(&anchor, "x").unwrap_err();
        assert!(matches!(
            err,
            Error::Capability {
                operation: Operation::InsertText,
                backend: "automation"
            }
        ));
        let err = backend
            .set_font(&Range::Node(NodeId(3)), &FontSpec::default().bold(true))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Capability);
        assert!(service.log.lock().is_empty());
    }

    #[test]
    fn test_validation_never_reaches_the_host() {
        let service = Arc::new(Scripted::default());
        let backend = connect(Arc::clone(&service));
        assert!(backend.create_table(0, 1).is_err());
        assert!(backend.insert_text(&Anchor::DocumentEnd, "\u{8}").is_err());
        assert!(backend.find_text("").is_err());
        assert!(service.log.lock().is_empty());
    }

    #[test]
    fn test_host_rejection_keeps_session() {
        let service = Arc::new(Scripted::default());
        let backend = connect(Arc::clone(&service));
        let err = backend.invoke("Explode", Parameters::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Host);
        assert!(err.to_string().contains("code -1"));
        assert!(backend.is_alive());
        backend.insert_text(&Anchor::DocumentStart, "ok").unwrap();
        let log = service.log.lock();
        let commands: Vec<_> = log.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(commands, ["Explode", "MoveDocBegin", "InsertText"]);
    }

    #[test]
    fn test_save_tracks_path() {
        let service = Arc::new(Scripted::default());
        let backend = connect(Arc::clone(&service));
        backend.create_new().unwrap();
        let err = backend.save(None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(service.log.lock().iter().all(|(c, _)| c != command::FILE_SAVE));
        let saved = backend.save(Some(Path::new("/tmp/out.hwpx"))).unwrap();
        assert_eq!(saved, Path::new("/tmp/out.hwpx"));
        assert_eq!(backend.save(None).unwrap(), saved);
    }

    #[test]
    fn test_close_releases_session() {
        let backend = connect(Arc::new(Scripted::default()));
        backend.close().unwrap();
        assert!(!backend.is_alive());
        let err = backend.get_text(None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }
}
