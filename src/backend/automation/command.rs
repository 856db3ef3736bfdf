//! Host command names and parameter builders.
//!
//! | operation       | host command(s)                                   |
//! |-----------------|---------------------------------------------------|
//! | open            | `FileOpen` {Path}                                 |
//! | createNew       | `FileNew`                                         |
//! | save            | `FileSave` / `FileSaveAs` {Path, Format}          |
//! | close           | `FileClose`                                       |
//! | insertText      | `MoveDocBegin`/`MoveDocEnd`, `InsertText` {Text}  |
//! | insertParagraph | `MoveDocBegin`/`MoveDocEnd`, `BreakPara`          |
//! | getText         | `GetTextFile` {Format: "UNICODE"}                 |
//! | findText        | `FindAll` {FindString}                            |
//! | replaceText     | `AllReplace` {FindString, ReplaceString}          |
//! | createTable     | `MoveDocEnd`, `TableCreate` {Rows, Cols, ...}     |
//! | getCell/setCell | `TableGetCellText` / `TableSetCellText`           |
//! | insertRow       | `TableInsertRow` {Table, Row}                     |
//! | deleteRow       | `TableDeleteRow` {Table, Row}                     |
//! | setFont         | `SelectAll`, `CharShape` {FaceName, Height, ...}  |
//! | setAlignment    | `SelectAll`, `ParaShape` {Align}                  |
//! | exportPdf       | `FileSaveAs` {Path, Format: "PDF"}                |
//! | documentInfo    | `GetDocumentInfo`                                 |

use std::path::Path;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::queue::Step;
use super::service::Parameters;
use crate::common::{Error, Result};
use crate::document::{Alignment, FontSpec, NodeId};

pub(crate) const FILE_OPEN: &str = "FileOpen";
pub(crate) const FILE_NEW: &str = "FileNew";
pub(crate) const FILE_SAVE: &str = "FileSave";
pub(crate) const FILE_SAVE_AS: &str = "FileSaveAs";
pub(crate) const FILE_CLOSE: &str = "FileClose";
pub(crate) const MOVE_DOC_BEGIN: &str = "MoveDocBegin";
pub(crate) const MOVE_DOC_END: &str = "MoveDocEnd";
pub(crate) const INSERT_TEXT: &str = "InsertText";
pub(crate) const BREAK_PARA: &str = "BreakPara";
pub(crate) const GET_TEXT: &str = "GetTextFile";
pub(crate) const FIND_ALL: &str = "FindAll";
pub(crate) const ALL_REPLACE: &str = "AllReplace";
pub(crate) const TABLE_CREATE: &str = "TableCreate";
pub(crate) const TABLE_GET_CELL: &str = "TableGetCellText";
pub(crate) const TABLE_SET_CELL: &str = "TableSetCellText";
pub(crate) const TABLE_INSERT_ROW: &str = "TableInsertRow";
pub(crate) const TABLE_DELETE_ROW: &str = "TableDeleteRow";
pub(crate) const SELECT_ALL: &str = "SelectAll";
pub(crate) const CHAR_SHAPE: &str = "CharShape";
pub(crate) const PARA_SHAPE: &str = "ParaShape";
pub(crate) const GET_DOCUMENT_INFO: &str = "GetDocumentInfo";

fn params(value: Value) -> Parameters {
    match value {
        Value::Object(map) => map,
        _ => Parameters::new(),
    }
}

fn bare(command: &str) -> Step {
    Step::new(command, Parameters::new())
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Save format for a destination, by extension.
fn save_format(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("hwp") => "HWP",
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => "PDF",
        _ => "HWPX",
    }
}

pub(crate) fn open(path: &Path) -> Vec<Step> {
    vec![Step::new(FILE_OPEN, params(json!({ "Path": path_str(path) })))]
}

pub(crate) fn create_new() -> Vec<Step> {
    vec![bare(FILE_NEW)]
}

pub(crate) fn save(path: Option<&Path>) -> Vec<Step> {
    match path {
        None => vec![bare(FILE_SAVE)],
        Some(p) => vec![save_as(p, save_format(p))],
    }
}

fn save_as(path: &Path, format: &str) -> Step {
    Step::new(
        FILE_SAVE_AS,
        params(json!({ "Path": path_str(path), "Format": format })),
    )
}

pub(crate) fn close() -> Vec<Step> {
    vec![bare(FILE_CLOSE)]
}

/// Cursor movement for a document-edge anchor.
pub(crate) fn move_to(start: bool) -> Step {
    bare(if start { MOVE_DOC_BEGIN } else { MOVE_DOC_END })
}

pub(crate) fn insert_text(start: bool, text: &str) -> Vec<Step> {
    vec![
        move_to(start),
        Step::new(INSERT_TEXT, params(json!({ "Text": text }))),
    ]
}

pub(crate) fn insert_paragraph(start: bool) -> Vec<Step> {
    vec![move_to(start), bare(BREAK_PARA)]
}

pub(crate) fn get_text() -> Vec<Step> {
    vec![Step::new(GET_TEXT, params(json!({ "Format": "UNICODE" })))]
}

pub(crate) fn find_all(pattern: &str) -> Vec<Step> {
    vec![Step::new(FIND_ALL, params(json!({ "FindString": pattern })))]
}

pub(crate) fn replace_all(pattern: &str, replacement: &str) -> Vec<Step> {
    vec![Step::new(
        ALL_REPLACE,
        params(json!({ "FindString": pattern, "ReplaceString": replacement })),
    )]
}

pub(crate) fn create_table(rows: usize, cols: usize) -> Vec<Step> {
    vec![
        move_to(false),
        Step::new(
            TABLE_CREATE,
            params(json!({ "Rows": rows, "Cols": cols, "WidthType": 0, "HeightType": 1 })),
        ),
    ]
}

pub(crate) fn get_cell(table: NodeId, row: usize, col: usize) -> Vec<Step> {
    vec![Step::new(
        TABLE_GET_CELL,
        params(json!({ "Table": table.0, "Row": row, "Col": col })),
    )]
}

pub(crate) fn set_cell(table: NodeId, row: usize, col: usize, text: &str) -> Vec<Step> {
    vec![Step::new(
        TABLE_SET_CELL,
        params(json!({ "Table": table.0, "Row": row, "Col": col, "Text": text })),
    )]
}

pub(crate) fn insert_row(table: NodeId, index: usize) -> Vec<Step> {
    vec![Step::new(
        TABLE_INSERT_ROW,
        params(json!({ "Table": table.0, "Row": index })),
    )]
}

pub(crate) fn delete_row(table: NodeId, index: usize) -> Vec<Step> {
    vec![Step::new(
        TABLE_DELETE_ROW,
        params(json!({ "Table": table.0, "Row": index })),
    )]
}

pub(crate) fn set_font(spec: &FontSpec) -> Vec<Step> {
    let mut p = Parameters::new();
    if let Some(family) = &spec.family {
        p.insert("FaceName".into(), json!(family));
    }
    if let Some(height) = spec.height() {
        p.insert("Height".into(), json!(height));
    }
    if let Some(bold) = spec.bold {
        p.insert("Bold".into(), json!(bold));
    }
    if let Some(italic) = spec.italic {
        p.insert("Italic".into(), json!(italic));
    }
    vec![bare(SELECT_ALL), Step::new(CHAR_SHAPE, p)]
}

pub(crate) fn set_alignment(alignment: Alignment) -> Vec<Step> {
    vec![
        bare(SELECT_ALL),
        Step::new(PARA_SHAPE, params(json!({ "Align": alignment.host_code() }))),
    ]
}

pub(crate) fn export_pdf(path: &Path) -> Vec<Step> {
    vec![save_as(path, "PDF")]
}

pub(crate) fn document_info() -> Vec<Step> {
    vec![bare(GET_DOCUMENT_INFO)]
}

/// Decode a host result, reporting a shape mismatch as a host error.
pub(crate) fn decode<T: DeserializeOwned>(command: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::Host {
        command: command.to_string(),
        detail: format!("unexpected result: {e}"),
    })
}

/// Results that carry text, either bare or as `{"text": ...}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum TextResult {
    Bare(String),
    Field { text: String },
}

impl TextResult {
    pub fn into_string(self) -> String {
        match self {
            TextResult::Bare(s) | TextResult::Field { text: s } => s,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct FoundRange {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum FindResult {
    List(Vec<FoundRange>),
    Field { matches: Vec<FoundRange> },
}

impl FindResult {
    pub fn into_ranges(self) -> Vec<FoundRange> {
        match self {
            FindResult::List(v) | FindResult::Field { matches: v } => v,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum CountResult {
    Bare(usize),
    Field { count: usize },
}

impl CountResult {
    pub fn count(&self) -> usize {
        match *self {
            CountResult::Bare(n) | CountResult::Field { count: n } => n,
        }
    }
}

/// Identifier the host assigned to a new node, if it reports one.
pub(crate) fn node_id(value: &Value, field: &str) -> Option<NodeId> {
    value
        .get(field)
        .or(Some(value))
        .and_then(Value::as_u64)
        .map(NodeId)
}

/// Saved path reported by the host, if any.
pub(crate) fn saved_path(value: &Value) -> Option<&str> {
    value.get("path").and_then(Value::as_str)
}
