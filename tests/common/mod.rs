#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use hwpkit::backend::{
    AutomationService, ConnectionError, HostError, InvokeError, Parameters, SessionHandle,
};
use parking_lot::Mutex;
use serde_json::Value;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::{CompressionMethod, ZipArchive};

pub const CONTAINER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><ocf:container xmlns:ocf="urn:oasis:names:tc:opendocument:xmlns:container"><ocf:rootfiles><ocf:rootfile full-path="Contents/content.hpf" media-type="application/hwpml-package+xml"/></ocf:rootfiles></ocf:container>"#;

pub const CONTENT_HPF: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><opf:package xmlns:opf="http://www.idpf.org/2007/opf/" version="" unique-identifier="" id=""><opf:metadata><opf:title>Quarterly report</opf:title><opf:meta name="creator" content="text">Kim</opf:meta></opf:metadata><opf:manifest><opf:item id="header" href="Contents/header.xml" media-type="application/xml"/><opf:item id="image1" href="BinData/image1.bmp" media-type="image/bmp" isEmbeded="1"/><opf:item id="section0" href="Contents/section0.xml" media-type="application/xml"/></opf:manifest><opf:spine><opf:itemref idref="header" linear="yes"/><opf:itemref idref="section0" linear="yes"/></opf:spine></opf:package>"#;

pub const HEADER: &str = r##"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><hh:head xmlns:hh="http://www.hancom.co.kr/hwpml/2011/head" version="1.4" secCnt="1"><hh:beginNum page="1" footnote="1" endnote="1" pic="1" tbl="1" equation="1"/><hh:refList><hh:fontfaces itemCnt="2"><hh:fontface lang="HANGUL" fontCnt="1"><hh:font id="0" face="함초롬바탕" type="TTF" isEmbedded="0"/></hh:fontface><hh:fontface lang="LATIN" fontCnt="1"><hh:font id="0" face="함초롬바탕" type="TTF" isEmbedded="0"/></hh:fontface></hh:fontfaces><hh:charProperties itemCnt="2"><hh:charPr id="0" height="1000" textColor="#000000"><hh:fontRef hangul="0" latin="0"/><hh:underline type="NONE" shape="SOLID" color="#000000"/></hh:charPr><hh:charPr id="1" height="1600" textColor="#000000"><hh:fontRef hangul="0" latin="0"/><hh:bold/></hh:charPr></hh:charProperties><hh:paraProperties itemCnt="1"><hh:paraPr id="0" tabPrIDRef="0"><hh:align horizontal="JUSTIFY" vertical="BASELINE"/><hh:lineSpacing type="PERCENT" value="160" unit="HWPUNIT"/></hh:paraPr></hh:paraProperties></hh:refList><hh:compatibleDocument targetProgram="HWP201X"/></hh:head>"##;

/// A heading, a body paragraph carrying layout caches and a bookmark, a
/// 2x2 table with a merged first row, and an element from a foreign
/// namespace at section level.
pub const SECTION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><hs:sec xmlns:hp="http://www.hancom.co.kr/hwpml/2011/paragraph" xmlns:hs="http://www.hancom.co.kr/hwpml/2011/section"><hp:p id="1" paraPrIDRef="0" styleIDRef="0" pageBreak="0" columnBreak="0" merged="0"><hp:run charPrIDRef="0"><hp:secPr id="" textDirection="HORIZONTAL"><hp:grid lineGrid="0" charGrid="0"/></hp:secPr><hp:ctrl><hp:colPr id="" type="NEWSPAPER" layout="LEFT" colCount="1"/></hp:ctrl></hp:run><hp:run charPrIDRef="1"><hp:t>Quarterly report</hp:t></hp:run><hp:linesegarray><hp:lineseg textpos="0" vertpos="0" vertsize="1600"/></hp:linesegarray></hp:p><hp:p id="2" paraPrIDRef="0" styleIDRef="0" pageBreak="0" columnBreak="0" merged="0"><hp:run charPrIDRef="0"><hp:ctrl><hp:bookmark name="summary"/></hp:ctrl><hp:t>Revenue grew in every region.</hp:t></hp:run></hp:p><hp:p id="3" paraPrIDRef="0" styleIDRef="0" pageBreak="0" columnBreak="0" merged="0"><hp:run charPrIDRef="0"><hp:tbl id="10" rowCnt="2" colCnt="2" cellSpacing="0" borderFillIDRef="1"><hp:sz width="42520" widthRelTo="ABSOLUTE" height="2000" heightRelTo="ABSOLUTE" protect="0"/><hp:tr><hp:tc name="" header="0" hasMargin="0" protect="0" editable="0" dirty="0" borderFillIDRef="1"><hp:subList id="" textDirection="HORIZONTAL" lineWrap="BREAK" vertAlign="CENTER"><hp:p id="11" paraPrIDRef="0"><hp:run charPrIDRef="0"><hp:t>Region totals</hp:t></hp:run></hp:p></hp:subList><hp:cellAddr colAddr="0" rowAddr="0"/><hp:cellSpan colSpan="2" rowSpan="1"/><hp:cellSz width="42520" height="1000"/><hp:cellMargin left="510" right="510" top="141" bottom="141"/></hp:tc></hp:tr><hp:tr><hp:tc name="" header="0" hasMargin="0" protect="0" editable="0" dirty="0" borderFillIDRef="1"><hp:subList id="" textDirection="HORIZONTAL" lineWrap="BREAK" vertAlign="CENTER"><hp:p id="12" paraPrIDRef="0"><hp:run charPrIDRef="0"><hp:t>North</hp:t></hp:run></hp:p></hp:subList><hp:cellAddr colAddr="0" rowAddr="1"/><hp:cellSpan colSpan="1" rowSpan="1"/><hp:cellSz width="21260" height="1000"/><hp:cellMargin left="510" right="510" top="141" bottom="141"/></hp:tc><hp:tc name="" header="0" hasMargin="0" protect="0" editable="0" dirty="0" borderFillIDRef="1"><hp:subList id="" textDirection="HORIZONTAL" lineWrap="BREAK" vertAlign="CENTER"><hp:p id="13" paraPrIDRef="0"><hp:run charPrIDRef="0"><hp:t>120</hp:t></hp:run></hp:p></hp:subList><hp:cellAddr colAddr="1" rowAddr="1"/><hp:cellSpan colSpan="1" rowSpan="1"/><hp:cellSz width="21260" height="1000"/><hp:cellMargin left="510" right="510" top="141" bottom="141"/></hp:tc></hp:tr></hp:tbl><hp:t/></hp:run></hp:p><ext:annotation xmlns:ext="urn:example:ext" author="reviewer"><ext:note>keep me</ext:note></ext:annotation></hs:sec>"#;

/// Bytes of a tiny BMP, stored uncompressed.
pub const IMAGE: &[u8] = &[
    b'B', b'M', 0x3A, 0, 0, 0, 0, 0, 0, 0, 0x36, 0, 0, 0, 0x28, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1,
    0, 0x18, 0, 0, 0, 0, 0, 4, 0, 0, 0, 0x13, 0x0B, 0, 0, 0x13, 0x0B, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0xFF, 0x00, 0x7F, 0,
];

pub const VERSION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><hv:HCFVersion xmlns:hv="http://www.hancom.co.kr/hwpml/2011/version" tagetApplication="WORDPROCESSOR" major="5" minor="1"/>"#;

pub const PREVIEW_TEXT: &str = "Quarterly report\r\nRevenue grew in every region.\r\n";

/// A package in the layout Hancom Office writes.
pub fn sample_package() -> Vec<u8> {
    build(&[
        ("mimetype", "application/hwp+zip".as_bytes(), CompressionMethod::Stored),
        ("version.xml", VERSION.as_bytes(), CompressionMethod::Deflated),
        ("Contents/header.xml", HEADER.as_bytes(), CompressionMethod::Deflated),
        ("Contents/section0.xml", SECTION.as_bytes(), CompressionMethod::Deflated),
        ("BinData/image1.bmp", IMAGE, CompressionMethod::Stored),
        ("Preview/PrvText.txt", PREVIEW_TEXT.as_bytes(), CompressionMethod::Deflated),
        ("META-INF/container.xml", CONTAINER.as_bytes(), CompressionMethod::Deflated),
        ("Contents/content.hpf", CONTENT_HPF.as_bytes(), CompressionMethod::Deflated),
    ])
}

/// The sample package's parts around a different section body.
pub fn package_with_section(section: &str) -> Vec<u8> {
    build(&[
        ("mimetype", "application/hwp+zip".as_bytes(), CompressionMethod::Stored),
        ("Contents/header.xml", HEADER.as_bytes(), CompressionMethod::Deflated),
        ("Contents/section0.xml", section.as_bytes(), CompressionMethod::Deflated),
        ("BinData/image1.bmp", IMAGE, CompressionMethod::Stored),
        ("META-INF/container.xml", CONTAINER.as_bytes(), CompressionMethod::Deflated),
        ("Contents/content.hpf", CONTENT_HPF.as_bytes(), CompressionMethod::Deflated),
    ])
}

/// A section holding one table, given as the `hp:tbl` element.
pub fn section_with_table(table: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><hs:sec xmlns:hp="http://www.hancom.co.kr/hwpml/2011/paragraph" xmlns:hs="http://www.hancom.co.kr/hwpml/2011/section"><hp:p id="1" paraPrIDRef="0"><hp:run charPrIDRef="0">{table}<hp:t/></hp:run></hp:p></hs:sec>"#
    )
}

/// `hp:tbl` with id 10 holding `rows` x `cols` cells, where the cell at
/// `merge.0`, `merge.1` spans `merge.2` rows and `merge.3` columns. Each
/// anchor cell's text is its "row,col" address.
pub fn merged_table(rows: usize, cols: usize, merge: (usize, usize, usize, usize)) -> String {
    let (mr, mc, rs, cs) = merge;
    let mut out = format!(r#"<hp:tbl id="10" rowCnt="{rows}" colCnt="{cols}">"#);
    for r in 0..rows {
        out.push_str("<hp:tr>");
        for c in 0..cols {
            let inside = (mr..mr + rs).contains(&r) && (mc..mc + cs).contains(&c);
            if inside && (r, c) != (mr, mc) {
                continue;
            }
            let (row_span, col_span) = if (r, c) == (mr, mc) { (rs, cs) } else { (1, 1) };
            out.push_str(&format!(
                r#"<hp:tc><hp:subList><hp:p paraPrIDRef="0"><hp:run charPrIDRef="0"><hp:t>{r},{c}</hp:t></hp:run></hp:p></hp:subList><hp:cellAddr colAddr="{c}" rowAddr="{r}"/><hp:cellSpan colSpan="{col_span}" rowSpan="{row_span}"/></hp:tc>"#
            ));
        }
        out.push_str("</hp:tr>");
    }
    out.push_str("</hp:tbl>");
    out
}

pub fn build(entries: &[(&str, &[u8], CompressionMethod)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data, method) in entries {
        zip.start_file(*name, SimpleFileOptions::default().compression_method(*method))
            .unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Name, compression method and content of every entry, in archive order.
pub fn unpack(bytes: &[u8]) -> Vec<(String, CompressionMethod, Vec<u8>)> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).unwrap();
            let mut data = Vec::new();
            file.read_to_end(&mut data).unwrap();
            (file.name().to_string(), file.compression(), data)
        })
        .collect()
}

pub fn entry(bytes: &[u8], name: &str) -> Option<Vec<u8>> {
    unpack(bytes)
        .into_iter()
        .find(|(n, _, _)| n == name)
        .map(|(_, _, data)| data)
}

/// One host call as the mock saw it.
#[derive(Debug, Clone)]
pub struct Call {
    pub command: String,
    pub params: Parameters,
}

/// Scripted automation host.
///
/// Records every call in execution order. Commands can be given canned
/// answers, made slow, made to fail, or made to drop the connection.
#[derive(Default)]
pub struct MockHost {
    pub unreachable: bool,
    answers: Mutex<HashMap<String, Value>>,
    delays: Mutex<HashMap<String, Duration>>,
    rejects: Mutex<HashMap<String, String>>,
    drops: Mutex<Vec<String>>,
    calls: Mutex<Vec<Call>>,
    connected: AtomicBool,
    disconnected: AtomicBool,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn answer(&self, command: &str, value: Value) -> &Self {
        self.answers.lock().insert(command.to_string(), value);
        self
    }

    pub fn delay(&self, command: &str, delay: Duration) -> &Self {
        self.delays.lock().insert(command.to_string(), delay);
        self
    }

    pub fn reject(&self, command: &str, message: &str) -> &Self {
        self.rejects.lock().insert(command.to_string(), message.to_string());
        self
    }

    pub fn drop_connection_on(&self, command: &str) -> &Self {
        self.drops.lock().push(command.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.command.clone()).collect()
    }

    pub fn was_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }
}

impl AutomationService for MockHost {
    fn is_available(&self) -> bool {
        !self.unreachable
    }

    fn connect_or_attach(&self) -> Result<SessionHandle, ConnectionError> {
        if self.unreachable {
            return Err(ConnectionError("host not installed".to_string()));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(SessionHandle(42))
    }

    fn invoke(
        &self,
        session: &SessionHandle,
        command: &str,
        params: Parameters,
    ) -> Result<Value, InvokeError> {
        assert_eq!(session, &SessionHandle(42));
        self.calls.lock().push(Call {
            command: command.to_string(),
            params,
        });
        let delay = self.delays.lock().get(command).copied();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        if self.drops.lock().iter().any(|c| c == command) {
            return Err(InvokeError::Disconnected("host process exited".to_string()));
        }
        if let Some(message) = self.rejects.lock().get(command) {
            return Err(HostError::new(message.clone()).into());
        }
        Ok(self.answers.lock().get(command).cloned().unwrap_or(Value::Null))
    }

    fn disconnect(&self, _session: SessionHandle) {
        self.disconnected.store(true, Ordering::SeqCst);
    }
}
