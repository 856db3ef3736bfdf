//! quick-xml plumbing shared by the part parsers and the writer.
//!
//! Parsers work on the decoded part text and track byte offsets, so any
//! element they do not map can be captured as the exact source slice.

use std::ops::Range;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::common::FormatError;
use crate::common::bom::{BomKind, strip_bom};
use crate::common::xml::{escape_xml, unescape_xml};
use crate::document::{Attr, Attrs};

/// Decode a content part as UTF-8.
///
/// A UTF-8 BOM is skipped. Other BOMs, invalid UTF-8 and an XML declaration
/// naming another encoding are rejected.
pub(crate) fn decode_part<'a>(part: &str, bytes: &'a [u8]) -> Result<&'a str, FormatError> {
    let body = match strip_bom(bytes) {
        (Some(BomKind::Utf8), rest) | (None, rest) => rest,
        (Some(kind), _) => {
            return Err(FormatError::encoding(part, format!("{} byte order mark", kind.label())));
        },
    };
    let text = std::str::from_utf8(body).map_err(|e| FormatError::encoding(part, e.to_string()))?;
    if let Some(declared) = declared_encoding(text)
        && !declared.eq_ignore_ascii_case("utf-8")
        && !declared.eq_ignore_ascii_case("utf8")
    {
        return Err(FormatError::encoding(part, format!("declared encoding '{declared}'")));
    }
    Ok(text)
}

/// The `encoding` pseudo-attribute of a leading XML declaration.
fn declared_encoding(text: &str) -> Option<&str> {
    let decl = text.strip_prefix("<?xml")?;
    let decl = &decl[..decl.find("?>")?];
    let at = decl.find("encoding")?;
    let rest = decl[at + "encoding".len()..].trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &rest[1..];
    Some(&value[..value.find(quote)?])
}

/// Event reader over one part that reports the source span of every event.
pub(crate) struct XmlCursor<'a> {
    reader: Reader<&'a [u8]>,
    text: &'a str,
    part: &'a str,
}

impl<'a> XmlCursor<'a> {
    pub(crate) fn new(part: &'a str, text: &'a str) -> Self {
        Self {
            reader: Reader::from_str(text),
            text,
            part,
        }
    }

    #[inline]
    fn position(&self) -> usize {
        self.reader.buffer_position() as usize
    }

    /// The next event and the byte range it covers.
    pub(crate) fn next(&mut self) -> Result<(Event<'a>, Range<usize>), FormatError> {
        let start = self.position();
        let event = self.reader.read_event().map_err(|e| self.malformed(e))?;
        Ok((event, start..self.position()))
    }

    /// Skip the content of an element whose start tag was just read and
    /// return the source of the whole element.
    pub(crate) fn capture(&mut self, start: &BytesStart<'a>, span: Range<usize>) -> Result<&'a str, FormatError> {
        self.reader
            .read_to_end(start.name())
            .map_err(|e| self.malformed(e))?;
        Ok(&self.text[span.start..self.position()])
    }

    /// Concatenated character data up to the end of the element whose start
    /// tag was just read. Nested markup is skipped.
    pub(crate) fn text_content(&mut self) -> Result<String, FormatError> {
        let mut out = String::new();
        let mut depth = 0usize;
        loop {
            let (event, span) = self.next()?;
            match event {
                Event::Start(_) => depth += 1,
                Event::End(_) if depth == 0 => return Ok(out),
                Event::End(_) => depth -= 1,
                Event::Text(_) | Event::GeneralRef(_) | Event::CData(_) => out.push_str(&self.chars(span)),
                Event::Eof => return Err(self.malformed("unexpected end of document")),
                _ => {},
            }
        }
    }

    /// Source of `span`.
    #[inline]
    pub(crate) fn raw(&self, span: Range<usize>) -> &'a str {
        &self.text[span]
    }

    /// Unescaped character data of a text, entity reference or CDATA event.
    pub(crate) fn chars(&self, span: Range<usize>) -> String {
        let raw = self.raw(span);
        if let Some(inner) = raw.strip_prefix("<![CDATA[").and_then(|r| r.strip_suffix("]]>")) {
            return inner.to_string();
        }
        unescape_xml(raw).into_owned()
    }

    pub(crate) fn malformed(&self, cause: impl std::fmt::Display) -> FormatError {
        FormatError::malformed(self.part, format!("{cause} (at byte {})", self.position()))
    }
}

/// Local part of a possibly prefixed name.
#[inline]
pub(crate) fn local(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, l)| l)
}

/// Qualified name of an element as written in the source.
pub(crate) fn qname(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

/// All attributes of a start tag, values unescaped.
pub(crate) fn attrs(e: &BytesStart<'_>, cursor: &XmlCursor<'_>) -> Result<Attrs, FormatError> {
    let mut out = Attrs::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| cursor.malformed(err))?;
        let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = std::str::from_utf8(&attr.value).map_err(|err| cursor.malformed(err))?;
        out.push(Attr::new(name, unescape_xml(raw)));
    }
    Ok(out)
}

/// Value of the attribute with local name `name`.
pub(crate) fn attr<'a>(attrs: &'a [Attr], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|a| local(&a.name) == name)
        .map(|a| a.value.as_str())
}

/// Set an attribute by local name, appending it when absent.
pub(crate) fn set_attr(attrs: &mut Attrs, name: &str, value: impl Into<String>) {
    let value = value.into();
    match attrs.iter_mut().find(|a| local(&a.name) == name) {
        Some(a) => a.value = value,
        None => attrs.push(Attr::new(name, value)),
    }
}

/// [`set_attr`] for integer values.
pub(crate) fn set_num(attrs: &mut Attrs, name: &str, value: impl itoa::Integer) {
    set_attr(attrs, name, itoa::Buffer::new().format(value));
}

/// `<name a="v" ...>`, or `<name ... />` when `empty`.
pub(crate) fn start_tag(out: &mut String, name: &str, attrs: &[Attr], empty: bool) {
    out.push('<');
    out.push_str(name);
    for a in attrs {
        out.push(' ');
        out.push_str(&a.name);
        out.push_str("=\"");
        out.push_str(&escape_xml(&a.value));
        out.push('"');
    }
    out.push_str(if empty { "/>" } else { ">" });
}

pub(crate) fn end_tag(out: &mut String, name: &str) {
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

/// Parse an integer attribute, reporting the element on failure.
pub(crate) fn number<T: std::str::FromStr>(
    cursor: &XmlCursor<'_>,
    attrs: &[Attr],
    name: &str,
) -> Result<Option<T>, FormatError> {
    match attr(attrs, name) {
        None => Ok(None),
        Some(v) => v
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| cursor.malformed(format!("attribute '{name}' is not a number: '{v}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_accepts_utf8_with_bom() {
        let bytes = b"\xEF\xBB\xBF<?xml version=\"1.0\" encoding=\"UTF-8\"?><a/>";
        assert!(decode_part("a.xml", bytes).unwrap().starts_with("<?xml"));
    }

    #[test]
    fn test_decode_rejects_other_encodings() {
        let err = decode_part("a.xml", b"\xFF\xFE<\x00a\x00").unwrap_err();
        assert!(matches!(err, FormatError::Encoding { .. }));

        let err = decode_part("a.xml", b"<?xml version='1.0' encoding='EUC-KR'?><a/>").unwrap_err();
        assert_eq!(
            err,
            FormatError::encoding("a.xml", "declared encoding 'EUC-KR'")
        );

        assert!(decode_part("a.xml", b"<a>\xC0\xC1</a>").is_err());
    }

    #[test]
    fn test_cursor_spans_and_capture() {
        let text = r#"<root><keep a="1"><deep/></keep>tail &amp; more</root>"#;
        let mut cursor = XmlCursor::new("x.xml", text);
        let (event, _) = cursor.next().unwrap();
        assert!(matches!(event, Event::Start(_)));
        let (event, span) = cursor.next().unwrap();
        let Event::Start(e) = event else { panic!("expected start") };
        assert_eq!(attr(&attrs(&e, &cursor).unwrap(), "a"), Some("1"));
        assert_eq!(cursor.capture(&e, span).unwrap(), r#"<keep a="1"><deep/></keep>"#);

        let mut text_out = String::new();
        loop {
            let (event, span) = cursor.next().unwrap();
            match event {
                Event::Text(_) | Event::GeneralRef(_) => text_out.push_str(&cursor.chars(span)),
                _ => break,
            }
        }
        assert_eq!(text_out, "tail & more");
    }

    #[test]
    fn test_mismatched_end_is_malformed() {
        let mut cursor = XmlCursor::new("x.xml", "<a><b></a>");
        let mut failed = false;
        for _ in 0..4 {
            if cursor.next().is_err() {
                failed = true;
                break;
            }
        }
        assert!(failed);
    }

    #[test]
    fn test_tag_writing_escapes() {
        let mut attrs = Attrs::new();
        set_attr(&mut attrs, "name", "a\"b<c");
        set_attr(&mut attrs, "name", "x & y");
        let mut out = String::new();
        start_tag(&mut out, "hp:t", &attrs, true);
        assert_eq!(out, r#"<hp:t name="x &amp; y"/>"#);
        assert_eq!(local("hp:t"), "t");
        assert_eq!(local("t"), "t");
    }
}
