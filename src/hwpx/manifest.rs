//! OCF container and OPF manifest parsing.
//!
//! `META-INF/container.xml` names the manifest (`Contents/content.hpf`),
//! which lists the package items, the reading order (spine) and the
//! descriptive metadata.

use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::events::Event;

use super::constants::{HEADER_ITEM_ID, MANIFEST_MEDIA_TYPE};
use super::xml::{XmlCursor, attr, attrs, local, qname};
use crate::common::FormatError;
use crate::document::DocumentMetadata;

/// The manifest path named by the container, if any.
///
/// The rootfile with the HWPML package media type (or an `.hpf` path) wins
/// over any other rootfile, such as the preview text.
pub(crate) fn parse_container(part: &str, text: &str) -> Result<Option<String>, FormatError> {
    let mut cursor = XmlCursor::new(part, text);
    let mut first = None;
    loop {
        let (event, _) = cursor.next()?;
        match event {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"rootfile" => {
                let a = attrs(&e, &cursor)?;
                let Some(path) = attr(&a, "full-path") else {
                    continue;
                };
                if attr(&a, "media-type") == Some(MANIFEST_MEDIA_TYPE) || path.ends_with(".hpf") {
                    return Ok(Some(path.to_string()));
                }
                first.get_or_insert_with(|| path.to_string());
            },
            Event::Eof => break,
            _ => {},
        }
    }
    Ok(first)
}

/// One `opf:item`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    pub href: String,
    pub media_type: String,
}

/// The parsed OPF package document.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pub items: Vec<ManifestItem>,
    /// Item ids in reading order.
    pub spine: Vec<String>,
    pub metadata: DocumentMetadata,
}

impl Manifest {
    pub fn parse(part: &str, text: &str) -> Result<Self, FormatError> {
        let mut cursor = XmlCursor::new(part, text);
        let mut manifest = Manifest::default();
        let mut in_metadata = false;
        let mut seen_root = false;
        loop {
            let (event, _) = cursor.next()?;
            match event {
                Event::Start(e) if e.local_name().as_ref() == b"metadata" => in_metadata = true,
                Event::End(e) if e.local_name().as_ref() == b"metadata" => in_metadata = false,
                Event::Start(e) if in_metadata => {
                    let name = qname(&e);
                    let a = attrs(&e, &cursor)?;
                    let value = cursor.text_content()?;
                    manifest.read_metadata(local(&name), attr(&a, "name"), value);
                },
                Event::Start(e) | Event::Empty(e) => {
                    seen_root = true;
                    match e.local_name().as_ref() {
                        b"item" => {
                            let a = attrs(&e, &cursor)?;
                            let (Some(id), Some(href)) = (attr(&a, "id"), attr(&a, "href")) else {
                                return Err(cursor.malformed("manifest item without id or href"));
                            };
                            manifest.items.push(ManifestItem {
                                id: id.to_string(),
                                href: href.to_string(),
                                media_type: attr(&a, "media-type").unwrap_or_default().to_string(),
                            });
                        },
                        b"itemref" => {
                            let a = attrs(&e, &cursor)?;
                            if let Some(idref) = attr(&a, "idref") {
                                manifest.spine.push(idref.to_string());
                            }
                        },
                        _ => {},
                    }
                },
                Event::Eof => break,
                _ => {},
            }
        }
        if !seen_root {
            return Err(FormatError::malformed(part, "manifest has no root element"));
        }
        for idref in &manifest.spine {
            if manifest.item(idref).is_none() {
                return Err(FormatError::malformed(
                    part,
                    format!("spine references unknown item '{idref}'"),
                ));
            }
        }
        Ok(manifest)
    }

    fn read_metadata(&mut self, element: &str, name: Option<&str>, value: String) {
        let value = value.trim().to_string();
        if value.is_empty() {
            return;
        }
        let key = match (element, name) {
            ("meta", Some(name)) => name,
            ("meta", None) => return,
            (element, _) => element,
        };
        let meta = &mut self.metadata;
        match key {
            "title" => meta.title = Some(value),
            "creator" => meta.author = Some(value),
            "subject" => meta.subject = Some(value),
            "keyword" | "keywords" => meta.keywords = Some(value),
            "CreatedDate" | "date" => {
                if meta.created.is_none() {
                    meta.created = parse_date(&value);
                }
            },
            "ModifiedDate" => meta.modified = parse_date(&value),
            _ => {},
        }
    }

    pub fn item(&self, id: &str) -> Option<&ManifestItem> {
        self.items.iter().find(|i| i.id == id)
    }

    /// The style header item.
    pub fn header(&self) -> Option<&ManifestItem> {
        self.item(HEADER_ITEM_ID)
            .or_else(|| self.items.iter().find(|i| i.href.ends_with("header.xml")))
    }

    /// Body section items in reading order.
    ///
    /// These are the spine items other than the header. A manifest without a
    /// spine falls back to the items named like `sectionN.xml`.
    pub fn sections(&self) -> Vec<&ManifestItem> {
        let header = self.header().map(|h| h.id.as_str());
        let from_spine: Vec<_> = self
            .spine
            .iter()
            .filter(|id| Some(id.as_str()) != header)
            .filter_map(|id| self.item(id))
            .filter(|i| i.href.ends_with(".xml"))
            .collect();
        if !from_spine.is_empty() || !self.spine.is_empty() {
            return from_spine;
        }
        let mut sections: Vec<_> = self
            .items
            .iter()
            .filter(|i| {
                let name = i.href.rsplit('/').next().unwrap_or(&i.href);
                name.starts_with("section") && name.ends_with(".xml")
            })
            .collect();
        sections.sort_by_key(|i| section_number(&i.href));
        sections
    }
}

fn section_number(href: &str) -> u32 {
    href.trim_end_matches(".xml")
        .rsplit(|c: char| !c.is_ascii_digit())
        .next()
        .and_then(|d| d.parse().ok())
        .unwrap_or(u32::MAX)
}

/// RFC 3339, or a bare `YYYY-MM-DDTHH:MM:SS` taken as UTC.
fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
