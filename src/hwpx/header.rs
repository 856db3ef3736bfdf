//! Style header (`Contents/header.xml`).
//!
//! The reader maps `hh:charPr` and `hh:paraPr` into a [`StyleCatalog`]. The
//! writer leaves the header untouched unless styles were derived during the
//! session; it then splices the new definitions in next to the existing ones,
//! each built from the source of the style it was derived from, and updates
//! the item counts. Nothing else in the part changes.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Range;

use quick_xml::events::Event;

use super::xml::{XmlCursor, attr, attrs, end_tag, local, number, qname, set_attr, set_num, start_tag};
use crate::common::FormatError;
use crate::common::xml::escape_xml;
use crate::document::{
    Alignment, Attr, Attrs, CharStyle, CharStyleId, ParaStyle, ParaStyleId, StyleCatalog,
};

/// `fontRef` attribute for each `fontface lang`.
const FONT_LANGS: [(&str, &str); 7] = [
    ("HANGUL", "hangul"),
    ("LATIN", "latin"),
    ("HANJA", "hanja"),
    ("JAPANESE", "japanese"),
    ("OTHER", "other"),
    ("SYMBOL", "symbol"),
    ("USER", "user"),
];

/// charPr children that follow `italic`/`bold` in schema order.
const AFTER_EMPHASIS: [&str; 8] = [
    "underline",
    "strikeout",
    "outline",
    "shadow",
    "emboss",
    "engrave",
    "supscript",
    "subscript",
];

/// A container element whose children can be appended to.
#[derive(Debug)]
struct Container {
    qname: String,
    attrs: Attrs,
    start: Range<usize>,
    /// Offset of the end tag; `None` for an empty element.
    end: Option<usize>,
}

impl Container {
    fn open(qname: String, attrs: Attrs, start: Range<usize>, empty: bool) -> Self {
        Self {
            qname,
            attrs,
            start,
            end: if empty { None } else { Some(usize::MAX) },
        }
    }

    /// Edits appending `children` and setting `count_attr` to `count`.
    fn append(&self, count_attr: &str, count: usize, children: String, edits: &mut Vec<Edit>) {
        let mut attrs = self.attrs.clone();
        set_num(&mut attrs, count_attr, count);
        let mut tag = String::new();
        match self.end {
            Some(end) => {
                start_tag(&mut tag, &self.qname, &attrs, false);
                edits.push((self.start.clone(), tag));
                edits.push((end..end, children));
            },
            None => {
                start_tag(&mut tag, &self.qname, &attrs, false);
                tag.push_str(&children);
                end_tag(&mut tag, &self.qname);
                edits.push((self.start.clone(), tag));
            },
        }
    }
}

type Edit = (Range<usize>, String);

#[derive(Debug)]
struct FontFace {
    /// Upper-case `lang`.
    lang: String,
    container: Container,
    fonts: Vec<(u32, String)>,
}

#[derive(Debug)]
struct CharEntry {
    source: Range<usize>,
    height: u32,
    hangul_font: Option<u32>,
    bold: bool,
    italic: bool,
}

#[derive(Debug)]
struct ParaEntry {
    source: Range<usize>,
    alignment: Option<Alignment>,
}

/// Positions and mapped fields of everything the engine touches in a header.
#[derive(Debug, Default)]
struct HeaderLayout {
    fontfaces: Vec<FontFace>,
    chars_container: Option<Container>,
    chars: BTreeMap<u32, CharEntry>,
    paras_container: Option<Container>,
    paras: BTreeMap<u32, ParaEntry>,
}

impl HeaderLayout {
    fn scan(part: &str, text: &str) -> Result<Self, FormatError> {
        let mut cursor = XmlCursor::new(part, text);
        let mut layout = HeaderLayout::default();
        let mut face: Option<FontFace> = None;
        let mut char_pr: Option<(u32, usize, CharEntry)> = None;
        let mut para_pr: Option<(u32, usize, ParaEntry)> = None;
        let mut seen_root = false;

        loop {
            let (event, span) = cursor.next()?;
            let (e, empty) = match event {
                Event::Start(e) => (e, false),
                Event::Empty(e) => (e, true),
                Event::End(e) => {
                    match e.local_name().as_ref() {
                        b"fontface" => {
                            if let Some(mut f) = face.take() {
                                f.container.end = Some(span.start);
                                layout.fontfaces.push(f);
                            }
                        },
                        b"charProperties" => {
                            if let Some(c) = layout.chars_container.as_mut() {
                                c.end = Some(span.start);
                            }
                        },
                        b"paraProperties" => {
                            if let Some(c) = layout.paras_container.as_mut() {
                                c.end = Some(span.start);
                            }
                        },
                        b"charPr" => {
                            if let Some((id, start, mut entry)) = char_pr.take() {
                                entry.source = start..span.end;
                                layout.chars.insert(id, entry);
                            }
                        },
                        b"paraPr" => {
                            if let Some((id, start, mut entry)) = para_pr.take() {
                                entry.source = start..span.end;
                                layout.paras.insert(id, entry);
                            }
                        },
                        _ => {},
                    }
                    continue;
                },
                Event::Eof => break,
                _ => continue,
            };
            seen_root = true;
            let name = qname(&e);
            let local_name = local(&name).to_string();
            match local_name.as_str() {
                "fontface" => {
                    let a = attrs(&e, &cursor)?;
                    let lang = attr(&a, "lang").unwrap_or_default().to_ascii_uppercase();
                    let f = FontFace {
                        lang,
                        container: Container::open(name, a, span.clone(), empty),
                        fonts: Vec::new(),
                    };
                    if empty {
                        layout.fontfaces.push(f);
                    } else {
                        face = Some(f);
                    }
                },
                "font" => {
                    if let Some(f) = face.as_mut() {
                        let a = attrs(&e, &cursor)?;
                        if let Some(id) = number::<u32>(&cursor, &a, "id")? {
                            f.fonts.push((id, attr(&a, "face").unwrap_or_default().to_string()));
                        }
                    }
                },
                "charProperties" => {
                    let a = attrs(&e, &cursor)?;
                    layout.chars_container = Some(Container::open(name, a, span.clone(), empty));
                },
                "paraProperties" => {
                    let a = attrs(&e, &cursor)?;
                    layout.paras_container = Some(Container::open(name, a, span.clone(), empty));
                },
                "charPr" => {
                    let a = attrs(&e, &cursor)?;
                    let id = number::<u32>(&cursor, &a, "id")?
                        .ok_or_else(|| cursor.malformed("charPr without id"))?;
                    let entry = CharEntry {
                        source: span.clone(),
                        height: number(&cursor, &a, "height")?.unwrap_or(1000),
                        hangul_font: None,
                        bold: false,
                        italic: false,
                    };
                    if empty {
                        layout.chars.insert(id, entry);
                    } else {
                        char_pr = Some((id, span.start, entry));
                    }
                },
                "fontRef" => {
                    if let Some((_, _, entry)) = char_pr.as_mut() {
                        let a = attrs(&e, &cursor)?;
                        entry.hangul_font = number(&cursor, &a, "hangul")?;
                    }
                },
                "bold" => {
                    if let Some((_, _, entry)) = char_pr.as_mut() {
                        entry.bold = true;
                    }
                },
                "italic" => {
                    if let Some((_, _, entry)) = char_pr.as_mut() {
                        entry.italic = true;
                    }
                },
                "paraPr" => {
                    let a = attrs(&e, &cursor)?;
                    let id = number::<u32>(&cursor, &a, "id")?
                        .ok_or_else(|| cursor.malformed("paraPr without id"))?;
                    let entry = ParaEntry {
                        source: span.clone(),
                        alignment: None,
                    };
                    if empty {
                        layout.paras.insert(id, entry);
                    } else {
                        para_pr = Some((id, span.start, entry));
                    }
                },
                "align" => {
                    if let Some((_, _, entry)) = para_pr.as_mut()
                        && entry.alignment.is_none()
                    {
                        let a = attrs(&e, &cursor)?;
                        entry.alignment = attr(&a, "horizontal").and_then(Alignment::from_hwpx);
                    }
                },
                _ => {},
            }
        }
        if !seen_root {
            return Err(FormatError::malformed(part, "header has no root element"));
        }
        let unclosed = face.is_some()
            || char_pr.is_some()
            || para_pr.is_some()
            || [&layout.chars_container, &layout.paras_container]
                .into_iter()
                .flatten()
                .any(|c| c.end == Some(usize::MAX));
        if unclosed {
            return Err(FormatError::malformed(part, "unexpected end of header"));
        }
        Ok(layout)
    }

    /// Face name of a font id in the Hangul font face (or the first face).
    fn face_name(&self, id: u32) -> Option<&str> {
        let face = self
            .fontfaces
            .iter()
            .find(|f| f.lang == "HANGUL")
            .or_else(|| self.fontfaces.first())?;
        face.fonts
            .iter()
            .find(|(fid, _)| *fid == id)
            .map(|(_, name)| name.as_str())
    }
}

/// Map the styles of a header part.
pub(crate) fn parse_header(part: &str, text: &str) -> Result<StyleCatalog, FormatError> {
    let layout = HeaderLayout::scan(part, text)?;
    let mut catalog = StyleCatalog::new();
    for (id, entry) in &layout.chars {
        let family = entry
            .hangul_font
            .and_then(|f| layout.face_name(f))
            .map(str::to_string);
        catalog.insert_char(
            CharStyleId(*id),
            CharStyle::new(family, entry.height, entry.bold, entry.italic),
        );
    }
    for (id, entry) in &layout.paras {
        catalog.insert_para(ParaStyleId(*id), ParaStyle::new(entry.alignment));
    }
    Ok(catalog)
}

/// The header with every derived style of `catalog` added.
pub(crate) fn splice_header(part: &str, text: &str, catalog: &StyleCatalog) -> Result<String, FormatError> {
    let layout = HeaderLayout::scan(part, text)?;
    let mut edits: Vec<Edit> = Vec::new();

    // Fonts first: derived character styles may reference new faces.
    let mut new_families = BTreeSet::new();
    for (_, style) in catalog.derived_chars() {
        let base = style.base.and_then(|b| catalog.char_style(b));
        if let Some(family) = &style.family
            && base.and_then(|b| b.family.as_ref()) != Some(family)
        {
            new_families.insert(family.as_str());
        }
    }
    // lang (lower-case fontRef attribute) -> family -> font id
    let mut font_ids: HashMap<&'static str, HashMap<&str, u32>> = HashMap::new();
    for face in &layout.fontfaces {
        let Some(&(_, attr_name)) = FONT_LANGS.iter().find(|(lang, _)| *lang == face.lang) else {
            continue;
        };
        let ids = font_ids.entry(attr_name).or_default();
        let mut next = face.fonts.iter().map(|(id, _)| id + 1).max().unwrap_or(0);
        let mut added = String::new();
        let mut added_count = 0usize;
        for &family in &new_families {
            match face.fonts.iter().find(|(_, name)| name == family) {
                Some((id, _)) => {
                    ids.insert(family, *id);
                },
                None => {
                    ids.insert(family, next);
                    let font_tag = face.container.qname.replace("fontface", "font");
                    added.push_str(&format!(
                        r#"<{font_tag} id="{next}" face="{}" type="TTF" isEmbedded="0"/>"#,
                        escape_xml(family)
                    ));
                    next += 1;
                    added_count += 1;
                },
            }
        }
        if added_count > 0 {
            face.container
                .append("fontCnt", face.fonts.len() + added_count, added, &mut edits);
        }
    }

    let derived_chars: Vec<_> = catalog.derived_chars().collect();
    if !derived_chars.is_empty() {
        let container = layout
            .chars_container
            .as_ref()
            .ok_or_else(|| FormatError::StylesUnavailable(format!("'{part}' has no charProperties")))?;
        let mut added = String::new();
        for (id, style) in &derived_chars {
            let root = style.base.unwrap_or(*id);
            let entry = layout.chars.get(&root.0).ok_or_else(|| {
                FormatError::StylesUnavailable(format!("character style {root} is not in '{part}'"))
            })?;
            let family_ids = style
                .family
                .as_deref()
                .filter(|f| new_families.contains(f))
                .map(|family| {
                    font_ids
                        .iter()
                        .filter_map(|(lang, ids)| ids.get(family).map(|id| (*lang, *id)))
                        .collect::<Vec<_>>()
                });
            added.push_str(&derive_char_source(
                part,
                &text[entry.source.clone()],
                *id,
                style,
                family_ids.as_deref(),
            )?);
        }
        container.append("itemCnt", layout.chars.len() + derived_chars.len(), added, &mut edits);
    }

    let derived_paras: Vec<_> = catalog.derived_paras().collect();
    if !derived_paras.is_empty() {
        let container = layout
            .paras_container
            .as_ref()
            .ok_or_else(|| FormatError::StylesUnavailable(format!("'{part}' has no paraProperties")))?;
        let mut added = String::new();
        for (id, style) in &derived_paras {
            let root = style.base.unwrap_or(*id);
            let entry = layout.paras.get(&root.0).ok_or_else(|| {
                FormatError::StylesUnavailable(format!("paragraph style {root} is not in '{part}'"))
            })?;
            let alignment = style.alignment.unwrap_or(Alignment::Justify);
            added.push_str(&derive_para_source(part, &text[entry.source.clone()], *id, alignment)?);
        }
        container.append("itemCnt", layout.paras.len() + derived_paras.len(), added, &mut edits);
    }

    edits.sort_by_key(|(range, _)| (range.start, range.end));
    let mut out = text.to_string();
    for (range, replacement) in edits.into_iter().rev() {
        out.replace_range(range, &replacement);
    }
    Ok(out)
}

/// Top-level children of an element source: local name and source text.
fn children<'a>(cursor: &mut XmlCursor<'a>) -> Result<Vec<(String, &'a str)>, FormatError> {
    let mut out = Vec::new();
    loop {
        let (event, span) = cursor.next()?;
        match event {
            Event::Start(e) => {
                let name = qname(&e);
                let source = cursor.capture(&e, span)?;
                out.push((local(&name).to_string(), source));
            },
            Event::Empty(e) => {
                let name = qname(&e);
                out.push((local(&name).to_string(), cursor.raw(span)));
            },
            Event::End(_) | Event::Eof => return Ok(out),
            _ => {},
        }
    }
}

/// Reads the root start tag of a style source.
fn root<'a>(cursor: &mut XmlCursor<'a>) -> Result<(String, Attrs, bool), FormatError> {
    loop {
        let (event, _) = cursor.next()?;
        match event {
            Event::Start(e) => return Ok((qname(&e), attrs(&e, cursor)?, false)),
            Event::Empty(e) => return Ok((qname(&e), attrs(&e, cursor)?, true)),
            Event::Eof => return Err(cursor.malformed("empty style definition")),
            _ => {},
        }
    }
}

fn prefix(qname: &str) -> &str {
    qname.split_once(':').map_or("", |(p, _)| &qname[..p.len() + 1])
}

fn derive_char_source(
    part: &str,
    source: &str,
    id: CharStyleId,
    style: &CharStyle,
    font_ids: Option<&[(&str, u32)]>,
) -> Result<String, FormatError> {
    let mut cursor = XmlCursor::new(part, source);
    let (name, mut a, empty) = root(&mut cursor)?;
    set_num(&mut a, "id", id.0);
    set_num(&mut a, "height", style.height);
    let kids = if empty { Vec::new() } else { children(&mut cursor)? };
    let p = prefix(&name);
    let emphasis = {
        let mut s = String::new();
        if style.italic {
            s.push_str(&format!("<{p}italic/>"));
        }
        if style.bold {
            s.push_str(&format!("<{p}bold/>"));
        }
        s
    };

    let mut out = String::new();
    start_tag(&mut out, &name, &a, false);
    let mut placed = false;
    for (local_name, child) in kids {
        match local_name.as_str() {
            "bold" | "italic" => continue,
            "fontRef" if font_ids.is_some() => {
                let mut child_cursor = XmlCursor::new(part, child);
                let (child_name, mut child_attrs, _) = root(&mut child_cursor)?;
                for &(lang, font) in font_ids.unwrap_or_default() {
                    set_num(&mut child_attrs, lang, font);
                }
                start_tag(&mut out, &child_name, &child_attrs, true);
            },
            n if AFTER_EMPHASIS.contains(&n) && !placed => {
                out.push_str(&emphasis);
                placed = true;
                out.push_str(child);
            },
            _ => out.push_str(child),
        }
    }
    if !placed {
        out.push_str(&emphasis);
    }
    end_tag(&mut out, &name);
    Ok(out)
}

fn derive_para_source(part: &str, source: &str, id: ParaStyleId, alignment: Alignment) -> Result<String, FormatError> {
    let mut cursor = XmlCursor::new(part, source);
    let (name, mut a, empty) = root(&mut cursor)?;
    set_num(&mut a, "id", id.0);
    let kids = if empty { Vec::new() } else { children(&mut cursor)? };

    let mut out = String::new();
    start_tag(&mut out, &name, &a, false);
    if !kids.iter().any(|(n, _)| n == "align") {
        start_tag(
            &mut out,
            &format!("{}align", prefix(&name)),
            &[
                Attr::new("horizontal", alignment.to_hwpx()),
                Attr::new("vertical", "BASELINE"),
            ],
            true,
        );
    }
    let mut aligned = false;
    for (local_name, child) in &kids {
        if local_name == "align" && !aligned {
            let mut child_cursor = XmlCursor::new(part, child);
            let (child_name, mut child_attrs, _) = root(&mut child_cursor)?;
            set_attr(&mut child_attrs, "horizontal", alignment.to_hwpx());
            start_tag(&mut out, &child_name, &child_attrs, true);
            aligned = true;
        } else {
            out.push_str(child);
        }
    }
    end_tag(&mut out, &name);
    Ok(out)
}
