//! Body section parts (`Contents/sectionN.xml`).
//!
//! Mapped structure: `hs:sec` > `hp:p` > `hp:run` > `hp:t`, and `hp:tbl` >
//! `hp:tr` > `hp:tc` > `hp:subList` > `hp:p`. Every other element is kept as
//! a raw fragment next to the mapped node it sits beside, and re-emitted in
//! place by [`write_section`].
//!
//! A table lives inside a run of a carrier paragraph. When that paragraph
//! holds no text the table becomes a block of its own and the paragraph is
//! kept as the table's host; otherwise the table is lifted out after the
//! paragraph and a plain host is generated on write.

use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};

use super::constants::{DEFAULT_ROW_HEIGHT, DEFAULT_TEXT_WIDTH, ns, tag};
use super::xml::{XmlCursor, attr, attrs, end_tag, number, qname, set_num, start_tag};
use crate::common::FormatError;
use crate::common::xml::escape_text;
use crate::document::{
    Attr, Attrs, Block, Cell, CharStyleId, Fragment, NodeId, ParaStyleId, Paragraph, Run, Section,
    SectionHead, Table, TableHost,
};

const P: &str = "hp:p";
const RUN: &str = "hp:run";
const T: &str = "hp:t";

/// Characters written as empty elements inside `hp:t`.
/// Upper bound on `rowCnt * colCnt` accepted from a section part.
const MAX_TABLE_SLOTS: usize = 1 << 18;

const TEXT_MARKS: [(&[u8], char, &str); 5] = [
    (tag::TAB, '\t', "<hp:tab/>"),
    (tag::LINE_BREAK, '\n', "<hp:lineBreak/>"),
    (tag::NB_SPACE, '\u{00A0}', "<hp:nbSpace/>"),
    (tag::FW_SPACE, '\u{3000}', "<hp:fwSpace/>"),
    (tag::HYPHEN, '\u{00AD}', "<hp:hyphen/>"),
];

/// Parse a section part. Node ids are placeholders until
/// [`assign_ids`] runs over the whole document.
pub(crate) fn parse_section(part: &str, text: &str) -> Result<Section, FormatError> {
    let mut parser = SectionParser {
        cursor: XmlCursor::new(part, text),
    };
    let mut section = Section::new(NodeId(0), part);
    loop {
        let (event, span) = parser.cursor.next()?;
        match event {
            Event::Start(e) => {
                let name = qname(&e);
                section.head = Some(SectionHead {
                    prolog: text[..span.start].to_string(),
                    start_tag: text[span].to_string(),
                    name,
                });
                parser.body(&mut section.blocks, &mut section.fragments)?;
                return Ok(section);
            },
            Event::Empty(e) => {
                section.head = Some(SectionHead {
                    prolog: text[..span.start].to_string(),
                    start_tag: text[span].trim_end_matches("/>").to_string() + ">",
                    name: qname(&e),
                });
                return Ok(section);
            },
            Event::Eof => return Err(FormatError::malformed(part, "section has no root element")),
            _ => {},
        }
    }
}

/// A table met inside a run, before it is placed.
struct LooseTable {
    table: Table,
    /// Run index within the paragraph.
    run: usize,
    after_text: bool,
    /// Position in the run's leading or trailing fragments.
    index: usize,
}

enum RunItem {
    Text(String, Vec<Fragment>),
    Raw(String),
    Table(Box<Table>),
}

struct SectionParser<'a> {
    cursor: XmlCursor<'a>,
}

impl<'a> SectionParser<'a> {
    /// Children of a block container (section root or `hp:subList`) up to its
    /// end tag.
    fn body(&mut self, blocks: &mut Vec<Block>, fragments: &mut Vec<Fragment>) -> Result<(), FormatError> {
        loop {
            let (event, span) = self.cursor.next()?;
            match event {
                Event::Start(e) if e.local_name().as_ref() == tag::PARAGRAPH => {
                    blocks.extend(self.paragraph(&e, false)?);
                },
                Event::Empty(e) if e.local_name().as_ref() == tag::PARAGRAPH => {
                    blocks.extend(self.paragraph(&e, true)?);
                },
                Event::Start(e) => {
                    let raw = self.cursor.capture(&e, span)?;
                    fragments.push(Fragment::new(blocks.len(), raw));
                },
                Event::End(_) => return Ok(()),
                Event::Eof => return Err(self.cursor.malformed("unexpected end of section")),
                Event::Text(_) if self.cursor.raw(span.clone()).trim().is_empty() => {},
                _ => fragments.push(Fragment::new(blocks.len(), self.cursor.raw(span))),
            }
        }
    }

    fn paragraph(&mut self, start: &BytesStart<'a>, empty: bool) -> Result<Vec<Block>, FormatError> {
        let a = attrs(start, &self.cursor)?;
        let style = ParaStyleId(number(&self.cursor, &a, "paraPrIDRef")?.unwrap_or(0));
        let mut p = Paragraph::new(NodeId(0), style);
        p.attrs = a;
        let mut tables = Vec::new();
        if !empty {
            loop {
                let (event, span) = self.cursor.next()?;
                match event {
                    Event::Start(e) if e.local_name().as_ref() == tag::RUN => {
                        let offset = p.runs.len();
                        let (runs, found) = self.run(&e, false)?;
                        p.runs.extend(runs);
                        tables.extend(found.into_iter().map(|mut t| {
                            t.run += offset;
                            t
                        }));
                    },
                    Event::Empty(e) if e.local_name().as_ref() == tag::RUN => {
                        let (runs, _) = self.run(&e, true)?;
                        p.runs.extend(runs);
                    },
                    Event::Start(e) => {
                        let raw = self.cursor.capture(&e, span)?;
                        p.fragments.push(Fragment::new(p.runs.len(), raw));
                    },
                    Event::End(_) => break,
                    Event::Eof => return Err(self.cursor.malformed("unexpected end of paragraph")),
                    Event::Text(_) if self.cursor.raw(span.clone()).trim().is_empty() => {},
                    _ => p.fragments.push(Fragment::new(p.runs.len(), self.cursor.raw(span))),
                }
            }
        }

        if tables.is_empty() {
            return Ok(vec![Block::Paragraph(p)]);
        }
        let mut blocks = Vec::with_capacity(tables.len() + 1);
        let mut tables = tables.into_iter();
        if p.char_len() == 0 {
            if let Some(first) = tables.next() {
                let mut table = first.table;
                table.host = Some(TableHost {
                    paragraph: p,
                    run: first.run,
                    after_text: first.after_text,
                    index: first.index,
                });
                blocks.push(Block::from(table));
            }
        } else {
            blocks.push(Block::Paragraph(p));
        }
        blocks.extend(tables.map(|t| Block::from(t.table)));
        Ok(blocks)
    }

    /// One `hp:run`, which yields a model run per `hp:t` it holds.
    fn run(&mut self, start: &BytesStart<'a>, empty: bool) -> Result<(Vec<Run>, Vec<LooseTable>), FormatError> {
        let a = attrs(start, &self.cursor)?;
        let style = CharStyleId(number(&self.cursor, &a, "charPrIDRef")?.unwrap_or(0));
        let mut items = Vec::new();
        if !empty {
            loop {
                let (event, span) = self.cursor.next()?;
                match event {
                    Event::Start(e) if e.local_name().as_ref() == tag::TEXT => {
                        let (text, inline) = self.text()?;
                        items.push(RunItem::Text(text, inline));
                    },
                    Event::Empty(e) if e.local_name().as_ref() == tag::TEXT => {
                        items.push(RunItem::Text(String::new(), Vec::new()));
                    },
                    Event::Start(e) if e.local_name().as_ref() == tag::TABLE => {
                        items.push(RunItem::Table(Box::new(self.table(&e)?)));
                    },
                    Event::Start(e) => items.push(RunItem::Raw(self.cursor.capture(&e, span)?.to_string())),
                    Event::End(_) => break,
                    Event::Eof => return Err(self.cursor.malformed("unexpected end of run")),
                    Event::Text(_) if self.cursor.raw(span.clone()).trim().is_empty() => {},
                    _ => items.push(RunItem::Raw(self.cursor.raw(span).to_string())),
                }
            }
        }

        let mut runs: Vec<Run> = Vec::new();
        let mut pending: Vec<String> = Vec::new();
        let mut tables = Vec::new();
        for item in items {
            match item {
                RunItem::Text(text, inline) => {
                    let mut run = Run::new(style, text);
                    run.inline = inline;
                    run.attrs = a.clone();
                    run.leading = std::mem::take(&mut pending);
                    runs.push(run);
                },
                RunItem::Raw(raw) => pending.push(raw),
                RunItem::Table(table) => tables.push(LooseTable {
                    table: *table,
                    run: runs.len(),
                    after_text: false,
                    index: pending.len(),
                }),
            }
        }
        match runs.last_mut() {
            Some(last) => {
                last.trailing = pending;
                let last_index = runs.len() - 1;
                for t in tables.iter_mut().filter(|t| t.run == runs.len()) {
                    t.run = last_index;
                    t.after_text = true;
                }
            },
            None => {
                let mut run = Run::new(style, "");
                run.attrs = a;
                run.leading = pending;
                runs.push(run);
            },
        }
        Ok((runs, tables))
    }

    /// Content of `hp:t` up to its end tag.
    fn text(&mut self) -> Result<(String, Vec<Fragment>), FormatError> {
        let mut text = String::new();
        let mut inline = Vec::new();
        let mut len = 0usize;
        loop {
            let (event, span) = self.cursor.next()?;
            let (e, empty) = match event {
                Event::Text(_) | Event::GeneralRef(_) | Event::CData(_) => {
                    let chars = self.cursor.chars(span);
                    len += chars.chars().count();
                    text.push_str(&chars);
                    continue;
                },
                Event::Start(e) => (e, false),
                Event::Empty(e) => (e, true),
                Event::End(_) => return Ok((text, inline)),
                Event::Eof => return Err(self.cursor.malformed("unexpected end of text")),
                _ => {
                    inline.push(Fragment::new(len, self.cursor.raw(span)));
                    continue;
                },
            };
            match TEXT_MARKS.iter().find(|(name, _, _)| e.local_name().as_ref() == *name) {
                Some((_, ch, _)) => {
                    if !empty {
                        self.cursor.capture(&e, span)?;
                    }
                    text.push(*ch);
                    len += 1;
                },
                None => {
                    let raw = if empty {
                        self.cursor.raw(span)
                    } else {
                        self.cursor.capture(&e, span)?
                    };
                    inline.push(Fragment::new(len, raw));
                },
            }
        }
    }

    fn table(&mut self, start: &BytesStart<'a>) -> Result<Table, FormatError> {
        let a = attrs(start, &self.cursor)?;
        let mut prefix = Vec::new();
        let mut suffix = Vec::new();
        let mut row_tails = Vec::new();
        // (row, col, cell) as addressed in the source
        let mut placed: Vec<(usize, usize, Cell)> = Vec::new();
        let mut row_index = 0usize;
        loop {
            let (event, span) = self.cursor.next()?;
            match event {
                Event::Start(e) if e.local_name().as_ref() == tag::ROW => {
                    let mut tail = Vec::new();
                    let mut col_index = 0usize;
                    loop {
                        let (event, span) = self.cursor.next()?;
                        match event {
                            Event::Start(e) if e.local_name().as_ref() == tag::CELL => {
                                let (addr, cell) = self.cell(&e)?;
                                let (row, col) = addr.unwrap_or((row_index, col_index));
                                col_index = col.saturating_add(cell.col_span.max(1) as usize);
                                placed.push((row, col, cell));
                            },
                            Event::Start(e) => tail.push(self.cursor.capture(&e, span)?.to_string()),
                            Event::End(_) => break,
                            Event::Eof => return Err(self.cursor.malformed("unexpected end of table row")),
                            Event::Text(_) if self.cursor.raw(span.clone()).trim().is_empty() => {},
                            _ => tail.push(self.cursor.raw(span).to_string()),
                        }
                    }
                    row_tails.push(tail);
                    row_index += 1;
                },
                Event::Empty(e) if e.local_name().as_ref() == tag::ROW => {
                    row_tails.push(Vec::new());
                    row_index += 1;
                },
                Event::Start(e) => {
                    let raw = self.cursor.capture(&e, span)?.to_string();
                    if row_index == 0 { prefix.push(raw) } else { suffix.push(raw) }
                },
                Event::End(_) => break,
                Event::Eof => return Err(self.cursor.malformed("unexpected end of table")),
                Event::Text(_) if self.cursor.raw(span.clone()).trim().is_empty() => {},
                _ => {
                    let raw = self.cursor.raw(span).to_string();
                    if row_index == 0 { prefix.push(raw) } else { suffix.push(raw) }
                },
            }
        }

        let extent_rows = placed
            .iter()
            .map(|(r, _, c)| r.saturating_add(c.row_span.max(1) as usize))
            .max()
            .unwrap_or(0)
            .max(row_tails.len());
        let extent_cols = placed
            .iter()
            .map(|(_, col, c)| col.saturating_add(c.col_span.max(1) as usize))
            .max()
            .unwrap_or(0);
        let rows = number::<usize>(&self.cursor, &a, "rowCnt")?.unwrap_or(extent_rows);
        let cols = number::<usize>(&self.cursor, &a, "colCnt")?.unwrap_or(extent_cols);

        let slots = rows
            .checked_mul(cols)
            .filter(|&n| n <= MAX_TABLE_SLOTS)
            .ok_or_else(|| {
                self.cursor.malformed(format!(
                    "table of {rows}x{cols} exceeds {MAX_TABLE_SLOTS} cells"
                ))
            })?;
        let mut grid: Vec<Option<Cell>> = (0..slots).map(|_| None).collect();
        for (row, col, cell) in placed {
            if row >= rows || col >= cols {
                return Err(self.cursor.malformed(format!(
                    "cell ({row}, {col}) lies outside a {rows}x{cols} table"
                )));
            }
            let slot = &mut grid[row * cols + col];
            if slot.is_some() {
                return Err(self.cursor.malformed(format!("two cells at ({row}, {col})")));
            }
            *slot = Some(cell);
        }
        let cells = grid
            .into_iter()
            .map(|c| c.unwrap_or_else(|| Cell::covered(NodeId(0))))
            .collect();

        let mut table = Table::from_grid(NodeId(0), rows, cols, cells);
        table.attrs = a;
        table.prefix = prefix;
        table.suffix = suffix;
        row_tails.resize(rows, Vec::new());
        table.row_tails = row_tails;
        Ok(table)
    }

    /// One `hp:tc` and its declared address.
    fn cell(&mut self, start: &BytesStart<'a>) -> Result<(Option<(usize, usize)>, Cell), FormatError> {
        let mut cell = Cell::blank(NodeId(0), Paragraph::new(NodeId(0), ParaStyleId(0)));
        cell.blocks.clear();
        cell.attrs = attrs(start, &self.cursor)?;
        let mut addr = None;
        loop {
            let (event, span) = self.cursor.next()?;
            let (e, empty) = match event {
                Event::Start(e) => (e, false),
                Event::Empty(e) => (e, true),
                Event::End(_) => return Ok((addr, cell)),
                Event::Eof => return Err(self.cursor.malformed("unexpected end of table cell")),
                Event::Text(_) if self.cursor.raw(span.clone()).trim().is_empty() => continue,
                _ => {
                    cell.tail.push(self.cursor.raw(span).to_string());
                    continue;
                },
            };
            match e.local_name().as_ref() {
                tag::SUB_LIST => {
                    cell.sublist_attrs = attrs(&e, &self.cursor)?;
                    if !empty {
                        self.body(&mut cell.blocks, &mut cell.fragments)?;
                    }
                },
                tag::CELL_ADDR => {
                    let a = attrs(&e, &self.cursor)?;
                    let row = number::<usize>(&self.cursor, &a, "rowAddr")?;
                    let col = number::<usize>(&self.cursor, &a, "colAddr")?;
                    if let (Some(row), Some(col)) = (row, col) {
                        addr = Some((row, col));
                    }
                    if !empty {
                        self.cursor.capture(&e, span)?;
                    }
                },
                tag::CELL_SPAN => {
                    let a = attrs(&e, &self.cursor)?;
                    cell.col_span = number(&self.cursor, &a, "colSpan")?.unwrap_or(1);
                    cell.row_span = number(&self.cursor, &a, "rowSpan")?.unwrap_or(1);
                    if !empty {
                        self.cursor.capture(&e, span)?;
                    }
                },
                _ => {
                    let raw = if empty {
                        self.cursor.raw(span)
                    } else {
                        self.cursor.capture(&e, span)?
                    };
                    cell.tail.push(raw.to_string());
                },
            }
        }
    }
}

/// Give every section, paragraph, table and cell its final id.
///
/// Paragraph and table ids declared in the source are kept when they are
/// numeric and unique; all other nodes get fresh ids above the largest
/// declared one. Returns the next free id.
pub(crate) fn assign_ids(sections: &mut [Section]) -> u64 {
    fn declared(attrs: &[Attr]) -> Option<u64> {
        attr(attrs, "id")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|v| *v <= u64::MAX / 2)
    }
    fn count(blocks: &[Block], seen: &mut HashMap<u64, usize>) {
        for block in blocks {
            let attrs = match block {
                Block::Paragraph(p) => &p.attrs,
                Block::Table(t) => &t.attrs,
            };
            if let Some(id) = declared(attrs) {
                *seen.entry(id).or_default() += 1;
            }
            if let Block::Table(t) = block {
                for cell in &t.cells {
                    count(&cell.blocks, seen);
                }
            }
        }
    }
    fn assign(blocks: &mut [Block], seen: &HashMap<u64, usize>, next: &mut u64) {
        fn fresh(next: &mut u64) -> NodeId {
            let id = NodeId(*next);
            *next += 1;
            id
        }
        for block in blocks {
            let keep = |attrs: &[Attr]| declared(attrs).filter(|id| seen.get(id) == Some(&1)).map(NodeId);
            match block {
                Block::Paragraph(p) => p.id = keep(p.attrs.as_slice()).unwrap_or_else(|| fresh(next)),
                Block::Table(t) => {
                    t.id = keep(t.attrs.as_slice()).unwrap_or_else(|| fresh(next));
                    for cell in &mut t.cells {
                        cell.id = fresh(next);
                        assign(&mut cell.blocks, seen, next);
                    }
                },
            }
        }
    }

    let mut seen = HashMap::new();
    for section in sections.iter() {
        count(&section.blocks, &mut seen);
    }
    let mut next = seen.keys().max().map_or(1, |max| max + 1);
    for section in sections.iter_mut() {
        section.id = NodeId(next);
        next += 1;
        assign(&mut section.blocks, &seen, &mut next);
    }
    next
}

/// Serialize a section part.
pub(crate) fn write_section(section: &Section) -> String {
    let mut out = String::with_capacity(4096);
    let name = match &section.head {
        Some(head) => {
            out.push_str(&head.prolog);
            out.push_str(&head.start_tag);
            head.name.as_str()
        },
        None => {
            out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
            out.push_str(&format!(
                r#"<hs:sec xmlns:hp="{}" xmlns:hs="{}" xmlns:hc="{}" xmlns:hh="{}">"#,
                ns::PARAGRAPH,
                ns::SECTION,
                ns::CORE,
                ns::HEAD
            ));
            "hs:sec"
        },
    };
    write_blocks(&mut out, &section.blocks, &section.fragments);
    end_tag(&mut out, name);
    out
}

fn write_fragments(out: &mut String, fragments: &[Fragment], position: usize, last: bool) {
    for f in fragments {
        if f.position == position || (last && f.position > position) {
            out.push_str(&f.xml);
        }
    }
}

fn write_blocks(out: &mut String, blocks: &[Block], fragments: &[Fragment]) {
    for (i, block) in blocks.iter().enumerate() {
        write_fragments(out, fragments, i, false);
        match block {
            Block::Paragraph(p) => write_paragraph(out, p, true, None),
            Block::Table(t) => write_table_block(out, t),
        }
    }
    write_fragments(out, fragments, blocks.len(), true);
}

fn paragraph_attrs(p: &Paragraph, with_id: bool) -> Attrs {
    let mut a = p.attrs.clone();
    if a.is_empty() {
        a.push(Attr::new("id", "0"));
        a.push(Attr::new("paraPrIDRef", "0"));
        a.push(Attr::new("styleIDRef", "0"));
        a.push(Attr::new("pageBreak", "0"));
        a.push(Attr::new("columnBreak", "0"));
        a.push(Attr::new("merged", "0"));
    }
    if with_id {
        set_num(&mut a, "id", p.id.0);
    }
    set_num(&mut a, "paraPrIDRef", p.style.0);
    a
}

/// Writes a paragraph; `table` is injected into the host run when given.
fn write_paragraph(out: &mut String, p: &Paragraph, with_id: bool, table: Option<(&TableHost, &Table)>) {
    start_tag(out, P, &paragraph_attrs(p, with_id), false);
    for (i, run) in p.runs.iter().enumerate() {
        write_fragments(out, &p.fragments, i, false);
        let hosted = table.filter(|(host, _)| host.run == i);
        write_run(out, run, hosted);
    }
    write_fragments(out, &p.fragments, p.runs.len(), true);
    end_tag(out, P);
}

fn write_run(out: &mut String, run: &Run, table: Option<(&TableHost, &Table)>) {
    let mut a = run.attrs.clone();
    set_num(&mut a, "charPrIDRef", run.style.0);
    start_tag(out, RUN, &a, false);

    let write_list = |out: &mut String, list: &[String], after_text: bool| {
        let insert = table.filter(|(host, _)| host.after_text == after_text);
        for (i, raw) in list.iter().enumerate() {
            if let Some((host, t)) = insert
                && host.index == i
            {
                write_table(out, t);
            }
            out.push_str(raw);
        }
        if let Some((host, t)) = insert
            && host.index >= list.len()
        {
            write_table(out, t);
        }
    };

    write_list(out, &run.leading, false);
    if !run.text.is_empty() || !run.inline.is_empty() {
        out.push_str("<hp:t>");
        write_text(out, &run.text, &run.inline);
        out.push_str("</hp:t>");
    } else if table.is_some() {
        // A carrier run keeps an empty text element after the object.
        out.push_str("<hp:t/>");
    }
    write_list(out, &run.trailing, true);
    end_tag(out, RUN);
}

fn write_text(out: &mut String, text: &str, inline: &[Fragment]) {
    let mut plain = String::new();
    let flush = |out: &mut String, plain: &mut String| {
        if !plain.is_empty() {
            out.push_str(&escape_text(plain));
            plain.clear();
        }
    };
    let mut offset = 0usize;
    for ch in text.chars() {
        if inline.iter().any(|f| f.position == offset) {
            flush(out, &mut plain);
            write_fragments(out, inline, offset, false);
        }
        match TEXT_MARKS.iter().find(|(_, c, _)| *c == ch) {
            Some((_, _, element)) => {
                flush(out, &mut plain);
                out.push_str(element);
            },
            None => plain.push(ch),
        }
        offset += 1;
    }
    flush(out, &mut plain);
    write_fragments(out, inline, offset, true);
}

fn write_table_block(out: &mut String, table: &Table) {
    match &table.host {
        Some(host) => write_paragraph(out, &host.paragraph, false, Some((host, table))),
        None => {
            let mut p = Paragraph::with_text(NodeId(0), ParaStyleId(0), CharStyleId(0), "");
            p.attrs.clear();
            let host = TableHost {
                paragraph: p,
                run: 0,
                after_text: false,
                index: 0,
            };
            write_paragraph(out, &host.paragraph, false, Some((&host, table)));
        },
    }
}

fn write_table(out: &mut String, table: &Table) {
    let rows = table.rows();
    let cols = table.cols();
    let mut a = table.attrs.clone();
    let generated = a.is_empty();
    if generated {
        for (name, value) in [
            ("id", "0"),
            ("zOrder", "0"),
            ("numberingType", "TABLE"),
            ("textWrap", "TOP_AND_BOTTOM"),
            ("textFlow", "BOTH_SIDES"),
            ("lock", "0"),
            ("dropcapstyle", "None"),
            ("pageBreak", "CELL"),
            ("repeatHeader", "1"),
            ("rowCnt", "0"),
            ("colCnt", "0"),
            ("cellSpacing", "0"),
            ("borderFillIDRef", "1"),
            ("noAdjust", "0"),
        ] {
            a.push(Attr::new(name, value));
        }
    }
    set_num(&mut a, "id", table.id.0);
    set_num(&mut a, "rowCnt", rows);
    set_num(&mut a, "colCnt", cols);
    start_tag(out, "hp:tbl", &a, false);

    let cell_width = DEFAULT_TEXT_WIDTH / cols.max(1) as u32;
    if generated && table.prefix.is_empty() {
        out.push_str(&format!(
            concat!(
                r#"<hp:sz width="{}" widthRelTo="ABSOLUTE" height="{}" heightRelTo="ABSOLUTE" protect="0"/>"#,
                r#"<hp:pos treatAsChar="0" affectLSpacing="0" flowWithText="1" allowOverlap="0" holdAnchorAndSO="0" vertRelTo="PARA" horzRelTo="COLUMN" vertAlign="TOP" horzAlign="LEFT" vertOffset="0" horzOffset="0"/>"#,
                r#"<hp:outMargin left="283" right="283" top="283" bottom="283"/>"#,
                r#"<hp:inMargin left="510" right="510" top="141" bottom="141"/>"#,
            ),
            cell_width * cols as u32,
            DEFAULT_ROW_HEIGHT * rows as u32,
        ));
    }
    for raw in &table.prefix {
        out.push_str(raw);
    }
    for r in 0..rows {
        out.push_str("<hp:tr>");
        for c in 0..cols {
            let cell = &table.cells[r * cols + c];
            if !cell.covered {
                write_cell(out, cell, r, c, cell_width);
            }
        }
        for raw in table.row_tails.get(r).into_iter().flatten() {
            out.push_str(raw);
        }
        out.push_str("</hp:tr>");
    }
    for raw in &table.suffix {
        out.push_str(raw);
    }
    out.push_str("</hp:tbl>");
}

fn write_cell(out: &mut String, cell: &Cell, row: usize, col: usize, width: u32) {
    let mut a = cell.attrs.clone();
    if a.is_empty() {
        for (name, value) in [
            ("name", ""),
            ("header", "0"),
            ("hasMargin", "0"),
            ("protect", "0"),
            ("editable", "0"),
            ("dirty", "0"),
            ("borderFillIDRef", "1"),
        ] {
            a.push(Attr::new(name, value));
        }
    }
    start_tag(out, "hp:tc", &a, false);

    let mut sub = cell.sublist_attrs.clone();
    if sub.is_empty() {
        for (name, value) in [
            ("id", ""),
            ("textDirection", "HORIZONTAL"),
            ("lineWrap", "BREAK"),
            ("vertAlign", "CENTER"),
            ("linkListIDRef", "0"),
            ("linkListNextIDRef", "0"),
            ("textWidth", "0"),
            ("textHeight", "0"),
            ("hasTextRef", "0"),
            ("hasNumRef", "0"),
        ] {
            sub.push(Attr::new(name, value));
        }
    }
    start_tag(out, "hp:subList", &sub, false);
    write_blocks(out, &cell.blocks, &cell.fragments);
    out.push_str("</hp:subList>");

    out.push_str(&format!(r#"<hp:cellAddr colAddr="{col}" rowAddr="{row}"/>"#));
    out.push_str(&format!(
        r#"<hp:cellSpan colSpan="{}" rowSpan="{}"/>"#,
        cell.col_span.max(1),
        cell.row_span.max(1)
    ));
    if cell.tail.is_empty() {
        out.push_str(&format!(
            r#"<hp:cellSz width="{width}" height="{DEFAULT_ROW_HEIGHT}"/><hp:cellMargin left="510" right="510" top="141" bottom="141"/>"#
        ));
    }
    for raw in &cell.tail {
        out.push_str(raw);
    }
    out.push_str("</hp:tc>");
}
