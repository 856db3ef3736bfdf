//! The in-memory document and its editing operations.
//!
//! Every mutating method validates its arguments against the current tree
//! before touching it, so a returned error means the model is unchanged.

use std::path::{Path, PathBuf};

use memchr::memmem;

use super::element::{Block, Fragment, blocks_text};
use super::paragraph::{Paragraph, Run};
use super::style::{CharStyleId, ParaStyleId, StyleCatalog};
use super::table::{Cell, Table};
use super::types::{Alignment, Anchor, DocumentInfo, DocumentMetadata, FontSpec, NodeId, Range, TextMatch};
use crate::common::{Error, Result};
use crate::hwpx::package::PackageState;

/// One body part of the package.
#[derive(Debug, Clone)]
pub struct Section {
    pub id: NodeId,
    /// Package path of the part.
    pub(crate) part: String,
    pub(crate) blocks: Vec<Block>,
    /// Unmapped children of the root, positioned by block index.
    pub(crate) fragments: Vec<Fragment>,
    /// Source text up to and including the root start tag, re-emitted as is.
    pub(crate) head: Option<SectionHead>,
}

#[derive(Debug, Clone)]
pub(crate) struct SectionHead {
    pub prolog: String,
    pub start_tag: String,
    pub name: String,
}

impl Section {
    pub(crate) fn new(id: NodeId, part: impl Into<String>) -> Self {
        Self {
            id,
            part: part.into(),
            blocks: Vec::new(),
            fragments: Vec::new(),
            head: None,
        }
    }

    #[inline]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    #[inline]
    pub fn part(&self) -> &str {
        &self.part
    }
}

/// Structural view of a block, used to compare models across a write/read
/// cycle. Cell and section ids are engine-assigned and left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockShape {
    Paragraph {
        id: NodeId,
        style: ParaStyleId,
        runs: Vec<(CharStyleId, String)>,
    },
    Table {
        id: NodeId,
        rows: usize,
        cols: usize,
        /// `None` for covered slots.
        cells: Vec<Option<Vec<BlockShape>>>,
    },
}

/// One entry per section.
pub type DocumentShape = Vec<Vec<BlockShape>>;

/// An open document.
#[derive(Debug, Clone)]
pub struct DocumentModel {
    sections: Vec<Section>,
    styles: StyleCatalog,
    metadata: DocumentMetadata,
    path: Option<PathBuf>,
    next_id: u64,
    pub(crate) package: PackageState,
}

enum Scope<'a> {
    Blocks(&'a [Block]),
    Block(&'a Block),
    Cell(&'a Cell),
}

enum ScopeMut<'a> {
    Blocks(&'a mut Vec<Block>),
    Paragraph(&'a mut Paragraph),
    Table(&'a mut Table),
}

impl DocumentModel {
    pub(crate) fn from_parts(
        sections: Vec<Section>,
        styles: StyleCatalog,
        metadata: DocumentMetadata,
        package: PackageState,
        next_id: u64,
    ) -> Self {
        Self {
            sections,
            styles,
            metadata,
            path: None,
            next_id,
            package,
        }
    }

    #[inline]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    #[inline]
    pub fn styles(&self) -> &StyleCatalog {
        &self.styles
    }

    #[inline]
    pub fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }

    /// Where the document was read from or last written to.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub(crate) fn set_path(&mut self, path: PathBuf) {
        self.path = Some(path);
    }

    pub(crate) fn allocate_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Paragraphs in document order, including those inside table cells.
    pub fn paragraphs(&self) -> Vec<&Paragraph> {
        let mut out = Vec::new();
        for section in &self.sections {
            collect_paragraphs(&section.blocks, &mut out);
        }
        out
    }

    pub fn paragraph(&self, id: NodeId) -> Option<&Paragraph> {
        match self.scope(id)? {
            Scope::Block(Block::Paragraph(p)) => Some(p),
            _ => None,
        }
    }

    pub fn table(&self, id: NodeId) -> Option<&Table> {
        match self.scope(id)? {
            Scope::Block(Block::Table(t)) => Some(t.as_ref()),
            _ => None,
        }
    }

    fn scope(&self, id: NodeId) -> Option<Scope<'_>> {
        for section in &self.sections {
            if section.id == id {
                return Some(Scope::Blocks(&section.blocks));
            }
            if let Some(found) = scope_in(&section.blocks, id) {
                return Some(found);
            }
        }
        None
    }

    fn scope_mut(&mut self, id: NodeId) -> Option<ScopeMut<'_>> {
        for section in &mut self.sections {
            if section.id == id {
                return Some(ScopeMut::Blocks(&mut section.blocks));
            }
            if let Some(found) = scope_in_mut(&mut section.blocks, id) {
                return Some(found);
            }
        }
        None
    }

    fn paragraph_mut(&mut self, id: NodeId) -> Result<&mut Paragraph> {
        match self.scope_mut(id) {
            Some(ScopeMut::Paragraph(p)) => Ok(p),
            _ => Err(Error::validation("paragraph", format!("no paragraph with id {id}"))),
        }
    }

    fn table_mut(&mut self, id: NodeId) -> Result<&mut Table> {
        match self.scope_mut(id) {
            Some(ScopeMut::Table(t)) => Ok(t),
            _ => Err(Error::validation("table", format!("no table with id {id}"))),
        }
    }

    fn table_ref(&self, id: NodeId) -> Result<&Table> {
        self.table(id)
            .ok_or_else(|| Error::validation("table", format!("no table with id {id}")))
    }

    fn body_mut(&mut self, first: bool) -> Result<&mut Vec<Block>> {
        let section = if first {
            self.sections.first_mut()
        } else {
            self.sections.last_mut()
        };
        section
            .map(|s| &mut s.blocks)
            .ok_or_else(|| Error::validation("anchor", "document has no body section"))
    }

    /// Plain text of the document or of part of it.
    ///
    /// Blocks are separated by newlines; inside tables cells are separated
    /// by tabs and rows by newlines.
    pub fn text(&self, range: Option<&Range>) -> Result<String> {
        match range.unwrap_or(&Range::Document) {
            Range::Document => Ok(self
                .sections
                .iter()
                .map(|s| blocks_text(&s.blocks))
                .collect::<Vec<_>>()
                .join("\n")),
            Range::Node(id) => match self.scope(*id) {
                Some(Scope::Blocks(blocks)) => Ok(blocks_text(blocks)),
                Some(Scope::Block(block)) => Ok(block.text()),
                Some(Scope::Cell(cell)) => Ok(cell.text()),
                None => Err(Error::validation("range", format!("no node with id {id}"))),
            },
            Range::Span {
                paragraph,
                start,
                end,
            } => {
                let p = self.paragraph(*paragraph).ok_or_else(|| {
                    Error::validation("range", format!("no paragraph with id {paragraph}"))
                })?;
                check_span(p, *start, *end)?;
                Ok(p.text().chars().skip(*start).take(end - start).collect())
            },
        }
    }

    /// Inserts text at an anchor. `\n` becomes a line break inside the
    /// paragraph.
    pub fn insert_text(&mut self, anchor: &Anchor, text: &str) -> Result<()> {
        match *anchor {
            Anchor::DocumentStart => {
                let p = self.edge_paragraph(true)?;
                p.insert_text(0, text, CharStyleId(0));
            },
            Anchor::DocumentEnd => {
                let p = self.edge_paragraph(false)?;
                let len = p.char_len();
                p.insert_text(len, text, CharStyleId(0));
            },
            Anchor::Paragraph { id, offset } => {
                let p = self.paragraph_mut(id)?;
                let len = p.char_len();
                if offset > len {
                    return Err(Error::validation(
                        "offset",
                        format!("{offset} is past the end of paragraph {id} ({len} chars)"),
                    ));
                }
                p.insert_text(offset, text, CharStyleId(0));
            },
        }
        Ok(())
    }

    /// The first or last top-level paragraph, created when the body starts
    /// (or ends) with a table or is empty.
    fn edge_paragraph(&mut self, first: bool) -> Result<&mut Paragraph> {
        let needs_new = {
            let blocks = self.body_mut(first)?;
            let edge = if first { blocks.first() } else { blocks.last() };
            !matches!(edge, Some(Block::Paragraph(_)))
        };
        if needs_new {
            self.new_edge_paragraph(first)?;
        }
        let blocks = self.body_mut(first)?;
        let edge = if first { blocks.first_mut() } else { blocks.last_mut() };
        edge.and_then(Block::as_paragraph_mut)
            .ok_or_else(|| Error::validation("anchor", "document body has no paragraph"))
    }

    /// Adds an empty paragraph at the start or end of the body and returns its
    /// id. At the start it takes over the section definitions that must lead
    /// the body.
    fn new_edge_paragraph(&mut self, first: bool) -> Result<NodeId> {
        let id = self.allocate_id();
        let blocks = self.body_mut(first)?;
        let neighbour = if first { blocks.first_mut() } else { blocks.last_mut() };
        let (para_style, run_style, head) = match neighbour {
            Some(Block::Paragraph(p)) => {
                let head = if first { p.take_head() } else { Vec::new() };
                (p.style, p.leading_char_style().unwrap_or(CharStyleId(0)), head)
            },
            Some(Block::Table(t)) => {
                let head = match (&mut t.host, first) {
                    (Some(host), true) => host.paragraph.take_head(),
                    _ => Vec::new(),
                };
                (ParaStyleId(0), CharStyleId(0), head)
            },
            None => (ParaStyleId(0), CharStyleId(0), Vec::new()),
        };
        let mut run = Run::new(run_style, "");
        run.leading = head;
        let mut paragraph = Paragraph::new(id, para_style);
        paragraph.runs.push(run);
        if first {
            blocks.insert(0, Block::Paragraph(paragraph));
        } else {
            blocks.push(Block::Paragraph(paragraph));
        }
        Ok(id)
    }

    /// Inserts a paragraph break and returns the id of the new paragraph.
    ///
    /// At a paragraph anchor the text after the offset moves into the new
    /// paragraph, which follows the original one.
    pub fn insert_paragraph(&mut self, anchor: &Anchor) -> Result<NodeId> {
        match *anchor {
            Anchor::DocumentStart => self.new_edge_paragraph(true),
            Anchor::DocumentEnd => self.new_edge_paragraph(false),
            Anchor::Paragraph { id, offset } => {
                let len = self.paragraph(id).map(Paragraph::char_len).ok_or_else(|| {
                    Error::validation("paragraph", format!("no paragraph with id {id}"))
                })?;
                if offset > len {
                    return Err(Error::validation(
                        "offset",
                        format!("{offset} is past the end of paragraph {id} ({len} chars)"),
                    ));
                }
                let new_id = self.allocate_id();
                for section in &mut self.sections {
                    if let Some((blocks, i)) = parent_of(&mut section.blocks, id)
                        && let Some(p) = blocks[i].as_paragraph_mut()
                    {
                        let tail = p.split_off(offset, new_id);
                        blocks.insert(i + 1, Block::Paragraph(tail));
                        return Ok(new_id);
                    }
                }
                Err(Error::validation("paragraph", format!("no paragraph with id {id}")))
            },
        }
    }

    /// Non-overlapping occurrences of `pattern`, paragraph by paragraph.
    pub fn find_text(&self, pattern: &str) -> Result<Vec<TextMatch>> {
        check_pattern(pattern)?;
        let finder = memmem::Finder::new(pattern.as_bytes());
        let mut matches = Vec::new();
        for p in self.paragraphs() {
            let text = p.text();
            for (start, end) in char_matches(&finder, &text, pattern) {
                matches.push(TextMatch {
                    paragraph: Some(p.id),
                    start,
                    end,
                });
            }
        }
        Ok(matches)
    }

    /// Replaces every occurrence of `pattern`, including occurrences that
    /// straddle run boundaries. Returns the number of replacements.
    pub fn replace_text(&mut self, pattern: &str, replacement: &str) -> Result<usize> {
        check_pattern(pattern)?;
        let finder = memmem::Finder::new(pattern.as_bytes());
        let mut count = 0usize;
        for section in &mut self.sections {
            visit_paragraphs_mut(&mut section.blocks, &mut |p| {
                let text = p.text();
                let found = char_matches(&finder, &text, pattern);
                for &(start, end) in found.iter().rev() {
                    p.replace_range(start, end, replacement);
                }
                count += found.len();
            });
        }
        Ok(count)
    }

    /// Appends a `rows` × `cols` table of empty cells to the end of the body.
    pub fn create_table(&mut self, rows: usize, cols: usize) -> Result<NodeId> {
        self.body_mut(false)?;
        let id = self.allocate_id();
        let mut next = self.next_id;
        let table = Table::new(id, rows, cols, || {
            next += 1;
            NodeId(next - 1)
        });
        self.next_id = next;
        self.body_mut(false)?.push(Block::from(table));
        Ok(id)
    }

    pub fn cell_text(&self, table: NodeId, row: usize, col: usize) -> Result<String> {
        Ok(self.table_ref(table)?.cell(row, col)?.text())
    }

    pub fn set_cell_text(&mut self, table: NodeId, row: usize, col: usize, text: &str) -> Result<()> {
        let cell = self.table_ref(table)?.cell(row, col)?;
        if cell.is_covered() {
            return Err(Error::validation(
                "cell",
                format!("({row}, {col}) of table {table} is covered by a merged cell"),
            ));
        }
        let new_id = NodeId(self.next_id);
        let mut used = false;
        self.table_mut(table)?.cell_mut(row, col)?.set_text(text, || {
            used = true;
            new_id
        });
        if used {
            self.next_id += 1;
        }
        Ok(())
    }

    pub fn insert_row(&mut self, table: NodeId, index: usize) -> Result<()> {
        let mut next = self.next_id;
        self.table_mut(table)?.insert_row(index, || {
            next += 1;
            NodeId(next - 1)
        })?;
        self.next_id = next;
        Ok(())
    }

    pub fn delete_row(&mut self, table: NodeId, index: usize) -> Result<()> {
        self.table_mut(table)?.delete_row(index)
    }

    /// Applies character formatting to every run in `range`.
    pub fn apply_font(&mut self, range: &Range, spec: &FontSpec) -> Result<()> {
        self.check_range(range)?;
        // Every style referenced by the range must be derivable before any
        // run is split or repointed.
        let mut styles = Vec::new();
        self.each_paragraph_in(range, |p| styles.extend(p.runs.iter().map(|r| r.style)));
        let mut trial = self.styles.clone();
        for style in &styles {
            trial.derive_char(*style, spec)?;
        }

        let Self { sections, styles, .. } = self;
        let mut apply = |runs: &mut [Run]| {
            for run in runs {
                if let Ok(id) = styles.derive_char(run.style, spec) {
                    run.style = id;
                }
            }
        };
        match *range {
            Range::Span {
                paragraph,
                start,
                end,
            } => {
                for section in sections.iter_mut() {
                    if let Some(ScopeMut::Paragraph(p)) = scope_in_mut(&mut section.blocks, paragraph) {
                        let idx = p.isolate(start, end);
                        apply(&mut p.runs[idx]);
                        break;
                    }
                }
            },
            _ => {
                for_paragraphs_mut(sections, range, &mut |p| apply(&mut p.runs));
            },
        }
        Ok(())
    }

    /// Sets the alignment of every paragraph in `range`.
    pub fn apply_alignment(&mut self, range: &Range, alignment: Alignment) -> Result<()> {
        self.check_range(range)?;
        let mut current = Vec::new();
        self.each_paragraph_in(range, |p| current.push(p.style));
        let mut trial = self.styles.clone();
        for style in &current {
            trial.derive_para(*style, alignment)?;
        }

        let Self { sections, styles, .. } = self;
        for_paragraphs_mut(sections, range, &mut |p| {
            if let Ok(id) = styles.derive_para(p.style, alignment) {
                p.style = id;
            }
        });
        Ok(())
    }

    fn check_range(&self, range: &Range) -> Result<()> {
        match *range {
            Range::Document => Ok(()),
            Range::Node(id) => self
                .scope(id)
                .map(|_| ())
                .ok_or_else(|| Error::validation("range", format!("no node with id {id}"))),
            Range::Span {
                paragraph,
                start,
                end,
            } => {
                let p = self.paragraph(paragraph).ok_or_else(|| {
                    Error::validation("range", format!("no paragraph with id {paragraph}"))
                })?;
                check_span(p, start, end)
            },
        }
    }

    fn each_paragraph_in(&self, range: &Range, mut f: impl FnMut(&Paragraph)) {
        let mut found = Vec::new();
        match *range {
            Range::Document => {
                for s in &self.sections {
                    collect_paragraphs(&s.blocks, &mut found);
                }
            },
            Range::Node(id) => match self.scope(id) {
                Some(Scope::Blocks(blocks)) => collect_paragraphs(blocks, &mut found),
                Some(Scope::Block(block)) => collect_paragraphs(std::slice::from_ref(block), &mut found),
                Some(Scope::Cell(cell)) => collect_paragraphs(&cell.blocks, &mut found),
                None => {},
            },
            Range::Span { paragraph, .. } => found.extend(self.paragraph(paragraph)),
        }
        for p in found {
            f(p);
        }
    }

    /// Counts and metadata.
    pub fn info(&self) -> DocumentInfo {
        let paragraphs = self.paragraphs();
        let mut tables = 0usize;
        for s in &self.sections {
            count_tables(&s.blocks, &mut tables);
        }
        DocumentInfo {
            path: self.path.clone(),
            sections: self.sections.len(),
            paragraphs: paragraphs.len(),
            tables,
            characters: paragraphs.iter().map(|p| p.char_len()).sum(),
            metadata: self.metadata.clone(),
        }
    }

    /// Structural view used to check write/read equivalence.
    pub fn shape(&self) -> DocumentShape {
        self.sections.iter().map(|s| blocks_shape(&s.blocks)).collect()
    }
}

fn check_pattern(pattern: &str) -> Result<()> {
    if pattern.is_empty() {
        return Err(Error::validation("pattern", "search pattern must not be empty"));
    }
    Ok(())
}

fn check_span(p: &Paragraph, start: usize, end: usize) -> Result<()> {
    let len = p.char_len();
    if start > end || end > len {
        return Err(Error::validation(
            "range",
            format!("{start}..{end} is not within paragraph {} ({len} chars)", p.id),
        ));
    }
    Ok(())
}

/// Non-overlapping matches as char offset pairs.
fn char_matches(finder: &memmem::Finder<'_>, text: &str, pattern: &str) -> Vec<(usize, usize)> {
    let pattern_chars = pattern.chars().count();
    let mut out = Vec::new();
    let mut chars_before = 0usize;
    let mut last_byte = 0usize;
    let mut next_allowed = 0usize;
    for byte in finder.find_iter(text.as_bytes()) {
        if byte < next_allowed {
            continue;
        }
        chars_before += text[last_byte..byte].chars().count();
        last_byte = byte;
        out.push((chars_before, chars_before + pattern_chars));
        next_allowed = byte + pattern.len();
    }
    out
}

fn collect_paragraphs<'a>(blocks: &'a [Block], out: &mut Vec<&'a Paragraph>) {
    for block in blocks {
        match block {
            Block::Paragraph(p) => out.push(p),
            Block::Table(t) => {
                for cell in &t.cells {
                    collect_paragraphs(&cell.blocks, out);
                }
            },
        }
    }
}

fn visit_paragraphs_mut(blocks: &mut [Block], f: &mut dyn FnMut(&mut Paragraph)) {
    for block in blocks {
        match block {
            Block::Paragraph(p) => f(p),
            Block::Table(t) => {
                for cell in &mut t.cells {
                    visit_paragraphs_mut(&mut cell.blocks, f);
                }
            },
        }
    }
}

fn for_paragraphs_mut(sections: &mut [Section], range: &Range, f: &mut dyn FnMut(&mut Paragraph)) {
    match *range {
        Range::Document => {
            for s in sections {
                visit_paragraphs_mut(&mut s.blocks, f);
            }
        },
        Range::Node(id) | Range::Span { paragraph: id, .. } => {
            for s in sections.iter_mut() {
                if s.id == id {
                    visit_paragraphs_mut(&mut s.blocks, f);
                    return;
                }
                match scope_in_mut(&mut s.blocks, id) {
                    Some(ScopeMut::Blocks(blocks)) => return visit_paragraphs_mut(blocks, f),
                    Some(ScopeMut::Paragraph(p)) => return f(p),
                    Some(ScopeMut::Table(t)) => {
                        for cell in &mut t.cells {
                            visit_paragraphs_mut(&mut cell.blocks, f);
                        }
                        return;
                    },
                    None => {},
                }
            }
        },
    }
}

fn count_tables(blocks: &[Block], count: &mut usize) {
    for block in blocks {
        if let Block::Table(t) = block {
            *count += 1;
            for cell in &t.cells {
                count_tables(&cell.blocks, count);
            }
        }
    }
}

fn scope_in(blocks: &[Block], id: NodeId) -> Option<Scope<'_>> {
    for block in blocks {
        match block {
            Block::Paragraph(p) if p.id == id => return Some(Scope::Block(block)),
            Block::Paragraph(_) => {},
            Block::Table(t) => {
                if t.id == id {
                    return Some(Scope::Block(block));
                }
                for cell in &t.cells {
                    if cell.id == id {
                        return Some(Scope::Cell(cell));
                    }
                    if let Some(found) = scope_in(&cell.blocks, id) {
                        return Some(found);
                    }
                }
            },
        }
    }
    None
}

fn scope_in_mut(blocks: &mut [Block], id: NodeId) -> Option<ScopeMut<'_>> {
    for block in blocks {
        match block {
            Block::Paragraph(p) => {
                if p.id == id {
                    return Some(ScopeMut::Paragraph(p));
                }
            },
            Block::Table(t) => {
                if t.id == id {
                    return Some(ScopeMut::Table(t));
                }
                for cell in &mut t.cells {
                    if cell.id == id {
                        return Some(ScopeMut::Blocks(&mut cell.blocks));
                    }
                    if let Some(found) = scope_in_mut(&mut cell.blocks, id) {
                        return Some(found);
                    }
                }
            },
        }
    }
    None
}

/// The block list holding block `id`, and its index there.
fn parent_of(blocks: &mut Vec<Block>, id: NodeId) -> Option<(&mut Vec<Block>, usize)> {
    if let Some(i) = blocks.iter().position(|b| b.id() == id) {
        return Some((blocks, i));
    }
    for block in blocks.iter_mut() {
        if let Block::Table(t) = block {
            for cell in &mut t.cells {
                if let Some(found) = parent_of(&mut cell.blocks, id) {
                    return Some(found);
                }
            }
        }
    }
    None
}

fn blocks_shape(blocks: &[Block]) -> Vec<BlockShape> {
    blocks
        .iter()
        .map(|block| match block {
            Block::Paragraph(p) => BlockShape::Paragraph {
                id: p.id,
                style: p.style,
                runs: p.runs.iter().map(|r| (r.style, r.text.clone())).collect(),
            },
            Block::Table(t) => BlockShape::Table {
                id: t.id,
                rows: t.rows(),
                cols: t.cols(),
                cells: t
                    .cells
                    .iter()
                    .map(|c| (!c.covered).then(|| blocks_shape(&c.blocks)))
                    .collect(),
            },
        })
        .collect()
}

#[cfg(test)]
impl DocumentModel {
    /// A one-section model over `blocks` with a minimal style catalog.
    pub(crate) fn for_tests(blocks: Vec<Block>) -> Self {
        use super::style::{CharStyle, ParaStyle};

        let mut styles = StyleCatalog::new();
        styles.insert_char(CharStyleId(0), CharStyle::new(Some("Batang".into()), 1000, false, false));
        styles.insert_para(ParaStyleId(0), ParaStyle::new(Some(Alignment::Justify)));
        let mut section = Section::new(NodeId(0), "Contents/section0.xml");
        section.blocks = blocks;
        Self::from_parts(vec![section], styles, DocumentMetadata::default(), PackageState::default(), 1000)
    }
}
