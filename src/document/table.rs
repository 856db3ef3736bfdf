//! Tables: a fixed rows × cols grid of cells, each owning its own blocks.

use std::ops::Range;

use super::element::{Attrs, Block, Fragment, blocks_text};
use super::paragraph::Paragraph;
use super::style::{CharStyleId, ParaStyleId};
use super::NodeId;
use crate::common::{Error, Result};

/// One grid slot.
#[derive(Debug, Clone)]
pub struct Cell {
    pub id: NodeId,
    pub(crate) blocks: Vec<Block>,
    /// Unmapped children of the cell's block list, positioned by block index.
    pub(crate) fragments: Vec<Fragment>,
    /// Slot hidden under a merged neighbour. Not written, not editable.
    pub(crate) covered: bool,
    pub(crate) col_span: u32,
    pub(crate) row_span: u32,
    pub(crate) attrs: Attrs,
    pub(crate) sublist_attrs: Attrs,
    /// Raw trailing children (size, margins) re-emitted after the address.
    pub(crate) tail: Vec<String>,
}

impl Cell {
    /// A cell holding one empty paragraph.
    pub(crate) fn blank(id: NodeId, paragraph: Paragraph) -> Self {
        Self {
            id,
            blocks: vec![Block::Paragraph(paragraph)],
            fragments: Vec::new(),
            covered: false,
            col_span: 1,
            row_span: 1,
            attrs: Attrs::new(),
            sublist_attrs: Attrs::new(),
            tail: Vec::new(),
        }
    }

    pub(crate) fn covered(id: NodeId) -> Self {
        Self {
            covered: true,
            blocks: Vec::new(),
            ..Self::blank(id, Paragraph::new(id, ParaStyleId(0)))
        }
    }

    #[inline]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    #[inline]
    pub fn is_covered(&self) -> bool {
        self.covered
    }

    pub fn span(&self) -> (u32, u32) {
        (self.row_span, self.col_span)
    }

    pub fn text(&self) -> String {
        blocks_text(&self.blocks)
    }

    /// Replaces the content with `text`, keeping the first paragraph (and so
    /// its style and id) when there is one.
    pub(crate) fn set_text(&mut self, text: &str, new_id: impl FnOnce() -> NodeId) {
        let mut first = None;
        for block in self.blocks.drain(..) {
            if let Block::Paragraph(p) = block
                && first.is_none()
            {
                first = Some(p);
            }
        }
        let mut paragraph = first.unwrap_or_else(|| Paragraph::new(new_id(), ParaStyleId(0)));
        paragraph.set_text(text, CharStyleId(0));
        self.blocks = vec![Block::Paragraph(paragraph)];
        self.fragments.retain(|f| f.position == 0);
    }
}

/// The paragraph that carried a table in the source, when it held nothing
/// else worth mapping. Re-emitted around the table on write.
#[derive(Debug, Clone)]
pub struct TableHost {
    pub(crate) paragraph: Paragraph,
    /// Run the table sat in.
    pub(crate) run: usize,
    /// Whether the table came after the run's text.
    pub(crate) after_text: bool,
    /// Index into the run's leading or trailing fragments.
    pub(crate) index: usize,
}

/// A table with a fixed grid. `rows * cols == cells.len()` always holds.
#[derive(Debug, Clone)]
pub struct Table {
    pub id: NodeId,
    rows: usize,
    cols: usize,
    /// Row-major.
    pub(crate) cells: Vec<Cell>,
    pub(crate) attrs: Attrs,
    /// Raw children before the first row (size, position, margins).
    pub(crate) prefix: Vec<String>,
    /// Raw children after the last row.
    pub(crate) suffix: Vec<String>,
    /// Raw non-cell children of each row.
    pub(crate) row_tails: Vec<Vec<String>>,
    pub(crate) host: Option<TableHost>,
}

impl Table {
    /// A table of blank cells. `next_id` is called for every cell and its
    /// paragraph.
    pub(crate) fn new(
        id: NodeId,
        rows: usize,
        cols: usize,
        mut next_id: impl FnMut() -> NodeId,
    ) -> Self {
        let mut cells = Vec::with_capacity(rows * cols);
        for _ in 0..rows * cols {
            let cell_id = next_id();
            let para = Paragraph::with_text(next_id(), ParaStyleId(0), CharStyleId(0), "");
            cells.push(Cell::blank(cell_id, para));
        }
        Self::from_grid(id, rows, cols, cells)
    }

    /// Builds a table from a complete row-major grid.
    pub(crate) fn from_grid(id: NodeId, rows: usize, cols: usize, cells: Vec<Cell>) -> Self {
        debug_assert_eq!(rows * cols, cells.len());
        Self {
            id,
            rows,
            cols,
            cells,
            attrs: Attrs::new(),
            prefix: Vec::new(),
            suffix: Vec::new(),
            row_tails: vec![Vec::new(); rows],
            host: None,
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    fn check(&self, row: usize, col: usize) -> Result<usize> {
        if row >= self.rows {
            return Err(Error::validation(
                "row",
                format!("{row} is outside table {} with {} rows", self.id, self.rows),
            ));
        }
        if col >= self.cols {
            return Err(Error::validation(
                "col",
                format!("{col} is outside table {} with {} columns", self.id, self.cols),
            ));
        }
        Ok(row * self.cols + col)
    }

    /// The cell at zero-based (row, col).
    pub fn cell(&self, row: usize, col: usize) -> Result<&Cell> {
        let i = self.check(row, col)?;
        Ok(&self.cells[i])
    }

    pub(crate) fn cell_mut(&mut self, row: usize, col: usize) -> Result<&mut Cell> {
        let i = self.check(row, col)?;
        Ok(&mut self.cells[i])
    }

    /// Rows separated by newlines, cells by tabs.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for r in 0..self.rows {
            if r > 0 {
                out.push('\n');
            }
            for c in 0..self.cols {
                if c > 0 {
                    out.push('\t');
                }
                out.push_str(&self.cells[r * self.cols + c].text());
            }
        }
        out
    }

    /// Anchors above row `index` whose row span reaches into it, as
    /// (cell index, covered columns).
    fn spans_into(&self, index: usize) -> Vec<(usize, Range<usize>)> {
        let mut found = Vec::new();
        for r in 0..index.min(self.rows) {
            for c in 0..self.cols {
                let cell = &self.cells[r * self.cols + c];
                if !cell.covered && r + cell.row_span.max(1) as usize > index {
                    let end = (c + cell.col_span.max(1) as usize).min(self.cols);
                    found.push((r * self.cols + c, c..end));
                }
            }
        }
        found
    }

    /// Inserts a row before `index` (`index == rows` appends). New cells copy
    /// the chrome of the neighbouring row and hold one empty paragraph.
    ///
    /// A row inserted inside a vertical merge extends the merge: the
    /// merged cell grows by one row and the new slots under it are covered.
    pub(crate) fn insert_row(&mut self, index: usize, mut next_id: impl FnMut() -> NodeId) -> Result<()> {
        if index > self.rows {
            return Err(Error::validation(
                "index",
                format!("{index} is past the end of table {} with {} rows", self.id, self.rows),
            ));
        }
        let spans = if index < self.rows { self.spans_into(index) } else { Vec::new() };
        let template_row = index.saturating_sub(1);
        let mut row = Vec::with_capacity(self.cols);
        for c in 0..self.cols {
            if spans.iter().any(|(_, cols)| cols.contains(&c)) {
                row.push(Cell::covered(NodeId(0)));
                continue;
            }
            let neighbour = (self.rows > 0).then(|| &self.cells[template_row * self.cols + c]);
            let (para_style, run_style) = neighbour
                .and_then(|n| n.blocks.iter().find_map(Block::as_paragraph))
                .map(|p| (p.style, p.leading_char_style().unwrap_or(CharStyleId(0))))
                .unwrap_or((ParaStyleId(0), CharStyleId(0)));
            let cell_id = next_id();
            let para = Paragraph::with_text(next_id(), para_style, run_style, "");
            let mut cell = Cell::blank(cell_id, para);
            if let Some(n) = neighbour.filter(|n| !n.covered) {
                cell.attrs = n.attrs.clone();
                cell.sublist_attrs = n.sublist_attrs.clone();
                cell.tail = n.tail.clone();
            }
            row.push(cell);
        }
        // Anchors sit in rows above `index`, so the splice leaves their indices alone.
        for (anchor, _) in &spans {
            self.cells[*anchor].row_span += 1;
        }
        let at = index * self.cols;
        self.cells.splice(at..at, row);
        self.row_tails.insert(index, Vec::new());
        self.rows += 1;
        Ok(())
    }

    /// Removes row `index`.
    ///
    /// Merges crossing the row shrink by one. A merged cell anchored in the
    /// row moves down one row with its content, so the slots it still
    /// spans keep an owner.
    pub(crate) fn delete_row(&mut self, index: usize) -> Result<()> {
        if index >= self.rows {
            return Err(Error::validation(
                "index",
                format!("{index} is outside table {} with {} rows", self.id, self.rows),
            ));
        }
        if self.rows == 1 {
            return Err(Error::validation(
                "index",
                format!("cannot delete the only row of table {}", self.id),
            ));
        }
        for (anchor, _) in self.spans_into(index) {
            self.cells[anchor].row_span -= 1;
        }
        let at = index * self.cols;
        if index + 1 < self.rows {
            for c in 0..self.cols {
                let cell = &self.cells[at + c];
                if cell.covered || cell.row_span <= 1 {
                    continue;
                }
                let mut anchor = std::mem::replace(&mut self.cells[at + c], Cell::covered(NodeId(0)));
                anchor.row_span -= 1;
                self.cells[at + self.cols + c] = anchor;
            }
        }
        self.cells.drain(at..at + self.cols);
        self.row_tails.remove(index);
        self.rows -= 1;
        Ok(())
    }
}
