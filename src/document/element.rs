//! Block-level elements and the opaque side channel carried by every node.

use smallvec::SmallVec;

use super::{NodeId, Paragraph, Table};

/// An attribute the model does not interpret, kept for re-emission.
///
/// `value` is unescaped; the writer escapes it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub name: String,
    pub value: String,
}

impl Attr {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Attribute list of one element. Most elements carry only a handful.
pub type Attrs = SmallVec<[Attr; 4]>;

/// Raw XML the model does not map, attached to the nearest mapped node.
///
/// `position` is the index of the mapped sibling the fragment precedes; a
/// position equal to the sibling count places it after the last one. For
/// run-inline fragments it is a character offset into the run text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub position: usize,
    pub xml: String,
}

impl Fragment {
    pub fn new(position: usize, xml: impl Into<String>) -> Self {
        Self {
            position,
            xml: xml.into(),
        }
    }
}

/// A block-level element of a section or table cell.
#[derive(Debug, Clone)]
pub enum Block {
    Paragraph(Paragraph),
    /// Boxed: tables are large and nest blocks themselves.
    Table(Box<Table>),
}

impl Block {
    /// Check if this element is a paragraph.
    #[inline]
    pub fn is_paragraph(&self) -> bool {
        matches!(self, Block::Paragraph(_))
    }

    /// Check if this element is a table.
    #[inline]
    pub fn is_table(&self) -> bool {
        matches!(self, Block::Table(_))
    }

    #[inline]
    pub fn as_paragraph(&self) -> Option<&Paragraph> {
        match self {
            Block::Paragraph(p) => Some(p),
            _ => None,
        }
    }

    #[inline]
    pub fn as_paragraph_mut(&mut self) -> Option<&mut Paragraph> {
        match self {
            Block::Paragraph(p) => Some(p),
            _ => None,
        }
    }

    #[inline]
    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Block::Table(t) => Some(t.as_ref()),
            _ => None,
        }
    }

    #[inline]
    pub fn as_table_mut(&mut self) -> Option<&mut Table> {
        match self {
            Block::Table(t) => Some(t.as_mut()),
            _ => None,
        }
    }

    /// Identifier of the paragraph or table.
    pub fn id(&self) -> NodeId {
        match self {
            Block::Paragraph(p) => p.id,
            Block::Table(t) => t.id,
        }
    }

    /// Plain text: runs for a paragraph, tab/newline separated cells for a
    /// table.
    pub fn text(&self) -> String {
        match self {
            Block::Paragraph(p) => p.text(),
            Block::Table(t) => t.text(),
        }
    }
}

impl From<Paragraph> for Block {
    fn from(p: Paragraph) -> Self {
        Block::Paragraph(p)
    }
}

impl From<Table> for Block {
    fn from(t: Table) -> Self {
        Block::Table(Box::new(t))
    }
}

/// Text of a block sequence, one line per block.
pub(crate) fn blocks_text(blocks: &[Block]) -> String {
    let mut out = String::new();
    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&block.text());
    }
    out
}
