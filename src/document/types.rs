//! Value types used to address and describe document content.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::Error;

/// Stable identifier of a structural node (section, paragraph, table, cell).
///
/// Assigned when the node is created or read, never changed afterwards, and
/// unique within one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Insertion point for text and paragraphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Start of the first paragraph of the document body.
    DocumentStart,
    /// End of the last paragraph of the document body.
    DocumentEnd,
    /// A character offset inside a paragraph.
    Paragraph { id: NodeId, offset: usize },
}

/// Content selected for reading or formatting.
///
/// Offsets count Unicode scalar values, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Range {
    /// The whole document body.
    Document,
    /// Everything under one node.
    Node(NodeId),
    /// Characters `start..end` of one paragraph.
    Span {
        paragraph: NodeId,
        start: usize,
        end: usize,
    },
}

/// Horizontal paragraph alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
    Distribute,
}

impl Alignment {
    /// Lowercase name, as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "justify",
            Alignment::Distribute => "distribute",
        }
    }

    /// Value of the `horizontal` attribute of `hh:align`.
    pub fn to_hwpx(&self) -> &'static str {
        match self {
            Alignment::Left => "LEFT",
            Alignment::Center => "CENTER",
            Alignment::Right => "RIGHT",
            Alignment::Justify => "JUSTIFY",
            Alignment::Distribute => "DISTRIBUTE",
        }
    }

    /// Parse the `horizontal` attribute of `hh:align`.
    pub fn from_hwpx(value: &str) -> Option<Self> {
        match value {
            "LEFT" => Some(Alignment::Left),
            "CENTER" => Some(Alignment::Center),
            "RIGHT" => Some(Alignment::Right),
            "JUSTIFY" => Some(Alignment::Justify),
            "DISTRIBUTE" | "DISTRIBUTE_SPACE" => Some(Alignment::Distribute),
            _ => None,
        }
    }

    /// Numeric code used by the automation host's `ParaShape` command.
    pub fn host_code(&self) -> u8 {
        match self {
            Alignment::Left => 0,
            Alignment::Center => 1,
            Alignment::Right => 2,
            Alignment::Justify => 3,
            Alignment::Distribute => 4,
        }
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Alignment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(Alignment::Left),
            "center" => Ok(Alignment::Center),
            "right" => Ok(Alignment::Right),
            "justify" => Ok(Alignment::Justify),
            "distribute" => Ok(Alignment::Distribute),
            _ => Err(Error::validation(
                "alignment",
                format!("'{s}' is not one of left, center, right, justify, distribute"),
            )),
        }
    }
}

/// Character formatting request. `None` fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    /// Font face name applied to every script.
    pub family: Option<String>,
    /// Size in points.
    pub size: Option<f32>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
}

impl FontSpec {
    pub fn family(mut self, family: impl Into<String>) -> Self {
        self.family = Some(family.into());
        self
    }

    pub fn size(mut self, points: f32) -> Self {
        self.size = Some(points);
        self
    }

    pub fn bold(mut self, bold: bool) -> Self {
        self.bold = Some(bold);
        self
    }

    pub fn italic(mut self, italic: bool) -> Self {
        self.italic = Some(italic);
        self
    }

    /// True when no field would change anything.
    pub fn is_empty(&self) -> bool {
        self.family.is_none() && self.size.is_none() && self.bold.is_none() && self.italic.is_none()
    }

    /// Size in HWPUNIT height (1/100 pt).
    pub fn height(&self) -> Option<u32> {
        self.size.map(|pt| (pt * 100.0).round() as u32)
    }
}

/// One occurrence found by `findText`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMatch {
    /// The paragraph holding the match. The automation host does not expose
    /// paragraph identities, so its matches leave this empty.
    pub paragraph: Option<NodeId>,
    /// Character offset of the first matched character.
    pub start: usize,
    /// Character offset one past the last matched character.
    pub end: usize,
}

/// Descriptive properties from the package manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

impl DocumentMetadata {
    /// Check if the metadata contains any actual data.
    pub fn has_data(&self) -> bool {
        self.title.is_some()
            || self.author.is_some()
            || self.subject.is_some()
            || self.keywords.is_some()
            || self.created.is_some()
            || self.modified.is_some()
    }
}

/// Summary returned by `documentInfo`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DocumentInfo {
    pub path: Option<PathBuf>,
    pub sections: usize,
    pub paragraphs: usize,
    pub tables: usize,
    pub characters: usize,
    pub metadata: DocumentMetadata,
}
