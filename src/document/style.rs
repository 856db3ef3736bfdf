//! Character and paragraph style catalog.
//!
//! Runs and paragraphs hold style identifiers only. Formatting a range never
//! edits a shared definition in place: the catalog derives a new style from
//! the one currently referenced (or reuses an equal derivation made earlier)
//! and the affected runs are repointed. The package writer later splices the
//! derived definitions into the header part.

use std::collections::BTreeMap;
use std::fmt;

use crate::common::{FormatError, Result};

use super::types::{Alignment, FontSpec};

/// Identifier of a character style (`hh:charPr id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CharStyleId(pub u32);

/// Identifier of a paragraph style (`hh:paraPr id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParaStyleId(pub u32);

impl fmt::Display for CharStyleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ParaStyleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The character formatting the engine understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharStyle {
    /// Face name of the Hangul font slot.
    pub family: Option<String>,
    /// Height in 1/100 pt.
    pub height: u32,
    pub bold: bool,
    pub italic: bool,
    /// The header style this one was derived from, if it was made during the
    /// session.
    pub(crate) base: Option<CharStyleId>,
}

impl CharStyle {
    pub fn new(family: Option<String>, height: u32, bold: bool, italic: bool) -> Self {
        Self {
            family,
            height,
            bold,
            italic,
            base: None,
        }
    }

    /// Size in points.
    pub fn size(&self) -> f32 {
        self.height as f32 / 100.0
    }

    pub fn is_derived(&self) -> bool {
        self.base.is_some()
    }

    fn with(&self, spec: &FontSpec) -> (Option<String>, u32, bool, bool) {
        (
            spec.family.clone().or_else(|| self.family.clone()),
            spec.height().unwrap_or(self.height),
            spec.bold.unwrap_or(self.bold),
            spec.italic.unwrap_or(self.italic),
        )
    }

    fn fields(&self) -> (Option<String>, u32, bool, bool) {
        (self.family.clone(), self.height, self.bold, self.italic)
    }
}

/// The paragraph formatting the engine understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParaStyle {
    pub alignment: Option<Alignment>,
    pub(crate) base: Option<ParaStyleId>,
}

impl ParaStyle {
    pub fn new(alignment: Option<Alignment>) -> Self {
        Self {
            alignment,
            base: None,
        }
    }

    pub fn is_derived(&self) -> bool {
        self.base.is_some()
    }
}

/// Style definitions referenced by id.
#[derive(Debug, Clone, Default)]
pub struct StyleCatalog {
    chars: BTreeMap<CharStyleId, CharStyle>,
    paras: BTreeMap<ParaStyleId, ParaStyle>,
    /// Why the catalog is read-only, when it is.
    locked: Option<String>,
}

impl StyleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog that rejects every derivation, used when the header part
    /// could not be mapped.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            locked: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn is_editable(&self) -> bool {
        self.locked.is_none()
    }

    pub fn insert_char(&mut self, id: CharStyleId, style: CharStyle) {
        self.chars.insert(id, style);
    }

    pub fn insert_para(&mut self, id: ParaStyleId, style: ParaStyle) {
        self.paras.insert(id, style);
    }

    pub fn char_style(&self, id: CharStyleId) -> Option<&CharStyle> {
        self.chars.get(&id)
    }

    pub fn para_style(&self, id: ParaStyleId) -> Option<&ParaStyle> {
        self.paras.get(&id)
    }

    pub fn char_styles(&self) -> impl Iterator<Item = (CharStyleId, &CharStyle)> {
        self.chars.iter().map(|(id, s)| (*id, s))
    }

    pub fn para_styles(&self) -> impl Iterator<Item = (ParaStyleId, &ParaStyle)> {
        self.paras.iter().map(|(id, s)| (*id, s))
    }

    /// Character styles created during the session, in id order.
    pub fn derived_chars(&self) -> impl Iterator<Item = (CharStyleId, &CharStyle)> {
        self.char_styles().filter(|(_, s)| s.is_derived())
    }

    /// Paragraph styles created during the session, in id order.
    pub fn derived_paras(&self) -> impl Iterator<Item = (ParaStyleId, &ParaStyle)> {
        self.para_styles().filter(|(_, s)| s.is_derived())
    }

    pub fn has_derived(&self) -> bool {
        self.chars.values().any(CharStyle::is_derived)
            || self.paras.values().any(ParaStyle::is_derived)
    }

    fn check_editable(&self) -> Result<()> {
        match &self.locked {
            Some(reason) => Err(FormatError::StylesUnavailable(reason.clone()).into()),
            None => Ok(()),
        }
    }

    /// Style equal to `current` with `spec` applied.
    ///
    /// Returns `current` when nothing changes, an earlier derivation from the
    /// same header style when one matches, and otherwise a new style.
    pub fn derive_char(&mut self, current: CharStyleId, spec: &FontSpec) -> Result<CharStyleId> {
        self.check_editable()?;
        let style = self.chars.get(&current).ok_or_else(|| {
            FormatError::StylesUnavailable(format!("character style {current} is not defined"))
        })?;
        let target = style.with(spec);
        if target == style.fields() {
            return Ok(current);
        }
        let root = style.base.unwrap_or(current);
        if let Some(root_style) = self.chars.get(&root)
            && root_style.fields() == target
        {
            return Ok(root);
        }
        if let Some((id, _)) = self
            .chars
            .iter()
            .find(|(_, s)| s.base == Some(root) && s.fields() == target)
        {
            return Ok(*id);
        }

        let id = CharStyleId(self.chars.keys().next_back().map_or(0, |k| k.0 + 1));
        let (family, height, bold, italic) = target;
        self.chars.insert(
            id,
            CharStyle {
                family,
                height,
                bold,
                italic,
                base: Some(root),
            },
        );
        Ok(id)
    }

    /// Paragraph style equal to `current` but aligned as requested.
    pub fn derive_para(&mut self, current: ParaStyleId, alignment: Alignment) -> Result<ParaStyleId> {
        self.check_editable()?;
        let style = self.paras.get(&current).ok_or_else(|| {
            FormatError::StylesUnavailable(format!("paragraph style {current} is not defined"))
        })?;
        if style.alignment == Some(alignment) {
            return Ok(current);
        }
        let root = style.base.unwrap_or(current);
        if let Some(root_style) = self.paras.get(&root)
            && root_style.alignment == Some(alignment)
        {
            return Ok(root);
        }
        if let Some((id, _)) = self
            .paras
            .iter()
            .find(|(_, s)| s.base == Some(root) && s.alignment == Some(alignment))
        {
            return Ok(*id);
        }

        let id = ParaStyleId(self.paras.keys().next_back().map_or(0, |k| k.0 + 1));
        self.paras.insert(
            id,
            ParaStyle {
                alignment: Some(alignment),
                base: Some(root),
            },
        );
        Ok(id)
    }
}
