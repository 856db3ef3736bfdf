//! Paragraphs and runs, with character-offset text editing.

use super::element::{Attrs, Fragment};
use super::style::{CharStyleId, ParaStyleId};
use super::NodeId;

/// A contiguous span of text sharing one character style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub style: CharStyleId,
    pub(crate) text: String,
    /// Unmapped inline elements inside the text, positioned by char offset.
    pub(crate) inline: Vec<Fragment>,
    /// Unmapped run children before the text (section/column definitions,
    /// controls).
    pub(crate) leading: Vec<String>,
    /// Unmapped run children after the text.
    pub(crate) trailing: Vec<String>,
    pub(crate) attrs: Attrs,
}

impl Run {
    pub fn new(style: CharStyleId, text: impl Into<String>) -> Self {
        Self {
            style,
            text: text.into(),
            inline: Vec::new(),
            leading: Vec::new(),
            trailing: Vec::new(),
            attrs: Attrs::new(),
        }
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    fn insert_chars(&mut self, offset: usize, text: &str) {
        let at = byte_index(&self.text, offset);
        self.text.insert_str(at, text);
        let added = text.chars().count();
        for frag in &mut self.inline {
            if frag.position > offset {
                frag.position += added;
            }
        }
    }

    fn remove_chars(&mut self, start: usize, end: usize) {
        let from = byte_index(&self.text, start);
        let to = byte_index(&self.text, end);
        self.text.replace_range(from..to, "");
        let removed = end - start;
        for frag in &mut self.inline {
            if frag.position >= end {
                frag.position -= removed;
            } else if frag.position > start {
                // Inline markers inside the removed text collapse onto its start.
                frag.position = start;
            }
        }
    }

    /// Splits at a char offset, returning the tail. Leading fragments stay on
    /// the left, trailing ones move right.
    fn split_off(&mut self, offset: usize) -> Run {
        let at = byte_index(&self.text, offset);
        let tail_text = self.text.split_off(at);
        let (keep, moved): (Vec<Fragment>, Vec<Fragment>) =
            self.inline.drain(..).partition(|f| f.position < offset);
        self.inline = keep;
        Run {
            style: self.style,
            text: tail_text,
            inline: moved
                .into_iter()
                .map(|f| Fragment::new(f.position - offset, f.xml))
                .collect(),
            leading: Vec::new(),
            trailing: std::mem::take(&mut self.trailing),
            attrs: self.attrs.clone(),
        }
    }
}

/// A paragraph: an ordered sequence of runs with a paragraph style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    pub id: NodeId,
    pub style: ParaStyleId,
    pub(crate) runs: Vec<Run>,
    pub(crate) attrs: Attrs,
    /// Unmapped children, positioned by run index.
    pub(crate) fragments: Vec<Fragment>,
}

impl Paragraph {
    pub fn new(id: NodeId, style: ParaStyleId) -> Self {
        Self {
            id,
            style,
            runs: Vec::new(),
            attrs: Attrs::new(),
            fragments: Vec::new(),
        }
    }

    /// A paragraph holding a single run.
    pub fn with_text(id: NodeId, style: ParaStyleId, run_style: CharStyleId, text: &str) -> Self {
        let mut p = Self::new(id, style);
        p.runs.push(Run::new(run_style, text));
        p
    }

    #[inline]
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn char_len(&self) -> usize {
        self.runs.iter().map(Run::char_len).sum()
    }

    /// Style of the first run, used for text added to an empty paragraph.
    pub fn leading_char_style(&self) -> Option<CharStyleId> {
        self.runs.first().map(|r| r.style)
    }

    /// Inserts `text` at a char offset. The text joins the run ending at the
    /// offset, so it inherits the formatting of what precedes it.
    ///
    /// `offset` must not exceed [`Paragraph::char_len`].
    pub(crate) fn insert_text(&mut self, offset: usize, text: &str, fallback: CharStyleId) {
        if self.runs.is_empty() {
            self.runs.push(Run::new(fallback, ""));
        }
        let mut remaining = offset;
        let last = self.runs.len() - 1;
        for (i, run) in self.runs.iter_mut().enumerate() {
            let len = run.char_len();
            if remaining <= len || i == last {
                run.insert_chars(remaining.min(len), text);
                return;
            }
            remaining -= len;
        }
    }

    /// Removes chars `start..end`. Runs left empty are kept, so run-attached
    /// fragments survive.
    pub(crate) fn delete_range(&mut self, start: usize, end: usize) {
        let mut run_start = 0usize;
        for run in &mut self.runs {
            let len = run.char_len();
            let run_end = run_start + len;
            let from = start.max(run_start);
            let to = end.min(run_end);
            if from < to {
                run.remove_chars(from - run_start, to - run_start);
            }
            run_start = run_end;
        }
    }

    /// Replaces chars `start..end` with `text`. The replacement takes the
    /// style of the run holding the first replaced char.
    pub(crate) fn replace_range(&mut self, start: usize, end: usize, text: &str) {
        let mut run_start = 0usize;
        let mut target = None;
        for (i, run) in self.runs.iter().enumerate() {
            let len = run.char_len();
            if start < run_start + len {
                target = Some((i, start - run_start));
                break;
            }
            run_start += len;
        }
        self.delete_range(start, end);
        match target {
            Some((i, local)) => self.runs[i].insert_chars(local, text),
            None => self.insert_text(start, text, CharStyleId(0)),
        }
    }

    /// Ensures a run boundary at `offset` and returns the index of the first
    /// run starting there.
    pub(crate) fn split_at(&mut self, offset: usize) -> usize {
        let mut run_start = 0usize;
        for i in 0..self.runs.len() {
            if offset == run_start {
                return i;
            }
            let len = self.runs[i].char_len();
            if offset < run_start + len {
                let tail = self.runs[i].split_off(offset - run_start);
                self.runs.insert(i + 1, tail);
                for frag in &mut self.fragments {
                    if frag.position > i {
                        frag.position += 1;
                    }
                }
                return i + 1;
            }
            run_start += len;
        }
        self.runs.len()
    }

    /// Indices of the runs covering chars `start..end`, splitting runs at the
    /// bounds.
    pub(crate) fn isolate(&mut self, start: usize, end: usize) -> std::ops::Range<usize> {
        // Split at `start` first: the later split cannot shift `from`.
        let from = self.split_at(start);
        let to = self.split_at(end);
        from..to
    }

    /// Moves the runs from `offset` on into a new paragraph with `id`.
    /// Unmapped paragraph children stay with `self`.
    pub(crate) fn split_off(&mut self, offset: usize, id: NodeId) -> Paragraph {
        let at = self.split_at(offset);
        let mut tail = self.runs.split_off(at);
        // Section and column definitions stay with the paragraph that led.
        if let Some(first) = tail.first_mut()
            && !first.leading.is_empty()
        {
            let mut head = Run::new(first.style, "");
            head.leading = std::mem::take(&mut first.leading);
            head.attrs = first.attrs.clone();
            self.runs.push(head);
        }
        let kept = self.runs.len();
        for frag in &mut self.fragments {
            frag.position = frag.position.min(kept);
        }
        Paragraph {
            id,
            style: self.style,
            runs: tail,
            attrs: self.attrs.clone(),
            fragments: Vec::new(),
        }
    }

    /// Replaces all runs with one run of `text`, keeping the first run's style.
    pub(crate) fn set_text(&mut self, text: &str, fallback: CharStyleId) {
        let style = self.leading_char_style().unwrap_or(fallback);
        self.runs = vec![Run::new(style, text)];
        for frag in &mut self.fragments {
            frag.position = frag.position.min(1);
        }
    }

    /// Takes the leading fragments of the first run. These hold the section
    /// and column definitions, which must stay in the first paragraph.
    pub(crate) fn take_head(&mut self) -> Vec<String> {
        self.runs
            .first_mut()
            .map(|r| std::mem::take(&mut r.leading))
            .unwrap_or_default()
    }
}

/// Byte index of the `offset`-th char, or the string length past the end.
fn byte_index(s: &str, offset: usize) -> usize {
    s.char_indices().nth(offset).map(|(i, _)| i).unwrap_or(s.len())
}
