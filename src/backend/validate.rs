//! Argument checks shared by both backends.
//!
//! Everything here runs before a backend touches its document or the host,
//! so a rejected call changes nothing.

use std::borrow::Cow;
use std::path::Path;

use crate::common::{Error, Result};
use crate::config::Limits;
use crate::document::FontSpec;

/// Reject control characters other than tab and newline, and normalize CR
/// and CRLF line endings to `\n`.
pub(crate) fn text<'a>(argument: &str, text: &'a str) -> Result<Cow<'a, str>> {
    if let Some(c) = text
        .chars()
        .find(|&c| c.is_control() && !matches!(c, '\t' | '\n' | '\r'))
    {
        return Err(Error::validation(
            argument,
            format!("control character U+{:04X} is not allowed", c as u32),
        ));
    }
    if text.contains('\r') {
        Ok(Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n")))
    } else {
        Ok(Cow::Borrowed(text))
    }
}

/// Search patterns must be non-empty and free of control characters.
pub(crate) fn pattern<'a>(pattern: &'a str) -> Result<Cow<'a, str>> {
    if pattern.is_empty() {
        return Err(Error::validation("pattern", "must not be empty"));
    }
    text("pattern", pattern)
}

pub(crate) fn table_dims(rows: usize, cols: usize, limits: &Limits) -> Result<()> {
    if rows == 0 || rows > limits.max_rows {
        return Err(Error::validation(
            "rows",
            format!("{rows} is outside 1..={}", limits.max_rows),
        ));
    }
    if cols == 0 || cols > limits.max_cols {
        return Err(Error::validation(
            "cols",
            format!("{cols} is outside 1..={}", limits.max_cols),
        ));
    }
    Ok(())
}

pub(crate) fn font(spec: &FontSpec, limits: &Limits) -> Result<()> {
    if let Some(size) = spec.size
        && !(size > 0.0 && size <= limits.max_font_size)
    {
        return Err(Error::validation(
            "size",
            format!("{size} is outside (0, {}]", limits.max_font_size),
        ));
    }
    if let Some(family) = &spec.family {
        if family.trim().is_empty() {
            return Err(Error::validation("family", "must not be blank"));
        }
        text("family", family)?;
    }
    Ok(())
}

pub(crate) fn path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(Error::validation("path", "must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorKind;

    #[test]
    fn test_text_normalizes_line_endings() {
        assert_eq!(text("text", "a\r\nb\rc\n").unwrap(), "a\nb\nc\n");
        assert!(matches!(text("text", "plain\ttab").unwrap(), Cow::Borrowed(_)));
    }

    #[test]
    fn test_text_rejects_control_characters() {
        let err = text("text", "bell\u{7}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("U+0007"));
        assert!(text("text", "nul\0").is_err());
    }

    #[test]
    fn test_table_bounds() {
        let limits = Limits::default();
        assert!(table_dims(1, 1, &limits).is_ok());
        assert!(table_dims(1000, 100, &limits).is_ok());
        assert!(table_dims(0, 3, &limits).is_err());
        assert!(table_dims(1001, 3, &limits).is_err());
        assert!(table_dims(3, 101, &limits).is_err());
    }

    #[test]
    fn test_font_bounds() {
        let limits = Limits::default();
        assert!(font(&FontSpec::default().size(12.0), &limits).is_ok());
        assert!(font(&FontSpec::default().size(0.0), &limits).is_err());
        assert!(font(&FontSpec::default().size(-1.0), &limits).is_err());
        assert!(font(&FontSpec::default().size(f32::NAN), &limits).is_err());
        assert!(font(&FontSpec::default().size(5000.0), &limits).is_err());
        assert!(font(&FontSpec::default().family("  "), &limits).is_err());
    }

    #[test]
    fn test_empty_pattern() {
        assert!(pattern("").is_err());
        assert_eq!(pattern("x").unwrap(), "x");
    }
}
