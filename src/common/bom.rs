//! Byte Order Mark (BOM) detection for XML parts.
//!
//! HWPX content parts are UTF-8. A UTF-8 BOM is tolerated and stripped; any
//! other BOM means the part is in an encoding the reader does not accept.

/// Supported BOM encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BomKind {
    Utf8,
    Utf16Le,
    Utf16Be,
    Utf32Le,
    Utf32Be,
}

impl BomKind {
    /// Returns the byte representation of the BOM.
    #[inline]
    pub const fn as_bytes(&self) -> &'static [u8] {
        match self {
            BomKind::Utf8 => &UTF8_BOM,
            BomKind::Utf16Le => &UTF16_LE_BOM,
            BomKind::Utf16Be => &UTF16_BE_BOM,
            BomKind::Utf32Le => &UTF32_LE_BOM,
            BomKind::Utf32Be => &UTF32_BE_BOM,
        }
    }

    /// Returns the length in bytes of the BOM.
    #[inline]
    #[allow(clippy::len_without_is_empty)] // No need to check for empty BOMs
    pub const fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Encoding label used in diagnostics.
    pub const fn label(&self) -> &'static str {
        match self {
            BomKind::Utf8 => "UTF-8",
            BomKind::Utf16Le => "UTF-16LE",
            BomKind::Utf16Be => "UTF-16BE",
            BomKind::Utf32Le => "UTF-32LE",
            BomKind::Utf32Be => "UTF-32BE",
        }
    }
}

/// UTF-8 BOM bytes.
pub const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
/// UTF-16 little-endian BOM bytes.
pub const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];
/// UTF-16 big-endian BOM bytes.
pub const UTF16_BE_BOM: [u8; 2] = [0xFE, 0xFF];
/// UTF-32 little-endian BOM bytes.
pub const UTF32_LE_BOM: [u8; 4] = [0xFF, 0xFE, 0x00, 0x00];
/// UTF-32 big-endian BOM bytes.
pub const UTF32_BE_BOM: [u8; 4] = [0x00, 0x00, 0xFE, 0xFF];

/// Detects a BOM at the start of `bytes`.
///
/// UTF-32LE is checked before UTF-16LE since the former starts with the
/// latter.
pub fn detect_bom(bytes: &[u8]) -> Option<BomKind> {
    if bytes.starts_with(&UTF32_BE_BOM) {
        return Some(BomKind::Utf32Be);
    }
    if bytes.starts_with(&UTF32_LE_BOM) {
        return Some(BomKind::Utf32Le);
    }
    if bytes.starts_with(&UTF8_BOM) {
        return Some(BomKind::Utf8);
    }
    if bytes.starts_with(&UTF16_BE_BOM) {
        return Some(BomKind::Utf16Be);
    }
    if bytes.starts_with(&UTF16_LE_BOM) {
        return Some(BomKind::Utf16Le);
    }
    None
}

/// Returns `bytes` without a leading BOM, together with the BOM found.
#[inline]
pub fn strip_bom(bytes: &[u8]) -> (Option<BomKind>, &[u8]) {
    match detect_bom(bytes) {
        Some(kind) => (Some(kind), &bytes[kind.len()..]),
        None => (None, bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_bom_variants() {
        assert_eq!(detect_bom(&[0xEF, 0xBB, 0xBF, b'<']), Some(BomKind::Utf8));
        assert_eq!(detect_bom(&[0xFF, 0xFE, b'<', 0]), Some(BomKind::Utf16Le));
        assert_eq!(detect_bom(&[0xFF, 0xFE, 0, 0]), Some(BomKind::Utf32Le));
        assert_eq!(detect_bom(&[0xFE, 0xFF, 0, b'<']), Some(BomKind::Utf16Be));
        assert_eq!(detect_bom(b"<?xml"), None);
    }

    #[test]
    fn test_strip_utf8() {
        let (kind, rest) = strip_bom(b"\xEF\xBB\xBF<a/>");
        assert_eq!(kind, Some(BomKind::Utf8));
        assert_eq!(rest, b"<a/>");
    }
}
