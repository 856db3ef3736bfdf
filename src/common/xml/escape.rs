use std::borrow::Cow;

use aho_corasick::{AhoCorasick, MatchKind};
use once_cell::sync::Lazy;

// Static initialization: automaton is built only once, thread-safe
static XML_ESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .build(["&", "<", ">", "\"", "'"])
        .expect("Failed to build XML escaper")
});

static TEXT_ESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .build(["&", "<", ">"])
        .expect("Failed to build XML text escaper")
});

// LeftmostLongest so that "&amp;" wins over any shorter overlapping entity
static XML_UNESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .match_kind(MatchKind::LeftmostLongest)
        .build(["&amp;", "&lt;", "&gt;", "&quot;", "&apos;"])
        .expect("Failed to build XML unescaper")
});

/// Escape a string for use inside a double-quoted attribute value.
///
/// # Examples
///
/// ```
/// use hwpkit::common::xml::escape_xml;
/// assert_eq!(escape_xml("a & b"), "a &amp; b");
/// assert_eq!(escape_xml("<tag>\"hello\"</tag>"), "&lt;tag&gt;&quot;hello&quot;&lt;/tag&gt;");
/// ```
#[inline]
pub fn escape_xml(s: &str) -> String {
    XML_ESCAPER.replace_all(s, &["&amp;", "&lt;", "&gt;", "&quot;", "&apos;"])
}

/// Escape character data. Quotes are left alone.
///
/// ```
/// use hwpkit::common::xml::escape_text;
/// assert_eq!(escape_text("\"a\" < b"), "\"a\" &lt; b");
/// ```
#[inline]
pub fn escape_text(s: &str) -> String {
    TEXT_ESCAPER.replace_all(s, &["&amp;", "&lt;", "&gt;"])
}

/// Unescape XML character data.
///
/// Predefined entities and numeric character references are resolved. If the
/// input contains a reference quick-xml rejects, only the five predefined
/// entities are replaced and everything else is left unchanged.
///
/// # Examples
///
/// ```
/// use hwpkit::common::xml::unescape_xml;
/// assert_eq!(unescape_xml("&lt;a &amp; b&gt;"), "<a & b>");
/// assert_eq!(unescape_xml("&#xAC00;&#44033;"), "가각");
/// assert_eq!(unescape_xml("&invalid;"), "&invalid;");
/// ```
pub fn unescape_xml(s: &str) -> Cow<'_, str> {
    match quick_xml::escape::unescape(s) {
        Ok(text) => text,
        Err(_) => Cow::Owned(XML_UNESCAPER.replace_all(s, &["&", "<", ">", "\"", "'"])),
    }
}
