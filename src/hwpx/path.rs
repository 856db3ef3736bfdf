//! Part names inside an HWPX archive.
//!
//! A [`PartPath`] is the ZIP member name of a part: relative to the archive
//! root, `/`-separated and case-sensitive. Hrefs in the manifest are resolved
//! against the manifest's own directory.

use std::fmt;

use crate::common::FormatError;

/// A validated, normalized part name such as `Contents/section0.xml`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartPath {
    name: String,
}

impl PartPath {
    /// Validate an archive member name.
    ///
    /// Backslashes, absolute names, empty segments and `..` segments that
    /// would leave the archive root are rejected. `.` segments are dropped.
    pub fn new(name: impl AsRef<str>) -> Result<Self, FormatError> {
        let raw = name.as_ref();
        let invalid = |reason| FormatError::InvalidPath {
            path: raw.to_string(),
            reason,
        };
        if raw.is_empty() {
            return Err(invalid("empty path"));
        }
        if raw.contains('\\') {
            return Err(invalid("backslash separator"));
        }
        if raw.starts_with('/') {
            return Err(invalid("absolute path"));
        }
        let mut segments: Vec<&str> = Vec::new();
        let trimmed = raw.strip_suffix('/').unwrap_or(raw);
        for segment in trimmed.split('/') {
            match segment {
                "" => return Err(invalid("empty segment")),
                "." => {},
                ".." => {
                    if segments.pop().is_none() {
                        return Err(invalid("escapes the archive root"));
                    }
                },
                s => segments.push(s),
            }
        }
        if segments.is_empty() {
            return Err(invalid("empty path"));
        }
        Ok(Self {
            name: segments.join("/"),
        })
    }

    /// Resolve a manifest href relative to `base_dir` (the directory of the
    /// manifest, `""` for the root).
    pub fn resolve(base_dir: &str, href: &str) -> Result<Self, FormatError> {
        if let Some(rooted) = href.strip_prefix('/') {
            return Self::new(rooted);
        }
        if base_dir.is_empty() {
            Self::new(href)
        } else {
            Self::new(format!("{}/{}", base_dir.trim_end_matches('/'), href))
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Directory portion, `""` for a part at the archive root.
    ///
    /// `"Contents"` for `"Contents/section0.xml"`.
    pub fn dir(&self) -> &str {
        match self.name.rfind('/') {
            Some(pos) => &self.name[..pos],
            None => "",
        }
    }

    /// `"section0.xml"` for `"Contents/section0.xml"`.
    pub fn filename(&self) -> &str {
        match self.name.rfind('/') {
            Some(pos) => &self.name[pos + 1..],
            None => &self.name,
        }
    }

    /// Extension without the leading period, `""` when there is none.
    pub fn ext(&self) -> &str {
        let filename = self.filename();
        match filename.rfind('.') {
            Some(pos) if pos > 0 => &filename[pos + 1..],
            _ => "",
        }
    }

    /// Numeric suffix of the file stem, `Some(2)` for `section2.xml`.
    pub fn idx(&self) -> Option<u32> {
        let filename = self.filename();
        let stem = match filename.rfind('.') {
            Some(pos) => &filename[..pos],
            None => filename,
        };
        let digits = stem.len() - stem.trim_end_matches(|c: char| c.is_ascii_digit()).len();
        if digits == 0 || digits == stem.len() {
            return None;
        }
        stem[stem.len() - digits..].parse().ok()
    }

    /// Whether the name has the form of a body section part.
    pub fn is_section(&self) -> bool {
        self.filename().starts_with("section") && self.ext() == "xml" && self.idx().is_some()
    }
}

impl fmt::Display for PartPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl AsRef<str> for PartPath {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_components() {
        let p = PartPath::new("Contents/section12.xml").unwrap();
        assert_eq!(p.dir(), "Contents");
        assert_eq!(p.filename(), "section12.xml");
        assert_eq!(p.ext(), "xml");
        assert_eq!(p.idx(), Some(12));
        assert!(p.is_section());

        let root = PartPath::new("mimetype").unwrap();
        assert_eq!(root.dir(), "");
        assert_eq!(root.ext(), "");
        assert_eq!(root.idx(), None);
        assert!(!PartPath::new("Contents/header.xml").unwrap().is_section());
    }

    #[test]
    fn test_normalization() {
        assert_eq!(PartPath::new("Contents/./a/../header.xml").unwrap().as_str(), "Contents/header.xml");
        assert_eq!(PartPath::new("BinData/").unwrap().as_str(), "BinData");
    }

    #[test]
    fn test_rejections() {
        for bad in ["", "/Contents/x.xml", "Contents\\x.xml", "a//b", "../x", "a/../../b", "."] {
            assert!(PartPath::new(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_case_is_preserved() {
        let a = PartPath::new("Contents/Section0.xml").unwrap();
        let b = PartPath::new("Contents/section0.xml").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_resolve() {
        assert_eq!(PartPath::resolve("Contents", "section0.xml").unwrap().as_str(), "Contents/section0.xml");
        assert_eq!(PartPath::resolve("Contents", "../BinData/image1.png").unwrap().as_str(), "BinData/image1.png");
        assert_eq!(PartPath::resolve("", "header.xml").unwrap().as_str(), "header.xml");
        assert_eq!(PartPath::resolve("Contents", "/settings.xml").unwrap().as_str(), "settings.xml");
    }
}
