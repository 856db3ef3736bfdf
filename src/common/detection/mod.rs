//! Signature-based format detection.
//!
//! Only two container kinds matter here: the ZIP-based HWPX package and the
//! OLE2 compound file used by legacy HWP. Detection looks at the leading
//! magic bytes and nothing else; whether a ZIP archive really is an HWPX
//! package is decided later by the reader.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::common::Result;

/// OLE2 compound file signature (legacy HWP).
pub const OLE2_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Local file header signature of a ZIP archive.
pub const ZIP_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// End-of-central-directory signature; an empty ZIP archive starts with it.
const ZIP_EMPTY_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x05, 0x06];

/// Container kinds recognized by signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// ZIP+XML package (.hwpx)
    Hwpx,
    /// Legacy binary OLE2 document (.hwp)
    Hwp,
}

/// Detect the container kind from the first bytes of a file.
#[inline]
pub fn detect_file_format_from_bytes(bytes: &[u8]) -> Option<FileFormat> {
    if bytes.len() >= OLE2_SIGNATURE.len() && bytes[..OLE2_SIGNATURE.len()] == OLE2_SIGNATURE {
        return Some(FileFormat::Hwp);
    }
    if bytes.len() >= 4 && (bytes[..4] == ZIP_SIGNATURE || bytes[..4] == ZIP_EMPTY_SIGNATURE) {
        return Some(FileFormat::Hwpx);
    }
    None
}

/// Detect the container kind of a file on disk by reading its header.
pub fn detect_file_format<P: AsRef<Path>>(path: P) -> Result<Option<FileFormat>> {
    let mut header = [0u8; 8];
    let mut file = File::open(path.as_ref())?;
    let mut read = 0usize;
    while read < header.len() {
        match file.read(&mut header[read..])? {
            0 => break,
            n => read += n,
        }
    }
    Ok(detect_file_format_from_bytes(&header[..read]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_ole2() {
        let mut bytes = OLE2_SIGNATURE.to_vec();
        bytes.extend_from_slice(&[0u8; 16]);
        assert_eq!(detect_file_format_from_bytes(&bytes), Some(FileFormat::Hwp));
    }

    #[test]
    fn test_detects_zip() {
        assert_eq!(
            detect_file_format_from_bytes(b"PK\x03\x04rest"),
            Some(FileFormat::Hwpx)
        );
        assert_eq!(detect_file_format_from_bytes(b"<?xml"), None);
        assert_eq!(detect_file_format_from_bytes(b"PK"), None);
    }

    #[test]
    fn test_partial_ole_signature_is_unknown() {
        assert_eq!(detect_file_format_from_bytes(&OLE2_SIGNATURE[..4]), None);
    }
}
