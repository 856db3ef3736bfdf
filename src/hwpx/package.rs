//! Raw archive contents carried alongside a [`DocumentModel`].
//!
//! The reader keeps every entry of the source archive in archive order,
//! tagged with the role it plays. Mapped parts (sections) are rebuilt from
//! the model on write; everything else is emitted from the bytes kept here.
//!
//! [`DocumentModel`]: crate::document::DocumentModel

use std::io::{Cursor, Read};

use zip::CompressionMethod;
use zip::ZipArchive;

use super::path::PartPath;
use crate::common::{Error, FormatError, Result};

/// Largest buffer reserved up front for one entry; the declared size is
/// taken from the archive and cannot be trusted.
const PREALLOC_CAP: u64 = 1 << 20;

/// Decompression ceilings applied while loading an archive.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ArchiveLimits {
    /// Bytes any single entry may expand to.
    pub entry: u64,
    /// Bytes all entries together may expand to.
    pub total: u64,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            entry: 256 << 20,
            total: 1 << 30,
        }
    }
}

/// What an archive entry is to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartRole {
    Mimetype,
    Manifest,
    /// The style header; re-emitted verbatim unless styles were derived.
    Header,
    /// A body section; the index is its position in the model.
    Section(usize),
    /// Anything the engine does not map, re-emitted byte-identical.
    Opaque,
}

/// One entry of the source archive.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Member name as stored in the archive.
    pub name: String,
    pub role: PartRole,
    /// Uncompressed content. Emptied for sections, which are rebuilt.
    pub data: Vec<u8>,
    pub compression: CompressionMethod,
    pub modified: Option<zip::DateTime>,
    pub is_dir: bool,
}

impl Entry {
    pub(crate) fn new(name: impl Into<String>, role: PartRole, data: Vec<u8>) -> Self {
        let compression = if role == PartRole::Mimetype {
            CompressionMethod::Stored
        } else {
            CompressionMethod::Deflated
        };
        Self {
            name: name.into(),
            role,
            data,
            compression,
            modified: None,
            is_dir: false,
        }
    }
}

/// Package-level state of an open document.
#[derive(Debug, Clone, Default)]
pub struct PackageState {
    /// All entries in source archive order.
    pub(crate) entries: Vec<Entry>,
    /// Path of the manifest part.
    pub(crate) manifest: Option<String>,
}

impl PackageState {
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn manifest_path(&self) -> Option<&str> {
        self.manifest.as_deref()
    }

    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Entries the writer emits as they are, in archive order.
    pub fn opaque_entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| e.role == PartRole::Opaque)
    }

    pub fn header(&self) -> Option<&Entry> {
        self.entries.iter().find(|e| e.role == PartRole::Header)
    }
}

/// Load every entry of a ZIP archive into memory.
///
/// Directory entries are kept so the archive layout survives a rewrite.
pub(crate) fn read_archive(bytes: &[u8]) -> Result<Vec<Entry>> {
    read_archive_within(bytes, ArchiveLimits::default())
}

pub(crate) fn read_archive_within(bytes: &[u8], limits: ArchiveLimits) -> Result<Vec<Entry>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut entries = Vec::with_capacity(archive.len());
    let mut total = 0u64;
    for i in 0..archive.len() {
        let file = archive.by_index(i)?;
        let name = file.name().to_string();
        let is_dir = file.is_dir();
        if !is_dir {
            PartPath::new(&name)?;
        }
        let declared = file.size();
        if declared > limits.entry {
            return Err(too_large(&name, declared, limits.entry));
        }
        let compression = file.compression();
        let modified = file.last_modified();

        let budget = limits.entry.min(limits.total - total);
        let mut data = Vec::with_capacity(declared.min(PREALLOC_CAP) as usize);
        // One byte past the budget tells an oversized stream from an exact fit.
        file.take(budget + 1).read_to_end(&mut data)?;
        let len = data.len() as u64;
        if len > budget {
            return Err(too_large(&name, len, budget));
        }
        total += len;

        entries.push(Entry {
            name,
            role: PartRole::Opaque,
            data,
            compression,
            modified,
            is_dir,
        });
    }
    Ok(entries)
}

fn too_large(name: &str, size: u64, limit: u64) -> Error {
    FormatError::Zip(format!("entry {name} expands past {limit} bytes (at least {size})")).into()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::write::{SimpleFileOptions, ZipWriter};

    use super::*;
    use crate::common::{Error, FormatError};

    fn archive(entries: &[(&str, &[u8], CompressionMethod)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data, method) in entries {
            zip.start_file(*name, SimpleFileOptions::default().compression_method(*method))
                .unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_reads_entries_in_order() {
        let bytes = archive(&[
            ("mimetype", b"application/hwp+zip", CompressionMethod::Stored),
            ("Contents/content.hpf", b"<opf:package/>", CompressionMethod::Deflated),
            ("BinData/image1.png", &[0x89, 0x50, 0x4E, 0x47], CompressionMethod::Stored),
        ]);
        let entries = read_archive(&bytes).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["mimetype", "Contents/content.hpf", "BinData/image1.png"]);
        assert_eq!(entries[0].compression, CompressionMethod::Stored);
        assert_eq!(entries[1].compression, CompressionMethod::Deflated);
        assert_eq!(entries[2].data, [0x89, 0x50, 0x4E, 0x47]);
    }

    #[test]
    fn test_rejects_backslash_names() {
        let bytes = archive(&[("Contents\\section0.xml", b"<x/>", CompressionMethod::Stored)]);
        let err = read_archive(&bytes).unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::InvalidPath { .. })));
    }

    #[test]
    fn test_entry_over_limit_is_rejected() {
        let big = vec![b'a'; 4096];
        let bytes = archive(&[
            ("mimetype", b"application/hwp+zip", CompressionMethod::Stored),
            ("Contents/section0.xml", &big, CompressionMethod::Deflated),
        ]);
        let limits = ArchiveLimits {
            entry: 1024,
            total: 1 << 20,
        };
        let err = read_archive_within(&bytes, limits).unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::Zip(_))));

        let limits = ArchiveLimits {
            entry: 4096,
            total: 1 << 20,
        };
        assert_eq!(read_archive_within(&bytes, limits).unwrap()[1].data.len(), 4096);
    }

    #[test]
    fn test_total_over_limit_is_rejected() {
        let chunk = vec![b'a'; 600];
        let bytes = archive(&[
            ("a.xml", &chunk, CompressionMethod::Deflated),
            ("b.xml", &chunk, CompressionMethod::Deflated),
        ]);
        let limits = ArchiveLimits {
            entry: 1000,
            total: 1000,
        };
        let err = read_archive_within(&bytes, limits).unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::Zip(_))));
    }

    /// Rewrites the uncompressed size in every local and central header.
    fn forge_size(bytes: &mut [u8], size: u32) {
        for i in 0..bytes.len().saturating_sub(30) {
            let offset = match bytes[i..i + 4] {
                [b'P', b'K', 3, 4] => 22,
                [b'P', b'K', 1, 2] => 24,
                _ => continue,
            };
            bytes[i + offset..i + offset + 4].copy_from_slice(&size.to_le_bytes());
        }
    }

    #[test]
    fn test_forged_size_does_not_preallocate() {
        let mut bytes = archive(&[("Contents/section0.xml", b"<hs:sec/>", CompressionMethod::Deflated)]);
        forge_size(&mut bytes, u32::MAX - 1);
        let err = read_archive(&bytes).unwrap_err();
        assert!(matches!(err, Error::Format(_)), "{err:?}");
    }

    #[test]
    fn test_garbage_is_not_a_package() {
        assert!(read_archive(b"PK\x03\x04 definitely not a zip").is_err());
    }
}
