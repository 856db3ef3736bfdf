//! HWPX package writing.
//!
//! Entry order: `mimetype` (stored, first), the manifest, the header,
//! sections in model order, then every other entry in source archive order.
//! Parts the model does not rebuild are copied byte for byte with their
//! original compression method and timestamp.

use std::io::{self, Cursor, Write};
use std::path::Path;
use std::time::Instant;

use tempfile::NamedTempFile;
use tracing::{debug, info};
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

use super::constants::{MIMETYPE, MIMETYPE_PATH};
use super::header::splice_header;
use super::package::{Entry, PartRole};
use super::section::write_section;
use super::xml::decode_part;
use crate::common::{FormatError, Result};
use crate::document::DocumentModel;

/// Points at which [`PackageWriter::write_with_checkpoint`] hands control to
/// the caller before the destination is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    /// The archive is complete in the temporary file.
    Written,
    /// The temporary file has been flushed to disk.
    Synced,
}

/// Serializes a [`DocumentModel`] into an HWPX package.
pub struct PackageWriter;

impl PackageWriter {
    /// Write atomically to `dest`.
    ///
    /// The archive goes to a temporary file in the destination directory and
    /// is renamed over `dest` only once complete and synced. On failure the
    /// destination is untouched and the temporary file is removed.
    pub fn write(model: &DocumentModel, dest: impl AsRef<Path>) -> Result<()> {
        Self::write_with_checkpoint(model, dest, |_| Ok(()))
    }

    /// [`write`](Self::write), calling `checkpoint` at each [`WriteStage`].
    /// An error from the checkpoint aborts the write.
    pub fn write_with_checkpoint(
        model: &DocumentModel,
        dest: impl AsRef<Path>,
        mut checkpoint: impl FnMut(WriteStage) -> io::Result<()>,
    ) -> Result<()> {
        let dest = dest.as_ref();
        let started = Instant::now();
        let bytes = Self::to_bytes(model)?;

        let dir = match dest.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(&bytes)?;
        temp.flush()?;
        // An overwritten file keeps its mode rather than the temp file's.
        match std::fs::metadata(dest) {
            Ok(meta) => temp.as_file().set_permissions(meta.permissions())?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {},
            Err(e) => return Err(e.into()),
        }
        checkpoint(WriteStage::Written)?;
        temp.as_file().sync_all()?;
        checkpoint(WriteStage::Synced)?;
        temp.persist(dest).map_err(|e| e.error)?;

        info!(
            path = %dest.display(),
            bytes = bytes.len(),
            entries = model.package.entries().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "wrote package"
        );
        Ok(())
    }

    /// Serialize into memory.
    pub fn to_bytes(model: &DocumentModel) -> Result<Vec<u8>> {
        let package = &model.package;
        let manifest_path = package.manifest_path().ok_or(FormatError::MissingManifest)?;
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let mimetype_options = match package.entries().iter().find(|e| e.role == PartRole::Mimetype) {
            Some(entry) => with_time(stored, entry),
            None => stored,
        };
        zip.start_file(MIMETYPE_PATH, mimetype_options)?;
        zip.write_all(MIMETYPE.as_bytes())?;

        let manifest = package.entry(manifest_path).ok_or(FormatError::MissingManifest)?;
        copy_entry(&mut zip, manifest)?;

        if let Some(header) = package.header() {
            let styles = model.styles();
            if styles.has_derived() {
                let text = decode_part(&header.name, &header.data)?;
                let spliced = splice_header(&header.name, text, styles)?;
                zip.start_file(header.name.as_str(), options_for(header))?;
                zip.write_all(spliced.as_bytes())?;
                debug!(
                    part = %header.name,
                    chars = styles.derived_chars().count(),
                    paras = styles.derived_paras().count(),
                    "spliced derived styles"
                );
            } else {
                copy_entry(&mut zip, header)?;
            }
        }

        for (index, section) in model.sections().iter().enumerate() {
            let source = package
                .entries()
                .iter()
                .find(|e| e.role == PartRole::Section(index));
            let options = source
                .map(options_for)
                .unwrap_or_else(|| SimpleFileOptions::default().compression_method(CompressionMethod::Deflated));
            zip.start_file(section.part(), options)?;
            zip.write_all(write_section(section).as_bytes())?;
        }

        for entry in package.opaque_entries() {
            if entry.is_dir {
                zip.add_directory(entry.name.trim_end_matches('/'), with_time(SimpleFileOptions::default(), entry))?;
            } else {
                copy_entry(&mut zip, entry)?;
            }
        }

        Ok(zip.finish()?.into_inner())
    }
}

fn with_time(options: SimpleFileOptions, entry: &Entry) -> SimpleFileOptions {
    match entry.modified {
        Some(time) => options.last_modified_time(time),
        None => options,
    }
}

/// Stored entries stay stored; everything else is deflated.
fn options_for(entry: &Entry) -> SimpleFileOptions {
    let method = if entry.compression == CompressionMethod::Stored {
        CompressionMethod::Stored
    } else {
        CompressionMethod::Deflated
    };
    with_time(SimpleFileOptions::default().compression_method(method), entry)
}

fn copy_entry(zip: &mut ZipWriter<Cursor<Vec<u8>>>, entry: &Entry) -> Result<()> {
    zip.start_file(entry.name.as_str(), options_for(entry))?;
    zip.write_all(&entry.data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use chrono::Utc;
    use zip::ZipArchive;

    use super::*;
    use crate::config::DocumentDefaults;
    use crate::document::{Anchor, FontSpec, Range};
    use crate::hwpx::reader::{PackageReader, assemble};
    use crate::hwpx::template;

    fn new_model() -> DocumentModel {
        assemble(template::entries(&DocumentDefaults::default(), Utc::now()))
            .unwrap()
            .0
    }

    fn names(bytes: &[u8]) -> Vec<String> {
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        archive.file_names().map(str::to_string).collect::<Vec<_>>()
    }

    #[test]
    fn test_entry_order_and_mimetype() {
        let bytes = PackageWriter::to_bytes(&new_model()).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let order: Vec<_> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(
            order[..4],
            ["mimetype", "Contents/content.hpf", "Contents/header.xml", "Contents/section0.xml"]
        );
        let mut first = archive.by_index(0).unwrap();
        assert_eq!(first.compression(), CompressionMethod::Stored);
        let mut content = String::new();
        first.read_to_string(&mut content).unwrap();
        assert_eq!(content, MIMETYPE);
        assert_eq!(names(&bytes).len(), 8);
    }

    #[test]
    fn test_round_trip_keeps_shape() {
        let mut model = new_model();
        model.insert_text(&Anchor::DocumentEnd, "둘째 줄").unwrap();
        let table = model.create_table(2, 2).unwrap();
        model.set_cell_text(table, 1, 1, "x").unwrap();

        let bytes = PackageWriter::to_bytes(&model).unwrap();
        let (again, diagnostics) = PackageReader::from_bytes(&bytes).unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(again.shape(), model.shape());
        assert_eq!(again.cell_text(table, 1, 1).unwrap(), "x");
    }

    #[test]
    fn test_derived_styles_are_spliced() {
        let mut model = new_model();
        model.insert_text(&Anchor::DocumentEnd, "bold").unwrap();
        model
            .apply_font(&Range::Document, &FontSpec::default().bold(true))
            .unwrap();
        let bytes = PackageWriter::to_bytes(&model).unwrap();
        let (again, _) = PackageReader::from_bytes(&bytes).unwrap();
        let style = again.paragraphs()[0].runs()[0].style;
        assert!(again.styles().char_style(style).unwrap().bold);
    }

    #[test]
    fn test_opaque_entries_are_byte_identical() {
        let mut model = new_model();
        model.package.entries.push(Entry {
            name: "BinData/image1.png".to_string(),
            role: PartRole::Opaque,
            data: vec![0x89, b'P', b'N', b'G', 0, 1, 2, 3],
            compression: CompressionMethod::Stored,
            modified: None,
            is_dir: false,
        });
        let bytes = PackageWriter::to_bytes(&model).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let mut file = archive.by_name("BinData/image1.png").unwrap();
        assert_eq!(file.compression(), CompressionMethod::Stored);
        let mut data = Vec::new();
        file.read_to_end(&mut data).unwrap();
        assert_eq!(data, [0x89, b'P', b'N', b'G', 0, 1, 2, 3]);
    }

    #[test]
    fn test_failed_write_leaves_destination_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("doc.hwpx");
        std::fs::write(&dest, b"previous").unwrap();

        for stage in [WriteStage::Written, WriteStage::Synced] {
            let err = PackageWriter::write_with_checkpoint(&new_model(), &dest, |s| {
                if s == stage {
                    Err(io::Error::other("simulated crash"))
                } else {
                    Ok(())
                }
            })
            .unwrap_err();
            assert_eq!(err.kind(), crate::common::ErrorKind::Io);
            assert_eq!(std::fs::read(&dest).unwrap(), b"previous");
            let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
            assert_eq!(leftovers, 1);
        }

        PackageWriter::write(&new_model(), &dest).unwrap();
        assert!(PackageReader::read(&dest).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_overwrite_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("shared.hwpx");
        std::fs::write(&dest, b"previous").unwrap();
        std::fs::set_permissions(&dest, std::fs::Permissions::from_mode(0o644)).unwrap();

        PackageWriter::write(&new_model(), &dest).unwrap();
        let mode = std::fs::metadata(&dest).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
        assert!(PackageReader::read(&dest).is_ok());
    }
}
