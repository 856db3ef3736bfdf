//! HWPX package reading.

use std::fmt;
use std::path::Path;
use std::time::Instant;

use tracing::{debug, warn};

use super::constants::{CONTAINER_PATH, DEFAULT_MANIFEST_PATH, MIMETYPE, MIMETYPE_PATH};
use super::header::parse_header;
use super::manifest::{Manifest, parse_container};
use super::package::{Entry, PackageState, PartRole, read_archive};
use super::path::PartPath;
use super::section::{assign_ids, parse_section};
use super::xml::decode_part;
use crate::common::{FileFormat, FormatError, Result, detect_file_format_from_bytes};
use crate::document::{DocumentModel, StyleCatalog};

/// A non-fatal problem found while reading a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The part the problem was found in.
    pub part: String,
    pub message: String,
}

impl Diagnostic {
    fn new(part: impl Into<String>, message: impl Into<String>) -> Self {
        let diagnostic = Self {
            part: part.into(),
            message: message.into(),
        };
        warn!(part = %diagnostic.part, message = %diagnostic.message, "package diagnostic");
        diagnostic
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.part, self.message)
    }
}

/// Reads HWPX packages into a [`DocumentModel`].
pub struct PackageReader;

impl PackageReader {
    /// Read a package file. The model remembers `path` as its save target.
    pub fn read(path: impl AsRef<Path>) -> Result<(DocumentModel, Vec<Diagnostic>)> {
        let path = path.as_ref();
        let started = Instant::now();
        let bytes = std::fs::read(path)?;
        let (mut model, diagnostics) = Self::from_bytes(&bytes)?;
        model.set_path(path.to_path_buf());
        debug!(
            path = %path.display(),
            bytes = bytes.len(),
            sections = model.sections().len(),
            diagnostics = diagnostics.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "read package"
        );
        Ok((model, diagnostics))
    }

    /// Read a package held in memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<(DocumentModel, Vec<Diagnostic>)> {
        match detect_file_format_from_bytes(bytes) {
            Some(FileFormat::Hwp) => return Err(FormatError::LegacyBinary.into()),
            Some(FileFormat::Hwpx) => {},
            None => return Err(FormatError::NotPackage("no ZIP signature".to_string()).into()),
        }
        assemble(read_archive(bytes)?)
    }
}

/// Build a model from the raw entries of a package.
pub(crate) fn assemble(mut entries: Vec<Entry>) -> Result<(DocumentModel, Vec<Diagnostic>)> {
    let mut diagnostics = Vec::new();

    if let Some(entry) = entries.iter_mut().find(|e| e.name == MIMETYPE_PATH) {
        entry.role = PartRole::Mimetype;
        if entry.data.trim_ascii() != MIMETYPE.as_bytes() {
            diagnostics.push(Diagnostic::new(
                MIMETYPE_PATH,
                format!("unexpected mimetype '{}'", String::from_utf8_lossy(&entry.data)),
            ));
        }
    } else {
        diagnostics.push(Diagnostic::new(MIMETYPE_PATH, "missing; it will be written on save"));
    }

    let manifest_path = locate_manifest(&entries, &mut diagnostics);
    let Some(manifest_path) = manifest_path else {
        return Err(FormatError::MissingManifest.into());
    };
    let manifest = {
        let entry = find(&entries, &manifest_path).ok_or(FormatError::MissingManifest)?;
        let text = decode_part(&manifest_path, &entry.data)?;
        Manifest::parse(&manifest_path, text)?
    };
    if let Some(entry) = find_mut(&mut entries, &manifest_path) {
        entry.role = PartRole::Manifest;
    }
    let manifest_dir = PartPath::new(&manifest_path)?.dir().to_string();

    let styles = match manifest.header() {
        Some(item) => {
            let name = resolve(&entries, &manifest_dir, &item.href)?;
            match find(&entries, &name).map(|e| read_header(&name, &e.data)) {
                Some(Ok(styles)) => {
                    if let Some(entry) = find_mut(&mut entries, &name) {
                        entry.role = PartRole::Header;
                    }
                    styles
                },
                Some(Err(e)) => {
                    diagnostics.push(Diagnostic::new(&name, format!("{e}; styles are read-only")));
                    StyleCatalog::unavailable(e.to_string())
                },
                None => {
                    diagnostics.push(Diagnostic::new(&name, "header part is missing; styles are read-only"));
                    StyleCatalog::unavailable(format!("'{name}' is missing"))
                },
            }
        },
        None => {
            diagnostics.push(Diagnostic::new(&manifest_path, "no header item; styles are read-only"));
            StyleCatalog::unavailable("the package has no header part")
        },
    };

    let items = manifest.sections();
    if items.is_empty() {
        return Err(FormatError::malformed(&manifest_path, "the spine lists no section").into());
    }
    let mut sections = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let name = resolve(&entries, &manifest_dir, &item.href)?;
        let entry = find_mut(&mut entries, &name).ok_or_else(|| FormatError::MissingPart(name.clone()))?;
        let text = decode_part(&name, &entry.data)?;
        sections.push(parse_section(&name, text)?);
        entry.role = PartRole::Section(index);
        entry.data = Vec::new();
    }
    let next_id = assign_ids(&mut sections);

    debug!(
        entries = entries.len(),
        sections = sections.len(),
        manifest = %manifest_path,
        "assembled package"
    );
    let package = PackageState {
        entries,
        manifest: Some(manifest_path),
    };
    let model = DocumentModel::from_parts(sections, styles, manifest.metadata, package, next_id);
    Ok((model, diagnostics))
}

fn read_header(name: &str, data: &[u8]) -> std::result::Result<StyleCatalog, FormatError> {
    parse_header(name, decode_part(name, data)?)
}

/// The manifest path named by the container, or the default one.
fn locate_manifest(entries: &[Entry], diagnostics: &mut Vec<Diagnostic>) -> Option<String> {
    if let Some(entry) = find(entries, CONTAINER_PATH) {
        let named = decode_part(CONTAINER_PATH, &entry.data)
            .and_then(|text| parse_container(CONTAINER_PATH, text));
        match named {
            Ok(Some(path)) if find(entries, &path).is_some() => return Some(path),
            Ok(Some(path)) => diagnostics.push(Diagnostic::new(
                CONTAINER_PATH,
                format!("rootfile '{path}' is not in the archive"),
            )),
            Ok(None) => diagnostics.push(Diagnostic::new(CONTAINER_PATH, "no rootfile")),
            Err(e) => diagnostics.push(Diagnostic::new(CONTAINER_PATH, e.to_string())),
        }
    }
    find(entries, DEFAULT_MANIFEST_PATH).map(|_| DEFAULT_MANIFEST_PATH.to_string())
}

/// Archive name of a manifest href.
///
/// Hancom writes hrefs relative to the archive root; other producers write
/// them relative to the manifest. An href naming an existing entry is taken
/// as is. One matching neither resolves root-relative, so a missing part is
/// reported under the name the manifest gave.
fn resolve(entries: &[Entry], manifest_dir: &str, href: &str) -> Result<String> {
    let rooted = PartPath::new(href).ok();
    if let Some(path) = &rooted
        && find(entries, path.as_str()).is_some()
    {
        return Ok(path.as_str().to_string());
    }
    let relative = PartPath::resolve(manifest_dir, href)?;
    if find(entries, relative.as_str()).is_some() {
        return Ok(relative.as_str().to_string());
    }
    Ok(rooted.unwrap_or(relative).as_str().to_string())
}

fn find<'a>(entries: &'a [Entry], name: &str) -> Option<&'a Entry> {
    entries.iter().find(|e| !e.is_dir && e.name == name)
}

fn find_mut<'a>(entries: &'a mut [Entry], name: &str) -> Option<&'a mut Entry> {
    entries.iter_mut().find(|e| !e.is_dir && e.name == name)
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use zip::CompressionMethod;
    use zip::write::{SimpleFileOptions, ZipWriter};

    use super::*;
    use crate::common::Error;
    use crate::common::detection::OLE2_SIGNATURE;
    use crate::document::CharStyleId;

    const HPF: &str = r#"<opf:package xmlns:opf="http://www.idpf.org/2007/opf/"><opf:metadata><opf:title>T</opf:title></opf:metadata><opf:manifest><opf:item id="header" href="Contents/header.xml" media-type="application/xml"/><opf:item id="section0" href="Contents/section0.xml" media-type="application/xml"/></opf:manifest><opf:spine><opf:itemref idref="header"/><opf:itemref idref="section0"/></opf:spine></opf:package>"#;
    const HEADER: &str = r#"<hh:head xmlns:hh="http://www.hancom.co.kr/hwpml/2011/head"><hh:refList><hh:fontfaces itemCnt="1"><hh:fontface lang="HANGUL" fontCnt="1"><hh:font id="0" face="Batang"/></hh:fontface></hh:fontfaces><hh:charProperties itemCnt="1"><hh:charPr id="0" height="1000"><hh:fontRef hangul="0"/></hh:charPr></hh:charProperties><hh:paraProperties itemCnt="1"><hh:paraPr id="0"><hh:align horizontal="LEFT"/></hh:paraPr></hh:paraProperties></hh:refList></hh:head>"#;
    const SECTION: &str = r#"<hs:sec xmlns:hs="http://www.hancom.co.kr/hwpml/2011/section" xmlns:hp="http://www.hancom.co.kr/hwpml/2011/paragraph"><hp:p id="5" paraPrIDRef="0"><hp:run charPrIDRef="0"><hp:t>Hi</hp:t></hp:run></hp:p></hs:sec>"#;

    fn package(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in parts {
            let method = if *name == MIMETYPE_PATH {
                CompressionMethod::Stored
            } else {
                CompressionMethod::Deflated
            };
            zip.start_file(*name, SimpleFileOptions::default().compression_method(method))
                .unwrap();
            zip.write_all(data.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    fn standard(header: &str) -> Vec<u8> {
        package(&[
            (MIMETYPE_PATH, MIMETYPE),
            (DEFAULT_MANIFEST_PATH, HPF),
            ("Contents/header.xml", header),
            ("Contents/section0.xml", SECTION),
            ("BinData/image1.bin", "\u{1}\u{2}"),
        ])
    }

    #[test]
    fn test_reads_minimal_package() {
        let (model, diagnostics) = PackageReader::from_bytes(&standard(HEADER)).unwrap();
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(model.sections().len(), 1);
        assert_eq!(model.sections()[0].blocks()[0].text(), "Hi");
        assert_eq!(model.metadata().title.as_deref(), Some("T"));
        assert!(model.styles().is_editable());
        assert_eq!(
            model.styles().char_style(CharStyleId(0)).unwrap().family.as_deref(),
            Some("Batang")
        );
        let roles: Vec<_> = model.package.entries().iter().map(|e| e.role).collect();
        assert_eq!(
            roles,
            [
                PartRole::Mimetype,
                PartRole::Manifest,
                PartRole::Header,
                PartRole::Section(0),
                PartRole::Opaque
            ]
        );
    }

    #[test]
    fn test_broken_header_is_a_diagnostic() {
        let (model, diagnostics) = PackageReader::from_bytes(&standard("<hh:head><hh:refList></hh:head>")).unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].part, "Contents/header.xml");
        assert!(!model.styles().is_editable());
        assert_eq!(model.package.header().map(|e| e.name.as_str()), None);
        assert!(model.package.opaque_entries().any(|e| e.name == "Contents/header.xml"));
    }

    #[test]
    fn test_missing_manifest() {
        let bytes = package(&[(MIMETYPE_PATH, MIMETYPE), ("Contents/section0.xml", SECTION)]);
        let err = PackageReader::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::MissingManifest)));
    }

    #[test]
    fn test_missing_section_part() {
        let bytes = package(&[(MIMETYPE_PATH, MIMETYPE), (DEFAULT_MANIFEST_PATH, HPF), ("Contents/header.xml", HEADER)]);
        let err = PackageReader::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::MissingPart(ref p)) if p == "Contents/section0.xml"));
    }

    #[test]
    fn test_malformed_section_names_the_part() {
        let bytes = package(&[
            (MIMETYPE_PATH, MIMETYPE),
            (DEFAULT_MANIFEST_PATH, HPF),
            ("Contents/header.xml", HEADER),
            ("Contents/section0.xml", "<hs:sec><hp:p></hs:sec>"),
        ]);
        let err = PackageReader::from_bytes(&bytes).unwrap_err();
        assert!(matches!(
            err,
            Error::Format(FormatError::MalformedXml { ref part, .. }) if part == "Contents/section0.xml"
        ));
    }

    #[test]
    fn test_container_names_manifest() {
        let container = r#"<ocf:container><ocf:rootfiles><ocf:rootfile full-path="Other/pkg.hpf" media-type="application/hwpml-package+xml"/></ocf:rootfiles></ocf:container>"#;
        // Hrefs relative to the manifest directory.
        let hpf = HPF.replace("Contents/", "");
        let bytes = package(&[
            (MIMETYPE_PATH, MIMETYPE),
            (CONTAINER_PATH, container),
            ("Other/pkg.hpf", &hpf),
            ("Other/header.xml", HEADER),
            ("Other/section0.xml", SECTION),
        ]);
        let (model, diagnostics) = PackageReader::from_bytes(&bytes).unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(model.package.manifest_path(), Some("Other/pkg.hpf"));
        assert_eq!(model.sections()[0].part(), "Other/section0.xml");
    }

    #[test]
    fn test_legacy_and_garbage() {
        let mut ole = OLE2_SIGNATURE.to_vec();
        ole.extend_from_slice(&[0; 64]);
        let err = PackageReader::from_bytes(&ole).unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::LegacyBinary)));

        let err = PackageReader::from_bytes(b"plain text").unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::NotPackage(_))));
    }

    #[test]
    fn test_read_remembers_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.hwpx");
        std::fs::write(&path, standard(HEADER)).unwrap();
        let (model, _) = PackageReader::read(&path).unwrap();
        assert_eq!(model.path(), Some(path.as_path()));
        assert_eq!(model.sections()[0].blocks()[0].id().0, 5);
    }
}
