//! Fixed names of the HWPX (OWPML) package format.

/// Content of the `mimetype` entry.
pub const MIMETYPE: &str = "application/hwp+zip";
/// Name of the entry holding [`MIMETYPE`]; must be first and stored.
pub const MIMETYPE_PATH: &str = "mimetype";
/// OCF container pointing at the manifest.
pub const CONTAINER_PATH: &str = "META-INF/container.xml";
/// Manifest location used when the container does not name one.
pub const DEFAULT_MANIFEST_PATH: &str = "Contents/content.hpf";
/// Media type of the manifest rootfile in the container.
pub const MANIFEST_MEDIA_TYPE: &str = "application/hwpml-package+xml";
/// Manifest item id of the style header.
pub const HEADER_ITEM_ID: &str = "header";

pub mod ns {
    //! Namespace URIs declared by generated parts.
    pub const PARAGRAPH: &str = "http://www.hancom.co.kr/hwpml/2011/paragraph";
    pub const SECTION: &str = "http://www.hancom.co.kr/hwpml/2011/section";
    pub const CORE: &str = "http://www.hancom.co.kr/hwpml/2011/core";
    pub const HEAD: &str = "http://www.hancom.co.kr/hwpml/2011/head";
    pub const APP: &str = "http://www.hancom.co.kr/hwpml/2011/app";
    pub const VERSION: &str = "http://www.hancom.co.kr/hwpml/2011/version";
    pub const HPF: &str = "http://www.hancom.co.kr/schema/2011/hpf";
    pub const OPF: &str = "http://www.idpf.org/2007/opf/";
    pub const DC: &str = "http://purl.org/dc/elements/1.1/";
    pub const OCF: &str = "urn:oasis:names:tc:opendocument:xmlns:container";
}

/// Local names of the section elements the model maps.
pub mod tag {
    pub const PARAGRAPH: &[u8] = b"p";
    pub const RUN: &[u8] = b"run";
    pub const TEXT: &[u8] = b"t";
    pub const TABLE: &[u8] = b"tbl";
    pub const ROW: &[u8] = b"tr";
    pub const CELL: &[u8] = b"tc";
    pub const SUB_LIST: &[u8] = b"subList";
    pub const CELL_ADDR: &[u8] = b"cellAddr";
    pub const CELL_SPAN: &[u8] = b"cellSpan";
    pub const TAB: &[u8] = b"tab";
    pub const LINE_BREAK: &[u8] = b"lineBreak";
    pub const NB_SPACE: &[u8] = b"nbSpace";
    pub const FW_SPACE: &[u8] = b"fwSpace";
    pub const HYPHEN: &[u8] = b"hyphen";
}

/// Default text width of an A4 page with standard margins, in HWPUNIT.
pub const DEFAULT_TEXT_WIDTH: u32 = 42_520;
/// Default height of a generated table row, in HWPUNIT.
pub const DEFAULT_ROW_HEIGHT: u32 = 1_000;
