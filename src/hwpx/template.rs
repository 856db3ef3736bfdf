//! Parts of a new, empty document.
//!
//! The generated package is the smallest one Hancom Office opens without
//! complaint: one A4 section, one font per script, one character and one
//! paragraph style. It goes through the same assembly path as a package read
//! from disk, so a new document and an opened one behave the same.

use chrono::{DateTime, Utc};

use super::constants::{
    CONTAINER_PATH, DEFAULT_MANIFEST_PATH, MANIFEST_MEDIA_TYPE, MIMETYPE, MIMETYPE_PATH, ns,
};
use super::package::{Entry, PartRole};
use crate::common::xml::escape_xml;
use crate::config::DocumentDefaults;

const HEADER_PATH: &str = "Contents/header.xml";
const SECTION_PATH: &str = "Contents/section0.xml";

/// Archive entries of a new document, in the order Hancom writes them.
pub(crate) fn entries(defaults: &DocumentDefaults, now: DateTime<Utc>) -> Vec<Entry> {
    vec![
        Entry::new(MIMETYPE_PATH, PartRole::Mimetype, MIMETYPE.as_bytes().to_vec()),
        Entry::new("version.xml", PartRole::Opaque, version().into_bytes()),
        Entry::new(HEADER_PATH, PartRole::Opaque, header(defaults).into_bytes()),
        Entry::new(SECTION_PATH, PartRole::Opaque, section().into_bytes()),
        Entry::new("settings.xml", PartRole::Opaque, settings().into_bytes()),
        Entry::new(CONTAINER_PATH, PartRole::Opaque, container().into_bytes()),
        Entry::new("META-INF/manifest.xml", PartRole::Opaque, odf_manifest().into_bytes()),
        Entry::new(DEFAULT_MANIFEST_PATH, PartRole::Opaque, content_hpf(now).into_bytes()),
    ]
}

const DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

fn version() -> String {
    format!(
        r#"{DECL}<hv:HCFVersion xmlns:hv="{}" tagetApplication="WORDPROCESSOR" major="5" minor="1" micro="1" buildNumber="0" os="1" xmlVersion="1.4" application="hwpkit" appVersion="{}"/>"#,
        ns::VERSION,
        env!("CARGO_PKG_VERSION"),
    )
}

fn container() -> String {
    format!(
        r#"{DECL}<ocf:container xmlns:ocf="{}" xmlns:hpf="{}"><ocf:rootfiles><ocf:rootfile full-path="{DEFAULT_MANIFEST_PATH}" media-type="{MANIFEST_MEDIA_TYPE}"/></ocf:rootfiles></ocf:container>"#,
        ns::OCF,
        ns::HPF,
    )
}

fn odf_manifest() -> String {
    format!(r#"{DECL}<odf:manifest xmlns:odf="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0"/>"#)
}

fn content_hpf(now: DateTime<Utc>) -> String {
    let stamp = now.format("%Y-%m-%dT%H:%M:%SZ");
    format!(
        concat!(
            r#"{decl}<opf:package xmlns:opf="{opf}" xmlns:dc="{dc}" xmlns:hpf="{hpf}" version="" unique-identifier="" id="">"#,
            r#"<opf:metadata><opf:title/><opf:language>ko</opf:language>"#,
            r#"<opf:meta name="creator" content="text"/>"#,
            r#"<opf:meta name="CreatedDate" content="text">{stamp}</opf:meta>"#,
            r#"<opf:meta name="ModifiedDate" content="text">{stamp}</opf:meta>"#,
            r#"</opf:metadata><opf:manifest>"#,
            r#"<opf:item id="header" href="{header}" media-type="application/xml"/>"#,
            r#"<opf:item id="section0" href="{section}" media-type="application/xml"/>"#,
            r#"<opf:item id="settings" href="settings.xml" media-type="application/xml"/>"#,
            r#"</opf:manifest><opf:spine>"#,
            r#"<opf:itemref idref="header" linear="yes"/><opf:itemref idref="section0" linear="yes"/>"#,
            r#"</opf:spine></opf:package>"#,
        ),
        decl = DECL,
        opf = ns::OPF,
        dc = ns::DC,
        hpf = ns::HPF,
        stamp = stamp,
        header = HEADER_PATH,
        section = SECTION_PATH,
    )
}

fn settings() -> String {
    format!(
        r#"{DECL}<ha:HWPApplicationSetting xmlns:ha="{}"><ha:CaretPosition listIDRef="0" paraIDRef="0" pos="0"/></ha:HWPApplicationSetting>"#,
        ns::APP,
    )
}

fn header(defaults: &DocumentDefaults) -> String {
    let face = escape_xml(&defaults.font_family);
    let mut fontfaces = String::new();
    for lang in ["HANGUL", "LATIN", "HANJA", "JAPANESE", "OTHER", "SYMBOL", "USER"] {
        fontfaces.push_str(&format!(
            r#"<hh:fontface lang="{lang}" fontCnt="1"><hh:font id="0" face="{face}" type="TTF" isEmbedded="0"/></hh:fontface>"#
        ));
    }
    let height = (defaults.font_size * 100.0).round() as u32;
    format!(
        concat!(
            r#"{decl}<hh:head xmlns:hh="{head}" xmlns:hc="{core}" version="1.4" secCnt="1">"#,
            r#"<hh:beginNum page="1" footnote="1" endnote="1" pic="1" tbl="1" equation="1"/>"#,
            r#"<hh:refList>"#,
            r#"<hh:fontfaces itemCnt="7">{fontfaces}</hh:fontfaces>"#,
            r#"<hh:borderFills itemCnt="2">"#,
            r#"<hh:borderFill id="1" threeD="0" shadow="0" centerLine="NONE" breakCellSeparateLine="0">"#,
            r#"<hh:slash type="NONE" Crooked="0" isCounter="0"/><hh:backSlash type="NONE" Crooked="0" isCounter="0"/>"#,
            r##"<hh:leftBorder type="SOLID" width="0.12 mm" color="#000000"/>"##,
            r##"<hh:rightBorder type="SOLID" width="0.12 mm" color="#000000"/>"##,
            r##"<hh:topBorder type="SOLID" width="0.12 mm" color="#000000"/>"##,
            r##"<hh:bottomBorder type="SOLID" width="0.12 mm" color="#000000"/>"##,
            r##"<hh:diagonal type="SOLID" width="0.1 mm" color="#000000"/>"##,
            r#"</hh:borderFill>"#,
            r#"<hh:borderFill id="2" threeD="0" shadow="0" centerLine="NONE" breakCellSeparateLine="0">"#,
            r#"<hh:slash type="NONE" Crooked="0" isCounter="0"/><hh:backSlash type="NONE" Crooked="0" isCounter="0"/>"#,
            r##"<hh:leftBorder type="NONE" width="0.1 mm" color="#000000"/>"##,
            r##"<hh:rightBorder type="NONE" width="0.1 mm" color="#000000"/>"##,
            r##"<hh:topBorder type="NONE" width="0.1 mm" color="#000000"/>"##,
            r##"<hh:bottomBorder type="NONE" width="0.1 mm" color="#000000"/>"##,
            r##"<hh:diagonal type="SOLID" width="0.1 mm" color="#000000"/>"##,
            r#"</hh:borderFill>"#,
            r#"</hh:borderFills>"#,
            r#"<hh:charProperties itemCnt="1">"#,
            r##"<hh:charPr id="0" height="{height}" textColor="#000000" shadeColor="none" useFontSpace="0" useKerning="0" symMark="NONE" borderFillIDRef="2">"##,
            r#"<hh:fontRef hangul="0" latin="0" hanja="0" japanese="0" other="0" symbol="0" user="0"/>"#,
            r#"<hh:ratio hangul="100" latin="100" hanja="100" japanese="100" other="100" symbol="100" user="100"/>"#,
            r#"<hh:spacing hangul="0" latin="0" hanja="0" japanese="0" other="0" symbol="0" user="0"/>"#,
            r#"<hh:relSz hangul="100" latin="100" hanja="100" japanese="100" other="100" symbol="100" user="100"/>"#,
            r#"<hh:offset hangul="0" latin="0" hanja="0" japanese="0" other="0" symbol="0" user="0"/>"#,
            r##"<hh:underline type="NONE" shape="SOLID" color="#000000"/>"##,
            r##"<hh:strikeout shape="NONE" color="#000000"/>"##,
            r#"<hh:outline type="NONE"/>"#,
            r##"<hh:shadow type="NONE" color="#B2B2B2" offsetX="10" offsetY="10"/>"##,
            r#"</hh:charPr>"#,
            r#"</hh:charProperties>"#,
            r#"<hh:tabProperties itemCnt="1"><hh:tabPr id="0" autoTabLeft="0" autoTabRight="0"/></hh:tabProperties>"#,
            r#"<hh:paraProperties itemCnt="1">"#,
            r#"<hh:paraPr id="0" tabPrIDRef="0" condense="0" fontLineHeight="0" snapToGrid="1" suppressLineNumbers="0" checked="0">"#,
            r#"<hh:align horizontal="{align}" vertical="BASELINE"/>"#,
            r#"<hh:heading type="NONE" idRef="0" level="0"/>"#,
            r#"<hh:breakSetting breakLatinWord="KEEP_WORD" breakNonLatinWord="KEEP_WORD" widowOrphan="0" keepWithNext="0" keepLines="0" pageBreakBefore="0" lineWrap="BREAK"/>"#,
            r#"<hh:autoSpacing eAsianEng="0" eAsianNum="0"/>"#,
            r#"<hh:margin><hc:intent value="0" unit="HWPUNIT"/><hc:left value="0" unit="HWPUNIT"/><hc:right value="0" unit="HWPUNIT"/><hc:prev value="0" unit="HWPUNIT"/><hc:next value="0" unit="HWPUNIT"/></hh:margin>"#,
            r#"<hh:lineSpacing type="PERCENT" value="160" unit="HWPUNIT"/>"#,
            r#"<hh:border borderFillIDRef="2" offsetLeft="0" offsetRight="0" offsetTop="0" offsetBottom="0" connect="0" ignoreMargin="0"/>"#,
            r#"</hh:paraPr>"#,
            r#"</hh:paraProperties>"#,
            r#"<hh:styles itemCnt="1">"#,
            r#"<hh:style id="0" type="PARA" name="바탕글" engName="Normal" paraPrIDRef="0" charPrIDRef="0" nextStyleIDRef="0" langID="1042" lockForm="0"/>"#,
            r#"</hh:styles>"#,
            r#"</hh:refList>"#,
            r#"<hh:compatibleDocument targetProgram="HWP201X"><hh:layoutCompatibility/></hh:compatibleDocument>"#,
            r#"<hh:docOption><hh:linkinfo path="" pageInherit="0" footnoteInherit="0"/></hh:docOption>"#,
            r#"<hh:trackchageConfig flags="56"/>"#,
            r#"</hh:head>"#,
        ),
        decl = DECL,
        head = ns::HEAD,
        core = ns::CORE,
        fontfaces = fontfaces,
        height = height,
        align = defaults.alignment.to_hwpx(),
    )
}

fn section() -> String {
    format!(
        concat!(
            r#"{decl}<hs:sec xmlns:hp="{hp}" xmlns:hs="{hs}" xmlns:hc="{hc}" xmlns:hh="{hh}">"#,
            r#"<hp:p id="0" paraPrIDRef="0" styleIDRef="0" pageBreak="0" columnBreak="0" merged="0">"#,
            r#"<hp:run charPrIDRef="0">"#,
            r#"<hp:secPr id="" textDirection="HORIZONTAL" spaceColumns="1134" tabStop="8000" tabStopVal="4000" tabStopUnit="HWPUNIT" outlineShapeIDRef="1" memoShapeIDRef="0" textVerticalWidthHead="0" masterPageCnt="0">"#,
            r#"<hp:grid lineGrid="0" charGrid="0" wonggojiFormat="0"/>"#,
            r#"<hp:startNum pageStartsOn="BOTH" page="0" pic="0" tbl="0" equation="0"/>"#,
            r#"<hp:visibility hideFirstHeader="0" hideFirstFooter="0" hideFirstMasterPage="0" border="SHOW_ALL" fill="SHOW_ALL" hideFirstPageNum="0" hideFirstEmptyLine="0" showLineNumber="0"/>"#,
            r#"<hp:pagePr landscape="WIDELY" width="59528" height="84188" gutterType="LEFT_ONLY">"#,
            r#"<hp:margin header="4252" footer="4252" gutter="0" left="8504" right="8504" top="5668" bottom="4252"/>"#,
            r#"</hp:pagePr>"#,
            r#"</hp:secPr>"#,
            r#"<hp:ctrl><hp:colPr id="" type="NEWSPAPER" layout="LEFT" colCount="1" sameSz="1" sameGap="0"/></hp:ctrl>"#,
            r#"<hp:t/>"#,
            r#"</hp:run>"#,
            r#"</hp:p>"#,
            r#"</hs:sec>"#,
        ),
        decl = DECL,
        hp = ns::PARAGRAPH,
        hs = ns::SECTION,
        hc = ns::CORE,
        hh = ns::HEAD,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Alignment, CharStyleId, ParaStyleId};
    use crate::hwpx::header::parse_header;
    use crate::hwpx::manifest::{Manifest, parse_container};
    use crate::hwpx::section::parse_section;

    fn text_of<'a>(entries: &'a [Entry], name: &str) -> &'a str {
        let entry = entries.iter().find(|e| e.name == name).unwrap();
        std::str::from_utf8(&entry.data).unwrap()
    }

    #[test]
    fn test_parts_parse() {
        let defaults = DocumentDefaults {
            font_family: "Noto & Sans".to_string(),
            font_size: 11.0,
            alignment: Alignment::Left,
        };
        let entries = entries(&defaults, Utc::now());
        assert_eq!(entries[0].name, MIMETYPE_PATH);

        let manifest = parse_container(CONTAINER_PATH, text_of(&entries, CONTAINER_PATH))
            .unwrap()
            .unwrap();
        assert_eq!(manifest, DEFAULT_MANIFEST_PATH);
        let m = Manifest::parse(DEFAULT_MANIFEST_PATH, text_of(&entries, DEFAULT_MANIFEST_PATH)).unwrap();
        assert_eq!(m.sections().len(), 1);
        assert!(m.metadata.created.is_some());

        let styles = parse_header(HEADER_PATH, text_of(&entries, HEADER_PATH)).unwrap();
        let base = styles.char_style(CharStyleId(0)).unwrap();
        assert_eq!(base.family.as_deref(), Some("Noto & Sans"));
        assert_eq!(base.height, 1100);
        let para = styles.para_style(ParaStyleId(0)).unwrap();
        assert_eq!(para.alignment, Some(Alignment::Left));

        let section = parse_section(SECTION_PATH, text_of(&entries, SECTION_PATH)).unwrap();
        assert_eq!(section.blocks().len(), 1);
        assert_eq!(section.blocks()[0].text(), "");
    }
}
