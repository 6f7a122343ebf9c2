#![allow(dead_code)]

use std::io::{Cursor, Write};

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, StringFormat};

const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

// ── DOCX ──────────────────────────────────────────────────────────────────────

pub fn run(text: &str, font: Option<&str>, size_pt: Option<f64>) -> String {
    let mut rpr = String::new();
    if let Some(font) = font {
        rpr.push_str(&format!(r#"<w:rFonts w:ascii="{font}" w:hAnsi="{font}"/>"#));
    }
    if let Some(size) = size_pt {
        rpr.push_str(&format!(r#"<w:sz w:val="{}"/>"#, (size * 2.0).round() as i64));
    }
    let rpr = if rpr.is_empty() {
        String::new()
    } else {
        format!("<w:rPr>{rpr}</w:rPr>")
    };
    format!(r#"<w:r>{rpr}<w:t xml:space="preserve">{text}</w:t></w:r>"#)
}

pub fn paragraph(style: Option<&str>, line_spacing: Option<f64>, runs: &[String]) -> String {
    let mut ppr = String::new();
    if let Some(style) = style {
        ppr.push_str(&format!(r#"<w:pStyle w:val="{style}"/>"#));
    }
    if let Some(spacing) = line_spacing {
        ppr.push_str(&format!(
            r#"<w:spacing w:line="{}" w:lineRule="auto"/>"#,
            (spacing * 240.0).round() as i64
        ));
    }
    let ppr = if ppr.is_empty() {
        String::new()
    } else {
        format!("<w:pPr>{ppr}</w:pPr>")
    };
    format!("<w:p>{ppr}{}</w:p>", runs.concat())
}

/// A run whose formatting is only the character style `style_id`.
pub fn styled_run(text: &str, style_id: &str) -> String {
    format!(r#"<w:r><w:rPr><w:rStyle w:val="{style_id}"/></w:rPr><w:t xml:space="preserve">{text}</w:t></w:r>"#)
}

pub fn cm_to_twips(cm: f64) -> i64 {
    (cm / 2.54 * 1440.0).round() as i64
}

/// Body-level section with margins given in centimetres.
pub fn section_cm(left: f64, right: f64, top: f64, bottom: f64) -> String {
    format!(
        r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/><w:pgMar w:top="{}" w:right="{}" w:bottom="{}" w:left="{}" w:header="708" w:footer="708" w:gutter="0"/></w:sectPr>"#,
        cm_to_twips(top),
        cm_to_twips(right),
        cm_to_twips(bottom),
        cm_to_twips(left)
    )
}

pub fn house_section() -> String {
    section_cm(4.0, 3.0, 3.0, 3.0)
}

pub fn styles_xml(styles: &str) -> String {
    format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:styles xmlns:w="{WML_NS}">{styles}</w:styles>"#)
}

pub fn paragraph_style(id: &str, font: Option<&str>, based_on: Option<&str>, default: bool) -> String {
    style("paragraph", id, font, based_on, default)
}

pub fn character_style(id: &str, font: Option<&str>, based_on: Option<&str>) -> String {
    style("character", id, font, based_on, false)
}

fn style(kind: &str, id: &str, font: Option<&str>, based_on: Option<&str>, default: bool) -> String {
    let default_attr = if default { r#" w:default="1""# } else { "" };
    let based_on = based_on
        .map(|b| format!(r#"<w:basedOn w:val="{b}"/>"#))
        .unwrap_or_default();
    let rpr = font
        .map(|f| format!(r#"<w:rPr><w:rFonts w:ascii="{f}" w:hAnsi="{f}"/></w:rPr>"#))
        .unwrap_or_default();
    format!(
        r#"<w:style w:type="{kind}"{default_attr} w:styleId="{id}"><w:name w:val="{id}"/>{based_on}{rpr}</w:style>"#
    )
}

pub fn build_docx(body: &str, styles: Option<&str>) -> Vec<u8> {
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{WML_NS}"><w:body>{body}</w:body></w:document>"#
    );
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(br#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#)
        .unwrap();
    zip.start_file("word/document.xml", options).unwrap();
    zip.write_all(document.as_bytes()).unwrap();
    if let Some(styles) = styles {
        zip.start_file("word/styles.xml", options).unwrap();
        zip.write_all(styles.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

// ── PDF ───────────────────────────────────────────────────────────────────────

/// `BT /font size Tf 72 720 Td (line) Tj 0 -14 Td ... ET`: one span per line.
pub fn text_ops(font_resource: &str, size: f64, lines: &[&str]) -> Vec<Operation> {
    let mut ops = vec![
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![Object::Name(font_resource.as_bytes().to_vec()), Object::Real(size as f32)],
        ),
        Operation::new("Td", vec![Object::Integer(72), Object::Integer(720)]),
    ];
    for line in lines {
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(line.as_bytes().to_vec(), StringFormat::Literal)],
        ));
        ops.push(Operation::new("Td", vec![Object::Integer(0), Object::Integer(-14)]));
    }
    ops.push(Operation::new("ET", vec![]));
    ops
}

pub enum TestFont<'a> {
    /// Type1 font without an `/Encoding` entry.
    Simple(&'a str),
    /// `Identity-H` composite font whose codes are read through `to_unicode`.
    Type0 { base_font: &'a str, to_unicode: &'a str },
}

/// A `/ToUnicode` CMap program with two-byte codes and the given
/// `(code, unicode)` pairs.
pub fn to_unicode_cmap(pairs: &[(u16, char)]) -> String {
    let entries: String = pairs
        .iter()
        .map(|(code, c)| format!("<{code:04X}> <{:04X}>\n", *c as u32))
        .collect();
    format!(
        "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n\
         {} beginbfchar\n{entries}endbfchar\nendcmap\nend\nend\n",
        pairs.len()
    )
}

fn add_font(doc: &mut Document, font: &TestFont) -> lopdf::ObjectId {
    match font {
        TestFont::Simple(base_font) => doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(base_font.as_bytes().to_vec())),
        ])),
        TestFont::Type0 {
            base_font,
            to_unicode,
        } => {
            let descendant = doc.add_object(Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Font".to_vec())),
                ("Subtype", Object::Name(b"CIDFontType2".to_vec())),
                ("BaseFont", Object::Name(base_font.as_bytes().to_vec())),
            ]));
            let cmap = doc.add_object(Stream::new(Dictionary::new(), to_unicode.as_bytes().to_vec()));
            doc.add_object(Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Font".to_vec())),
                ("Subtype", Object::Name(b"Type0".to_vec())),
                ("BaseFont", Object::Name(base_font.as_bytes().to_vec())),
                ("Encoding", Object::Name(b"Identity-H".to_vec())),
                ("DescendantFonts", Object::Array(vec![Object::Reference(descendant)])),
                ("ToUnicode", Object::Reference(cmap)),
            ]))
        }
    }
}

/// A PDF whose pages share one resource dictionary on the page tree root.
/// `fonts` maps resource names (e.g. "F1") to base font names.
pub fn build_pdf(fonts: &[(&str, &str)], pages: &[Vec<Operation>]) -> Vec<u8> {
    let fonts: Vec<(&str, TestFont)> = fonts
        .iter()
        .map(|(resource, base_font)| (*resource, TestFont::Simple(*base_font)))
        .collect();
    build_pdf_with_fonts(&fonts, pages)
}

pub fn build_pdf_with_fonts(fonts: &[(&str, TestFont)], pages: &[Vec<Operation>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut font_dict = Dictionary::new();
    for (resource, font) in fonts {
        let font_id = add_font(&mut doc, font);
        font_dict.set(resource.as_bytes().to_vec(), Object::Reference(font_id));
    }
    let resources = Dictionary::from_iter(vec![("Font", Object::Dictionary(font_dict))]);
    let resources_id = doc.add_object(resources);

    let mut page_ids = Vec::new();
    for operations in pages {
        let content = Content {
            operations: operations.clone(),
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(595),
                    Object::Integer(842),
                ]),
            ),
            ("Contents", Object::Reference(content_id)),
        ]);
        page_ids.push(doc.add_object(page));
    }

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(page_ids.len() as i64)),
        (
            "Kids",
            Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        ),
        ("Resources", Object::Reference(resources_id)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]);
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}
