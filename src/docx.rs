use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read, Seek};

use crate::error::Error;
use crate::model::{DocxDocument, LineSpacing, PageMargins, Paragraph, Run};

const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CM_PER_INCH: f64 = 2.54;
const TWIPS_PER_INCH: f64 = 1440.0;

/// Inline containers whose `w:r` children still belong to the paragraph.
const RUN_WRAPPERS: &[&str] = &["hyperlink", "smartTag", "ins", "customXml", "fldSimple"];

fn twips_to_cm(twips: f64) -> f64 {
    twips / TWIPS_PER_INCH * CM_PER_INCH
}

fn is_wml(node: roxmltree::Node, name: &str) -> bool {
    node.tag_name().name() == name && node.tag_name().namespace() == Some(WML_NS)
}

fn wml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children().find(|n| is_wml(*n, name))
}

fn wml_attr<'a>(node: roxmltree::Node<'a, 'a>, child: &str) -> Option<&'a str> {
    wml(node, child).and_then(|n| n.attribute((WML_NS, "val")))
}

fn num_attr(node: roxmltree::Node, attr: &str) -> Option<f64> {
    node.attribute((WML_NS, attr))
        .and_then(|v| v.trim().parse::<f64>().ok())
}

/// `w:rFonts/@w:ascii`. Theme-only references (`w:asciiTheme`) name no font.
fn direct_font<'a>(rpr: Option<roxmltree::Node<'a, 'a>>) -> Option<&'a str> {
    rpr.and_then(|n| wml(n, "rFonts"))
        .and_then(|n| n.attribute((WML_NS, "ascii")))
        .filter(|name| !name.trim().is_empty())
}

struct StyleDef {
    font_name: Option<String>,
    based_on: Option<String>,
    /// `w:type="paragraph"`; only these can be named by `w:pStyle`.
    is_paragraph: bool,
}

#[derive(Default)]
struct Styles {
    styles: HashMap<String, StyleDef>,
    default_paragraph: Option<String>,
}

impl Styles {
    /// Style applied to a paragraph: its `w:pStyle` when that names a known
    /// paragraph style, otherwise the default paragraph style.
    fn paragraph_style<'s>(&'s self, p_style: Option<&'s str>) -> Option<&'s str> {
        if let Some(id) = p_style {
            match self.styles.get(id) {
                Some(style) if style.is_paragraph => return Some(id),
                Some(_) => log::debug!("pStyle '{id}' is not a paragraph style"),
                None => log::debug!("pStyle '{id}' is not defined"),
            }
        }
        self.default_paragraph.as_deref()
    }

    /// First font named along the `basedOn` chain starting at `style_id`.
    fn font_of(&self, style_id: &str) -> Option<&str> {
        let mut seen = HashSet::new();
        let mut current = Some(style_id);
        while let Some(id) = current {
            if !seen.insert(id) {
                log::warn!("style inheritance cycle through '{id}'");
                return None;
            }
            let style = self.styles.get(id)?;
            if let Some(name) = style.font_name.as_deref() {
                return Some(name);
            }
            current = style.based_on.as_deref();
        }
        None
    }
}

fn read_part<R: Read + Seek>(zip: &mut zip::ZipArchive<R>, name: &str) -> Option<String> {
    let mut file = zip.by_name(name).ok()?;
    let mut content = String::new();
    file.read_to_string(&mut content).ok()?;
    Some(content)
}

fn parse_styles<R: Read + Seek>(zip: &mut zip::ZipArchive<R>) -> Styles {
    let mut styles = Styles::default();

    let Some(xml_content) = read_part(zip, "word/styles.xml") else {
        log::debug!("no word/styles.xml; style fonts unavailable");
        return styles;
    };
    let xml = match roxmltree::Document::parse(&xml_content) {
        Ok(xml) => xml,
        Err(e) => {
            log::warn!("ignoring unreadable word/styles.xml: {e}");
            return styles;
        }
    };

    for style_node in xml.root_element().children() {
        if !is_wml(style_node, "style") {
            continue;
        }
        let Some(style_id) = style_node.attribute((WML_NS, "styleId")) else {
            continue;
        };
        let style_type = style_node.attribute((WML_NS, "type"));
        let is_default = matches!(style_node.attribute((WML_NS, "default")), Some("1" | "true"));
        if style_type == Some("paragraph") && is_default && styles.default_paragraph.is_none() {
            styles.default_paragraph = Some(style_id.to_string());
        }

        let font_name = direct_font(wml(style_node, "rPr")).map(str::to_string);
        let based_on = wml_attr(style_node, "basedOn").map(str::to_string);

        styles.styles.insert(
            style_id.to_string(),
            StyleDef {
                font_name,
                based_on,
                is_paragraph: style_type == Some("paragraph"),
            },
        );
    }

    styles
}

/// Effective font of a run: direct formatting, then the run's character
/// style, then the paragraph style. `None` when nothing names a font.
fn resolve_run_font<'a>(
    rpr: Option<roxmltree::Node<'a, 'a>>,
    para_style: Option<&str>,
    styles: &Styles,
) -> Option<String> {
    direct_font(rpr)
        .or_else(|| {
            rpr.and_then(|n| wml_attr(n, "rStyle"))
                .and_then(|id| styles.font_of(id))
        })
        .or_else(|| para_style.and_then(|id| styles.font_of(id)))
        .map(str::to_string)
}

fn collect_runs<'a>(node: roxmltree::Node<'a, 'a>, out: &mut Vec<roxmltree::Node<'a, 'a>>) {
    for child in node.children() {
        if is_wml(child, "r") {
            out.push(child);
        } else if child.tag_name().namespace() == Some(WML_NS)
            && RUN_WRAPPERS.contains(&child.tag_name().name())
        {
            collect_runs(child, out);
        }
    }
}

fn run_text(run_node: roxmltree::Node) -> String {
    let mut text = String::new();
    for child in run_node.children() {
        if child.tag_name().namespace() != Some(WML_NS) {
            continue;
        }
        match child.tag_name().name() {
            "t" => text.push_str(child.text().unwrap_or_default()),
            "tab" => text.push('\t'),
            "br" | "cr" => text.push('\n'),
            _ => {}
        }
    }
    text
}

fn parse_line_spacing<'a>(ppr: Option<roxmltree::Node<'a, 'a>>) -> Option<LineSpacing> {
    let spacing = ppr.and_then(|n| wml(n, "spacing"))?;
    let line = num_attr(spacing, "line")?;
    let spacing = match spacing.attribute((WML_NS, "lineRule")) {
        Some("exact") => LineSpacing::Exact(line / 20.0),
        Some("atLeast") => LineSpacing::AtLeast(line / 20.0),
        _ => LineSpacing::Multiple(line / 240.0),
    };
    Some(spacing)
}

fn parse_paragraph<'a>(node: roxmltree::Node<'a, 'a>, index: usize, styles: &Styles) -> Paragraph {
    let ppr = wml(node, "pPr");
    let para_style = styles.paragraph_style(ppr.and_then(|ppr| wml_attr(ppr, "pStyle")));

    let mut run_nodes = Vec::new();
    collect_runs(node, &mut run_nodes);

    let mut text = String::new();
    let mut runs = Vec::new();
    for run_node in run_nodes {
        let content = run_text(run_node);
        text.push_str(&content);
        if content.trim().is_empty() {
            continue;
        }

        let rpr = wml(run_node, "rPr");
        let font_size = rpr
            .and_then(|n| wml_attr(n, "sz"))
            .and_then(|v| v.trim().parse::<f64>().ok())
            .map(|half_points| half_points / 2.0);

        runs.push(Run {
            text: content,
            effective_font_name: resolve_run_font(rpr, para_style, styles),
            font_size,
        });
    }

    Paragraph {
        index,
        text,
        runs,
        line_spacing: parse_line_spacing(ppr),
    }
}

fn parse_margins(pg_mar: roxmltree::Node) -> PageMargins {
    let side = |attr: &str| twips_to_cm(num_attr(pg_mar, attr).unwrap_or(0.0));
    PageMargins {
        left_cm: side("left"),
        right_cm: side("right"),
        top_cm: side("top"),
        bottom_cm: side("bottom"),
    }
}

/// Margins of the first section in document order. Later sections are not
/// consulted, even when the first declares no `w:pgMar`.
fn first_section_margins<'a>(body: roxmltree::Node<'a, 'a>) -> Option<PageMargins> {
    let Some(section) = body
        .descendants()
        .filter(|n| is_wml(*n, "sectPr"))
        .find(|n| n.parent().is_none_or(|p| !is_wml(p, "sectPrChange")))
    else {
        log::warn!("document has no sections");
        return None;
    };
    let Some(pg_mar) = wml(section, "pgMar") else {
        log::warn!("first section declares no page margins");
        return None;
    };
    Some(parse_margins(pg_mar))
}

pub fn parse(bytes: &[u8]) -> Result<DocxDocument, Error> {
    if bytes.is_empty() {
        return Err(Error::EmptyFile);
    }
    let mut zip = zip::ZipArchive::new(Cursor::new(bytes))?;

    let styles = parse_styles(&mut zip);

    let xml_content = read_part(&mut zip, "word/document.xml")
        .ok_or_else(|| Error::InvalidDocx("missing word/document.xml".into()))?;
    let xml = roxmltree::Document::parse(&xml_content)?;
    let root = xml.root_element();

    let body = wml(root, "body").ok_or_else(|| Error::InvalidDocx("missing w:body".into()))?;

    let paragraphs: Vec<Paragraph> = body
        .children()
        .filter(|n| is_wml(*n, "p"))
        .enumerate()
        .map(|(index, node)| parse_paragraph(node, index, &styles))
        .collect();

    let margins = first_section_margins(body);

    log::debug!(
        "parsed DOCX: {} paragraphs, {} styles, margins {:?}",
        paragraphs.len(),
        styles.styles.len(),
        margins
    );

    Ok(DocxDocument { paragraphs, margins })
}
