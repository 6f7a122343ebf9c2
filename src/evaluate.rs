use std::collections::HashSet;

use crate::config::RuleConfig;
use crate::fonts::{docx_font_matches, pdf_font_matches};
use crate::model::{Document, DocxDocument, LineSpacing, PageMargins, Paragraph, PdfDocument};
use crate::result::{
    CheckResult, Issue, IssueCategory, Location, MarginSide, ResultBuilder, Value,
};

/// PDF text layout rounds sizes, so they get half a point of slack.
pub const PDF_SIZE_TOLERANCE: f64 = 0.5;

pub const PDF_DISCLAIMER: &str =
    "Margins and line spacing are not checked in depth for PDF files.";

const MESSAGE_PREVIEW_CHARS: usize = 30;
const ISSUE_PREVIEW_CHARS: usize = 50;

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Run every rule in `config` against a parsed document.
pub fn evaluate(document: &Document, config: &RuleConfig, filename: &str) -> CheckResult {
    let result = match document {
        Document::Docx(doc) => evaluate_docx(doc, config, filename),
        Document::Pdf(doc) => evaluate_pdf(doc, config, filename),
    };
    log::info!(
        "checked {filename}: success={}, {} message(s), {} issue(s)",
        result.success,
        result.messages.len(),
        result.issue_count()
    );
    result
}

fn evaluate_docx(doc: &DocxDocument, config: &RuleConfig, filename: &str) -> CheckResult {
    let mut report = ResultBuilder::new(filename, &IssueCategory::ALL);

    for para in doc.paragraphs.iter().filter(|p| !p.is_blank()) {
        check_runs(para, config, &mut report);
        check_spacing(para, config, &mut report);
    }
    check_margins(doc.margins, config, &mut report);

    report.finish()
}

fn paragraph_location(para: &Paragraph) -> Location {
    Location::Paragraph {
        index: para.index,
        text: preview(&para.text, ISSUE_PREVIEW_CHARS),
    }
}

/// Font and size share one scan: the first offending run ends the
/// paragraph, so each paragraph yields at most one font or size issue.
fn check_runs(para: &Paragraph, config: &RuleConfig, report: &mut ResultBuilder) {
    let excerpt = preview(&para.text, MESSAGE_PREVIEW_CHARS);

    for run in &para.runs {
        match run.effective_font_name.as_deref() {
            Some(font) if !docx_font_matches(font, &config.font_name) => {
                log::debug!(
                    "[DOCX] font mismatch: paragraph {}, found '{font}', expected '{}'",
                    para.index + 1,
                    config.font_name
                );
                report.record(
                    format!("Font mismatch in paragraph: \"{excerpt}...\""),
                    Issue {
                        category: IssueCategory::Font,
                        location: paragraph_location(para),
                        found: font.into(),
                        expected: config.font_name.as_str().into(),
                    },
                );
                break;
            }
            Some(_) => {}
            None => log::debug!(
                "[DOCX] run without font information in paragraph {} (Default)",
                para.index + 1
            ),
        }

        if let Some(size) = run.font_size
            && size != config.font_size
        {
            log::debug!(
                "[DOCX] size mismatch: paragraph {}, found {size}pt, expected {}pt",
                para.index + 1,
                config.font_size
            );
            report.record(
                format!("Font size mismatch in paragraph: \"{excerpt}...\""),
                Issue {
                    category: IssueCategory::Size,
                    location: paragraph_location(para),
                    found: size.into(),
                    expected: config.font_size.into(),
                },
            );
            break;
        }
    }
}

fn check_spacing(para: &Paragraph, config: &RuleConfig, report: &mut ResultBuilder) {
    let Some(spacing) = para.line_spacing else {
        return;
    };
    if spacing == LineSpacing::Multiple(config.line_spacing) {
        return;
    }
    log::debug!(
        "[DOCX] spacing mismatch: paragraph {}, found {spacing}, expected {}",
        para.index + 1,
        config.line_spacing
    );
    let found = match spacing {
        LineSpacing::Multiple(m) => Value::Number(m),
        fixed => Value::Text(fixed.to_string()),
    };
    report.record(
        format!(
            "Line spacing mismatch in paragraph: \"{}...\"",
            preview(&para.text, MESSAGE_PREVIEW_CHARS)
        ),
        Issue {
            category: IssueCategory::Spacing,
            location: paragraph_location(para),
            found,
            expected: config.line_spacing.into(),
        },
    );
}

fn check_margins(margins: Option<PageMargins>, config: &RuleConfig, report: &mut ResultBuilder) {
    let Some(m) = margins else {
        log::warn!("[DOCX] no section found, cannot check margins");
        report.record(
            "Unable to check margins.".to_string(),
            Issue {
                category: IssueCategory::Margin,
                location: Location::Document,
                found: "no page section".into(),
                expected: "page section with margins".into(),
            },
        );
        return;
    };

    let sides = [
        (MarginSide::Left, m.left_cm, config.margin_left),
        (MarginSide::Right, m.right_cm, config.margin_right),
        (MarginSide::Top, m.top_cm, config.margin_top),
        (MarginSide::Bottom, m.bottom_cm, config.margin_bottom),
    ];
    for (side, observed, expected) in sides {
        if (observed - expected).abs() <= config.margin_tolerance {
            continue;
        }
        log::debug!("[DOCX] {side} margin mismatch: found {observed:.2}cm, expected {expected:.2}cm");
        report.record(
            format!("{side} margin mismatch: {observed:.2} cm (expected: {expected} cm)"),
            Issue {
                category: IssueCategory::Margin,
                location: Location::Margin { side },
                found: observed.into(),
                expected: expected.into(),
            },
        );
    }
}

/// Every span is checked on its own; repeated identical findings (same
/// page, font and text prefix) are reported once.
fn evaluate_pdf(doc: &PdfDocument, config: &RuleConfig, filename: &str) -> CheckResult {
    let mut report = ResultBuilder::new(filename, &[IssueCategory::Font, IssueCategory::Size]);
    let mut reported: HashSet<String> = HashSet::new();

    for span in &doc.spans {
        let excerpt = preview(&span.text, MESSAGE_PREVIEW_CHARS);
        let location = || Location::Page {
            number: span.page_number,
            text: preview(&span.text, ISSUE_PREVIEW_CHARS),
        };

        if !pdf_font_matches(&span.font_name, &config.font_name) {
            let message = format!(
                "Font mismatch on page {}: \"{excerpt}...\" (found: {})",
                span.page_number, span.font_name
            );
            if reported.insert(message.clone()) {
                log::debug!(
                    "[PDF] font mismatch: page {}, found '{}', expected '{}'",
                    span.page_number,
                    span.font_name,
                    config.font_name
                );
                report.record(
                    message,
                    Issue {
                        category: IssueCategory::Font,
                        location: location(),
                        found: span.font_name.as_str().into(),
                        expected: config.font_name.as_str().into(),
                    },
                );
            }
        }

        if (span.font_size - config.font_size).abs() > PDF_SIZE_TOLERANCE {
            let message = format!(
                "Font size mismatch on page {}: \"{excerpt}...\" (found: {:.1}pt)",
                span.page_number, span.font_size
            );
            if reported.insert(message.clone()) {
                log::debug!(
                    "[PDF] size mismatch: page {}, found {:.1}pt, expected {:.1}pt",
                    span.page_number,
                    span.font_size,
                    config.font_size
                );
                report.record(
                    message,
                    Issue {
                        category: IssueCategory::Size,
                        location: location(),
                        found: span.font_size.into(),
                        expected: config.font_size.into(),
                    },
                );
            }
        }
    }

    report.note(PDF_DISCLAIMER);
    report.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_counts_chars_not_bytes() {
        assert_eq!(preview("ééééé", 3), "ééé");
        assert_eq!(preview("ab", 30), "ab");
    }
}
