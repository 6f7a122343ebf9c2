//! Renderers for a finished batch: plain text, JSON, HTML and a simple PDF.

use std::fmt::Write as _;

use pdf_writer::{Content, Name, Pdf, Rect, Ref, Str};
use serde::Serialize;

use crate::batch::{BatchSummary, CheckedFile};
use crate::config::RuleConfig;
use crate::error::Error;
use crate::fonts::encode_winansi;
use crate::result::IssueCategory;

fn rules_line(config: &RuleConfig) -> String {
    format!(
        "{} {}pt, line spacing {}, margins L{} R{} T{} B{} cm (tolerance {} cm)",
        config.font_name,
        config.font_size,
        config.line_spacing,
        config.margin_left,
        config.margin_right,
        config.margin_top,
        config.margin_bottom,
        config.margin_tolerance
    )
}

fn summary_lines(summary: &BatchSummary) -> [String; 2] {
    let issues = IssueCategory::ALL
        .iter()
        .map(|c| format!("{} {}", c.label(), summary.issue_total(*c)))
        .collect::<Vec<_>>()
        .join(", ");
    [
        format!(
            "Summary: {} file(s), {} passed, {} failed",
            summary.total, summary.passed, summary.failed
        ),
        format!("Issues: {issues}"),
    ]
}

fn text_lines(files: &[CheckedFile], summary: &BatchSummary, config: &RuleConfig) -> Vec<String> {
    let mut lines = vec![
        "Document format check".to_string(),
        format!("Rules: {}", rules_line(config)),
        String::new(),
    ];
    for file in files {
        let status = if file.result.success { "PASS" } else { "FAIL" };
        lines.push(format!("[{status}] {}", file.path.display()));
        for message in &file.result.messages {
            lines.push(format!("  - {message}"));
        }
    }
    lines.push(String::new());
    lines.extend(summary_lines(summary));
    lines
}

pub fn render_text(files: &[CheckedFile], summary: &BatchSummary, config: &RuleConfig) -> String {
    let mut out = text_lines(files, summary, config).join("\n");
    out.push('\n');
    out
}

#[derive(Serialize)]
struct JsonReport<'a> {
    rules: &'a RuleConfig,
    summary: &'a BatchSummary,
    files: &'a [CheckedFile],
}

pub fn render_json(
    files: &[CheckedFile],
    summary: &BatchSummary,
    config: &RuleConfig,
) -> Result<String, Error> {
    let report = JsonReport {
        rules: config,
        summary,
        files,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

pub fn render_html(files: &[CheckedFile], summary: &BatchSummary, config: &RuleConfig) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str("<title>Document format check</title>\n");
    out.push_str(
        "<style>body{font-family:sans-serif}.pass{color:#2e7d32}.fail{color:#c62828}\
         table{border-collapse:collapse}td,th{border:1px solid #ccc;padding:4px 8px}</style>\n",
    );
    out.push_str("</head>\n<body>\n<h1>Document format check</h1>\n");
    let _ = writeln!(out, "<p>Rules: {}</p>", escape_html(&rules_line(config)));

    for line in summary_lines(summary) {
        let _ = writeln!(out, "<p>{}</p>", escape_html(&line));
    }

    for file in files {
        let (class, status) = if file.result.success {
            ("pass", "PASS")
        } else {
            ("fail", "FAIL")
        };
        let _ = writeln!(
            out,
            "<h2 class=\"{class}\">{status}: {}</h2>",
            escape_html(&file.path.display().to_string())
        );
        if !file.result.messages.is_empty() {
            out.push_str("<ul>\n");
            for message in &file.result.messages {
                let _ = writeln!(out, "<li>{}</li>", escape_html(message));
            }
            out.push_str("</ul>\n");
        }
        if file.result.issue_count() > 0 {
            out.push_str("<table>\n<tr><th>Category</th><th>Location</th><th>Found</th><th>Expected</th></tr>\n");
            for issue in file.result.issues.values().flatten() {
                let _ = writeln!(
                    out,
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                    issue.category.label(),
                    escape_html(&issue.location.to_string()),
                    escape_html(&issue.found.to_string()),
                    escape_html(&issue.expected.to_string())
                );
            }
            out.push_str("</table>\n");
        }
    }

    out.push_str("</body>\n</html>\n");
    out
}

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const PAGE_MARGIN: f32 = 56.0;
const FONT_SIZE: f32 = 10.0;
const LEADING: f32 = 14.0;
const WRAP_CHARS: usize = 95;

fn wrap(line: &str) -> Vec<String> {
    if line.chars().count() <= WRAP_CHARS {
        return vec![line.to_string()];
    }
    let indent = &line[..line.len() - line.trim_start().len()];
    let continuation = format!("{indent}    ");

    let mut wrapped = Vec::new();
    let mut current = indent.to_string();
    let mut has_words = false;
    for word in line.split_whitespace() {
        if has_words && current.chars().count() + 1 + word.chars().count() > WRAP_CHARS {
            wrapped.push(std::mem::replace(&mut current, continuation.clone()));
            has_words = false;
        }
        if has_words {
            current.push(' ');
        }
        current.push_str(word);
        has_words = true;
    }
    wrapped.push(current);
    wrapped
}

/// A4 pages of Helvetica text with the same content as [`render_text`].
pub fn render_pdf(files: &[CheckedFile], summary: &BatchSummary, config: &RuleConfig) -> Vec<u8> {
    let lines: Vec<String> = text_lines(files, summary, config)
        .iter()
        .flat_map(|l| wrap(l))
        .collect();
    let lines_per_page = ((PAGE_HEIGHT - 2.0 * PAGE_MARGIN) / LEADING) as usize;
    let pages: Vec<&[String]> = lines.chunks(lines_per_page.max(1)).collect();

    let mut pdf = Pdf::new();
    let catalog_id = Ref::new(1);
    let pages_id = Ref::new(2);
    let font_id = Ref::new(3);
    let page_ids: Vec<Ref> = (0..pages.len())
        .map(|i| Ref::new(4 + 2 * i as i32))
        .collect();

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(pages.len() as i32);

    for (page_lines, page_id) in pages.iter().zip(&page_ids) {
        let content_id = Ref::new(page_id.get() + 1);
        let mut content = Content::new();
        let mut cursor_y = PAGE_HEIGHT - PAGE_MARGIN;

        for line in page_lines.iter() {
            if !line.is_empty() {
                content
                    .begin_text()
                    .set_font(Name(b"F1"), FONT_SIZE)
                    .next_line(PAGE_MARGIN, cursor_y)
                    .show(Str(&encode_winansi(line)))
                    .end_text();
            }
            cursor_y -= LEADING;
        }

        pdf.stream(content_id, &content.finish());

        pdf.page(*page_id)
            .media_box(Rect::new(0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT))
            .parent(pages_id)
            .contents(content_id)
            .resources()
            .fonts()
            .pair(Name(b"F1"), font_id);
    }

    pdf.type1_font(font_id)
        .base_font(Name(b"Helvetica"))
        .encoding_predefined(Name(b"WinAnsiEncoding"));

    pdf.finish()
}
