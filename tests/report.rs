use std::path::PathBuf;

use docstyle_check::report::{render_html, render_json, render_pdf, render_text};
use docstyle_check::{BatchSummary, CheckResult, CheckedFile, RuleConfig};

fn sample() -> (Vec<CheckedFile>, BatchSummary) {
    let files = vec![
        CheckedFile {
            path: PathBuf::from("good.docx"),
            result: CheckResult {
                filename: "good.docx".into(),
                success: true,
                messages: Vec::new(),
                issues: Default::default(),
            },
        },
        CheckedFile {
            path: PathBuf::from("<odd> & bad.pdf"),
            result: CheckResult::failure("<odd> & bad.pdf", "Error while checking file: PDF has no pages"),
        },
    ];
    let summary = BatchSummary::from_results(files.iter().map(|f| &f.result));
    (files, summary)
}

#[test]
fn text_report_lists_files_and_summary() {
    let (files, summary) = sample();
    let text = render_text(&files, &summary, &RuleConfig::default());
    assert!(text.contains("[PASS] good.docx"));
    assert!(text.contains("[FAIL] <odd> & bad.pdf"));
    assert!(text.contains("  - Error while checking file: PDF has no pages"));
    assert!(text.contains("Summary: 2 file(s), 1 passed, 1 failed"));
    assert!(text.contains("Times New Roman 12pt"));
}

#[test]
fn json_report_is_machine_readable() {
    let (files, summary) = sample();
    let json = render_json(&files, &summary, &RuleConfig::default()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["summary"]["total"], 2);
    assert_eq!(value["summary"]["issue_totals"]["font"], 0);
    assert_eq!(value["rules"]["margin_left"], 4.0);
    assert_eq!(value["files"][1]["result"]["success"], false);
}

#[test]
fn html_report_escapes_paths() {
    let (files, summary) = sample();
    let html = render_html(&files, &summary, &RuleConfig::default());
    assert!(html.contains("&lt;odd&gt; &amp; bad.pdf"));
    assert!(!html.contains("<odd>"));
}

#[test]
fn pdf_report_paginates() {
    let (mut files, _) = sample();
    let template = files[1].clone();
    files.extend((0..120).map(|i| CheckedFile {
        path: PathBuf::from(format!("extra-{i}.pdf")),
        ..template.clone()
    }));
    let summary = BatchSummary::from_results(files.iter().map(|f| &f.result));

    let bytes = render_pdf(&files, &summary, &RuleConfig::default());
    let doc = lopdf::Document::load_mem(&bytes).unwrap();
    assert!(doc.get_pages().len() > 1);
}
