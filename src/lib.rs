mod batch;
mod cmap;
mod config;
mod docx;
mod error;
mod evaluate;
mod fonts;
pub mod model;
mod pdf;
pub mod report;
mod result;

pub use batch::{
    BatchEvent, BatchOutcome, BatchSummary, CancelToken, CheckedFile, EventSink, NoEvents,
    run_batch,
};
pub use config::{CoercionWarning, RuleConfig, Settings};
pub use error::{BatchError, Error};
pub use evaluate::{PDF_DISCLAIMER, PDF_SIZE_TOLERANCE, evaluate};
pub use result::{CheckResult, Issue, IssueCategory, Location, MarginSide, Value};

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use model::{Document, DocumentKind};

pub const UNSUPPORTED_FORMAT_MESSAGE: &str =
    "Unsupported file format. Only .docx and .pdf files can be checked.";

/// Build the structural model for `bytes` of the given kind.
pub fn parse_document(kind: DocumentKind, bytes: &[u8]) -> Result<Document, Error> {
    match kind {
        DocumentKind::Docx => docx::parse(bytes).map(Document::Docx),
        DocumentKind::Pdf => pdf::parse(bytes).map(Document::Pdf),
    }
}

/// Check in-memory document bytes. Never fails: parse errors become a
/// failed [`CheckResult`] carrying the cause.
pub fn check_bytes(
    filename: &str,
    kind: DocumentKind,
    bytes: &[u8],
    config: &RuleConfig,
) -> CheckResult {
    // Malformed content streams can panic inside the parsers.
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        parse_document(kind, bytes).map(|doc| evaluate(&doc, config, filename))
    }));
    match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            log::error!("failed to check {filename}: {e}");
            CheckResult::failure(filename, format!("Error while checking file: {e}"))
        }
        Err(_) => {
            log::error!("internal error while checking {filename}");
            CheckResult::failure(filename, "Error while checking file: internal error")
        }
    }
}

fn dispatch(path: &Path) -> Result<DocumentKind, Error> {
    DocumentKind::from_path(path).ok_or_else(|| {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        Error::UnsupportedFormat(ext)
    })
}

/// Check one file on disk. The extension is inspected before the file is
/// opened; unknown formats are rejected without any I/O.
pub fn check_file(path: &Path, config: &RuleConfig) -> CheckResult {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let kind = match dispatch(path) {
        Ok(kind) => kind,
        Err(e) => {
            log::warn!("skipping {}: {e}", path.display());
            return CheckResult::failure(filename, UNSUPPORTED_FORMAT_MESSAGE);
        }
    };

    log::info!("checking {}", path.display());
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            let e = Error::Io(e);
            log::error!("failed to read {}: {e}", path.display());
            return CheckResult::failure(filename, format!("Error while checking file: {e}"));
        }
    };

    check_bytes(&filename, kind, &bytes, config)
}
