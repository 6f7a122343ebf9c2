use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentKind {
    Docx,
    Pdf,
}

impl DocumentKind {
    /// Case-insensitive extension dispatch. Returns `None` for anything that
    /// is not `.docx` or `.pdf`.
    pub fn from_path(path: &Path) -> Option<DocumentKind> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "docx" => Some(DocumentKind::Docx),
            "pdf" => Some(DocumentKind::Pdf),
            _ => None,
        }
    }
}

pub enum Document {
    Docx(DocxDocument),
    Pdf(PdfDocument),
}

pub struct DocxDocument {
    pub paragraphs: Vec<Paragraph>,
    /// Margins of the first section that declares `w:pgMar`. `None` when the
    /// document has no usable section.
    pub margins: Option<PageMargins>,
}

pub struct Paragraph {
    /// Position among the body paragraphs, blank ones included.
    pub index: usize,
    pub text: String,
    /// Runs with visible text only; whitespace-only runs are dropped.
    pub runs: Vec<Run>,
    pub line_spacing: Option<LineSpacing>,
}

impl Paragraph {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

pub struct Run {
    pub text: String,
    pub effective_font_name: Option<String>,
    pub font_size: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LineSpacing {
    /// Proportional spacing (`lineRule="auto"`), e.g. 1.5.
    Multiple(f64),
    /// Fixed line height in points.
    Exact(f64),
    /// Minimum line height in points.
    AtLeast(f64),
}

impl std::fmt::Display for LineSpacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineSpacing::Multiple(m) => write!(f, "{m}"),
            LineSpacing::Exact(pt) => write!(f, "exactly {pt}pt"),
            LineSpacing::AtLeast(pt) => write!(f, "at least {pt}pt"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageMargins {
    pub left_cm: f64,
    pub right_cm: f64,
    pub top_cm: f64,
    pub bottom_cm: f64,
}

pub struct PdfDocument {
    pub page_count: usize,
    pub spans: Vec<TextSpan>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextSpan {
    /// 1-based.
    pub page_number: usize,
    pub text: String,
    pub font_name: String,
    pub font_size: f64,
}
