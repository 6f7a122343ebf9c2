use std::fmt;

#[derive(Debug)]
pub enum Error {
    UnsupportedFormat(String),
    EmptyFile,
    InvalidDocx(String),
    InvalidPdf(String),
    Zip(zip::result::ZipError),
    Xml(roxmltree::Error),
    Pdf(lopdf::Error),
    Io(std::io::Error),
    Settings(toml::de::Error),
    Json(serde_json::Error),
}

impl Error {
    /// True for failures that come from reading or decoding a document
    /// (as opposed to an unknown extension or a bad settings file).
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Error::EmptyFile
                | Error::InvalidDocx(_)
                | Error::InvalidPdf(_)
                | Error::Zip(_)
                | Error::Xml(_)
                | Error::Pdf(_)
                | Error::Io(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnsupportedFormat(ext) if ext.is_empty() => {
                write!(f, "unsupported file format (no extension)")
            }
            Error::UnsupportedFormat(ext) => write!(f, "unsupported file format: .{ext}"),
            Error::EmptyFile => write!(f, "file is empty"),
            Error::InvalidDocx(reason) => write!(f, "not a valid DOCX file: {reason}"),
            Error::InvalidPdf(reason) => write!(f, "not a valid PDF file: {reason}"),
            Error::Zip(e) => write!(f, "ZIP error: {e}"),
            Error::Xml(e) => write!(f, "XML error: {e}"),
            Error::Pdf(e) => write!(f, "PDF error: {e}"),
            Error::Io(e) => write!(f, "IO error: {e}"),
            Error::Settings(e) => write!(f, "settings error: {e}"),
            Error::Json(e) => write!(f, "JSON error: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::Zip(e)
    }
}

impl From<roxmltree::Error> for Error {
    fn from(e: roxmltree::Error) -> Self {
        Error::Xml(e)
    }
}

impl From<lopdf::Error> for Error {
    fn from(e: lopdf::Error) -> Self {
        Error::Pdf(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Settings(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

/// Failure of the batch machinery itself, distinct from per-file results.
#[derive(Debug)]
pub enum BatchError {
    SinkClosed,
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchError::SinkClosed => write!(f, "batch event receiver was dropped"),
        }
    }
}

impl std::error::Error for BatchError {}
