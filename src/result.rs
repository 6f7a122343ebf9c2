use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Font,
    Size,
    Spacing,
    Margin,
}

impl IssueCategory {
    pub const ALL: [IssueCategory; 4] = [
        IssueCategory::Font,
        IssueCategory::Size,
        IssueCategory::Spacing,
        IssueCategory::Margin,
    ];

    pub fn label(self) -> &'static str {
        match self {
            IssueCategory::Font => "font",
            IssueCategory::Size => "size",
            IssueCategory::Spacing => "spacing",
            IssueCategory::Margin => "margin",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarginSide {
    Left,
    Right,
    Top,
    Bottom,
}

impl fmt::Display for MarginSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MarginSide::Left => "Left",
            MarginSide::Right => "Right",
            MarginSide::Top => "Top",
            MarginSide::Bottom => "Bottom",
        };
        f.write_str(name)
    }
}

/// Where in the document an issue was found.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Location {
    Paragraph { index: usize, text: String },
    Page { number: usize, text: String },
    Margin { side: MarginSide },
    Document,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Paragraph { index, text } => write!(f, "paragraph {}: \"{text}\"", index + 1),
            Location::Page { number, text } => write!(f, "page {number}: \"{text}\""),
            Location::Margin { side } => write!(f, "{side} margin"),
            Location::Document => write!(f, "document"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Number(f64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Issue {
    pub category: IssueCategory,
    pub location: Location,
    pub found: Value,
    pub expected: Value,
}

/// Outcome of checking one file.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CheckResult {
    pub filename: String,
    pub success: bool,
    /// Human-readable findings in detection order.
    pub messages: Vec<String>,
    pub issues: BTreeMap<IssueCategory, Vec<Issue>>,
}

impl CheckResult {
    /// A file that could not be evaluated at all.
    pub fn failure(filename: impl Into<String>, message: impl Into<String>) -> CheckResult {
        CheckResult {
            filename: filename.into(),
            success: false,
            messages: vec![message.into()],
            issues: BTreeMap::new(),
        }
    }

    pub fn issues_in(&self, category: IssueCategory) -> &[Issue] {
        self.issues.get(&category).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn issue_count(&self) -> usize {
        self.issues.values().map(Vec::len).sum()
    }
}

/// Accumulates findings while a document is evaluated. Success is derived
/// from the recorded issues when the result is built.
pub(crate) struct ResultBuilder {
    filename: String,
    messages: Vec<String>,
    issues: BTreeMap<IssueCategory, Vec<Issue>>,
}

impl ResultBuilder {
    pub(crate) fn new(filename: &str, categories: &[IssueCategory]) -> ResultBuilder {
        ResultBuilder {
            filename: filename.to_string(),
            messages: Vec::new(),
            issues: categories.iter().map(|c| (*c, Vec::new())).collect(),
        }
    }

    pub(crate) fn record(&mut self, message: String, issue: Issue) {
        self.messages.push(message);
        self.issues.entry(issue.category).or_default().push(issue);
    }

    /// A message that does not count against the file.
    pub(crate) fn note(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }

    pub(crate) fn finish(self) -> CheckResult {
        let success = self.issues.values().all(Vec::is_empty);
        CheckResult {
            filename: self.filename,
            success,
            messages: self.messages,
            issues: self.issues,
        }
    }
}
