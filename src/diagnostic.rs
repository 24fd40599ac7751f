use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a primary diagnostic line.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    Error,
    Warning,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::Error => "error",
            IssueKind::Warning => "warning",
        }
    }

    /// Parses the level word captured from a header line.
    pub fn from_level(level: &str) -> Option<Self> {
        match level {
            "error" => Some(IssueKind::Error),
            "warning" => Some(IssueKind::Warning),
            _ => None,
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    Note,
    ImplicitFix,
}

/// Label carried by every implicit-fix note.
pub const IMPLICIT_FIX_MESSAGE: &str = "Fix suggestion";

/// Secondary annotation attached to exactly one [`DiagnosticIssue`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    #[serde(rename = "type")]
    pub kind: NoteKind,
    pub message: String,
    pub file_path: Option<String>,
    pub line_number: Option<u32>,
    pub column: Option<u32>,
    pub suggested_fix: Option<String>,
    pub code_context: Option<String>,
    pub fixit_indicator: Option<String>,
}

impl Note {
    pub fn new(
        message: String,
        file_path: String,
        line_number: u32,
        column: u32,
        code_context: Option<String>,
    ) -> Self {
        Note {
            kind: NoteKind::Note,
            message,
            file_path: Some(file_path),
            line_number: Some(line_number),
            column: Some(column),
            suggested_fix: None,
            code_context,
            fixit_indicator: None,
        }
    }

    /// A fix suggestion found under a caret line with no note before it.
    /// Location fields are copied from the owning diagnostic.
    pub fn implicit_fix(owner: &DiagnosticIssue, suggestion: String, indicator: String) -> Self {
        Note {
            kind: NoteKind::ImplicitFix,
            message: IMPLICIT_FIX_MESSAGE.to_string(),
            file_path: owner.file_path.clone(),
            line_number: owner.line_number,
            column: owner.column,
            suggested_fix: Some(suggestion),
            code_context: None,
            fixit_indicator: Some(indicator),
        }
    }
}

/// One error or warning recovered from a build log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticIssue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub message: String,
    pub file_path: Option<String>,
    pub line_number: Option<u32>,
    pub column: Option<u32>,
    pub character_range: Option<String>,
    pub code: Option<String>,
    pub notes: Vec<Note>,
    /// 0-based index of the header line in the scanned sequence.
    #[serde(skip)]
    pub source_line: usize,
}

impl DiagnosticIssue {
    pub fn new(
        kind: IssueKind,
        message: String,
        file_path: Option<String>,
        line_number: Option<u32>,
        column: Option<u32>,
        source_line: usize,
    ) -> Self {
        DiagnosticIssue {
            kind,
            message,
            file_path,
            line_number,
            column,
            character_range: None,
            code: None,
            notes: Vec::new(),
            source_line,
        }
    }

    /// The synthetic issue reported when the log text could not be obtained.
    pub fn extraction_failure(log_file: &str, description: &str) -> Self {
        DiagnosticIssue::new(
            IssueKind::Error,
            format!("Error parsing log file: {}", description),
            Some(log_file.to_string()),
            None,
            None,
            0,
        )
    }

    pub fn is_error(&self) -> bool {
        self.kind == IssueKind::Error
    }

    pub fn is_warning(&self) -> bool {
        self.kind == IssueKind::Warning
    }

    /// `path:line:col` as far as the location is known.
    pub fn lineref(&self) -> String {
        let mut lineref = self.file_path.clone().unwrap_or_default();
        if let Some(line) = self.line_number {
            lineref.push_str(&format!(":{}", line));
            if let Some(col) = self.column {
                lineref.push_str(&format!(":{}", col));
            }
        }
        lineref
    }
}

/// Line attribution for one scan.
///
/// Every input line lands in exactly one bucket, so the four counters always
/// add up to `total_lines`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub total_lines: usize,
    /// Header lines that opened a retained diagnostic.
    pub header_lines: usize,
    /// Warning header lines dropped because warnings were excluded.
    pub filtered_lines: usize,
    /// Lines eaten by lookahead (notes, indicators, fixes, context).
    pub consumed_lines: usize,
    pub skipped_lines: usize,
}

impl ScanStats {
    pub fn attributed(&self) -> usize {
        self.header_lines + self.filtered_lines + self.consumed_lines + self.skipped_lines
    }
}

/// Result of parsing one text stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    pub issues: Vec<DiagnosticIssue>,
    pub stats: ScanStats,
}

impl ParseOutcome {
    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues.iter().filter(|i| i.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues.iter().filter(|i| i.is_warning())
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    /// Splits the issues into (errors, warnings), keeping their order.
    pub fn into_partition(self) -> (Vec<DiagnosticIssue>, Vec<DiagnosticIssue>) {
        self.issues.into_iter().partition(|i| i.is_error())
    }
}
