//! Human-readable rendering of diagnostics for the terminal.

use crate::diagnostic::{DiagnosticIssue, IssueKind, Note, NoteKind};
use crate::report::DiagnosticsReport;
use nu_ansi_term::{Color, Style};
use std::fmt::Write;

/// Renders one issue. `index` is 1-based and padded to `width` digits.
pub fn render_issue(issue: &DiagnosticIssue, index: usize, width: usize, color: bool) -> String {
    let label = match issue.kind {
        IssueKind::Error => "Error",
        IssueKind::Warning => "Warning",
    };
    let number = format!("{}{:0width$}:", label, index, width = width);
    let mut out = String::new();
    if color {
        let paint = match issue.kind {
            IssueKind::Error => Color::Red,
            IssueKind::Warning => Color::Yellow,
        };
        let _ = write!(
            out,
            "{} {} {}",
            paint.bold().paint(number),
            Style::new().underline().paint(issue.lineref()),
            issue.message
        );
    } else {
        let _ = write!(out, "{} {} {}", number, issue.lineref(), issue.message);
    }

    if let Some(code) = &issue.code {
        let _ = write!(out, "\n  | {}", code);
    }
    if let Some(range) = &issue.character_range {
        let range = if color {
            Color::Green.paint(range.as_str()).to_string()
        } else {
            range.clone()
        };
        let _ = write!(out, "\n  | {}", range);
    }
    for note in &issue.notes {
        out.push('\n');
        out.push_str(&render_note(note, color));
    }
    out
}

fn render_note(note: &Note, color: bool) -> String {
    let label = match note.kind {
        NoteKind::Note => "note",
        NoteKind::ImplicitFix => "fix",
    };
    let label = if color {
        Color::Cyan.paint(label).to_string()
    } else {
        label.to_string()
    };
    let location = match (&note.file_path, note.line_number) {
        (Some(path), Some(line)) => format!(" {}:{}", path, line),
        _ => String::new(),
    };
    let mut out = format!("  {}{}: {}", label, location, note.message);
    if let Some(context) = &note.code_context {
        let _ = write!(out, "\n    | {}", context);
    }
    if let Some(indicator) = &note.fixit_indicator {
        let _ = write!(out, "\n    | {}", indicator);
    }
    if let Some(fix) = &note.suggested_fix {
        let fix = if color {
            Color::Green.paint(fix.as_str()).to_string()
        } else {
            fix.clone()
        };
        let _ = write!(out, "\n    = try: {}", fix);
    }
    out
}

/// Renders a whole report: errors first, then warnings, then a summary line.
pub fn render_report(report: &DiagnosticsReport, color: bool) -> String {
    if !report.success {
        return report.message.clone().unwrap_or_default();
    }
    let mut out = String::new();
    if let Some(log) = &report.log_file {
        let _ = writeln!(out, "{}", log);
    }
    let width = report.total().to_string().len();
    for (n, issue) in report.errors.iter().chain(&report.warnings).enumerate() {
        let _ = writeln!(out, "{}", render_issue(issue, n + 1, width, color));
    }
    let _ = write!(
        out,
        "{} error(s), {} warning(s)",
        report.error_count, report.warning_count
    );
    out
}
