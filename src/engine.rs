//! The diagnostic parse engine.
//!
//! One forward pass over the lines. When a line opens a diagnostic, a
//! bounded lookahead collects the notes, caret/tilde indicators, fix
//! suggestions and source context that trail it, then the outer scan resumes
//! at the first line the lookahead did not take.

use crate::classifier::{
    classify_continuation, header_form_names, is_blank, is_diagnostic_line, is_fixit_indicator,
    is_plain_context_line, match_header, Continuation, HeaderMatch, NoteMatch,
    CONCURRENCY_HINT_TERMS,
};
use crate::diagnostic::{DiagnosticIssue, IssueKind, Note, ParseOutcome, ScanStats};
use crate::extract::LogExtractor;
use std::collections::HashMap;
use std::path::Path;

/// Source snippets keyed by `file_path:line_number`. First writer wins.
type CodeContextMap = HashMap<String, String>;

/// Parses build-log text into diagnostics.
///
/// The parser holds no state between calls, so one value can be reused for
/// any number of logs.
///
/// ```
/// use xcode_diagnostics::engine::DiagnosticParser;
///
/// let log = "/src/App.swift:3:5: error: cannot find 'foo' in scope\n    foo()\n    ^~~";
/// let outcome = DiagnosticParser::new(true).parse_text(log);
/// assert_eq!(outcome.error_count(), 1);
/// assert_eq!(outcome.issues[0].code.as_deref(), Some("    foo()"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticParser {
    include_warnings: bool,
}

impl Default for DiagnosticParser {
    fn default() -> Self {
        DiagnosticParser::new(true)
    }
}

impl DiagnosticParser {
    pub fn new(include_warnings: bool) -> Self {
        DiagnosticParser { include_warnings }
    }

    pub fn include_warnings(&self) -> bool {
        self.include_warnings
    }

    pub fn parse_text(&self, text: &str) -> ParseOutcome {
        let lines: Vec<&str> = text.lines().collect();
        self.parse_lines(lines.as_slice())
    }

    /// Obtains the log text through `extractor` and parses it. An extraction
    /// failure becomes a single synthetic error issue, never an `Err`.
    pub fn parse_log(&self, extractor: &dyn LogExtractor, log: &Path) -> ParseOutcome {
        match extractor.extract_lines(log) {
            Ok(lines) => {
                log_concurrency_hints(lines.as_slice());
                self.parse_lines(lines.as_slice())
            }
            Err(e) => {
                log::warn!("Error parsing log file {}: {}", log.display(), e);
                ParseOutcome {
                    issues: vec![DiagnosticIssue::extraction_failure(
                        &log.display().to_string(),
                        &e.to_string(),
                    )],
                    stats: ScanStats::default(),
                }
            }
        }
    }

    pub fn parse_lines<S: AsRef<str>>(&self, lines: &[S]) -> ParseOutcome {
        let lines: Vec<&str> = lines.iter().map(|l| l.as_ref()).collect();
        log::debug!(
            "scanning {} lines (warnings {}) with header forms {:?}",
            lines.len(),
            if self.include_warnings { "included" } else { "excluded" },
            header_form_names()
        );

        let mut contexts = CodeContextMap::new();
        let mut stats = ScanStats {
            total_lines: lines.len(),
            ..ScanStats::default()
        };
        let mut issues = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            let Some(header) = match_header(lines[i]) else {
                stats.skipped_lines += 1;
                i += 1;
                continue;
            };

            if header.kind == IssueKind::Warning && !self.include_warnings {
                // Keep the shared context map identical to a run with warnings.
                if let Some(code) = header_context(&lines, i) {
                    contexts
                        .entry(header.coordinate())
                        .or_insert_with(|| code.to_string());
                }
                stats.filtered_lines += 1;
                i += 1;
                continue;
            }

            let (issue, next) = Lookahead::open(&lines, i, header, &mut contexts).run();
            stats.header_lines += 1;
            stats.consumed_lines += next - (i + 1);
            issues.push(issue);
            i = next;
        }

        log::debug!(
            "scan finished: {} issues, {} headers, {} filtered, {} consumed, {} skipped",
            issues.len(),
            stats.header_lines,
            stats.filtered_lines,
            stats.consumed_lines,
            stats.skipped_lines
        );
        ParseOutcome { issues, stats }
    }
}

/// The line right after a header, when it reads as source context for it.
fn header_context<'a>(lines: &[&'a str], header_index: usize) -> Option<&'a str> {
    let line = *lines.get(header_index + 1)?;
    if is_blank(line) || is_diagnostic_line(line) || line.trim_start().starts_with('/') {
        return None;
    }
    Some(line.trim_end())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LookaheadState {
    Opened,
    CapturingContext,
    ConsumingNote(NoteMatch),
    ConsumingFixit,
    ConsumingCodeContext,
    Closed,
}

/// Collects everything that trails one retained header.
struct Lookahead<'a, 'm> {
    lines: &'a [&'a str],
    header_index: usize,
    cursor: usize,
    coordinate: String,
    issue: DiagnosticIssue,
    contexts: &'m mut CodeContextMap,
    scratch: Vec<String>,
}

impl<'a, 'm> Lookahead<'a, 'm> {
    fn open(
        lines: &'a [&'a str],
        header_index: usize,
        header: HeaderMatch,
        contexts: &'m mut CodeContextMap,
    ) -> Self {
        let coordinate = header.coordinate();
        let issue = DiagnosticIssue::new(
            header.kind,
            header.message,
            Some(header.file_path),
            Some(header.line_number),
            Some(header.column),
            header_index,
        );
        Lookahead {
            lines,
            header_index,
            cursor: header_index + 1,
            coordinate,
            issue,
            contexts,
            scratch: Vec::new(),
        }
    }

    /// Drives the state machine to `Closed` and returns the finished issue
    /// with the index of the first line not consumed.
    fn run(mut self) -> (DiagnosticIssue, usize) {
        let mut state = LookaheadState::Opened;
        loop {
            state = match state {
                LookaheadState::Opened => LookaheadState::CapturingContext,
                LookaheadState::CapturingContext => {
                    self.capture_header_context();
                    self.next_state()
                }
                LookaheadState::ConsumingNote(note) => {
                    self.consume_note(note);
                    self.next_state()
                }
                LookaheadState::ConsumingFixit => {
                    self.consume_fixit();
                    self.next_state()
                }
                LookaheadState::ConsumingCodeContext => {
                    self.consume_code_context();
                    self.next_state()
                }
                LookaheadState::Closed => break,
            };
        }
        log::trace!(
            "{} closed after {} lines ({} context lines, {} notes)",
            self.coordinate,
            self.cursor - self.header_index,
            self.scratch.len(),
            self.issue.notes.len()
        );
        (self.issue, self.cursor)
    }

    fn line(&self, index: usize) -> Option<&'a str> {
        self.lines.get(index).copied()
    }

    fn next_state(&self) -> LookaheadState {
        let Some(line) = self.line(self.cursor) else {
            return LookaheadState::Closed;
        };
        match classify_continuation(line) {
            Continuation::Note(note) => LookaheadState::ConsumingNote(note),
            Continuation::FixitIndicator => LookaheadState::ConsumingFixit,
            Continuation::CodeContext => LookaheadState::ConsumingCodeContext,
            Continuation::Terminator => LookaheadState::Closed,
        }
    }

    /// Does not move the cursor: the captured line is still classified.
    fn capture_header_context(&mut self) {
        if let Some(code) = header_context(self.lines, self.header_index) {
            self.issue.code = Some(code.to_string());
            self.contexts
                .entry(self.coordinate.clone())
                .or_insert_with(|| code.to_string());
        }
    }

    fn consume_note(&mut self, note: NoteMatch) {
        let code_context = self.contexts.get(&note.coordinate()).cloned();
        let mut out = Note::new(
            note.message,
            note.file_path,
            note.line_number,
            note.column,
            code_context,
        );

        let mut last = self.cursor;
        if let Some(indicator) = self.line(last + 1).filter(|l| is_fixit_indicator(l)) {
            last += 1;
            out.fixit_indicator = Some(indicator.trim_end().to_string());
            if let Some(fix) = self
                .line(last + 1)
                .filter(|l| !is_blank(l) && !is_diagnostic_line(l))
            {
                last += 1;
                out.suggested_fix = Some(fix.trim().to_string());
            }
        }
        self.issue.notes.push(out);
        self.cursor = last + 1;
    }

    fn consume_fixit(&mut self) {
        let indicator = self.lines[self.cursor].trim_end().to_string();

        if self.issue.code.is_none() {
            if let Some(prev) = self
                .line(self.cursor - 1)
                .filter(|l| is_plain_context_line(l))
            {
                self.issue.code = Some(prev.trim_end().to_string());
            }
        }
        if self.issue.character_range.is_none() {
            self.issue.character_range = Some(indicator.clone());
        }

        let mut last = self.cursor;
        if let Some(fix) = self.line(last + 1).filter(|l| is_plain_context_line(l)) {
            last += 1;
            let note = Note::implicit_fix(&self.issue, fix.trim().to_string(), indicator);
            self.issue.notes.push(note);
        }
        self.cursor = last + 1;
    }

    fn consume_code_context(&mut self) {
        let line = self.lines[self.cursor].trim_end();
        self.scratch.push(line.to_string());
        if self.issue.code.is_none() && !line.is_empty() {
            self.issue.code = Some(line.to_string());
        }
        self.cursor += 1;
    }
}

/// Debug telemetry: reports concurrency-flavored lines and whether the
/// header cascade recognizes them. Has no effect on parsing.
pub fn log_concurrency_hints<S: AsRef<str>>(lines: &[S]) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    for (index, line) in lines.iter().enumerate() {
        let line: &str = line.as_ref();
        if let Some(term) = CONCURRENCY_HINT_TERMS.iter().find(|t| line.contains(*t)) {
            let recognized = match_header(line).is_some();
            log::debug!(
                "line {}: '{}' hint ({}): {}",
                index,
                term,
                if recognized { "recognized" } else { "not recognized" },
                line
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::NoteKind;

    fn parse(lines: &[&str], include_warnings: bool) -> ParseOutcome {
        DiagnosticParser::new(include_warnings).parse_lines(lines)
    }

    #[test]
    fn header_context_is_captured_and_shared_with_notes() {
        let outcome = parse(
            &[
                "/a/One.swift:11:5: error: cannot assign to 'x'",
                "        x = 2",
                "/a/One.swift:11:5: note: change 'let' to 'var'",
            ],
            true,
        );
        assert_eq!(outcome.issues.len(), 1);
        let issue = &outcome.issues[0];
        assert_eq!(issue.code.as_deref(), Some("        x = 2"));
        assert_eq!(issue.notes.len(), 1);
        assert_eq!(issue.notes[0].kind, NoteKind::Note);
        assert_eq!(issue.notes[0].code_context.as_deref(), Some("        x = 2"));
        assert_eq!(outcome.stats.consumed_lines, 2);
    }

    #[test]
    fn first_context_for_a_coordinate_wins() {
        let outcome = parse(
            &[
                "/a/One.swift:4:1: error: first",
                "    original()",
                "/a/One.swift:4:9: error: second",
                "    replacement()",
                "/a/One.swift:4:2: error: third",
                "/a/One.swift:4:2: note: look here",
            ],
            true,
        );
        assert_eq!(outcome.issues.len(), 3);
        assert_eq!(outcome.issues[1].code.as_deref(), Some("    replacement()"));
        assert_eq!(
            outcome.issues[2].notes[0].code_context.as_deref(),
            Some("    original()")
        );
    }

    #[test]
    fn path_prefixed_line_is_not_header_context() {
        let outcome = parse(
            &["/a/One.swift:1:1: error: e", "/usr/bin/swiftc -frontend"],
            true,
        );
        assert_eq!(outcome.issues[0].code, None);
        assert_eq!(outcome.stats.skipped_lines, 1);
    }

    #[test]
    fn note_with_indicator_and_fix() {
        let outcome = parse(
            &[
                "/a/Two.swift:11:16: error: cannot assign",
                "/a/Two.swift:11:16: note: convert 'activityIdentifier' to a 'let' constant",
                "        ~~~ ^",
                "        let",
                "unrelated trailer",
            ],
            true,
        );
        let note = &outcome.issues[0].notes[0];
        assert_eq!(note.fixit_indicator.as_deref(), Some("        ~~~ ^"));
        assert_eq!(note.suggested_fix.as_deref(), Some("let"));
        assert_eq!(outcome.stats.consumed_lines, 3);
        assert_eq!(outcome.stats.skipped_lines, 1);
    }

    #[test]
    fn note_indicator_without_fix_before_next_note() {
        let outcome = parse(
            &[
                "/a/Two.swift:3:1: error: ambiguous",
                "/a/Two.swift:3:1: note: candidate one",
                "    ^",
                "/a/Two.swift:9:1: note: candidate two",
            ],
            true,
        );
        let notes = &outcome.issues[0].notes;
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].fixit_indicator.as_deref(), Some("    ^"));
        assert_eq!(notes[0].suggested_fix, None);
        assert_eq!(notes[1].message, "candidate two");
    }

    #[test]
    fn bare_indicator_sets_range_and_implicit_fix() {
        let outcome = parse(
            &[
                "/a/Three.swift:5:9: warning: variable was never mutated",
                "        var total = 0",
                "        ~~~ ^",
                "        let",
            ],
            true,
        );
        let issue = &outcome.issues[0];
        assert_eq!(issue.character_range.as_deref(), Some("        ~~~ ^"));
        assert_eq!(issue.notes.len(), 1);
        let fix = &issue.notes[0];
        assert_eq!(fix.kind, NoteKind::ImplicitFix);
        assert_eq!(fix.suggested_fix.as_deref(), Some("let"));
        assert_eq!(fix.fixit_indicator.as_deref(), Some("        ~~~ ^"));
        assert_eq!(fix.line_number, Some(5));
        assert_eq!(outcome.stats.consumed_lines, 3);
    }

    #[test]
    fn indicator_right_after_header_is_code_and_range() {
        let outcome = parse(
            &[
                "/a/Four.swift:1:1: error: e",
                "    ^~~~",
                "/a/Four.swift:1:1: note: here",
            ],
            true,
        );
        let issue = &outcome.issues[0];
        assert_eq!(issue.code.as_deref(), Some("    ^~~~"));
        assert_eq!(issue.character_range.as_deref(), Some("    ^~~~"));
        assert_eq!(issue.notes.len(), 1);
        assert_eq!(issue.notes[0].code_context.as_deref(), Some("    ^~~~"));
        assert_eq!(outcome.stats.consumed_lines, 2);
    }

    #[test]
    fn whitespace_only_line_keeps_lookahead_open() {
        let outcome = parse(
            &[
                "/a/Seven.swift:9:1: error: ambiguous use of 'f'",
                "    f()",
                "    ",
                "/a/X.swift:9:1: note: found this candidate",
            ],
            true,
        );
        let issue = &outcome.issues[0];
        assert_eq!(issue.code.as_deref(), Some("    f()"));
        assert_eq!(issue.notes.len(), 1);
        assert_eq!(issue.notes[0].message, "found this candidate");
        assert_eq!(outcome.stats.consumed_lines, 3);
        assert_eq!(outcome.stats.skipped_lines, 0);
    }

    #[test]
    fn whitespace_only_line_is_never_code() {
        let outcome = parse(&["/a/Eight.swift:2:1: error: e", "\t", "    x()"], true);
        assert_eq!(outcome.issues[0].code.as_deref(), Some("    x()"));
        assert_eq!(outcome.stats.consumed_lines, 2);
    }

    #[test]
    fn unindented_context_stops_lookahead() {
        let outcome = parse(
            &[
                "/a/AppDelegate.swift:15:10: error: missing required module 'UIKit'",
                "import UIKit",
                "       ^",
            ],
            true,
        );
        let issue = &outcome.issues[0];
        assert_eq!(issue.code.as_deref(), Some("import UIKit"));
        assert_eq!(issue.character_range, None);
        assert_eq!(outcome.stats.consumed_lines, 0);
        assert_eq!(outcome.stats.skipped_lines, 2);
    }

    #[test]
    fn blank_line_closes_lookahead() {
        let outcome = parse(
            &[
                "/a/Five.swift:2:2: error: e",
                "    call()",
                "",
                "    stray()",
            ],
            true,
        );
        assert_eq!(outcome.stats.consumed_lines, 1);
        assert_eq!(outcome.stats.skipped_lines, 2);
    }

    #[test]
    fn excluded_warning_skips_lookahead() {
        let lines = [
            "/a/Six.swift:1:1: warning: unused",
            "    let x = 1",
            "    ^",
            "/a/Six.swift:2:1: error: broken",
        ];
        let outcome = parse(&lines, false);
        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(outcome.issues[0].kind, IssueKind::Error);
        assert_eq!(outcome.issues[0].source_line, 3);
        assert_eq!(outcome.stats.filtered_lines, 1);
        assert_eq!(outcome.stats.skipped_lines, 2);
        assert_eq!(outcome.stats.attributed(), lines.len());
    }

    #[test]
    fn empty_input() {
        let outcome = parse(&[], true);
        assert!(outcome.issues.is_empty());
        assert_eq!(outcome.stats, ScanStats::default());
    }

    #[test]
    fn extraction_failure_becomes_synthetic_error() {
        struct Broken;
        impl LogExtractor for Broken {
            fn extract_lines(&self, log: &Path) -> Result<Vec<String>, crate::error::ExtractError> {
                Err(crate::error::ExtractError::Read {
                    path: log.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
                })
            }
        }
        let outcome =
            DiagnosticParser::new(true).parse_log(&Broken, Path::new("/logs/build.xcactivitylog"));
        assert_eq!(outcome.issues.len(), 1);
        let issue = &outcome.issues[0];
        assert_eq!(issue.kind, IssueKind::Error);
        assert!(issue.message.starts_with("Error parsing log file: "));
        assert!(issue.message.contains("denied"));
        assert_eq!(issue.file_path.as_deref(), Some("/logs/build.xcactivitylog"));
    }
}
