//! Line classification for Xcode build-log text.
//!
//! A line is first offered to the header cascade, which decides whether it
//! opens a new error or warning. Lines that follow a header are offered to
//! the continuation classifiers instead (notes, caret/tilde indicators,
//! indented source context). Nothing in here fails: a line that matches no
//! pattern is simply not interesting.

use crate::diagnostic::IssueKind;
use crate::matcher::{MatcherCascade, PatternMatcher};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// The ranked variants of the diagnostic header recognizer.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum HeaderForm {
    /// `<path>:<line>:<col>: (error|warning): <message>`
    Main,
    /// `<path>:<line>: (error|warning): expected <message>`, column 1.
    Abbreviated,
    /// Swift source, warning, message names a Swift concurrency keyword.
    SwiftConcurrency,
    /// Any path, warning, message mentions concurrency or isolation.
    GenericConcurrency,
}

impl HeaderForm {
    /// Cascade order.
    pub const ALL: [HeaderForm; 4] = [
        HeaderForm::Main,
        HeaderForm::Abbreviated,
        HeaderForm::SwiftConcurrency,
        HeaderForm::GenericConcurrency,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            HeaderForm::Main => "main",
            HeaderForm::Abbreviated => "abbreviated",
            HeaderForm::SwiftConcurrency => "swift_concurrency",
            HeaderForm::GenericConcurrency => "generic_concurrency",
        }
    }

    fn matcher(&self) -> &'static PatternMatcher<HeaderMatch> {
        match self {
            HeaderForm::Main => &*MAIN_HEADER,
            HeaderForm::Abbreviated => &*ABBREVIATED_HEADER,
            HeaderForm::SwiftConcurrency => &*SWIFT_CONCURRENCY_HEADER,
            HeaderForm::GenericConcurrency => &*GENERIC_CONCURRENCY_HEADER,
        }
    }

    /// Tries this form alone, outside the cascade.
    pub fn try_match(&self, line: &str) -> Option<HeaderMatch> {
        self.matcher().apply(line)
    }
}

/// Keywords that qualify a `.swift` warning for [`HeaderForm::SwiftConcurrency`].
pub const SWIFT_CONCURRENCY_KEYWORDS: [&str; 4] =
    ["concurrency-safe", "global shared", "Swift 6", "nonisolated"];

/// Keywords that qualify a warning for [`HeaderForm::GenericConcurrency`].
pub const GENERIC_CONCURRENCY_KEYWORDS: [&str; 4] =
    ["concurrency", "thread safety", "isolation", "actor"];

/// Phrases worth a debug line when they show up in a log.
pub const CONCURRENCY_HINT_TERMS: [&str; 6] = [
    "concurrency-safe",
    "nonisolated global",
    "Swift 6 language mode",
    "thread safety",
    "actor isolation",
    "sendable",
];

/// Fields pulled out of a primary diagnostic line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMatch {
    pub form: HeaderForm,
    pub kind: IssueKind,
    pub file_path: String,
    pub line_number: u32,
    pub column: u32,
    pub message: String,
}

impl HeaderMatch {
    fn build(
        form: HeaderForm,
        path: &str,
        line: &str,
        column: Option<&str>,
        level: &str,
        message: &str,
    ) -> Option<Self> {
        let file_path = path.trim();
        let message = message.trim();
        if file_path.is_empty() || message.is_empty() {
            return None;
        }
        let column = match column {
            Some(col) => col.parse().ok()?,
            None => 1,
        };
        Some(HeaderMatch {
            form,
            kind: IssueKind::from_level(level)?,
            file_path: file_path.to_string(),
            line_number: line.parse().ok()?,
            column,
            message: message.to_string(),
        })
    }

    /// `file_path:line_number`, the key of the shared code-context map.
    pub fn coordinate(&self) -> String {
        coordinate_key(&self.file_path, self.line_number)
    }
}

/// Fields pulled out of a `note:` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteMatch {
    pub file_path: String,
    pub line_number: u32,
    pub column: u32,
    pub message: String,
}

impl NoteMatch {
    pub fn coordinate(&self) -> String {
        coordinate_key(&self.file_path, self.line_number)
    }
}

pub fn coordinate_key(file_path: &str, line_number: u32) -> String {
    format!("{}:{}", file_path, line_number)
}

/// What a line following a header means for that header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    Note(NoteMatch),
    FixitIndicator,
    CodeContext,
    Terminator,
}

fn full_form(form: HeaderForm) -> impl Fn(&Captures<'_>) -> Option<HeaderMatch> {
    move |caps: &Captures<'_>| HeaderMatch::build(form, &caps[1], &caps[2], Some(&caps[3]), &caps[4], &caps[5])
}

static MAIN_HEADER: Lazy<PatternMatcher<HeaderMatch>> = Lazy::new(|| {
    PatternMatcher::new(
        HeaderForm::Main.name(),
        r"([^:]+):(\d+):(\d+): (error|warning): (.+)",
        full_form(HeaderForm::Main),
    )
    .expect("Invalid regex")
});

static ABBREVIATED_HEADER: Lazy<PatternMatcher<HeaderMatch>> = Lazy::new(|| {
    PatternMatcher::new(
        HeaderForm::Abbreviated.name(),
        r"([^:]+):(\d+): (error|warning): (expected .+)",
        |caps| {
            HeaderMatch::build(
                HeaderForm::Abbreviated,
                &caps[1],
                &caps[2],
                None,
                &caps[3],
                &caps[4],
            )
        },
    )
    .expect("Invalid regex")
});

static SWIFT_CONCURRENCY_HEADER: Lazy<PatternMatcher<HeaderMatch>> = Lazy::new(|| {
    PatternMatcher::new(
        HeaderForm::SwiftConcurrency.name(),
        &format!(
            r"([^:]+\.swift):(\d+):(\d+): (warning): (.+(?:{}).+)",
            alternation(&SWIFT_CONCURRENCY_KEYWORDS)
        ),
        full_form(HeaderForm::SwiftConcurrency),
    )
    .expect("Invalid regex")
});

static GENERIC_CONCURRENCY_HEADER: Lazy<PatternMatcher<HeaderMatch>> = Lazy::new(|| {
    PatternMatcher::new(
        HeaderForm::GenericConcurrency.name(),
        &format!(
            r"([^:]+):(\d+):(\d+): (warning): (.+(?:{}).+)",
            alternation(&GENERIC_CONCURRENCY_KEYWORDS)
        ),
        full_form(HeaderForm::GenericConcurrency),
    )
    .expect("Invalid regex")
});

static HEADER_CASCADE: Lazy<MatcherCascade<HeaderMatch>> = Lazy::new(|| {
    HeaderForm::ALL
        .iter()
        .fold(MatcherCascade::new(), |cascade, form| {
            cascade.with_matcher(form.matcher().clone())
        })
});

static NOTE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^:]+):(\d+):(\d+): note: (.+)").expect("Invalid regex"));

static FIXIT_INDICATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[\^~][\^~\s]*$").expect("Invalid regex"));

static INDENTED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s+").expect("Invalid regex"));

fn alternation(keywords: &[&str]) -> String {
    keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|")
}

/// Runs the header cascade: main, abbreviated, Swift concurrency, generic
/// concurrency. At most one form ever answers for a line.
pub fn match_header(line: &str) -> Option<HeaderMatch> {
    HEADER_CASCADE.first_match(line)
}

pub fn header_form_names() -> Vec<&'static str> {
    HEADER_CASCADE.names()
}

pub fn match_note(line: &str) -> Option<NoteMatch> {
    let caps = NOTE_LINE.captures(line)?;
    let file_path = caps[1].trim();
    let message = caps[4].trim();
    if file_path.is_empty() || message.is_empty() {
        return None;
    }
    Some(NoteMatch {
        file_path: file_path.to_string(),
        line_number: caps[2].parse().ok()?,
        column: caps[3].parse().ok()?,
        message: message.to_string(),
    })
}

/// A line made only of `^` and `~` markers (spaces between them allowed).
pub fn is_fixit_indicator(line: &str) -> bool {
    FIXIT_INDICATOR.is_match(line)
}

/// Any header form or a note line.
pub fn is_diagnostic_line(line: &str) -> bool {
    match_header(line).is_some() || match_note(line).is_some()
}

pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Text that can stand in as source context: not blank, not a diagnostic or
/// note, not a marker line.
pub fn is_plain_context_line(line: &str) -> bool {
    !is_blank(line) && !is_diagnostic_line(line) && !is_fixit_indicator(line)
}

/// Secondary classification used while collecting a header's trailing lines.
///
/// A line that opens a diagnostic of its own always terminates, so the outer
/// scan gets to see it.
pub fn classify_continuation(line: &str) -> Continuation {
    if match_header(line).is_some() {
        return Continuation::Terminator;
    }
    if let Some(note) = match_note(line) {
        Continuation::Note(note)
    } else if is_fixit_indicator(line) {
        Continuation::FixitIndicator
    } else if INDENTED.is_match(line) {
        Continuation::CodeContext
    } else {
        Continuation::Terminator
    }
}
