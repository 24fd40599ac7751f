#![doc = include_str!("../README.md")]

pub mod prelude {
    pub use std::fs;
    pub use std::io;
    pub use std::path::{Path, PathBuf};
    pub use log::{debug, error, info, log_enabled, warn, Level};
}

pub mod classifier;
pub use classifier::{match_header, HeaderForm, HeaderMatch};
pub mod diagnostic;
pub use diagnostic::{DiagnosticIssue, IssueKind, Note, NoteKind, ParseOutcome, ScanStats};
pub mod engine;
pub use engine::DiagnosticParser;
pub mod error;
pub use error::{ExtractError, RpcError};
pub mod extract;
pub use extract::{ExtractorKind, GunzipExtractor, LogExtractor, PlainTextExtractor};
pub mod locate;
pub use locate::{DerivedData, ProjectInfo};
pub mod report;
pub use report::{extract_diagnostics, DiagnosticsReport};
pub mod cli;
pub use cli::Cli;
pub mod fmt;
pub mod matcher;
pub mod server;
pub use server::McpServer;
