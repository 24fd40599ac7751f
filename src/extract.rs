//! Turning a build log file into text lines for the parser.

use crate::error::ExtractError;
use clap::ValueEnum;
use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

/// Shortest printable run kept from decompressed data, as `strings` does.
pub const DEFAULT_MIN_RUN: usize = 4;

/// Supplies the text lines of a log.
pub trait LogExtractor: Send + Sync {
    fn extract_lines(&self, log: &Path) -> Result<Vec<String>, ExtractError>;
}

/// Selects a [`LogExtractor`] from the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ExtractorKind {
    /// gzip-compressed `.xcactivitylog` (decompressed with `gunzip -c`)
    #[default]
    Gunzip,
    /// the log file is already plain text
    Plain,
}

impl ExtractorKind {
    pub fn build(self) -> Box<dyn LogExtractor> {
        match self {
            ExtractorKind::Gunzip => Box::new(GunzipExtractor::default()),
            ExtractorKind::Plain => Box::new(PlainTextExtractor),
        }
    }
}

/// Decompresses with the system `gunzip` and keeps the printable runs.
#[derive(Debug, Clone, Copy)]
pub struct GunzipExtractor {
    pub min_run: usize,
}

impl Default for GunzipExtractor {
    fn default() -> Self {
        GunzipExtractor {
            min_run: DEFAULT_MIN_RUN,
        }
    }
}

impl LogExtractor for GunzipExtractor {
    fn extract_lines(&self, log: &Path) -> Result<Vec<String>, ExtractError> {
        log::debug!("decompressing {}", log.display());
        let child = Command::new("gunzip")
            .arg("-c")
            .arg(log)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExtractError::Spawn {
                program: "gunzip",
                source,
            })?;

        // Collects stdout and stderr concurrently.
        let output = child
            .wait_with_output()
            .map_err(|source| ExtractError::Read {
                path: log.to_path_buf(),
                source,
            })?;
        if !output.status.success() {
            return Err(ExtractError::Exit {
                program: "gunzip",
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        log::debug!(
            "{} bytes decompressed from {}",
            output.stdout.len(),
            log.display()
        );
        Ok(printable_runs(&output.stdout, self.min_run))
    }
}

/// Reads a log that is already text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl LogExtractor for PlainTextExtractor {
    fn extract_lines(&self, log: &Path) -> Result<Vec<String>, ExtractError> {
        let bytes = fs::read(log).map_err(|source| ExtractError::Read {
            path: log.to_path_buf(),
            source,
        })?;
        Ok(String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_string)
            .collect())
    }
}

fn is_printable(byte: u8) -> bool {
    byte == b'\t' || (0x20..0x7f).contains(&byte)
}

/// Splits binary data into maximal runs of printable ASCII (space, tab and
/// the visible characters), dropping runs shorter than `min_run`.
pub fn printable_runs(data: &[u8], min_run: usize) -> Vec<String> {
    data.split(|b| !is_printable(*b))
        .filter(|run| !run.is_empty() && run.len() >= min_run)
        .map(|run| run.iter().map(|b| char::from(*b)).collect())
        .collect()
}
