//! Assembles the result returned for one project's latest build.

use crate::diagnostic::{DiagnosticIssue, ParseOutcome};
use crate::engine::DiagnosticParser;
use crate::extract::LogExtractor;
use crate::locate::{modified_timestamp, DerivedData};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsReport {
    pub success: bool,
    pub message: Option<String>,
    pub log_file: Option<String>,
    pub timestamp: Option<String>,
    pub errors: Vec<DiagnosticIssue>,
    pub warnings: Vec<DiagnosticIssue>,
    pub error_count: usize,
    pub warning_count: usize,
}

impl DiagnosticsReport {
    pub fn not_found(project_dir_name: &str) -> Self {
        DiagnosticsReport {
            success: false,
            message: Some(format!(
                "No build logs found for project {}",
                project_dir_name
            )),
            ..DiagnosticsReport::default()
        }
    }

    /// Parses `log` and partitions the retained issues.
    pub fn from_log(extractor: &dyn LogExtractor, log: &Path, include_warnings: bool) -> Self {
        let outcome = DiagnosticParser::new(include_warnings).parse_log(extractor, log);
        DiagnosticsReport::from_outcome(log, outcome)
    }

    pub fn from_outcome(log: &Path, outcome: ParseOutcome) -> Self {
        let (errors, warnings) = outcome.into_partition();
        DiagnosticsReport {
            success: true,
            message: None,
            log_file: Some(log.display().to_string()),
            timestamp: modified_timestamp(log),
            error_count: errors.len(),
            warning_count: warnings.len(),
            errors,
            warnings,
        }
    }

    pub fn total(&self) -> usize {
        self.error_count + self.warning_count
    }
}

/// Diagnostics from the newest build log of `project_dir_name`.
pub fn extract_diagnostics(
    derived_data: &DerivedData,
    extractor: &dyn LogExtractor,
    project_dir_name: &str,
    include_warnings: bool,
) -> DiagnosticsReport {
    match derived_data.latest_build_log(project_dir_name) {
        Some(log) => {
            log::info!("parsing {}", log.display());
            DiagnosticsReport::from_log(extractor, &log, include_warnings)
        }
        None => DiagnosticsReport::not_found(project_dir_name),
    }
}
