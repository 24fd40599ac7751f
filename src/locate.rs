use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Extension of the build logs Xcode writes under `Logs/Build`.
pub const BUILD_LOG_EXTENSION: &str = "xcactivitylog";

/// A project directory found under DerivedData.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub project_name: String,
    pub directory_name: String,
    pub full_path: String,
    pub has_build_logs: bool,
    pub last_modified: Option<String>,
}

/// An Xcode DerivedData tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedData {
    root: PathBuf,
}

impl DerivedData {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DerivedData { root: root.into() }
    }

    /// `$HOME/Library/Developer/Xcode/DerivedData`, or a relative path of the
    /// same shape when `HOME` is unset.
    pub fn default_root() -> PathBuf {
        let base = std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_default();
        base.join("Library")
            .join("Developer")
            .join("Xcode")
            .join("DerivedData")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn build_logs_dir(&self, project_dir_name: &str) -> PathBuf {
        self.root.join(project_dir_name).join("Logs").join("Build")
    }

    /// All project directories, most recently modified first. A missing
    /// DerivedData directory is not an error and yields no projects.
    pub fn list_projects(&self) -> Result<Vec<ProjectInfo>> {
        if !self.root.is_dir() {
            log::debug!("no DerivedData at {}", self.root.display());
            return Ok(Vec::new());
        }

        let mut projects = Vec::new();
        for entry in fs::read_dir(&self.root)
            .with_context(|| format!("Reading directory {:?}", self.root))?
        {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let directory_name = entry.file_name().to_string_lossy().to_string();
            // Directories are named `<Project>-<hash>`.
            let project_name = directory_name
                .split('-')
                .next()
                .unwrap_or(&directory_name)
                .to_string();
            let mtime = entry.metadata().and_then(|m| m.modified()).ok();
            projects.push((
                mtime,
                ProjectInfo {
                    project_name,
                    has_build_logs: self.build_logs_dir(&directory_name).is_dir(),
                    directory_name,
                    full_path: path.display().to_string(),
                    last_modified: mtime.map(iso_timestamp),
                },
            ));
        }

        // Unknown mtimes sort last.
        projects.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(projects.into_iter().map(|(_, info)| info).collect())
    }

    /// The newest build log of a project, if it has any.
    pub fn latest_build_log(&self, project_dir_name: &str) -> Option<PathBuf> {
        let logs_dir = self.build_logs_dir(project_dir_name);
        if !logs_dir.is_dir() {
            return None;
        }
        let pattern = format!(
            "{}/*.{}",
            glob::Pattern::escape(&logs_dir.to_string_lossy()),
            BUILD_LOG_EXTENSION
        );
        let entries = match glob::glob(&pattern) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("bad log pattern {}: {}", pattern, e);
                return None;
            }
        };

        let mut logs: Vec<(SystemTime, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|path| {
                let mtime = fs::metadata(&path).and_then(|m| m.modified()).ok()?;
                Some((mtime, path))
            })
            .collect();
        logs.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        let latest = logs.into_iter().next().map(|(_, path)| path);
        log::debug!("latest build log for {}: {:?}", project_dir_name, latest);
        latest
    }
}

impl Default for DerivedData {
    fn default() -> Self {
        DerivedData::new(DerivedData::default_root())
    }
}

/// Local time in ISO-8601 with microseconds.
pub fn iso_timestamp(time: SystemTime) -> String {
    DateTime::<Local>::from(time)
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

/// Modification time of `path` as an ISO-8601 string.
pub fn modified_timestamp(path: &Path) -> Option<String> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(iso_timestamp)
}
