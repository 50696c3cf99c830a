//! Per-file syntax validation over the repository's graph directories.
//!
//! Unlike assembly, every file is parsed independently into a fresh graph and
//! failures are collected rather than aborting the walk.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::assemble::discover_graph_files;
use crate::config::PipelineConfig;
use crate::error::{ParseError, PipelineError, Result};
use crate::graph::{Graph, RdfSyntax};

/// Outcome for one checked file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxEntry {
    pub path: PathBuf,
    pub syntax: RdfSyntax,
    /// Triple count on success
    pub outcome: std::result::Result<usize, String>,
}

impl SyntaxEntry {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

impl fmt::Display for SyntaxEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Ok(_) => write!(f, "OK [{}]: {}", self.syntax.name(), self.path.display()),
            Err(message) => write!(
                f,
                "ERR [{}]: {}: {}",
                self.syntax.name(),
                self.path.display(),
                message
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyntaxReport {
    pub checked: usize,
    pub failed: usize,
    pub entries: Vec<SyntaxEntry>,
    /// Directory names shown in the "no files" summary
    pub targets: Vec<String>,
}

impl SyntaxReport {
    pub fn passed(&self) -> bool {
        self.failed == 0
    }

    pub fn exit_code(&self) -> i32 {
        if self.passed() { 0 } else { 1 }
    }

    /// Final summary line.
    pub fn summary(&self) -> String {
        if self.checked == 0 {
            format!(
                "No RDF files found in target directories ({}).",
                self.targets.join(", ")
            )
        } else if self.failed > 0 {
            format!(
                "Validation failed: {} file(s) errored out of {}.",
                self.failed, self.checked
            )
        } else {
            format!("Validation passed: {} file(s) checked.", self.checked)
        }
    }

    fn record(&mut self, entry: SyntaxEntry) {
        self.checked += 1;
        if !entry.is_ok() {
            self.failed += 1;
        }
        self.entries.push(entry);
    }
}

fn describe(error: &ParseError) -> String {
    match (error.line, error.column) {
        (Some(line), Some(column)) => format!("line {line}, column {column}: {}", error.message),
        _ => error.message.clone(),
    }
}

/// Parse one file into a throwaway graph.
pub fn check_file(path: &Path, syntax: RdfSyntax) -> SyntaxEntry {
    let outcome = match Graph::new().parse_file(path, syntax) {
        Ok(count) => Ok(count),
        Err(PipelineError::Parse(error)) => Err(describe(&error)),
        Err(other) => Err(other.to_string()),
    };
    match &outcome {
        Ok(count) => tracing::debug!(path = %path.display(), triples = count, "syntax ok"),
        Err(message) => tracing::debug!(path = %path.display(), error = %message, "syntax error"),
    }
    SyntaxEntry {
        path: path.to_path_buf(),
        syntax,
        outcome,
    }
}

/// Check every recognized graph file under the given directories. Directories
/// are visited in the order given, files within each in path order; missing
/// directories are skipped.
pub fn check_dirs(dirs: &[PathBuf]) -> Result<SyntaxReport> {
    let mut report = SyntaxReport {
        targets: dirs
            .iter()
            .map(|dir| {
                dir.file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| dir.display().to_string())
            })
            .collect(),
        ..SyntaxReport::default()
    };
    for dir in dirs {
        if !dir.is_dir() {
            tracing::debug!(dir = %dir.display(), "target directory missing; skipped");
            continue;
        }
        for path in discover_graph_files(dir)? {
            let Some(syntax) = RdfSyntax::from_path(&path) else {
                continue;
            };
            report.record(check_file(&path, syntax));
        }
    }
    Ok(report)
}

/// Check the configured syntax target directories.
pub fn check_targets(config: &PipelineConfig) -> Result<SyntaxReport> {
    let _span = crate::logging::stage_span("validate-rdf").entered();
    let report = check_dirs(&config.syntax_targets)?;
    tracing::info!(checked = report.checked, failed = report.failed, "syntax check finished");
    Ok(report)
}
