//! Test discovery
//!
//! Reads script sources, parses them with `casper_syntax` and matches the configured
//! [`CallPattern`] against every top-level statement. Failures are isolated per file: a
//! file that cannot be read or parsed becomes a [`DiscoveryError`] and the rest of the
//! batch is still discovered.

mod matcher;

use std::fs;
use std::path::{Path, PathBuf};

use casper_syntax::{ParseError, ParseReport, parse_source};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

pub use matcher::{CallPattern, Declaration, PatternError, find_declarations};

/// A discovered test declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TestCase {
    /// `<source path>::<display name>`
    pub id: String,
    pub display_name: String,
    pub source_file: PathBuf,
    /// 1-based
    pub line: usize,
    /// 0-based
    pub column: usize,
}

impl TestCase {
    pub fn new(source_file: impl Into<PathBuf>, display_name: impl Into<String>, line: usize, column: usize) -> Self {
        let source_file = source_file.into();
        let display_name = display_name.into();
        Self {
            id: format!("{}::{}", source_file.display(), display_name),
            display_name,
            source_file,
            line,
            column,
        }
    }
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to read {}: {error}", .path.display())]
    Read { path: PathBuf, error: std::io::Error },
    #[error("{}:{error}", .path.display())]
    Parse {
        path: PathBuf,
        error: ParseError,
        /// Source text, kept for rendering
        text: String,
    },
}

impl DiscoveryError {
    pub fn path(&self) -> &Path {
        match self {
            DiscoveryError::Read { path, .. } | DiscoveryError::Parse { path, .. } => path,
        }
    }

    /// Rich rendering for parse failures.
    pub fn report(&self) -> Option<ParseReport> {
        match self {
            DiscoveryError::Parse { path, error, text } => Some(error.to_report(&path.display().to_string(), text)),
            DiscoveryError::Read { .. } => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct DiscoveryReport {
    pub cases: Vec<TestCase>,
    pub errors: Vec<DiscoveryError>,
}

/// Discover test cases in every source, in the order given.
#[tracing::instrument(skip_all, fields(sources = sources.len(), pattern = %pattern))]
pub fn discover(sources: &[PathBuf], pattern: &CallPattern) -> DiscoveryReport {
    let mut report = DiscoveryReport::default();
    for path in sources {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(error) => {
                warn!("cannot read {}: {}", path.display(), error);
                report.errors.push(DiscoveryError::Read {
                    path: path.clone(),
                    error,
                });
                continue;
            }
        };
        match discover_source(path, &text, pattern) {
            Ok(cases) => {
                debug!("{}: {} test(s)", path.display(), cases.len());
                report.cases.extend(cases);
            }
            Err(error) => {
                warn!("cannot parse {}: {}", path.display(), error);
                report.errors.push(DiscoveryError::Parse {
                    path: path.clone(),
                    error,
                    text,
                });
            }
        }
    }
    report
}

/// Discover test cases in already-loaded source text.
pub fn discover_source(path: &Path, text: &str, pattern: &CallPattern) -> Result<Vec<TestCase>, ParseError> {
    let program = parse_source(text)?;
    Ok(find_declarations(&program, text, pattern)
        .into_iter()
        .map(|decl| TestCase::new(path, decl.name, decl.line, decl.column))
        .collect())
}

/// Script files under `path`: the path itself if it is a matching file, otherwise a recursive
/// walk that skips hidden directories and `node_modules`. Sorted.
pub fn collect_source_files(path: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    if path.is_file() {
        if has_extension(path, extensions) {
            files.push(path.to_path_buf());
        }
    } else if path.is_dir() {
        if let Ok(entries) = fs::read_dir(path) {
            for entry in entries.flatten() {
                let entry_path = entry.path();
                if entry_path.is_dir() {
                    let name = entry_path.file_name().and_then(|n| n.to_str()).unwrap_or("");
                    if !name.starts_with('.') && name != "node_modules" {
                        files.extend(collect_source_files(&entry_path, extensions));
                    }
                } else if has_extension(&entry_path, extensions) {
                    files.push(entry_path);
                }
            }
        }
    }

    files.sort();
    files
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|want| want.trim_start_matches('.') == ext))
}
