//! Staging workspaces
//!
//! The engine runs a copy of the test file inside a fresh directory so that concurrent and
//! repeated runs never see each other's files. Dependencies are copied alongside it at the same
//! relative locations, keeping every relative `require` valid inside the copy.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use thiserror::Error;
use tracing::debug;

use super::resolver::DependencyNode;

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("cannot create staging directory under {}: {error}", .path.display())]
    Prepare { path: PathBuf, error: io::Error },

    #[error("cannot stage {}: {error}", .from.display())]
    Copy { from: PathBuf, error: io::Error },

    #[error("cannot lay out {} relative to the test file", .path.display())]
    Layout { path: PathBuf },
}

/// Creates one workspace per execution under a common root.
#[derive(Debug, Clone)]
pub struct StagingManager {
    root: PathBuf,
}

/// A staged copy of a test file and its dependencies.
///
/// Removed by [`dispose`](Self::dispose); dropping it also removes the directory, ignoring errors.
#[derive(Debug)]
pub struct StagingWorkspace {
    dir: TempDir,
    entry_file: PathBuf,
}

impl StagingWorkspace {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn entry_file(&self) -> &Path {
        &self.entry_file
    }

    /// Remove the workspace directory.
    pub fn dispose(self) -> io::Result<()> {
        self.dir.close()
    }
}

impl StagingManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stage(&self, entry: &Path, dependencies: &[DependencyNode]) -> Result<StagingWorkspace, StagingError> {
        fs::create_dir_all(&self.root).map_err(|error| StagingError::Prepare {
            path: self.root.clone(),
            error,
        })?;
        let dir = tempfile::Builder::new()
            .prefix("casper-")
            .tempdir_in(&self.root)
            .map_err(|error| StagingError::Prepare {
                path: self.root.clone(),
                error,
            })?;

        let entry = entry.canonicalize().map_err(|error| StagingError::Copy {
            from: entry.to_path_buf(),
            error,
        })?;
        let entry_dir = entry.parent().ok_or_else(|| StagingError::Layout { path: entry.clone() })?;

        // Normally the entry's own directory; widened when a dependency lives above it.
        let base = dependencies
            .iter()
            .filter_map(|dep| dep.path.parent())
            .fold(entry_dir.to_path_buf(), |base, parent| common_ancestor(&base, parent));
        if base.as_os_str().is_empty() {
            return Err(StagingError::Layout { path: entry });
        }

        let entry_file = copy_into(dir.path(), &base, &entry)?;
        for dep in dependencies {
            copy_into(dir.path(), &base, &dep.path)?;
        }
        debug!(
            "staged {} with {} dependencies in {}",
            entry.display(),
            dependencies.len(),
            dir.path().display()
        );

        Ok(StagingWorkspace { dir, entry_file })
    }
}

/// Copy `file` to `root/<file relative to base>`, returning the destination.
fn copy_into(root: &Path, base: &Path, file: &Path) -> Result<PathBuf, StagingError> {
    let relative = file
        .strip_prefix(base)
        .map_err(|_| StagingError::Layout { path: file.to_path_buf() })?;
    let dest = root.join(relative);
    let copy_error = |error| StagingError::Copy {
        from: file.to_path_buf(),
        error,
    };
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(copy_error)?;
    }
    fs::copy(file, &dest).map_err(copy_error)?;
    Ok(dest)
}

fn common_ancestor(a: &Path, b: &Path) -> PathBuf {
    a.components()
        .zip(b.components())
        .take_while(|(x, y)| x == y)
        .map(|(c, _)| c)
        .collect()
}
