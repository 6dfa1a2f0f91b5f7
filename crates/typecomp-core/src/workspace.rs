// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Workspace file discovery for the initial bulk scan.
//!
//! Walks the workspace root, prunes well-known tool and environment
//! directories, and keeps files matching the include globs but none of the
//! exclude globs. Results are sorted by path so repeated scans enumerate
//! files in the same order (completion order of the reads is still free).

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use thiserror::Error;
use walkdir::WalkDir;

// ============================================================================
// Errors
// ============================================================================

/// Errors that abort a workspace walk before any file is read.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("workspace root not found: {}", path.display())]
    RootNotFound { path: PathBuf },

    #[error("invalid glob pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

// ============================================================================
// Default Exclusion Patterns
// ============================================================================

/// Directories never descended into.
const DEFAULT_EXCLUDE_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    ".ruff_cache",
    ".venv",
    "venv",
    ".tox",
    ".nox",
    "build",
    "dist",
    ".eggs",
    "*.egg-info",
];

fn is_excluded_dir(name: &str) -> bool {
    DEFAULT_EXCLUDE_DIRS.iter().any(|pattern| match pattern.strip_prefix('*') {
        Some(suffix) => name.ends_with(suffix),
        None => name == *pattern,
    })
}

// ============================================================================
// Discovery
// ============================================================================

/// Include/exclude glob configuration for a scan.
#[derive(Debug, Clone)]
pub struct FileFilter {
    include: GlobSet,
    exclude: GlobSet,
}

impl FileFilter {
    /// Compile include and exclude patterns. Patterns match workspace-relative
    /// paths with forward slashes.
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, ScanError> {
        Ok(FileFilter {
            include: build_globset(include)?,
            exclude: build_globset(exclude)?,
        })
    }

    /// Whether a workspace-relative path is selected.
    pub fn matches(&self, relative: &str) -> bool {
        self.include.is_match(relative) && !self.exclude.is_match(relative)
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, ScanError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| ScanError::InvalidPattern {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| ScanError::InvalidPattern {
        pattern: patterns.join(", "),
        reason: e.to_string(),
    })
}

/// List files under `root` selected by `filter`, as absolute paths sorted
/// lexicographically.
///
/// A relative `root` is resolved against the current directory without
/// following symlinks.
pub fn discover_files(root: &Path, filter: &FileFilter) -> Result<Vec<PathBuf>, ScanError> {
    let not_found = || ScanError::RootNotFound {
        path: root.to_path_buf(),
    };
    if !root.is_dir() {
        return Err(not_found());
    }
    let root = std::path::absolute(root).map_err(|_| not_found())?;
    let root = root.as_path();

    let mut files = Vec::new();
    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        // Never prune the root itself, even if it is named like an excluded dir.
        entry.depth() == 0
            || !entry.file_type().is_dir()
            || !is_excluded_dir(&entry.file_name().to_string_lossy())
    });

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative = relative
            .to_string_lossy()
            .replace(std::path::MAIN_SEPARATOR, "/");
        if filter.matches(&relative) {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort();
    tracing::debug!(root = %root.display(), count = files.len(), "discovered workspace files");
    Ok(files)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn python_filter() -> FileFilter {
        FileFilter::new(&["**/*.py".to_string()], &[]).unwrap()
    }

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn finds_python_files_recursively() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.py");
        touch(dir.path(), "pkg/b.py");
        touch(dir.path(), "README.md");

        let files = discover_files(dir.path(), &python_filter()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["a.py", "pkg/b.py"]);
    }

    #[test]
    fn prunes_default_excluded_directories() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "app.py");
        touch(dir.path(), ".venv/lib/site.py");
        touch(dir.path(), "__pycache__/app.py");
        touch(dir.path(), "thing.egg-info/setup.py");

        let files = discover_files(dir.path(), &python_filter()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("app.py"));
    }

    #[test]
    fn exclude_patterns_remove_matches() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/a.py");
        touch(dir.path(), "tests/test_a.py");

        let filter =
            FileFilter::new(&["**/*.py".to_string()], &["tests/**".to_string()]).unwrap();
        let files = discover_files(dir.path(), &filter).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("src/a.py"));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let err = FileFilter::new(&["[".to_string()], &[]).unwrap_err();
        assert!(matches!(err, ScanError::InvalidPattern { .. }));
    }

    #[test]
    fn relative_root_yields_absolute_paths() {
        // Tests run from the crate directory.
        let filter = FileFilter::new(&["*.rs".to_string()], &[]).unwrap();
        let files = discover_files(Path::new("./src"), &filter).unwrap();
        assert!(!files.is_empty());
        assert!(files.iter().all(|p| p.is_absolute()));
        assert!(files.iter().any(|p| p.ends_with("src/workspace.rs")));
        assert!(files
            .iter()
            .all(|p| !p.components().any(|c| c == std::path::Component::CurDir)));
    }

    #[test]
    fn missing_root_is_an_error() {
        let err = discover_files(Path::new("/no/such/workspace"), &python_filter()).unwrap_err();
        assert!(matches!(err, ScanError::RootNotFound { .. }));
    }
}
