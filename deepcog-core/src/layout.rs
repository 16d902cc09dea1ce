//! The project skeleton: an ordered list of directories and zero-byte placeholder files.

use crate::error::ScaffoldError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

/// Directories of the deep-research agent skeleton, in creation order.
pub const DEFAULT_DIRECTORIES: &[&str] = &[
    "app/graph",
    "app/agent",
    "app/tools",
    "app/subagents",
    "app/memory",
    "app/utils",
    "tests",
    "notebooks",
];

/// Placeholder files of the skeleton, in creation order.
pub const DEFAULT_FILES: &[&str] = &[
    "app/graph/state.py",
    "app/graph/builder.py",
    "app/graph/nodes.py",
    "app/tools/planning.py",
    "app/tools/filesystem.py",
    "app/tools/delegation.py",
    "app/tools/search.py",
    "app/subagents/researcher.py",
    "app/subagents/summarizer.py",
    "app/memory/file_store.py",
    "app/utils/helpers.py",
    "tests/test_planning.py",
];

/// What a layout path should become on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Directory,
    PlaceholderFile,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryKind::Directory => write!(f, "directory"),
            EntryKind::PlaceholderFile => write!(f, "file"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutEntry {
    /// Path relative to the scaffold root.
    pub path: PathBuf,
    pub kind: EntryKind,
}

/// An ordered skeleton. Directories always precede files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    entries: Vec<LayoutEntry>,
}

impl Default for Layout {
    fn default() -> Self {
        Self::from_paths(
            DEFAULT_DIRECTORIES.iter().copied(),
            DEFAULT_FILES.iter().copied(),
        )
    }
}

impl Layout {
    /// Build a layout from directory and file paths.
    pub fn from_paths<D, F>(
        directories: impl IntoIterator<Item = D>,
        files: impl IntoIterator<Item = F>,
    ) -> Self
    where
        D: Into<PathBuf>,
        F: Into<PathBuf>,
    {
        let mut layout = Self {
            entries: Vec::new(),
        };
        layout.extend(directories, files);
        layout
    }

    /// Append directories and files, keeping directories ahead of files.
    pub fn extend<D, F>(
        &mut self,
        directories: impl IntoIterator<Item = D>,
        files: impl IntoIterator<Item = F>,
    ) where
        D: Into<PathBuf>,
        F: Into<PathBuf>,
    {
        let split = self
            .entries
            .iter()
            .position(|e| e.kind == EntryKind::PlaceholderFile)
            .unwrap_or(self.entries.len());
        let mut files_tail = self.entries.split_off(split);

        self.entries
            .extend(directories.into_iter().map(|d| LayoutEntry {
                path: d.into(),
                kind: EntryKind::Directory,
            }));
        files_tail.extend(files.into_iter().map(|f| LayoutEntry {
            path: f.into(),
            kind: EntryKind::PlaceholderFile,
        }));
        self.entries.append(&mut files_tail);
    }

    pub fn entries(&self) -> &[LayoutEntry] {
        &self.entries
    }

    pub fn directories(&self) -> impl Iterator<Item = &Path> {
        self.entries
            .iter()
            .filter(|e| e.kind == EntryKind::Directory)
            .map(|e| e.path.as_path())
    }

    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.entries
            .iter()
            .filter(|e| e.kind == EntryKind::PlaceholderFile)
            .map(|e| e.path.as_path())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every path must be relative, non-empty, free of `..` and listed once.
    pub fn validate(&self) -> Result<(), ScaffoldError> {
        let mut seen = HashSet::new();
        for entry in &self.entries {
            check_relative(&entry.path)?;
            if !seen.insert(entry.path.as_path()) {
                return Err(ScaffoldError::InvalidPath {
                    path: entry.path.clone(),
                    reason: "listed more than once".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn check_relative(path: &Path) -> Result<(), ScaffoldError> {
    let invalid = |reason: &str| ScaffoldError::InvalidPath {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    if path.as_os_str().is_empty() {
        return Err(invalid("path is empty"));
    }
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => return Err(invalid("path must not contain '..'")),
            Component::RootDir | Component::Prefix(_) => {
                return Err(invalid("path must be relative"));
            }
        }
    }
    Ok(())
}
