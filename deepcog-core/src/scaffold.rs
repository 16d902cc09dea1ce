//! Scaffold engine: materializes a [`Layout`] on disk and checks an existing tree against it.
//!
//! Directories are created idempotently. Placeholder files are created empty and an
//! existing file is truncated. Entries are processed one at a time, in layout order.
//! A failing entry does not stop the run, and nothing is ever written through a symlink.

use crate::error::ScaffoldError;
use crate::layout::{EntryKind, Layout};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaffoldOptions {
    /// Report what would happen without touching the filesystem.
    pub dry_run: bool,
}

/// What happened (or, in a dry run, would happen) to one layout entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaffoldAction {
    CreatedDirectory,
    ExistingDirectory,
    CreatedFile,
    TruncatedFile,
}

impl std::fmt::Display for ScaffoldAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScaffoldAction::CreatedDirectory => write!(f, "created dir"),
            ScaffoldAction::ExistingDirectory => write!(f, "exists"),
            ScaffoldAction::CreatedFile => write!(f, "created"),
            ScaffoldAction::TruncatedFile => write!(f, "truncated"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaffoldRecord {
    pub path: PathBuf,
    pub action: ScaffoldAction,
}

/// A layout entry that could not be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaffoldFailure {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaffoldReport {
    pub root: PathBuf,
    pub dry_run: bool,
    pub actions: Vec<ScaffoldRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ScaffoldFailure>,
}

impl ScaffoldReport {
    fn count(&self, action: ScaffoldAction) -> usize {
        self.actions.iter().filter(|r| r.action == action).count()
    }

    pub fn directories_created(&self) -> usize {
        self.count(ScaffoldAction::CreatedDirectory)
    }

    pub fn directories_existing(&self) -> usize {
        self.count(ScaffoldAction::ExistingDirectory)
    }

    pub fn files_created(&self) -> usize {
        self.count(ScaffoldAction::CreatedFile)
    }

    pub fn files_truncated(&self) -> usize {
        self.count(ScaffoldAction::TruncatedFile)
    }

    /// Number of layout entries attempted, successful or not.
    pub fn attempted(&self) -> usize {
        self.actions.len() + self.failures.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        let verb = if self.dry_run { "Would scaffold" } else { "Scaffolded" };
        let mut line = format!(
            "{verb} {}: {} directories created, {} already present, {} files created, {} truncated",
            self.root.display(),
            self.directories_created(),
            self.directories_existing(),
            self.files_created(),
            self.files_truncated()
        );
        if !self.failures.is_empty() {
            line.push_str(&format!(", {} failed", self.failures.len()));
        }
        line
    }
}

/// Creates a layout under a root directory.
pub struct Scaffolder {
    layout: Layout,
}

impl Scaffolder {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Create every directory and placeholder file of the layout under `root`.
    ///
    /// A failing entry is recorded and the remaining entries are still attempted. If any
    /// entry failed the full report comes back inside `ScaffoldError::Incomplete`.
    pub async fn apply(
        &self,
        root: &Path,
        options: ScaffoldOptions,
    ) -> Result<ScaffoldReport, ScaffoldError> {
        self.layout.validate()?;

        // The root itself may be a symlinked directory; entries beneath it may not.
        match tokio::fs::metadata(root).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(ScaffoldError::Conflict {
                    path: root.to_path_buf(),
                    expected: EntryKind::Directory.to_string(),
                });
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if !options.dry_run {
                    tokio::fs::create_dir_all(root)
                        .await
                        .map_err(|e| ScaffoldError::io(root, e))?;
                }
            }
            Err(e) => return Err(ScaffoldError::io(root, e)),
        }

        let mut actions = Vec::with_capacity(self.layout.len());
        let mut failures = Vec::new();
        for entry in self.layout.entries() {
            let target = root.join(&entry.path);
            let outcome = match check_ancestors(root, &entry.path).await {
                Err(e) => Err(e),
                Ok(()) => match entry.kind {
                    EntryKind::Directory => ensure_directory(&target, options.dry_run).await,
                    EntryKind::PlaceholderFile => {
                        write_placeholder(&target, options.dry_run).await
                    }
                },
            };
            match outcome {
                Ok(action) => {
                    debug!(path = %target.display(), %action, dry_run = options.dry_run, "Scaffold entry");
                    actions.push(ScaffoldRecord {
                        path: entry.path.clone(),
                        action,
                    });
                }
                Err(e) => {
                    warn!(path = %target.display(), error = %e, "Scaffold entry failed");
                    failures.push(ScaffoldFailure {
                        path: entry.path.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let report = ScaffoldReport {
            root: root.to_path_buf(),
            dry_run: options.dry_run,
            actions,
            failures,
        };
        info!(
            root = %root.display(),
            dry_run = options.dry_run,
            dirs_created = report.directories_created(),
            files_created = report.files_created(),
            files_truncated = report.files_truncated(),
            failed = report.failures.len(),
            "Scaffold complete"
        );
        if !report.is_complete() {
            return Err(ScaffoldError::Incomplete {
                report: Box::new(report),
            });
        }
        Ok(report)
    }
}

enum Probe {
    Missing,
    Directory,
    File,
    Symlink,
}

/// Inspect `path` without following a symlink at its last component.
async fn probe(path: &Path) -> Result<Probe, ScaffoldError> {
    match tokio::fs::symlink_metadata(path).await {
        Ok(meta) if meta.file_type().is_symlink() => Ok(Probe::Symlink),
        Ok(meta) if meta.is_dir() => Ok(Probe::Directory),
        Ok(_) => Ok(Probe::File),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Probe::Missing),
        Err(e) => Err(ScaffoldError::io(path, e)),
    }
}

/// Refuse any entry whose intermediate components below `root` include a symlink.
async fn check_ancestors(root: &Path, relative: &Path) -> Result<(), ScaffoldError> {
    let mut current = root.to_path_buf();
    let mut components = relative.components().peekable();
    while let Some(component) = components.next() {
        if components.peek().is_none() {
            break;
        }
        current.push(component);
        match probe(&current).await? {
            Probe::Symlink => return Err(ScaffoldError::Symlink { path: current }),
            Probe::Missing => break,
            Probe::Directory | Probe::File => {}
        }
    }
    Ok(())
}

async fn ensure_directory(path: &Path, dry_run: bool) -> Result<ScaffoldAction, ScaffoldError> {
    match probe(path).await? {
        Probe::Directory => Ok(ScaffoldAction::ExistingDirectory),
        Probe::Symlink => Err(ScaffoldError::Symlink {
            path: path.to_path_buf(),
        }),
        Probe::File => Err(ScaffoldError::Conflict {
            path: path.to_path_buf(),
            expected: EntryKind::Directory.to_string(),
        }),
        Probe::Missing => {
            if !dry_run {
                tokio::fs::create_dir_all(path)
                    .await
                    .map_err(|e| ScaffoldError::io(path, e))?;
            }
            Ok(ScaffoldAction::CreatedDirectory)
        }
    }
}

async fn write_placeholder(path: &Path, dry_run: bool) -> Result<ScaffoldAction, ScaffoldError> {
    let action = match probe(path).await? {
        Probe::Directory => {
            return Err(ScaffoldError::Conflict {
                path: path.to_path_buf(),
                expected: EntryKind::PlaceholderFile.to_string(),
            });
        }
        Probe::Symlink => {
            return Err(ScaffoldError::Symlink {
                path: path.to_path_buf(),
            });
        }
        Probe::File => ScaffoldAction::TruncatedFile,
        Probe::Missing => ScaffoldAction::CreatedFile,
    };
    if dry_run {
        return Ok(action);
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ScaffoldError::io(parent, e))?;
    }
    // `File::create` truncates an existing file to zero length.
    tokio::fs::File::create(path)
        .await
        .map_err(|e| ScaffoldError::io(path, e))?;
    Ok(action)
}

/// A deviation of the tree on disk from the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerifyIssue {
    Missing,
    NotADirectory,
    NotAFile,
    NotEmpty { len: u64 },
}

impl std::fmt::Display for VerifyIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerifyIssue::Missing => write!(f, "missing"),
            VerifyIssue::NotADirectory => write!(f, "not a directory"),
            VerifyIssue::NotAFile => write!(f, "not a regular file"),
            VerifyIssue::NotEmpty { len } => write!(f, "not empty ({len} bytes)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyFinding {
    pub path: PathBuf,
    pub issue: VerifyIssue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyReport {
    pub root: PathBuf,
    pub checked: usize,
    pub issues: Vec<VerifyFinding>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Check that every layout directory exists and every placeholder file exists with length 0.
///
/// Unlisted files and directories under `root` are ignored.
pub async fn verify(layout: &Layout, root: &Path) -> Result<VerifyReport, ScaffoldError> {
    layout.validate()?;

    let mut issues = Vec::new();
    for entry in layout.entries() {
        let target = root.join(&entry.path);
        let meta = match tokio::fs::symlink_metadata(&target).await {
            Ok(meta) => Some(meta),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(ScaffoldError::io(&target, e)),
        };

        let issue = match (entry.kind, meta) {
            (_, None) => Some(VerifyIssue::Missing),
            (EntryKind::Directory, Some(m)) if !m.is_dir() => Some(VerifyIssue::NotADirectory),
            (EntryKind::PlaceholderFile, Some(m)) if !m.is_file() => Some(VerifyIssue::NotAFile),
            (EntryKind::PlaceholderFile, Some(m)) if m.len() > 0 => {
                Some(VerifyIssue::NotEmpty { len: m.len() })
            }
            _ => None,
        };
        if let Some(issue) = issue {
            debug!(path = %target.display(), %issue, "Layout mismatch");
            issues.push(VerifyFinding {
                path: entry.path.clone(),
                issue,
            });
        }
    }

    Ok(VerifyReport {
        root: root.to_path_buf(),
        checked: layout.len(),
        issues,
    })
}
