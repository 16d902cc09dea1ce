//! Scaffold tool: create, check or list the project skeleton.

use crate::registry::Tool;
use async_trait::async_trait;
use deepcog_core::error::{ScaffoldError, ToolError};
use deepcog_core::layout::{EntryKind, Layout};
use deepcog_core::scaffold::{ScaffoldAction, ScaffoldOptions, Scaffolder, verify};
use deepcog_core::types::{Artifact, RiskLevel, ToolOutput};
use serde::Deserialize;
use serde_json::json;
use std::path::{Component, Path, PathBuf};

const TOOL_NAME: &str = "scaffold";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Action {
    Create,
    Verify,
    List,
}

#[derive(Debug, Deserialize)]
struct ScaffoldArgs {
    action: Action,
    #[serde(default)]
    root: Option<String>,
    #[serde(default)]
    dry_run: bool,
}

pub struct ScaffoldTool {
    workspace: PathBuf,
    layout: Layout,
}

impl ScaffoldTool {
    pub fn new(workspace: PathBuf, layout: Layout) -> Self {
        Self { workspace, layout }
    }

    /// Resolve `root` against the workspace, refusing anything outside it.
    fn resolve_root(&self, root: Option<&str>) -> Result<PathBuf, ToolError> {
        let workspace = self
            .workspace
            .canonicalize()
            .unwrap_or_else(|_| self.workspace.clone());
        let Some(root) = root.filter(|r| !r.trim().is_empty()) else {
            return Ok(workspace);
        };

        let requested = Path::new(root);
        let joined = if requested.is_absolute() {
            requested.to_path_buf()
        } else {
            workspace.join(requested)
        };

        // The root may not exist yet, so normalize lexically.
        let mut normalized = PathBuf::new();
        for component in joined.components() {
            match component {
                Component::ParentDir => {
                    if !normalized.pop() {
                        return Err(escapes(root));
                    }
                }
                Component::CurDir => {}
                other => normalized.push(other),
            }
        }

        if !normalized.starts_with(&workspace) {
            return Err(escapes(root));
        }

        // A symlink inside the workspace may still point outside it.
        let existing = normalized
            .ancestors()
            .find(|p| p.exists())
            .unwrap_or(workspace.as_path());
        let canonical = existing.canonicalize().map_err(|e| ToolError::ExecutionFailed {
            name: TOOL_NAME.into(),
            message: format!("Path resolution failed: {}", e),
        })?;
        if !canonical.starts_with(&workspace) {
            return Err(escapes(root));
        }
        Ok(normalized)
    }
}

fn escapes(root: &str) -> ToolError {
    ToolError::PermissionDenied {
        name: TOOL_NAME.into(),
        reason: format!("Path '{}' is outside the workspace", root),
    }
}

fn failed(e: impl std::fmt::Display) -> ToolError {
    ToolError::ExecutionFailed {
        name: TOOL_NAME.into(),
        message: e.to_string(),
    }
}

#[async_trait]
impl Tool for ScaffoldTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Create the deep-research project skeleton (directories and empty placeholder files), verify an existing tree against it, or list it."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["create", "verify", "list"],
                    "description": "The scaffolding action to perform"
                },
                "root": {
                    "type": "string",
                    "description": "Directory to scaffold into (defaults to workspace)"
                },
                "dry_run": {
                    "type": "boolean",
                    "description": "Report what create would do without touching the filesystem"
                }
            },
            "required": ["action"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let args: ScaffoldArgs =
            serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments {
                name: TOOL_NAME.into(),
                reason: e.to_string(),
            })?;

        match args.action {
            Action::List => {
                let lines: Vec<String> = self
                    .layout
                    .entries()
                    .iter()
                    .map(|e| match e.kind {
                        EntryKind::Directory => format!("{}/", e.path.display()),
                        EntryKind::PlaceholderFile => e.path.display().to_string(),
                    })
                    .collect();
                Ok(ToolOutput::text(lines.join("\n")))
            }
            Action::Create => {
                let root = self.resolve_root(args.root.as_deref())?;
                let result = Scaffolder::new(self.layout.clone())
                    .apply(
                        &root,
                        ScaffoldOptions {
                            dry_run: args.dry_run,
                        },
                    )
                    .await;
                let report = match result {
                    Ok(report) => report,
                    Err(ScaffoldError::Incomplete { report }) => *report,
                    Err(e) => return Err(failed(e)),
                };

                let mut output = if report.is_complete() {
                    ToolOutput::text(report.summary())
                } else {
                    let mut lines = vec![report.summary()];
                    lines.extend(
                        report
                            .failures
                            .iter()
                            .map(|f| format!("  {}: {}", f.path.display(), f.error)),
                    );
                    ToolOutput::error(lines.join("\n"))
                };
                if !report.dry_run {
                    for record in &report.actions {
                        let path = root.join(&record.path);
                        match record.action {
                            ScaffoldAction::CreatedDirectory => {
                                output = output.with_artifact(Artifact::DirectoryCreated { path });
                            }
                            ScaffoldAction::CreatedFile => {
                                output = output.with_artifact(Artifact::FileCreated { path });
                            }
                            _ => {}
                        }
                    }
                }
                Ok(output)
            }
            Action::Verify => {
                let root = self.resolve_root(args.root.as_deref())?;
                let report = verify(&self.layout, &root).await.map_err(failed)?;
                if report.is_ok() {
                    return Ok(ToolOutput::text(format!(
                        "All {} layout entries present under {}",
                        report.checked,
                        root.display()
                    )));
                }
                let mut lines = vec![format!(
                    "{} of {} layout entries do not match under {}:",
                    report.issues.len(),
                    report.checked,
                    root.display()
                )];
                lines.extend(
                    report
                        .issues
                        .iter()
                        .map(|f| format!("  {}: {}", f.path.display(), f.issue)),
                );
                Ok(ToolOutput::error(lines.join("\n")))
            }
        }
    }

    fn risk_level(&self) -> RiskLevel {
        RiskLevel::Write
    }
}
