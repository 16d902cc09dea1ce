//! Persistence of planning results as pretty-printed JSON.

use crate::agent::RunResult;
use crate::error::Result;
use crate::types::TodoItem;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Longest task prefix used in a result filename.
const SLUG_CHARS: usize = 30;

/// The serialisable view of a `RunResult`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedResult {
    pub task: String,
    pub todos: Vec<TodoItem>,
    pub message_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_response: Option<String>,
}

impl From<&RunResult> for SavedResult {
    fn from(result: &RunResult) -> Self {
        Self {
            task: result.task.clone(),
            todos: result.todos.clone(),
            message_count: result.messages.len(),
            final_response: result.final_response.clone(),
        }
    }
}

/// `test_{index}_{slug}.json`, the slug being the lowercased task with spaces
/// replaced by underscores, cut to 30 characters.
pub fn result_filename(index: usize, task: &str) -> String {
    let slug: String = task
        .to_lowercase()
        .replace(' ', "_")
        .chars()
        .take(SLUG_CHARS)
        .collect();
    format!("test_{index}_{slug}.json")
}

/// Write `value` as indented JSON, creating parent directories.
pub async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    tokio::fs::write(path, json).await?;
    Ok(())
}

/// Save `result` to `output_dir/filename` and return the written path.
pub async fn save_result(result: &RunResult, filename: &str, output_dir: &Path) -> Result<PathBuf> {
    let path = output_dir.join(filename);
    write_json(&path, &SavedResult::from(result)).await?;
    info!(path = %path.display(), todos = result.todos.len(), "Saved result");
    Ok(path)
}

/// Read a previously saved result.
pub async fn load_result(path: &Path) -> Result<SavedResult> {
    let raw = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&raw)?)
}
