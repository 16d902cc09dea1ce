//! `write_todos`: decompose a complex task into structured todos before any execution.

use crate::registry::Tool;
use async_trait::async_trait;
use deepcog_core::agent::PLANNING_TOOL;
use deepcog_core::error::{PlanningError, ToolError};
use deepcog_core::planning::Planner;
use deepcog_core::types::{RiskLevel, ToolOutput};
use serde_json::json;
use std::time::Duration;

pub struct WriteTodosTool {
    planner: Planner,
    timeout: Duration,
}

impl WriteTodosTool {
    /// `timeout` should cover the planner's own LLM request and its retries.
    pub fn new(planner: Planner, timeout: Duration) -> Self {
        Self { planner, timeout }
    }
}

#[async_trait]
impl Tool for WriteTodosTool {
    fn name(&self) -> &str {
        PLANNING_TOOL
    }

    fn description(&self) -> &str {
        "Use this tool to decompose complex tasks into structured to-do lists \
         before any execution. This tool MUST be called for complex tasks. \
         Input: the complex task description. \
         Output: a JSON object with a 'todos' key containing a list of structured \
         TODO items, each with 'task' and 'status' fields."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "task": {
                    "type": "string",
                    "description": "The complex task to break down into steps"
                }
            },
            "required": ["task"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let task = args
            .get("task")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments {
                name: PLANNING_TOOL.into(),
                reason: "Missing 'task' parameter".into(),
            })?;

        let todos = self.planner.write_todos(task).await.map_err(|e| match e {
            PlanningError::EmptyTask => ToolError::InvalidArguments {
                name: PLANNING_TOOL.into(),
                reason: e.to_string(),
            },
            other => ToolError::ExecutionFailed {
                name: PLANNING_TOOL.into(),
                message: other.to_string(),
            },
        })?;

        let content = serde_json::to_string(&todos).map_err(|e| ToolError::ExecutionFailed {
            name: PLANNING_TOOL.into(),
            message: e.to_string(),
        })?;
        Ok(ToolOutput::text(content))
    }

    fn risk_level(&self) -> RiskLevel {
        RiskLevel::Network
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
