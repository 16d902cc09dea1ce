//! The five-task planning benchmark.
//!
//! Runs the agent over a fixed set of research-style tasks, saves every result and
//! writes a `test_summary.json` describing which runs succeeded.

use crate::agent::{PlanningAgent, RunResult};
use crate::error::{AgentError, DeepcogError};
use crate::output::{result_filename, save_result, write_json};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// The benchmark inputs, numbered from 1.
pub const TEST_INPUTS: [&str; 5] = [
    "Comparative study of EV vs Hydrogen vehicles",
    "Build an AI chatbot architecture",
    "Stock market research strategy",
    "Renewable energy research outline",
    "AI agents in healthcare report",
];

pub const SUMMARY_FILE: &str = "test_summary.json";

/// One line of the summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteEntry {
    pub test_number: usize,
    pub task: String,
    pub todo_count: usize,
    pub output_file: Option<PathBuf>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteSummary {
    pub timestamp: String,
    pub total_tests: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<SuiteEntry>,
}

/// Run every benchmark task.
pub async fn run_all(
    agent: &PlanningAgent,
    output_dir: &Path,
) -> Result<SuiteSummary, DeepcogError> {
    run_tasks(agent, &TEST_INPUTS, output_dir).await
}

/// Run `tasks` in order. A failing task is recorded and the run moves on.
pub async fn run_tasks(
    agent: &PlanningAgent,
    tasks: &[&str],
    output_dir: &Path,
) -> Result<SuiteSummary, DeepcogError> {
    let mut results = Vec::with_capacity(tasks.len());

    for (i, task) in tasks.iter().enumerate() {
        let test_number = i + 1;
        let thread_id = format!(
            "test-{test_number}-{}",
            Local::now().format("%Y%m%d%H%M%S")
        );
        info!(test_number, total = tasks.len(), task = %task, "Running benchmark task");

        let outcome = match agent.run(task, &thread_id).await {
            Ok(result) => {
                let filename = result_filename(test_number, task);
                save_result(&result, &filename, output_dir)
                    .await
                    .map(|path| (result.todos.len(), path))
            }
            Err(e) => Err(e),
        };

        results.push(match outcome {
            Ok((todo_count, path)) => SuiteEntry {
                test_number,
                task: task.to_string(),
                todo_count,
                output_file: Some(path),
                success: true,
                error: None,
            },
            Err(e) => {
                error!(test_number, error = %e, "Benchmark task failed");
                SuiteEntry {
                    test_number,
                    task: task.to_string(),
                    todo_count: 0,
                    output_file: None,
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        });
    }

    let successful = results.iter().filter(|r| r.success).count();
    let summary = SuiteSummary {
        timestamp: Local::now().to_rfc3339(),
        total_tests: tasks.len(),
        successful,
        failed: tasks.len() - successful,
        results,
    };

    let summary_path = output_dir.join(SUMMARY_FILE);
    write_json(&summary_path, &summary).await?;
    info!(
        path = %summary_path.display(),
        successful = summary.successful,
        failed = summary.failed,
        "Benchmark summary saved"
    );
    Ok(summary)
}

/// Run benchmark task `test_number` (1-based) and save it as `single_test_{n}.json`.
pub async fn run_single(
    agent: &PlanningAgent,
    test_number: usize,
    output_dir: &Path,
) -> Result<(RunResult, PathBuf), DeepcogError> {
    let task = test_number
        .checked_sub(1)
        .and_then(|i| TEST_INPUTS.get(i))
        .ok_or(AgentError::InvalidTestNumber {
            number: test_number,
            max: TEST_INPUTS.len(),
        })?;

    let result = agent
        .run(task, &format!("single-test-{test_number}"))
        .await?;
    let path = save_result(
        &result,
        &format!("single_test_{test_number}.json"),
        output_dir,
    )
    .await?;
    Ok((result, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{PLANNING_TOOL, RegisteredTool};
    use crate::brain::MockLlmProvider;
    use crate::config::AgentConfig;
    use crate::types::{RiskLevel, ToolDefinition, ToolOutput};
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn agent(mock: Arc<MockLlmProvider>) -> PlanningAgent {
        let mut agent = PlanningAgent::new(mock, &AgentConfig::default());
        agent.register_tool(RegisteredTool {
            definition: ToolDefinition {
                name: PLANNING_TOOL.into(),
                description: "plan".into(),
                parameters: json!({"type": "object"}),
            },
            risk_level: RiskLevel::ReadOnly,
            executor: Box::new(|_| {
                Box::pin(async {
                    Ok(ToolOutput::text(
                        r#"{"todos":[{"task":"a","status":"pending"},{"task":"b","status":"pending"}]}"#,
                    ))
                })
            }),
        });
        agent
    }

    fn queue_plan(mock: &MockLlmProvider) {
        mock.queue_response(MockLlmProvider::tool_call_response(
            PLANNING_TOOL,
            json!({"task": "t"}),
        ));
        mock.queue_response(MockLlmProvider::text_response("a, b"));
    }

    #[tokio::test]
    async fn test_run_tasks_continues_after_failure() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockLlmProvider::new());
        queue_plan(&mock);
        mock.queue_response(MockLlmProvider::text_response("I refuse to plan"));
        queue_plan(&mock);
        let agent = agent(mock);

        let summary = run_tasks(&agent, &["First task", "Second task", "Third task"], dir.path())
            .await
            .unwrap();

        assert_eq!(summary.total_tests, 3);
        assert_eq!(summary.successful, 2);
        assert_eq!(summary.failed, 1);

        let failed = &summary.results[1];
        assert!(!failed.success);
        assert_eq!(failed.todo_count, 0);
        assert!(failed.output_file.is_none());
        assert!(failed.error.as_deref().unwrap().contains("write_todos"));

        let third = &summary.results[2];
        assert_eq!(third.todo_count, 2);
        assert_eq!(
            third.output_file.as_deref(),
            Some(dir.path().join("test_3_third_task.json").as_path())
        );

        let raw = std::fs::read_to_string(dir.path().join(SUMMARY_FILE)).unwrap();
        let on_disk: SuiteSummary = serde_json::from_str(&raw).unwrap();
        assert_eq!(on_disk, summary);
        assert!(!raw.contains("\"error\": null"));
    }

    #[tokio::test]
    async fn test_run_single() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockLlmProvider::new());
        queue_plan(&mock);
        let agent = agent(mock.clone());

        let (result, path) = run_single(&agent, 3, dir.path()).await.unwrap();
        assert_eq!(result.task, "Stock market research strategy");
        assert_eq!(result.thread_id, "single-test-3");
        assert_eq!(path, dir.path().join("single_test_3.json"));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_run_single_rejects_out_of_range() {
        let dir = TempDir::new().unwrap();
        let agent = agent(Arc::new(MockLlmProvider::new()));
        for n in [0, 6] {
            match run_single(&agent, n, dir.path()).await {
                Err(DeepcogError::Agent(AgentError::InvalidTestNumber { number, max })) => {
                    assert_eq!((number, max), (n, 5));
                }
                other => panic!("Expected InvalidTestNumber, got {other:?}"),
            }
        }
    }
}
