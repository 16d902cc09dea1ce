//! Integration tests for the planning agent.
//!
//! These wire the real `Planner` behind the `write_todos` tool and drive the whole
//! loop with a single MockLlmProvider: the agent's turns and the planner's prompt
//! are served from the same response queue, in call order.

use deepcog_core::agent::{PLANNING_TOOL, PlanningAgent, RegisteredTool};
use deepcog_core::brain::MockLlmProvider;
use deepcog_core::config::AgentConfig;
use deepcog_core::error::{DeepcogError, PlanningError, ToolError};
use deepcog_core::output::{load_result, result_filename, save_result};
use deepcog_core::planning::Planner;
use deepcog_core::suite;
use deepcog_core::types::{RiskLevel, TodoStatus, ToolDefinition, ToolOutput};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

const PLAN: &str = r#"```json
["Define the comparison criteria", "Collect EV data", "Collect hydrogen data", "Compare and summarise"]
```"#;

/// Register a `write_todos` tool backed by the real planner.
fn register_planner(agent: &mut PlanningAgent, planner: Arc<Planner>) {
    agent.register_tool(RegisteredTool {
        definition: ToolDefinition {
            name: PLANNING_TOOL.to_string(),
            description: "Decompose a complex task into structured todos".to_string(),
            parameters: json!({
                "type": "object",
                "properties": { "task": { "type": "string" } },
                "required": ["task"]
            }),
        },
        risk_level: RiskLevel::ReadOnly,
        executor: Box::new(move |args: serde_json::Value| {
            let planner = planner.clone();
            Box::pin(async move {
                let task = args["task"].as_str().unwrap_or_default().to_string();
                let todos = planner.write_todos(&task).await.map_err(|e| {
                    ToolError::ExecutionFailed {
                        name: PLANNING_TOOL.to_string(),
                        message: e.to_string(),
                    }
                })?;
                let content = serde_json::to_string(&todos).map_err(|e| {
                    ToolError::ExecutionFailed {
                        name: PLANNING_TOOL.to_string(),
                        message: e.to_string(),
                    }
                })?;
                Ok(ToolOutput::text(content))
            })
        }),
    });
}

fn create_agent(mock: Arc<MockLlmProvider>) -> PlanningAgent {
    let config = AgentConfig::default();
    let planner = Arc::new(Planner::new(mock.clone(), &config));
    let mut agent = PlanningAgent::new(mock, &config);
    register_planner(&mut agent, planner);
    agent
}

fn queue_full_run(mock: &MockLlmProvider, task: &str, plan: &str) {
    mock.queue_response(MockLlmProvider::tool_call_response(
        PLANNING_TOOL,
        json!({ "task": task }),
    ));
    mock.queue_response(MockLlmProvider::text_response(plan));
    mock.queue_response(MockLlmProvider::text_response("Here is the plan."));
}

#[tokio::test]
async fn test_end_to_end_plan_and_save() {
    let task = "Comparative study of EV vs Hydrogen vehicles";
    let mock = Arc::new(MockLlmProvider::new());
    queue_full_run(&mock, task, PLAN);
    let agent = create_agent(mock.clone());

    let result = agent.run(task, "test-1").await.unwrap();
    assert_eq!(
        result
            .todos
            .iter()
            .map(|t| t.task.as_str())
            .collect::<Vec<_>>(),
        vec![
            "Define the comparison criteria",
            "Collect EV data",
            "Collect hydrogen data",
            "Compare and summarise",
        ]
    );
    assert!(result.todos.iter().all(|t| t.status == TodoStatus::Pending));

    // The planner's request carries the prompt, not the agent conversation.
    let requests = mock.requests();
    assert_eq!(requests.len(), 3);
    let planner_prompt = requests[1].messages[0].content.as_text().unwrap();
    assert!(planner_prompt.starts_with("You are a planning agent."));
    assert!(planner_prompt.ends_with(&format!("Task: {task}")));

    let dir = TempDir::new().unwrap();
    let path = save_result(&result, &result_filename(1, task), dir.path())
        .await
        .unwrap();
    let saved = load_result(&path).await.unwrap();
    assert_eq!(saved.todos, result.todos);
    assert_eq!(saved.message_count, 5);
    assert_eq!(saved.final_response.as_deref(), Some("Here is the plan."));
}

#[tokio::test]
async fn test_planner_failure_is_reported_to_the_model() {
    let mock = Arc::new(MockLlmProvider::new());
    queue_full_run(&mock, "Stock market research strategy", "1. Buy low\n2. Sell high");
    let agent = create_agent(mock.clone());

    // The tool failed, but it was called, so the run itself succeeds without todos.
    let result = agent
        .run("Stock market research strategy", "t")
        .await
        .unwrap();
    assert!(result.todos.is_empty());

    let last_request = mock.requests().pop().unwrap();
    let tool_message = last_request.messages.last().unwrap();
    let text = serde_json::to_string(&tool_message.content).unwrap();
    assert!(text.contains("LLM did not return valid JSON"));
}

#[tokio::test]
async fn test_empty_task_never_reaches_the_model() {
    let mock = Arc::new(MockLlmProvider::new());
    let agent = create_agent(mock.clone());
    let err = agent.run("", "t").await.unwrap_err();
    assert!(matches!(err, DeepcogError::Planning(PlanningError::EmptyTask)));
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_single_benchmark_run() {
    let mock = Arc::new(MockLlmProvider::new());
    queue_full_run(&mock, suite::TEST_INPUTS[4], PLAN);
    let agent = create_agent(mock);
    let dir = TempDir::new().unwrap();

    let (result, path) = suite::run_single(&agent, 5, dir.path()).await.unwrap();
    assert_eq!(result.task, "AI agents in healthcare report");
    assert_eq!(result.todos.len(), 4);
    assert!(path.ends_with("single_test_5.json"));
}
