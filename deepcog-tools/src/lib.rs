//! # Deepcog Tools
//!
//! Built-in tool implementations for the deepcog agent.
//! Provides the project scaffolding tool and the `write_todos` planning tool,
//! plus the registry that hands them to the planning agent.

pub mod planning;
pub mod registry;
pub mod scaffold;

use deepcog_core::agent::{RegisteredTool, ToolExecutor};
use deepcog_core::brain::LlmProvider;
use deepcog_core::config::AgentConfig;
use deepcog_core::planning::Planner;
use registry::{Tool, ToolRegistry, execute_with_timeout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Register all built-in tools with the given registry.
pub fn register_builtin_tools(
    registry: &mut ToolRegistry,
    workspace: PathBuf,
    provider: Arc<dyn LlmProvider>,
    config: &AgentConfig,
) {
    let scaffold: Arc<dyn Tool> = Arc::new(scaffold::ScaffoldTool::new(workspace, config.layout()));
    register(registry, vec![scaffold, planning_tool(provider, config)]);
}

/// Register only `write_todos`, for agents that must plan without side effects.
pub fn register_planning_tools(
    registry: &mut ToolRegistry,
    provider: Arc<dyn LlmProvider>,
    config: &AgentConfig,
) {
    register(registry, vec![planning_tool(provider, config)]);
}

fn planning_tool(provider: Arc<dyn LlmProvider>, config: &AgentConfig) -> Arc<dyn Tool> {
    // One request plus its retries, with slack for backoff.
    let timeout = Duration::from_secs(
        config.llm.timeout_secs * (u64::from(config.llm.max_retries) + 1) + 30,
    );
    Arc::new(planning::WriteTodosTool::new(
        Planner::new(provider, config),
        timeout,
    ))
}

fn register(registry: &mut ToolRegistry, tools: Vec<Arc<dyn Tool>>) {
    for tool in tools {
        if let Err(e) = registry.register(tool) {
            tracing::warn!("Failed to register tool: {}", e);
        }
    }
}

/// Wrap a registry tool as an agent executor.
fn executor_for(tool: Arc<dyn Tool>) -> ToolExecutor {
    Box::new(move |args| {
        let tool = tool.clone();
        Box::pin(async move { execute_with_timeout(tool.as_ref(), args).await })
    })
}

/// Convert every registry tool into the agent's `RegisteredTool` form.
pub fn agent_tools(registry: &ToolRegistry) -> Vec<RegisteredTool> {
    registry
        .tools()
        .map(|tool| RegisteredTool {
            definition: tool.definition(),
            risk_level: tool.risk_level(),
            executor: executor_for(tool.clone()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepcog_core::brain::MockLlmProvider;
    use deepcog_core::types::RiskLevel;

    #[test]
    fn test_register_builtin_tools() {
        let mut registry = ToolRegistry::new();
        register_builtin_tools(
            &mut registry,
            PathBuf::from("."),
            Arc::new(MockLlmProvider::new()),
            &AgentConfig::default(),
        );
        assert_eq!(registry.list_names(), vec!["scaffold", "write_todos"]);
        let planning = registry.get("write_todos").unwrap();
        assert_eq!(planning.risk_level(), RiskLevel::Network);
        assert_eq!(planning.timeout(), Duration::from_secs(60 * 3 + 30));
    }

    #[test]
    fn test_register_planning_tools_only() {
        let mut registry = ToolRegistry::new();
        register_planning_tools(
            &mut registry,
            Arc::new(MockLlmProvider::new()),
            &AgentConfig::default(),
        );
        assert_eq!(registry.list_names(), vec!["write_todos"]);
    }

    #[tokio::test]
    async fn test_agent_tools_execute_through_bridge() {
        let mock = Arc::new(MockLlmProvider::new());
        mock.queue_response(MockLlmProvider::text_response(r#"["a", "b", "c", "d"]"#));
        let mut registry = ToolRegistry::new();
        register_builtin_tools(
            &mut registry,
            PathBuf::from("."),
            mock,
            &AgentConfig::default(),
        );

        let tools = agent_tools(&registry);
        assert_eq!(tools.len(), 2);
        let write_todos = tools
            .iter()
            .find(|t| t.definition.name == "write_todos")
            .unwrap();
        let output = (write_todos.executor)(serde_json::json!({"task": "Plan"}))
            .await
            .unwrap();
        assert!(output.content.starts_with(r#"{"todos":[{"task":"a""#));
    }
}
