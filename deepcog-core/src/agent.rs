//! The ReAct planning agent.
//!
//! Runs a Think → Act → Observe loop against the LLM with a set of registered tools.
//! The agent's only job is decomposition: it must call `write_todos` for the user's
//! task and report the returned list. Todos are captured from the tool results as they
//! arrive, and every thread's conversation is kept by a `Checkpointer` so follow-up runs
//! on the same thread see the earlier turns.

use crate::brain::LlmProvider;
use crate::config::{AgentConfig, AgentLoopConfig};
use crate::error::{AgentError, DeepcogError, PlanningError, ToolError};
use crate::types::{
    CompletionRequest, Message, RiskLevel, TodoItem, TodoList, TokenUsage, ToolDefinition,
    ToolOutput,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Name of the tool the agent is required to call.
pub const PLANNING_TOOL: &str = "write_todos";

/// System prompt that pins the model to plan-first behaviour.
pub const SYSTEM_PROMPT: &str = "You are a strict ReAct planning agent.

RULES (follow every one without exception):

1. For ANY complex task the user gives you, you MUST call the write_todos tool FIRST.
2. You MUST NOT answer the user directly or generate your own list of steps.
3. You MUST NOT skip planning or attempt to execute any task.
4. Your job is decomposition into structured todos only. Do NOT execute tasks.
5. After calling write_todos, report the structured TODO list returned by the tool.
   Do NOT add, remove, or reword the steps.

ReAct discipline:
  - THINK: reason briefly about what tool to call.
  - ACT: call write_todos with the user's task.
  - OBSERVE: read the structured todos returned.
  - RESPOND: present the todos to the user exactly as returned.

If the write_todos tool is not called, the response is INVALID.";

/// Type alias for a tool executor function.
pub type ToolExecutor = Box<
    dyn Fn(
            serde_json::Value,
        ) -> std::pin::Pin<
            Box<dyn std::future::Future<Output = Result<ToolOutput, ToolError>> + Send>,
        > + Send
        + Sync,
>;

/// A registered tool with its definition and executor.
pub struct RegisteredTool {
    pub definition: ToolDefinition,
    pub risk_level: RiskLevel,
    pub executor: ToolExecutor,
}

/// In-memory conversation store keyed by thread id.
#[derive(Debug, Default)]
pub struct Checkpointer {
    threads: Mutex<HashMap<String, Vec<Message>>>,
}

impl Checkpointer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages recorded for `thread_id`, oldest first. Empty for an unknown thread.
    pub fn load(&self, thread_id: &str) -> Vec<Message> {
        self.threads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(thread_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Replace the stored conversation of `thread_id`.
    pub fn save(&self, thread_id: &str, messages: Vec<Message>) {
        self.threads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(thread_id.to_string(), messages);
    }

    pub fn thread_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .threads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    pub fn clear(&self, thread_id: &str) -> bool {
        self.threads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(thread_id)
            .is_some()
    }
}

/// Outcome of one agent run.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub task: String,
    pub thread_id: String,
    /// Full thread conversation, including turns from earlier runs.
    pub messages: Vec<Message>,
    pub todos: Vec<TodoItem>,
    /// Text of the model's closing answer.
    pub final_response: Option<String>,
    pub usage: TokenUsage,
    pub iterations: usize,
}

/// Payload shapes accepted from a `write_todos` tool result.
#[derive(Deserialize)]
#[serde(untagged)]
enum TodoPayload {
    Wrapped(TodoList),
    Bare(Vec<TodoItem>),
}

/// Read todos out of a `write_todos` result. Malformed content yields `None`.
pub fn extract_todos(content: &str) -> Option<Vec<TodoItem>> {
    match serde_json::from_str::<TodoPayload>(content).ok()? {
        TodoPayload::Wrapped(list) => Some(list.todos),
        TodoPayload::Bare(items) => Some(items),
    }
}

struct LoopOutcome {
    todos: Vec<TodoItem>,
    final_response: Option<String>,
    usage: TokenUsage,
    iterations: usize,
}

/// The planning agent.
pub struct PlanningAgent {
    provider: Arc<dyn LlmProvider>,
    config: AgentLoopConfig,
    temperature: f32,
    max_tokens: usize,
    tools: Vec<RegisteredTool>,
    checkpointer: Arc<Checkpointer>,
}

impl PlanningAgent {
    pub fn new(provider: Arc<dyn LlmProvider>, config: &AgentConfig) -> Self {
        Self {
            provider,
            config: config.agent.clone(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            tools: Vec::new(),
            checkpointer: Arc::new(Checkpointer::new()),
        }
    }

    /// Register a tool. A tool with the same name replaces the earlier one.
    pub fn register_tool(&mut self, tool: RegisteredTool) {
        if let Some(existing) = self
            .tools
            .iter_mut()
            .find(|t| t.definition.name == tool.definition.name)
        {
            *existing = tool;
        } else {
            self.tools.push(tool);
        }
    }

    /// Tool definitions sent to the LLM, in registration order.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition.clone()).collect()
    }

    pub fn checkpointer(&self) -> &Arc<Checkpointer> {
        &self.checkpointer
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Plan `task` on conversation thread `thread_id`.
    pub async fn run(&self, task: &str, thread_id: &str) -> Result<RunResult, DeepcogError> {
        if task.trim().is_empty() {
            return Err(PlanningError::EmptyTask.into());
        }
        if !self.tools.is_empty() && !self.provider.supports_tools() {
            return Err(AgentError::ToolsUnsupported {
                model: self.provider.model_name().to_string(),
            }
            .into());
        }

        let mut messages = self.checkpointer.load(thread_id);
        let history_len = messages.len();
        messages.push(Message::system(SYSTEM_PROMPT));
        messages.push(Message::user(task));

        info!(task = %task, thread_id = %thread_id, history = history_len, "Starting planning run");
        let outcome = self.run_loop(&mut messages).await;
        self.checkpointer.save(thread_id, messages.clone());
        let outcome = outcome?;

        info!(
            thread_id = %thread_id,
            todos = outcome.todos.len(),
            iterations = outcome.iterations,
            tokens = outcome.usage.total(),
            "Planning run complete"
        );

        Ok(RunResult {
            task: task.to_string(),
            thread_id: thread_id.to_string(),
            messages,
            todos: outcome.todos,
            final_response: outcome.final_response,
            usage: outcome.usage,
            iterations: outcome.iterations,
        })
    }

    async fn run_loop(&self, messages: &mut Vec<Message>) -> Result<LoopOutcome, DeepcogError> {
        let definitions = self.tool_definitions();
        let mut usage = TokenUsage::default();
        let mut todos = Vec::new();
        let mut plan_called = false;

        for iteration in 1..=self.config.max_iterations {
            let request = CompletionRequest {
                messages: messages.clone(),
                tools: (!definitions.is_empty()).then(|| definitions.clone()),
                temperature: self.temperature,
                max_tokens: Some(self.max_tokens),
                model: None,
            };

            let response = self.provider.complete(request).await?;
            usage.accumulate(&response.usage);

            let calls: Vec<(String, String, serde_json::Value)> = response
                .message
                .content
                .tool_calls()
                .into_iter()
                .map(|(id, name, args)| (id.to_string(), name.to_string(), args.clone()))
                .collect();
            let answer = response.message.content.joined_text();
            messages.push(response.message);

            if calls.is_empty() {
                if self.config.require_plan && !plan_called {
                    warn!(iteration, "Model answered without planning");
                    return Err(AgentError::PlanNotCalled {
                        tool: PLANNING_TOOL.to_string(),
                    }
                    .into());
                }
                return Ok(LoopOutcome {
                    todos,
                    final_response: answer,
                    usage,
                    iterations: iteration,
                });
            }

            for (call_id, name, arguments) in calls {
                let (output, is_error) = match self.execute_tool(&name, arguments).await {
                    Ok(output) => {
                        let is_error = output.is_error();
                        (output.content, is_error)
                    }
                    Err(e) => {
                        warn!(tool = %name, error = %e, "Tool call failed");
                        (format!("Error: {e}"), true)
                    }
                };

                if name == PLANNING_TOOL {
                    plan_called = true;
                    if !is_error {
                        match extract_todos(&output) {
                            Some(extracted) => todos = extracted,
                            None => debug!("Ignoring write_todos result without todos"),
                        }
                    }
                }

                messages.push(
                    Message::tool_result(call_id, output, is_error)
                        .with_metadata("tool_name", serde_json::Value::String(name)),
                );
            }
        }

        Err(AgentError::MaxIterationsReached {
            max: self.config.max_iterations,
        }
        .into())
    }

    async fn execute_tool(
        &self,
        tool_name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolOutput, ToolError> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.definition.name == tool_name)
            .ok_or_else(|| ToolError::NotFound {
                name: tool_name.to_string(),
            })?;
        debug!(tool = %tool_name, risk = %tool.risk_level, "Executing tool call");
        (tool.executor)(arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::MockLlmProvider;
    use crate::types::{Content, Role, TodoStatus};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const TODOS_JSON: &str = r#"{"todos": [
        {"task": "Research the topic", "status": "pending"},
        {"task": "Identify key components", "status": "pending"},
        {"task": "Draft an outline", "status": "pending"},
        {"task": "Review and refine", "status": "pending"}
    ]}"#;

    fn fixed_tool(name: &str, reply: &'static str) -> RegisteredTool {
        RegisteredTool {
            definition: ToolDefinition {
                name: name.to_string(),
                description: format!("{name} for tests"),
                parameters: json!({"type": "object", "properties": {"task": {"type": "string"}}}),
            },
            risk_level: RiskLevel::ReadOnly,
            executor: Box::new(move |_args| Box::pin(async move { Ok(ToolOutput::text(reply)) })),
        }
    }

    fn agent_with(mock: Arc<MockLlmProvider>, config: AgentConfig) -> PlanningAgent {
        let mut agent = PlanningAgent::new(mock, &config);
        agent.register_tool(fixed_tool(PLANNING_TOOL, TODOS_JSON));
        agent
    }

    fn plan_then_answer(mock: &MockLlmProvider, task: &str) {
        mock.queue_response(MockLlmProvider::tool_call_response(
            PLANNING_TOOL,
            json!({ "task": task }),
        ));
        mock.queue_response(MockLlmProvider::text_response("1. Research the topic ..."));
    }

    #[tokio::test]
    async fn test_run_collects_todos() {
        let mock = Arc::new(MockLlmProvider::new());
        plan_then_answer(&mock, "Build an AI chatbot architecture");
        let agent = agent_with(mock.clone(), AgentConfig::default());

        let result = agent
            .run("Build an AI chatbot architecture", "test-1")
            .await
            .unwrap();

        assert_eq!(result.todos.len(), 4);
        assert_eq!(result.todos[2].task, "Draft an outline");
        assert!(result.todos.iter().all(|t| t.status == TodoStatus::Pending));
        assert_eq!(
            result.final_response.as_deref(),
            Some("1. Research the topic ...")
        );
        // system, user, tool call, tool result, answer
        assert_eq!(result.messages.len(), 5);
        assert_eq!(result.iterations, 2);
        assert_eq!(result.usage.total(), 130 + 150);

        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        let first = &requests[0];
        assert_eq!(first.messages[0].content.as_text(), Some(SYSTEM_PROMPT));
        assert_eq!(first.messages[1].role, Role::User);
        let tools = first.tools.as_ref().unwrap();
        assert_eq!(tools[0].name, PLANNING_TOOL);
    }

    #[tokio::test]
    async fn test_run_refuses_provider_without_tool_calling() {
        let mock = Arc::new(MockLlmProvider::new().without_tool_support());
        let agent = agent_with(mock.clone(), AgentConfig::default());

        let err = agent
            .run("Build an AI chatbot architecture", "no-tools")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DeepcogError::Agent(AgentError::ToolsUnsupported { ref model }) if model == "mock-model"
        ));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_run_rejects_direct_answer() {
        let mock = Arc::new(MockLlmProvider::new());
        mock.queue_response(MockLlmProvider::text_response("Step 1: just do it"));
        let agent = agent_with(mock, AgentConfig::default());

        match agent.run("Stock market research strategy", "t").await {
            Err(DeepcogError::Agent(AgentError::PlanNotCalled { tool })) => {
                assert_eq!(tool, PLANNING_TOOL)
            }
            other => panic!("Expected PlanNotCalled, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_direct_answer_allowed_when_plan_not_required() {
        let mock = Arc::new(MockLlmProvider::new());
        mock.queue_response(MockLlmProvider::text_response("No plan needed."));
        let mut config = AgentConfig::default();
        config.agent.require_plan = false;
        let agent = agent_with(mock, config);

        let result = agent.run("Say hi", "t").await.unwrap();
        assert!(result.todos.is_empty());
        assert_eq!(result.final_response.as_deref(), Some("No plan needed."));
    }

    #[tokio::test]
    async fn test_unknown_tool_reports_error_and_continues() {
        let mock = Arc::new(MockLlmProvider::new());
        mock.queue_response(MockLlmProvider::tool_call_response(
            "web_search",
            json!({"query": "EV"}),
        ));
        plan_then_answer(&mock, "Comparative study of EV vs Hydrogen vehicles");
        let agent = agent_with(mock, AgentConfig::default());

        let result = agent
            .run("Comparative study of EV vs Hydrogen vehicles", "t")
            .await
            .unwrap();
        assert_eq!(result.todos.len(), 4);

        let error_result = result
            .messages
            .iter()
            .find_map(|m| match &m.content {
                Content::ToolResult {
                    output, is_error, ..
                } if *is_error => Some(output.clone()),
                _ => None,
            })
            .unwrap();
        assert!(error_result.contains("Tool not found: web_search"));
    }

    #[tokio::test]
    async fn test_max_iterations_reached() {
        let mock = Arc::new(MockLlmProvider::new());
        for _ in 0..3 {
            mock.queue_response(MockLlmProvider::tool_call_response(
                PLANNING_TOOL,
                json!({"task": "loop"}),
            ));
        }
        let mut config = AgentConfig::default();
        config.agent.max_iterations = 3;
        let agent = agent_with(mock, config);

        assert!(matches!(
            agent.run("loop", "t").await,
            Err(DeepcogError::Agent(AgentError::MaxIterationsReached {
                max: 3
            }))
        ));
    }

    #[tokio::test]
    async fn test_malformed_todos_ignored() {
        let mock = Arc::new(MockLlmProvider::new());
        plan_then_answer(&mock, "x");
        let mut agent = PlanningAgent::new(mock, &AgentConfig::default());
        agent.register_tool(fixed_tool(PLANNING_TOOL, "not json at all"));

        let result = agent.run("x", "t").await.unwrap();
        assert!(result.todos.is_empty());
    }

    #[tokio::test]
    async fn test_last_plan_wins() {
        let mock = Arc::new(MockLlmProvider::new());
        mock.queue_response(MockLlmProvider::tool_call_response(
            PLANNING_TOOL,
            json!({"task": "first"}),
        ));
        plan_then_answer(&mock, "second");

        let mut agent = PlanningAgent::new(mock, &AgentConfig::default());
        // Re-registering replaces the first executor.
        agent.register_tool(fixed_tool(PLANNING_TOOL, TODOS_JSON));
        agent.register_tool(fixed_tool(
            PLANNING_TOOL,
            r#"[{"task": "Only step", "status": "done"}]"#,
        ));
        assert_eq!(agent.tool_definitions().len(), 1);

        let result = agent.run("second", "t").await.unwrap();
        assert_eq!(
            result.todos,
            vec![TodoItem {
                task: "Only step".into(),
                status: TodoStatus::Done
            }]
        );
    }

    #[tokio::test]
    async fn test_thread_history_is_carried_over() {
        let mock = Arc::new(MockLlmProvider::new());
        plan_then_answer(&mock, "one");
        plan_then_answer(&mock, "two");
        let agent = agent_with(mock.clone(), AgentConfig::default());

        agent.run("one", "shared").await.unwrap();
        let second = agent.run("two", "shared").await.unwrap();
        assert_eq!(second.messages.len(), 10);
        assert_eq!(agent.checkpointer().load("shared").len(), 10);

        // The third request opens the second run and sees the whole first run.
        let requests = mock.requests();
        assert_eq!(requests[2].messages.len(), 7);
        assert_eq!(agent.checkpointer().thread_ids(), vec!["shared".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_run_is_still_checkpointed() {
        let mock = Arc::new(MockLlmProvider::new());
        mock.queue_response(MockLlmProvider::text_response("no plan"));
        let agent = agent_with(mock, AgentConfig::default());

        assert!(agent.run("task", "failed").await.is_err());
        assert_eq!(agent.checkpointer().load("failed").len(), 3);
        assert!(agent.checkpointer().clear("failed"));
    }

    #[tokio::test]
    async fn test_empty_task_rejected() {
        let agent = agent_with(Arc::new(MockLlmProvider::new()), AgentConfig::default());
        assert!(matches!(
            agent.run("  ", "t").await,
            Err(DeepcogError::Planning(PlanningError::EmptyTask))
        ));
    }

    #[test]
    fn test_extract_todos_shapes() {
        assert_eq!(extract_todos(TODOS_JSON).unwrap().len(), 4);
        assert_eq!(
            extract_todos(r#"[{"task": "a"}]"#).unwrap(),
            vec![TodoItem::pending("a")]
        );
        assert!(extract_todos(r#"{"steps": []}"#).is_none());
        assert!(extract_todos("Error: boom").is_none());
    }
}
