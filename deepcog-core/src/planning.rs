//! The `write_todos` planner.
//!
//! Asks the LLM to decompose a task into a short ordered list of steps and parses the
//! answer strictly: the reply must be a JSON array of strings, optionally wrapped in a
//! markdown code fence. There is no lenient fallback; anything else is an error that
//! carries the raw reply.

use crate::brain::LlmProvider;
use crate::config::AgentConfig;
use crate::error::PlanningError;
use crate::types::{CompletionRequest, Message, TodoItem, TodoList};
use std::sync::Arc;
use tracing::{debug, info, warn};

const FENCE: &str = "```";

/// Render the planning prompt for `task`, asking for `min_steps` to `max_steps` steps.
pub fn planning_prompt(task: &str, min_steps: usize, max_steps: usize) -> String {
    format!(
        "You are a planning agent.\n\
         \n\
         Break the following complex task into {min_steps} to {max_steps} logically ordered, clear, non-repeating, actionable steps.\n\
         \n\
         STRICT OUTPUT RULES:\n\
         - Return ONLY valid JSON.\n\
         - Do NOT include markdown, code fences, or explanations.\n\
         - The output MUST be a JSON array of strings.\n\
         \n\
         Example output:\n\
         [\"Research the topic\", \"Identify key components\", \"Draft an outline\", \"Review and refine\"]\n\
         \n\
         Task: {task}"
    )
}

/// Remove a markdown code fence the model may have wrapped its JSON in.
///
/// An opening fence loses its whole first line (so "```json" goes too); a closing
/// fence loses its three backticks.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut cleaned = raw.trim();
    if cleaned.starts_with(FENCE) {
        cleaned = match cleaned.split_once('\n') {
            Some((_, rest)) => rest,
            None => &cleaned[FENCE.len()..],
        };
    }
    if let Some(stripped) = cleaned.strip_suffix(FENCE) {
        cleaned = stripped;
    }
    cleaned.trim()
}

/// Parse the model's reply into pending todos.
pub fn parse_todo_response(raw: &str) -> Result<TodoList, PlanningError> {
    let cleaned = strip_code_fences(raw);
    let value: serde_json::Value =
        serde_json::from_str(cleaned).map_err(|e| PlanningError::InvalidJson {
            raw: raw.to_string(),
            reason: e.to_string(),
        })?;

    let serde_json::Value::Array(items) = value else {
        return Err(PlanningError::NotAStringList {
            found: json_type_name(&value).to_string(),
        });
    };

    items
        .into_iter()
        .map(|item| match item {
            serde_json::Value::String(step) => Ok(TodoItem::pending(step)),
            other => Err(PlanningError::NotAStringList {
                found: format!("array containing {}", json_type_name(&other)),
            }),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(TodoList::from)
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// LLM-backed task decomposer.
pub struct Planner {
    provider: Arc<dyn LlmProvider>,
    min_steps: usize,
    max_steps: usize,
    enforce_step_count: bool,
    temperature: f32,
    max_tokens: usize,
}

impl Planner {
    pub fn new(provider: Arc<dyn LlmProvider>, config: &AgentConfig) -> Self {
        Self {
            provider,
            min_steps: config.planning.min_steps,
            max_steps: config.planning.max_steps,
            enforce_step_count: config.planning.enforce_step_count,
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
        }
    }

    /// Decompose `task` into a todo list.
    pub async fn write_todos(&self, task: &str) -> Result<TodoList, PlanningError> {
        let task = task.trim();
        if task.is_empty() {
            return Err(PlanningError::EmptyTask);
        }

        let request = CompletionRequest {
            messages: vec![Message::user(planning_prompt(
                task,
                self.min_steps,
                self.max_steps,
            ))],
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            ..CompletionRequest::default()
        };

        debug!(task = %task, model = %self.provider.model_name(), "Requesting plan");
        let response = self.provider.complete(request).await?;
        let raw = response.message.content.joined_text().unwrap_or_default();
        let todos = parse_todo_response(&raw)?;

        let count = todos.len();
        if !(self.min_steps..=self.max_steps).contains(&count) {
            if self.enforce_step_count {
                return Err(PlanningError::StepCount {
                    count,
                    min: self.min_steps,
                    max: self.max_steps,
                });
            }
            warn!(
                count,
                min = self.min_steps,
                max = self.max_steps,
                "Plan step count outside requested range"
            );
        }

        info!(task = %task, steps = count, "Plan generated");
        Ok(todos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::MockLlmProvider;
    use crate::types::TodoStatus;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const FOUR_STEPS: &str =
        r#"["Research the topic", "Identify key components", "Draft an outline", "Review and refine"]"#;

    fn planner_with(reply: &str, config: &AgentConfig) -> (Planner, Arc<MockLlmProvider>) {
        let mock = Arc::new(MockLlmProvider::new());
        mock.queue_response(MockLlmProvider::text_response(reply));
        (Planner::new(mock.clone(), config), mock)
    }

    #[test]
    fn test_prompt_text() {
        let prompt = planning_prompt("Build an AI chatbot architecture", 4, 6);
        assert!(prompt.starts_with("You are a planning agent.\n\nBreak the following complex task into 4 to 6 logically ordered"));
        assert!(prompt.contains("- The output MUST be a JSON array of strings.\n"));
        assert!(prompt.ends_with("\n\nTask: Build an AI chatbot architecture"));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("  [\"a\"]  "), "[\"a\"]");
        assert_eq!(strip_code_fences("```json\n[\"a\"]\n```"), "[\"a\"]");
        assert_eq!(strip_code_fences("```\n[\"a\"]```"), "[\"a\"]");
        assert_eq!(strip_code_fences("```[\"a\"]```"), "[\"a\"]");
        assert_eq!(strip_code_fences("[\"a\"]\n```"), "[\"a\"]");
    }

    #[test]
    fn test_parse_valid_list() {
        let todos = parse_todo_response(FOUR_STEPS).unwrap();
        assert_eq!(todos.len(), 4);
        assert_eq!(todos.todos[0].task, "Research the topic");
        assert!(todos.todos.iter().all(|t| t.status == TodoStatus::Pending));
    }

    #[test]
    fn test_parse_fenced_list() {
        let raw = format!("```json\n{FOUR_STEPS}\n```");
        assert_eq!(parse_todo_response(&raw).unwrap().len(), 4);
    }

    #[test]
    fn test_parse_empty_list_is_accepted() {
        assert!(parse_todo_response("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_prose() {
        let raw = "Sure! Here are the steps:\n1. Research";
        match parse_todo_response(raw) {
            Err(PlanningError::InvalidJson { raw: kept, .. }) => assert_eq!(kept, raw),
            other => panic!("Expected InvalidJson, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_non_list() {
        match parse_todo_response(r#"{"steps": ["a"]}"#) {
            Err(PlanningError::NotAStringList { found }) => assert_eq!(found, "object"),
            other => panic!("Expected NotAStringList, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_mixed_list() {
        let err = parse_todo_response(r#"["a", 2, "c"]"#).unwrap_err();
        assert!(matches!(err, PlanningError::NotAStringList { .. }));
        assert!(err.to_string().contains("number"));
    }

    #[tokio::test]
    async fn test_write_todos_sends_prompt_at_configured_temperature() {
        let config = AgentConfig::default();
        let (planner, mock) = planner_with(FOUR_STEPS, &config);

        let todos = planner
            .write_todos("  Stock market research strategy ")
            .await
            .unwrap();
        assert_eq!(todos.len(), 4);

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].temperature, 0.0);
        assert!(requests[0].tools.is_none());
        let prompt = requests[0].messages[0].content.as_text().unwrap();
        assert!(prompt.ends_with("Task: Stock market research strategy"));
    }

    #[tokio::test]
    async fn test_write_todos_empty_task() {
        let (planner, mock) = planner_with(FOUR_STEPS, &AgentConfig::default());
        assert!(matches!(
            planner.write_todos("   ").await,
            Err(PlanningError::EmptyTask)
        ));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_write_todos_step_count_warns_by_default() {
        let (planner, _) = planner_with(r#"["Only", "Two"]"#, &AgentConfig::default());
        assert_eq!(planner.write_todos("Tiny task").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_write_todos_step_count_enforced() {
        let mut config = AgentConfig::default();
        config.planning.enforce_step_count = true;
        let (planner, _) = planner_with(r#"["Only", "Two"]"#, &config);
        match planner.write_todos("Tiny task").await {
            Err(PlanningError::StepCount { count, min, max }) => {
                assert_eq!((count, min, max), (2, 4, 6));
            }
            other => panic!("Expected StepCount, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_write_todos_propagates_llm_error() {
        let mock = Arc::new(MockLlmProvider::new());
        mock.queue_error(crate::error::LlmError::AuthFailed {
            provider: "groq".into(),
        });
        let planner = Planner::new(mock, &AgentConfig::default());
        assert!(matches!(
            planner.write_todos("Anything").await,
            Err(PlanningError::Llm(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_fenced_string_lists_parse(steps in prop::collection::vec("[A-Za-z0-9 ,.]{1,40}", 0..8)) {
            let json = serde_json::to_string(&steps).unwrap();
            let raw = format!("```json\n{json}\n```");
            let todos = parse_todo_response(&raw).unwrap();
            let tasks: Vec<String> = todos.todos.into_iter().map(|t| t.task).collect();
            prop_assert_eq!(tasks, steps);
        }

        #[test]
        fn prop_unfenced_text_is_only_trimmed(body in "[A-Za-z\\[\\]\"{} ]{0,40}") {
            let raw = format!("  {body}\n");
            prop_assert_eq!(strip_code_fences(&raw), body.trim());
        }
    }
}
