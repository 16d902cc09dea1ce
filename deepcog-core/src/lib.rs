//! # Deepcog Core
//!
//! Core library for deepcog, a planning-first research agent.
//! Provides the project skeleton and its scaffolder, the LLM interface (brain),
//! the `write_todos` planner, the ReAct planning agent, result persistence,
//! the benchmark suite, configuration, and fundamental types.

pub mod agent;
pub mod brain;
pub mod config;
pub mod error;
pub mod layout;
pub mod output;
pub mod planning;
pub mod providers;
pub mod scaffold;
pub mod suite;
pub mod types;

// Re-export commonly used types at the crate root.
pub use agent::{Checkpointer, PlanningAgent, RegisteredTool, RunResult, ToolExecutor};
pub use brain::{LlmProvider, MockLlmProvider};
pub use config::AgentConfig;
pub use error::{DeepcogError, Result};
pub use layout::{EntryKind, Layout, LayoutEntry};
pub use planning::Planner;
pub use providers::create_provider;
pub use scaffold::{ScaffoldFailure, ScaffoldOptions, ScaffoldReport, Scaffolder, VerifyReport};
pub use types::{
    Artifact, CompletionRequest, CompletionResponse, Content, Message, RiskLevel, Role,
    TodoItem, TodoList, TodoStatus, TokenUsage, ToolDefinition, ToolOutput,
};
