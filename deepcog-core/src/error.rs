//! Error types for the deepcog core library.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering LLM, tool execution, configuration, scaffolding, planning and
//! agent domains.

use crate::scaffold::ScaffoldReport;
use std::path::PathBuf;

/// Top-level error type for the deepcog core library.
#[derive(Debug, thiserror::Error)]
pub enum DeepcogError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scaffold error: {0}")]
    Scaffold(#[from] ScaffoldError),

    #[error("Planning error: {0}")]
    Planning(#[from] PlanningError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from LLM provider interactions.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Unknown provider: {provider}")]
    UnknownProvider { provider: String },
}

/// Errors from tool registration and execution.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool not found: {name}")]
    NotFound { name: String },

    #[error("Tool already registered: {name}")]
    AlreadyRegistered { name: String },

    #[error("Invalid arguments for tool '{name}': {reason}")]
    InvalidArguments { name: String, reason: String },

    #[error("Tool '{name}' execution failed: {message}")]
    ExecutionFailed { name: String, message: String },

    #[error("Permission denied for tool '{name}': {reason}")]
    PermissionDenied { name: String, reason: String },

    #[error("Tool '{name}' timed out after {timeout_secs}s")]
    Timeout { name: String, timeout_secs: u64 },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::ParseError {
            message: err.to_string(),
        }
    }
}

/// Errors raised while creating or checking the project skeleton.
#[derive(Debug, thiserror::Error)]
pub enum ScaffoldError {
    #[error("Invalid layout path '{path}': {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    #[error("Path conflict at {path}: expected a {expected}")]
    Conflict { path: PathBuf, expected: String },

    #[error("Refusing to write through symlink at {path}")]
    Symlink { path: PathBuf },

    #[error(
        "Scaffold of {} incomplete: {} of {} entries failed",
        .report.root.display(),
        .report.failures.len(),
        .report.attempted()
    )]
    Incomplete { report: Box<ScaffoldReport> },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ScaffoldError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScaffoldError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors from the `write_todos` planner.
#[derive(Debug, thiserror::Error)]
pub enum PlanningError {
    #[error("Task description is empty")]
    EmptyTask,

    #[error("LLM did not return valid JSON. Raw response:\n{raw}\n\nJSON error: {reason}")]
    InvalidJson { raw: String, reason: String },

    #[error("LLM returned JSON but not a list of strings. Got: {found}")]
    NotAStringList { found: String },

    #[error("Plan has {count} steps, expected between {min} and {max}")]
    StepCount { count: usize, min: usize, max: usize },

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

/// Errors from the planning agent.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Maximum iterations ({max}) reached without completing task")]
    MaxIterationsReached { max: usize },

    #[error("Agent answered without calling the '{tool}' tool")]
    PlanNotCalled { tool: String },

    #[error("Model '{model}' does not support tool calling")]
    ToolsUnsupported { model: String },

    #[error("Invalid test number {number}. Please choose 1-{max}")]
    InvalidTestNumber { number: usize, max: usize },
}

/// A type alias for results using the top-level `DeepcogError`.
pub type Result<T> = std::result::Result<T, DeepcogError>;
