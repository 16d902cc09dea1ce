//! Configuration system for deepcog.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> overrides.
//! Configuration is loaded from `~/.config/deepcog/config.toml` and/or `.deepcog/config.toml`
//! in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::layout::Layout;

/// Directory name holding workspace-level configuration.
pub const WORKSPACE_CONFIG_DIR: &str = ".deepcog";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub planning: PlanningConfig,
    #[serde(default)]
    pub agent: AgentLoopConfig,
    #[serde(default)]
    pub scaffold: ScaffoldConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl AgentConfig {
    /// The default project skeleton extended with any configured extra paths.
    pub fn layout(&self) -> Layout {
        let mut layout = Layout::default();
        layout.extend(
            self.scaffold.extra_directories.iter().cloned(),
            self.scaffold.extra_files.iter().cloned(),
        );
        layout
    }
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: "groq", "openai", "local".
    pub provider: String,
    /// Model identifier (e.g., "llama-3.3-70b-versatile", "gpt-4o-mini").
    pub model: String,
    /// Environment variable name containing the API key.
    pub api_key_env: String,
    /// Optional base URL override for the API endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Sampling temperature. Planning wants deterministic output.
    pub temperature: f32,
    /// Maximum tokens to generate in a response.
    pub max_tokens: usize,
    /// HTTP request timeout.
    pub timeout_secs: u64,
    /// Retries for rate-limited or timed-out requests.
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "groq".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            base_url: None,
            temperature: 0.0,
            max_tokens: 1024,
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

impl LlmConfig {
    /// The endpoint to talk to: explicit `base_url`, else the provider's well-known URL.
    pub fn resolved_base_url(&self) -> Option<String> {
        if let Some(url) = &self.base_url {
            return Some(url.trim_end_matches('/').to_string());
        }
        match self.provider.as_str() {
            "groq" => Some("https://api.groq.com/openai/v1".to_string()),
            "openai" => Some("https://api.openai.com/v1".to_string()),
            "local" | "ollama" => Some("http://localhost:11434/v1".to_string()),
            _ => None,
        }
    }

    /// Whether the endpoint is on this machine (no API key required).
    pub fn is_local(&self) -> bool {
        self.resolved_base_url()
            .map(|u| u.contains("localhost") || u.contains("127.0.0.1"))
            .unwrap_or(false)
    }

    /// Validate this LLM config and return any warnings.
    ///
    /// Returns an empty Vec if the config is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.model.trim().is_empty() {
            warnings.push("model is empty".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            warnings.push(format!(
                "temperature ({}) is outside the usual range [0.0, 2.0]",
                self.temperature
            ));
        }
        if self.max_tokens == 0 {
            warnings.push("max_tokens is 0; the model cannot answer".to_string());
        }
        if self.resolved_base_url().is_none() {
            warnings.push(format!(
                "unknown provider '{}' and no base_url set",
                self.provider
            ));
        }
        warnings
    }
}

/// Configuration of the `write_todos` planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningConfig {
    /// Fewest steps the prompt asks for.
    pub min_steps: usize,
    /// Most steps the prompt asks for.
    pub max_steps: usize,
    /// Reject plans outside `[min_steps, max_steps]` instead of only logging a warning.
    pub enforce_step_count: bool,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            min_steps: 4,
            max_steps: 6,
            enforce_step_count: false,
        }
    }
}

/// Configuration of the ReAct planning loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentLoopConfig {
    /// Upper bound on LLM round-trips per task.
    pub max_iterations: usize,
    /// Fail a run whose final answer was produced without calling `write_todos`.
    pub require_plan: bool,
}

impl Default for AgentLoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: 6,
            require_plan: true,
        }
    }
}

/// Configuration of the project skeleton.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScaffoldConfig {
    /// Directory the skeleton is created in (defaults to the workspace).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    /// Directories created in addition to the built-in skeleton.
    #[serde(default)]
    pub extra_directories: Vec<PathBuf>,
    /// Placeholder files created in addition to the built-in skeleton.
    #[serde(default)]
    pub extra_files: Vec<PathBuf>,
}

/// Where run results are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("outputs"),
        }
    }
}

fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "deepcog", "deepcog")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load configuration by layering defaults, the user-level file, the workspace file,
/// `DEEPCOG_` environment variables and finally explicit overrides.
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&AgentConfig>,
) -> Result<AgentConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(AgentConfig::default()));

    // User-level config
    if let Some(user_config) = user_config_path()
        && user_config.exists()
    {
        figment = figment.merge(Toml::file(&user_config));
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = ws.join(WORKSPACE_CONFIG_DIR).join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // Environment variables (DEEPCOG_LLM__MODEL, DEEPCOG_OUTPUT__DIR, etc.)
    figment = figment.merge(Env::prefixed("DEEPCOG_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    Ok(figment.extract()?)
}

/// Check whether any configuration file exists (user-level or workspace-level).
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if user_config_path().is_some_and(|p| p.exists()) {
        return true;
    }
    workspace.is_some_and(|ws| ws.join(WORKSPACE_CONFIG_DIR).join("config.toml").exists())
}
