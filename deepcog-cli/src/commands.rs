//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use deepcog_core::config::{AgentConfig, WORKSPACE_CONFIG_DIR, load_config};
use deepcog_core::error::ScaffoldError;
use deepcog_core::layout::EntryKind;
use deepcog_core::scaffold::{ScaffoldOptions, Scaffolder, verify};
use deepcog_core::{LlmProvider, PlanningAgent, create_provider, output, suite};
use deepcog_tools::registry::ToolRegistry;
use deepcog_tools::{agent_tools, register_planning_tools};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    workspace: &Path,
    model: Option<String>,
) -> anyhow::Result<()> {
    match command {
        Commands::Config { action } => handle_config(action, workspace).await,
        Commands::Layout => {
            let config = load(workspace, model)?;
            handle_layout(&config);
            Ok(())
        }
        Commands::Scaffold { root, dry_run } => {
            let config = load(workspace, model)?;
            handle_scaffold(&config, workspace, root, dry_run).await
        }
        Commands::Verify { root } => {
            let config = load(workspace, model)?;
            handle_verify(&config, workspace, root).await
        }
        Commands::Plan {
            task,
            thread_id,
            output,
        } => {
            let config = load(workspace, model)?;
            let provider = create_provider(&config.llm)?;
            handle_plan(&config, provider, workspace, &task, &thread_id, output)
                .await
                .map(|_| ())
        }
        Commands::Suite { test } => {
            let config = load(workspace, model)?;
            let provider = create_provider(&config.llm)?;
            handle_suite(&config, provider, workspace, test).await
        }
    }
}

fn load(workspace: &Path, model: Option<String>) -> anyhow::Result<AgentConfig> {
    let mut config = load_config(Some(workspace), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    if let Some(model) = model {
        config.llm.model = model;
    }
    for warning in config.llm.validate() {
        tracing::warn!("LLM config: {}", warning);
    }
    Ok(config)
}

/// Resolve `path` against the workspace unless it is already absolute.
fn in_workspace(workspace: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace.join(path)
    }
}

/// `--root` beats `scaffold.root`, which beats the workspace itself.
fn scaffold_root(config: &AgentConfig, workspace: &Path, root: Option<PathBuf>) -> PathBuf {
    match root.or_else(|| config.scaffold.root.clone()) {
        Some(root) => in_workspace(workspace, &root),
        None => workspace.to_path_buf(),
    }
}

fn output_dir(config: &AgentConfig, workspace: &Path) -> PathBuf {
    in_workspace(workspace, &config.output.dir)
}

fn handle_layout(config: &AgentConfig) {
    let layout = config.layout();
    for entry in layout.entries() {
        match entry.kind {
            EntryKind::Directory => println!("{}/", entry.path.display()),
            EntryKind::PlaceholderFile => println!("{}", entry.path.display()),
        }
    }
}

async fn handle_scaffold(
    config: &AgentConfig,
    workspace: &Path,
    root: Option<PathBuf>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let root = scaffold_root(config, workspace, root);
    let report = match Scaffolder::new(config.layout())
        .apply(&root, ScaffoldOptions { dry_run })
        .await
    {
        Ok(report) => report,
        Err(ScaffoldError::Incomplete { report }) => *report,
        Err(e) => return Err(e.into()),
    };

    if dry_run {
        for record in &report.actions {
            println!("  {} {}", record.action, record.path.display());
        }
    }
    for failure in &report.failures {
        println!("  failed {}: {}", failure.path.display(), failure.error);
    }
    println!("{}", report.summary());

    if !report.is_complete() {
        anyhow::bail!(
            "{} of {} layout entries could not be created under {}",
            report.failures.len(),
            report.attempted(),
            root.display()
        );
    }
    Ok(())
}

async fn handle_verify(
    config: &AgentConfig,
    workspace: &Path,
    root: Option<PathBuf>,
) -> anyhow::Result<()> {
    let root = scaffold_root(config, workspace, root);
    let report = verify(&config.layout(), &root).await?;

    if report.is_ok() {
        println!(
            "All {} layout entries present under {}",
            report.checked,
            root.display()
        );
        return Ok(());
    }

    for finding in &report.issues {
        println!("  {}: {}", finding.path.display(), finding.issue);
    }
    anyhow::bail!(
        "{} of {} layout entries do not match under {}",
        report.issues.len(),
        report.checked,
        root.display()
    )
}

/// An agent whose only tool is `write_todos`, sharing `provider` with its planner.
fn build_agent(config: &AgentConfig, provider: Arc<dyn LlmProvider>) -> PlanningAgent {
    let mut registry = ToolRegistry::new();
    register_planning_tools(&mut registry, provider.clone(), config);
    let mut agent = PlanningAgent::new(provider, config);
    for tool in agent_tools(&registry) {
        agent.register_tool(tool);
    }
    agent
}

async fn handle_plan(
    config: &AgentConfig,
    provider: Arc<dyn LlmProvider>,
    workspace: &Path,
    task: &str,
    thread_id: &str,
    output: Option<PathBuf>,
) -> anyhow::Result<PathBuf> {
    let agent = build_agent(config, provider);
    let result = agent.run(task, thread_id).await?;

    println!("Generated {} TODOs:", result.todos.len());
    for (i, todo) in result.todos.iter().enumerate() {
        println!("  {}. {} [{}]", i + 1, todo.task, todo.status);
    }
    if let Some(answer) = &result.final_response {
        println!("\n{}", answer);
    }

    let filename = output
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| format!("plan_{}.json", thread_id));
    let path = output::save_result(&result, &filename, &output_dir(config, workspace)).await?;
    println!("Saved to {}", path.display());
    Ok(path)
}

async fn handle_suite(
    config: &AgentConfig,
    provider: Arc<dyn LlmProvider>,
    workspace: &Path,
    test: Option<usize>,
) -> anyhow::Result<()> {
    let agent = build_agent(config, provider);
    let dir = output_dir(config, workspace);

    if let Some(number) = test {
        let (result, path) = suite::run_single(&agent, number, &dir).await?;
        println!("Test {}: {} TODOs", number, result.todos.len());
        for (i, todo) in result.todos.iter().enumerate() {
            println!("  {}. {}", i + 1, todo.task);
        }
        println!("Saved to {}", path.display());
        return Ok(());
    }

    let summary = suite::run_all(&agent, &dir).await?;
    for entry in &summary.results {
        match &entry.error {
            None => println!(
                "  [ok]   {}. {} ({} TODOs)",
                entry.test_number, entry.task, entry.todo_count
            ),
            Some(e) => println!("  [fail] {}. {}: {}", entry.test_number, entry.task, e),
        }
    }
    println!(
        "{} of {} tasks succeeded. Summary: {}",
        summary.successful,
        summary.total_tests,
        dir.join(suite::SUMMARY_FILE).display()
    );
    Ok(())
}

async fn handle_config(action: ConfigAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_dir = workspace.join(WORKSPACE_CONFIG_DIR);
            std::fs::create_dir_all(&config_dir)?;

            let config_path = config_dir.join("config.toml");
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            let toml_str = toml::to_string_pretty(&AgentConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_config(Some(workspace), None)
                .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}
