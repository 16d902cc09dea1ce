//! Deepcog CLI: scaffold the research-agent project and run the planning agent.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Deepcog: planning-first deep research agent
#[derive(Parser, Debug)]
#[command(name = "deepcog", version, about, long_about = None)]
struct Cli {
    /// Workspace directory
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// LLM model to use
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Create the project skeleton (directories and empty placeholder files)
    Scaffold {
        /// Directory to scaffold into (defaults to the workspace)
        #[arg(long)]
        root: Option<PathBuf>,
        /// Show what would be created without touching the filesystem
        #[arg(long)]
        dry_run: bool,
    },
    /// Check an existing tree against the skeleton
    Verify {
        /// Directory to check (defaults to the workspace)
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Print the configured skeleton
    Layout,
    /// Break a complex task into structured todos
    Plan {
        /// The task to plan
        task: String,
        /// Thread id recorded with the run; also names the default output file
        #[arg(long, default_value = "default")]
        thread_id: String,
        /// Result file name, relative to the output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run the five-task planning benchmark
    Suite {
        /// Run a single benchmark task by number (1-5)
        #[arg(long)]
        test: Option<usize>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create a default configuration file
    Init,
    /// Show current configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (GROQ_API_KEY and friends)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let stderr_filter = if cli.verbose == 0 && !cli.quiet {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter))
    } else {
        EnvFilter::new(filter)
    };

    // Human-readable layer for stderr (always active)
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(stderr_filter);

    // JSON file layer for structured logging
    let log_dir = directories::ProjectDirs::from("dev", "deepcog", "deepcog")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "deepcog.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    // Resolve workspace; `scaffold` may be pointed at a directory that does not exist yet
    let workspace = cli.workspace.canonicalize().unwrap_or_else(|_| {
        std::env::current_dir()
            .map(|cwd| cwd.join(&cli.workspace))
            .unwrap_or_else(|_| cli.workspace.clone())
    });

    commands::handle_command(cli.command, &workspace, cli.model).await
}
