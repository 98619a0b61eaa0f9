//! nlx CLI - explain NLI predictions from the terminal.

mod commands;

use clap::Parser;
use nlx_core::{Granularity, InteractionPolicy};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// nlx: which premise/hypothesis word pairs drive an NLI prediction
#[derive(Parser, Debug)]
#[command(name = "nlx", version, about, long_about = None)]
struct Cli {
    /// Workspace directory
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Rank the premise/hypothesis unit pairs that reduce model confidence
    Explain(ExplainArgs),
    /// Print a model's label map
    Labels {
        /// Model name (falls back to `default_model`)
        #[arg(short, long)]
        model: Option<String>,
        /// Print index -> label instead of label -> index
        #[arg(long)]
        inverse: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Debug)]
struct ExplainArgs {
    premise: String,
    hypothesis: String,

    /// Model name or card (falls back to `default_model`)
    #[arg(short, long)]
    model: Option<String>,

    /// Path to tokenizer.json (overrides the model profile)
    #[arg(long)]
    tokenizer: Option<PathBuf>,

    /// Separator token joining premise and hypothesis
    #[arg(long, default_value = "[SEP]")]
    sep_token: String,

    /// Class to explain, by label or index (defaults to the prediction)
    #[arg(short, long)]
    target_class: Option<String>,

    /// Number of ranked interactions to return
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Candidate units kept per side before pairing
    #[arg(long)]
    sent_k: Option<usize>,

    /// Scoring policy: simple, interaction
    #[arg(long)]
    policy: Option<InteractionPolicy>,

    /// Perturbation unit: token, sentence
    #[arg(long)]
    granularity: Option<Granularity>,

    /// Token substituted for masked units
    #[arg(long)]
    baseline_token: Option<String>,

    /// Logits endpoint URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Emit the explanation as JSON
    #[arg(long)]
    json: bool,
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Show the merged configuration
    Show,
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    // JSON file layer for structured logging
    let log_dir = directories::ProjectDirs::from("dev", "nlx", "nlx")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "nlx.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    commands::handle_command(cli.command, &workspace, cli.config.as_deref())
}
