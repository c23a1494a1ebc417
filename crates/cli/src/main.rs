//! StepStream CLI: the main entry point.
//!
//! Commands:
//! - `demo`:   Run a scripted agent against the built-in tools
//! - `replay`: Fold a recorded delta stream into client state
//! - `config`: Show configuration
//!
//! Deltas and snapshots go to stdout as JSON lines; logs go to stderr.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "stepstream",
    about = "StepStream: step-bounded agent runs streamed as state deltas",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log as JSON instead of text
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted agent and print its delta stream
    Demo(commands::demo::DemoArgs),

    /// Fold a recorded JSONL delta stream and print the final state
    Replay {
        /// File with one `{kind, data}` delta per line
        file: PathBuf,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (file + environment)
    Show,
    /// Print the config file path
    Path,
    /// Print a default config file
    Default,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the delta stream.
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }

    match cli.command {
        Commands::Demo(args) => commands::demo::run(args).await?,
        Commands::Replay { file } => commands::replay::run(&file).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Default => commands::config_cmd::default().await?,
        },
    }

    Ok(())
}
