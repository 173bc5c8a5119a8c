//! selsync CLI
//!
//! Command-line interface for selsync - clipboard selection sync between two nodes.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use selsync_core::{Config, Settings};

mod clipboard;
mod commands;
mod output;

use output::{Output, OutputFormat};

/// Environment variable holding the log filter
const LOG_ENV: &str = "SELSYNC_LOG";

#[derive(Parser)]
#[command(name = "selsync")]
#[command(about = "selsync - Keep clipboard selections in sync between two machines")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to config file (overrides SELSYNC_CONFIG and the default location)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sync daemon (default)
    Run {
        /// Use an in-process clipboard instead of the desktop one
        #[arg(long)]
        memory: bool,
    },
    /// Send text to the peer as a new selection value
    Push {
        /// Selection to update (CLIPBOARD or PRIMARY)
        #[arg(short, long)]
        selection: Option<String>,
        /// Text to send (read from stdin if omitted)
        text: Option<String>,
    },
    /// Fetch the peer's current selection value
    Pull {
        /// Selection to fetch (CLIPBOARD or PRIMARY)
        #[arg(short, long)]
        selection: Option<String>,
    },
    /// Show node, configuration and peer status
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Node identity
    Node {
        #[command(subcommand)]
        command: Option<NodeCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (listen_port, peer_endpoint, shared_secret,
        /// poll_interval, sync_primary, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[derive(Subcommand, Clone)]
enum NodeCommands {
    /// Show this node's id
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    let config_path = cli.config.unwrap_or_else(Config::config_file_path);
    let is_daemon = matches!(cli.command, None | Some(Commands::Run { .. }));
    let (settings, load_error) = open_settings(&config_path, is_daemon)?;

    init_logging(&settings.get());
    if let Some(e) = load_error {
        warn!(
            "Failed to load configuration from {:?}, running with defaults \
             (changes are not saved): {:#}",
            config_path, e
        );
    }

    match cli.command.unwrap_or(Commands::Run { memory: false }) {
        Commands::Run { memory } => commands::run::run(settings, memory, &output).await,
        Commands::Push { selection, text } => {
            commands::sync::push(&settings, selection, text, &output).await
        }
        Commands::Pull { selection } => commands::sync::pull(&settings, selection, &output).await,
        Commands::Status => commands::status::show(&settings, &output).await,
        Commands::Config { command } => match command {
            Some(ConfigCommands::Show) | None => commands::config::show(&settings, &output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(&settings, &key, &value, &output)
            }
        },
        Commands::Node { command } => match command {
            Some(NodeCommands::Show) | None => commands::node::show(&settings, &output),
        },
    }
}

/// Open the settings store
///
/// With `fall_back` set, an unreadable config file yields in-memory defaults
/// (plus environment overrides) and the load error is returned alongside.
fn open_settings(path: &Path, fall_back: bool) -> Result<(Settings, Option<anyhow::Error>)> {
    match Settings::open(path.to_path_buf()) {
        Ok(settings) => Ok((settings, None)),
        Err(e) if fall_back => Ok((Settings::in_memory(Config::from_env()), Some(e))),
        Err(e) => Err(e.context("Failed to load configuration")),
    }
}

/// Install the tracing subscriber
///
/// Logs go to stderr unless a log file is configured.
fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(ref log_path) = config.log_file else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
        return;
    };

    let log_file = match OpenOptions::new().create(true).append(true).open(log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
            return;
        }
    };

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();
}
