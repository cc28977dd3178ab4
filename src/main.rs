use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use points_ledger::config::{Config, ConfigSource, RunMode};

mod cli;

#[derive(Parser)]
#[command(name = "points-ledger")]
#[command(about = "Points, experience, levels and daily sign-in ledger service")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to config/config.<mode>.toml, then ~/.points-ledger/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Deployment mode selecting config/config.<mode>.toml
    #[arg(short, long, global = true, value_enum, default_value_t = RunMode::Dev)]
    mode: RunMode,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service (default)
    Serve,

    /// Write a default config file with a fresh gateway token
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show a user's progression snapshot
    User {
        user_id: String,
    },

    /// List a user's recent ledger entries
    Ledger {
        user_id: String,

        /// Number of entries to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Show level distribution, average points and this month's consumption
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    // Init writes the config, so it must not require one
    if let Some(Commands::Init { force }) = cli.command {
        return cli::init::init_command(cli.config, force);
    }

    let base_dir = std::env::current_dir()?;
    let (config, source) = Config::load(cli.config.as_deref(), cli.mode, &base_dir)?;
    match &source {
        ConfigSource::File(path) => tracing::info!("Loaded config ({}) from {}", cli.mode, path.display()),
        ConfigSource::Defaults => tracing::info!("No config file found, using defaults ({})", cli.mode),
    }

    match cli.command {
        Some(Commands::Serve) | None => cli::serve::serve_command(&config).await?,
        Some(Commands::User { user_id }) => cli::inspect::user_command(&config, &user_id)?,
        Some(Commands::Ledger { user_id, limit }) => {
            cli::inspect::ledger_command(&config, &user_id, limit)?
        }
        Some(Commands::Stats) => cli::inspect::stats_command(&config)?,
        Some(Commands::Init { .. }) => {}
    }

    Ok(())
}
