use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{
    AccountsCommand, ArchiveCommand, DomainsCommand, KeysCommand, QueueCommand, Workspace,
};
use newsloom::config::Config;
use newsloom::metrics;

#[derive(Parser)]
#[command(
    name = "newsloom",
    version,
    about = "News relay: rewrite articles with LLM providers and publish them to social accounts",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./newsloom.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the config file
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Write Prometheus metrics to this file on exit
    #[arg(long, global = true)]
    metrics_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, deduplicate and rewrite articles
    Process {
        /// Article URLs
        urls: Vec<String>,

        /// File with one URL per line
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Find recent articles in the news search feed
    Search {
        /// Search terms
        query: String,

        /// Time range: 1h, 2h, 6h, 12h, 24h, 7d or 30d
        #[arg(short, long)]
        range: Option<String>,

        /// Maximum results (defaults to search.max_results)
        #[arg(short, long)]
        max: Option<usize>,

        /// Rewrite the results right away
        #[arg(long)]
        process: bool,
    },

    /// Publish pending posts on the configured interval
    Publish,

    /// Publish all pending posts immediately
    PublishNow,

    /// Manage provider API keys
    Keys {
        #[command(subcommand)]
        action: KeysCommand,
    },

    /// Manage social accounts
    Accounts {
        #[command(subcommand)]
        action: AccountsCommand,
    },

    /// Inspect and edit the publish queue
    Queue {
        #[command(subcommand)]
        action: QueueCommand,
    },

    /// Inspect the duplicate-detection archive
    Archive {
        #[command(subcommand)]
        action: ArchiveCommand,
    },

    /// Manage excluded source domains
    Domains {
        #[command(subcommand)]
        action: DomainsCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing/logging
    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, &config.logging.level, cli.verbose)?;

    if cli.metrics_file.is_some() {
        metrics::init_metrics().map_err(|e| anyhow::anyhow!("Failed to init metrics: {e}"))?;
    }

    tracing::info!(
        provider = %config.rewrite.provider,
        data_dir = %config.storage.data_dir.display(),
        "newsloom starting"
    );

    let result = run(cli.command, config).await;

    if let Some(path) = &cli.metrics_file {
        write_metrics(path)?;
    }

    result
}

async fn run(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Process { urls, file } => {
            tracing::info!(urls = urls.len(), file = ?file, "Starting process command");
            commands::process(config, urls, file).await
        }
        Commands::Search {
            query,
            range,
            max,
            process,
        } => {
            tracing::info!(query = %query, range = ?range, process, "Starting search command");
            commands::search(config, query, range, max, process).await
        }
        Commands::Publish => {
            tracing::info!("Starting publish command");
            commands::publish(config).await
        }
        Commands::PublishNow => {
            tracing::info!("Starting publish-now command");
            commands::publish_now(config).await
        }
        Commands::Keys { action } => commands::manage::keys(&mut Workspace::open(config)?, action),
        Commands::Accounts { action } => {
            commands::manage::accounts(&mut Workspace::open(config)?, action).await
        }
        Commands::Queue { action } => commands::manage::queue(&mut Workspace::open(config)?, action),
        Commands::Archive { action } => {
            commands::manage::archive(&mut Workspace::open(config)?, action)
        }
        Commands::Domains { action } => {
            commands::manage::domains(&mut Workspace::open(config)?, action)
        }
    }
}

fn write_metrics(path: &std::path::Path) -> Result<()> {
    let text = metrics::gather_metrics().map_err(|e| anyhow::anyhow!("Failed to gather metrics: {e}"))?;
    std::fs::write(path, text)
        .with_context(|| format!("Failed to write metrics file: {}", path.display()))?;
    tracing::debug!(path = %path.display(), "Metrics written");
    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("newsloom=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("newsloom={level},warn")))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
