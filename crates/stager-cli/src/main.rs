//! Stager - single-product deployment agent
//!
//! Usage:
//!   stager status <NAME> <VERSION_TAG>      # Resolve current install status
//!   stager install <NAME> <VERSION_TAG>     # Download, extract, and install

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stager_core::commands::{InstallCommand, StatusCommand};
use stager_core::config::AgentConfig;
use stager_core::progress::{ProgressReport, ProgressSink};
use stager_core::types::ProductRecord;

#[derive(Parser)]
#[command(name = "stager")]
#[command(about = "Single-product deployment agent", long_about = None)]
struct Cli {
    /// Catalog repository base URL (overrides STAGER_REPOSITORY)
    #[arg(long, global = true)]
    repository: Option<String>,

    /// Local package cache root (overrides STAGER_CACHE_ROOT)
    #[arg(long, global = true)]
    cache_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current status of a package version
    Status {
        /// Package name in the catalog
        name: String,

        /// Version tag, e.g. "prod"
        version_tag: String,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Install or update a package version
    Install {
        /// Package name in the catalog
        name: String,

        /// Version tag, e.g. "prod"
        version_tag: String,

        /// Erase the cached package first, forcing reinstallation
        #[arg(long)]
        force: bool,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

/// Renders structured progress updates on stderr.
struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn progress(&self, report: &ProgressReport) {
        eprintln!("[{:>3}%] {}: {}", report.percent, report.activity, report.status);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stager=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli);

    match cli.command {
        Commands::Status {
            name,
            version_tag,
            format,
        } => {
            let record = StatusCommand::new(config).execute(&name, &version_tag).await?;
            print_record(&record, format)?;
        }
        Commands::Install {
            name,
            version_tag,
            force,
            format,
        } => {
            let command = InstallCommand::new(config).with_sink(Arc::new(ConsoleProgress));
            let record = command.execute(&name, &version_tag, force).await?;
            print_record(&record, format)?;
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> AgentConfig {
    let mut config = AgentConfig::from_env();
    if let Some(repository) = &cli.repository {
        config.repository_url = repository.clone();
    }
    if let Some(cache_root) = &cli.cache_root {
        config.cache_root = cache_root.clone();
    }
    config
}

fn print_record(record: &ProductRecord, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(record)?),
        OutputFormat::Table => {
            println!("Package:  {}", record.name);
            println!("Tag:      {}", record.version_tag);
            println!("Status:   {}", record.status);
            if let Some(catalog) = &record.catalog {
                println!("Catalog:  {} ({})", catalog.version, catalog.package_file);
            }
            if let Some(installed) = &record.installed {
                println!("Local:    {}", installed.version);
            }
        }
    }
    Ok(())
}
