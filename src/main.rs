use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

use listing_watcher::AppConfig;
use listing_watcher::AppError;
use listing_watcher::core::{run_once, watch};
use listing_watcher::plugins::ListingSource;
use listing_watcher::plugins::sources::SelectorSource;
use listing_watcher::scraper::StaticPage;
use listing_watcher::utils::logging::init_tracing;

#[derive(Parser)]
#[command(name = "listing-watcher", version, about = "Notifies about new real-estate listings")]
struct Cli {
    /// Directory holding default/{RUN_MODE}/local config files
    #[arg(long, default_value = "config")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Check every source once (default)
    Run,
    /// Keep running checks on an interval
    Watch {
        #[arg(long)]
        interval_secs: Option<u64>,
    },
    /// Run one source against a saved HTML page and print what it extracts
    Extract {
        #[arg(long)]
        source: String,
        #[arg(long)]
        html: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match AppConfig::from_dir(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            // No log directory is known yet; stderr only
            init_tracing(None)?;
            error!("Invalid configuration: {}. Exiting.", e);
            return Err(e).context("Invalid configuration");
        }
    };
    let _log_guard = init_tracing(config.logging.directory.as_deref())?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(&config).await,
        Command::Watch { interval_secs } => {
            let secs = interval_secs.unwrap_or(config.run.watch_interval_secs).max(1);
            exit_on_missing_config(watch(&config, Duration::from_secs(secs)).await)
        }
        Command::Extract { source, html } => extract(&config, &source, &html),
    }
}

async fn run(config: &AppConfig) -> Result<()> {
    exit_on_missing_config(run_once(config).await.map(|_| ()))
}

fn exit_on_missing_config(result: std::result::Result<(), AppError>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(AppError::Configuration(message)) => {
            error!("{}. Exiting.", message);
            Ok(())
        }
        Err(e) => {
            error!("Run aborted: {}", e);
            Err(e.into())
        }
    }
}

fn extract(config: &AppConfig, tag: &str, html: &Path) -> Result<()> {
    let source_config = config
        .sources
        .iter()
        .find(|s| s.tag == tag)
        .cloned()
        .ok_or_else(|| anyhow!("No source with tag '{}'", tag))?;

    let source = SelectorSource::new(source_config, &config.scraper)?;
    let page = StaticPage::from_file(html)?;

    let records = source.extract(&page);
    info!("{} records extracted from {}", records.len(), html.display());
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
