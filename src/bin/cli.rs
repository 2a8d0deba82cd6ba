//! Daily readings CLI
//!
//! Runs the HTTP service, or performs one-off fetches and cache maintenance.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use daily_readings::{
    error::Result,
    models::Config,
    scheduler::DailyRefresh,
    server,
    services::{HttpCrawler, ReadingsService},
    storage::JsonStore,
};
use serde_json::Value;

/// Daily readings - scrape, cache and serve the day's Mass readings
#[derive(Parser, Debug)]
#[command(name = "readings", version, about = "Daily Mass readings service")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve readings over HTTP and refresh the cache daily
    Serve {
        /// Override the configured bind address
        #[arg(long)]
        bind: Option<String>,
    },

    /// Fetch readings once and print them as JSON
    Fetch {
        /// Date to fetch (defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Ignore the cache and crawl the source
        #[arg(long)]
        no_cache: bool,
    },

    /// Validate configuration
    Validate,

    /// Inspect or clear the cached readings
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Print the cached readings
    Show,
    /// Delete the cached readings
    Clear,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

async fn build_service(config: &Arc<Config>) -> Result<Arc<ReadingsService>> {
    let store = Arc::new(JsonStore::open(&config.store.path).await?);
    let crawler = Arc::new(HttpCrawler::new(&config.crawler)?);
    Ok(Arc::new(ReadingsService::new(
        Arc::clone(config),
        store,
        crawler,
    )?))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown requested");
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load_or_default(&cli.config);
    log::debug!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Serve { bind } => {
            let mut config = config;
            if let Some(bind) = bind {
                config.server.bind_addr = bind;
            }
            config.validate()?;

            let config = Arc::new(config);
            let service = build_service(&config).await?;

            let refresh = if config.schedule.enabled {
                Some(DailyRefresh::start(Arc::clone(&service), &config.schedule)?)
            } else {
                log::info!("Daily refresh disabled");
                None
            };

            server::run(&config.server.bind_addr, service, shutdown_signal()).await?;

            if let Some(refresh) = refresh {
                refresh.stop().await;
            }
        }

        Command::Fetch { date, no_cache } => {
            config.validate()?;
            let config = Arc::new(config);
            let service = build_service(&config).await?;

            let date = date.map(Value::String);
            let collection = if no_cache {
                let token = service.validate(date.as_ref())?;
                service.refresh(&token).await?
            } else {
                service.serve(date.as_ref()).await?
            };

            println!("{}", serde_json::to_string_pretty(&collection)?);
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
        }

        Command::Cache { action } => {
            let config = Arc::new(config);
            let service = build_service(&config).await?;

            match action {
                CacheAction::Show => match service.cached().await? {
                    Some(collection) => {
                        println!("{}", serde_json::to_string_pretty(&collection)?)
                    }
                    None => log::info!("No cached readings in {}", config.store.path.display()),
                },
                CacheAction::Clear => {
                    service.clear_cache().await?;
                    log::info!("Cleared {}", config.store.cache_key);
                }
            }
        }
    }

    Ok(())
}
