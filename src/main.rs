use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use market_intel::api::state::AppState;
use market_intel::config::AppConfig;
use market_intel::parse_duration;
use market_intel::pipeline::Pipeline;
use market_intel::storage::{JsonlMarketStore, StorageConfig};

#[derive(Parser)]
#[command(name = "market-intel")]
#[command(about = "Game market intelligence: genre scores, tag correlations and weekly trends")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Data directory path (overrides the config file)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a JSONL file of game snapshot rows into the data lake
    Import {
        /// File to import
        path: PathBuf,
    },

    /// Compute aggregates, scores and tag correlations
    Compute {
        /// Snapshot date (YYYY-MM-DD); defaults to the latest snapshot
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Run continuously at interval
        #[arg(long)]
        watch: bool,

        /// Compute interval (e.g., "1d", "6h", "30m")
        #[arg(long, default_value = "24h")]
        interval: String,
    },

    /// Start the API server
    Serve {
        /// Bind address (overrides the config file)
        #[arg(long)]
        host: Option<String>,

        /// Port number (overrides the config file)
        #[arg(long)]
        port: Option<u16>,
    },
}

/// Config file if present, defaults otherwise.
fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = if cli.config.exists() {
        AppConfig::from_file(&cli.config)?
    } else {
        AppConfig::default()
    };
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    Ok(config)
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli);
    let log_level = config
        .as_ref()
        .map(|c| c.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_tracing(&log_level, cli.json_logs);
    let config = config?;

    tracing::info!("Starting market-intel v{}", env!("CARGO_PKG_VERSION"));

    let store = JsonlMarketStore::new(StorageConfig::new(config.data_dir.clone()));

    match cli.command {
        Commands::Import { path } => {
            let rows = JsonlMarketStore::read_import_file(&path)?;
            let read = rows.len();
            let written = store.import_rows(rows)?;

            println!("\n=== Import Results ===");
            println!("Rows read:        {}", read);
            println!("Rows written:     {}", written);
        }
        Commands::Compute {
            date,
            watch,
            interval,
        } => {
            let pipeline = Pipeline::new(store, config.engine.clone());

            if watch {
                let every = parse_duration(&interval)
                    .filter(|d| !d.is_zero())
                    .ok_or_else(|| anyhow!("Invalid --interval: {}", interval))?;
                tracing::info!("Running periodic compute (interval: {})...", interval);

                let pipeline = Arc::new(pipeline);
                tokio::select! {
                    _ = pipeline.run_periodic(every, date) => {}
                    _ = shutdown_signal() => {
                        tracing::info!("Periodic compute stopped");
                    }
                }
            } else {
                let report = pipeline.run_once(date)?;

                println!("\n=== Compute Results ===");
                println!("Snapshot date:    {}", report.snapshot_date);
                println!("Genres:           {}", report.genres_aggregated);
                println!("Scores:           {}", report.scores_written);
                println!("Tag correlations: {}", report.correlations_written);
                println!("Rejected rows:    {}", report.rejected_rows());
                println!("Pairs skipped:    {}", report.pairs_without_overlap());
                println!("No WoW baseline:  {}", report.missing_baselines());
                println!("Duration:         {:?}", report.duration);
            }
        }
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            let state = AppState {
                store: Arc::new(store),
                cors_origin: config.server.cors_origin.clone(),
            };
            let app = market_intel::api::build_router(state);
            let addr = format!("{}:{}", host, port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("Listening on http://{}", addr);
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }

    Ok(())
}
