//! Propstat - real-estate price statistics API
//!
//! Loads location/year price statistics from a spreadsheet and answers
//! free-text queries about one area or a comparison of several, with
//! chart-ready series and optional LLM-written summaries.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, bind failure, or a failed --load-data)

mod ai;
mod analysis;
mod cli;
mod config;
mod error;
mod loader;
mod models;
mod server;
mod store;

use ai::openai::OpenAiSettings;
use ai::{OpenAiClient, Summarizer, SummarizerConfig};
use anyhow::{Context, Result};
use cli::Args;
use config::Config;
use server::AppState;
use std::sync::Arc;
use store::RecordStore;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("Propstat v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Fatal: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .propstat.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(config::DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", config::DEFAULT_CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", config::DEFAULT_CONFIG_FILE);
    println!("   Edit it to set the spreadsheet path, port and AI model.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Load data and either report (--load-data) or serve. Returns the exit code.
async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate().context("Invalid configuration")?;

    let store = RecordStore::new();

    if args.load_data {
        return Ok(handle_load_data(&store, &config).await);
    }

    if config.data.load_on_startup {
        let outcome = loader::reload(
            &store,
            &config.data.spreadsheet,
            config.data.sheet.as_deref(),
        )
        .await;
        if !outcome.success {
            warn!("Starting with an empty table: {}", outcome.message);
        }
    }

    if config.ai.api_key.is_none() {
        debug!("No API key configured; AI summaries will report failure");
    }

    let client = OpenAiClient::new(OpenAiSettings {
        api_url: config.ai.api_url.clone(),
        api_key: config.ai.api_key.clone(),
        model: config.ai.model.clone(),
        timeout_seconds: config.ai.timeout_seconds,
    })
    .context("Failed to create HTTP client")?;

    let summarizer = Summarizer::new(
        Arc::new(client),
        SummarizerConfig {
            sample_rows: config.ai.sample_rows,
            max_tokens: config.ai.max_tokens,
            temperature: config.ai.temperature,
        },
    );

    let state = AppState::new(store, summarizer, config.data.clone());
    server::run_server(&config.server, state).await?;

    Ok(0)
}

/// Handle --load-data: read the spreadsheet once and print the outcome.
async fn handle_load_data(store: &RecordStore, config: &Config) -> i32 {
    println!("📥 Loading {}", config.data.spreadsheet.display());

    let outcome = loader::reload(store, &config.data.spreadsheet, config.data.sheet.as_deref()).await;

    if outcome.success {
        println!("✅ {} ({} records)", outcome.message, outcome.records);
        0
    } else {
        eprintln!("❌ {}", outcome.message);
        1
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", config::DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
