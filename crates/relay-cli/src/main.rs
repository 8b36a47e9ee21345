use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use relay_core::{Catalog, Dispatcher, Router};
use relay_gateway::{ChatRequest, GatewayServer, GatewayState, handle_chat};

mod config;

use config::RelayConfig;

#[derive(Parser)]
#[command(name = "relay")]
#[command(version)]
#[command(about = "Relay — a multi-provider generative-AI gateway")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay gateway
    Start,

    /// Send a one-shot chat message through the router
    Ask {
        /// The message to send
        message: String,
    },

    /// Initialize config directory and default config
    Init,

    /// Show current configuration (secrets masked)
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    match cli.command {
        Commands::Init => cmd_init().await,
        Commands::Config => cmd_config(&cli.config),
        Commands::Start => cmd_start(&cli.config).await,
        Commands::Ask { message } => cmd_ask(&cli.config, &message).await,
    }
}

async fn cmd_init() -> Result<()> {
    let config_dir = config::config_dir();
    tokio::fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;

    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        tracing::warn!("Config already exists at {}", config_path.display());
    } else {
        let default_config = include_str!("../../../config/default.toml");
        tokio::fs::write(&config_path, default_config).await?;
        info!("Created default config at {}", config_path.display());
    }

    println!("Relay initialized at {}", config_dir.display());
    println!(
        "Edit {} or set GEMINI_API_KEY / XAI_API_KEY / HF_API_KEY / STABILITY_API_KEY.",
        config_path.display()
    );
    Ok(())
}

fn cmd_config(custom_path: &Option<PathBuf>) -> Result<()> {
    let config = RelayConfig::load(custom_path)?;
    println!("{:#?}", config);
    Ok(())
}

fn build_state(config: &RelayConfig) -> Result<GatewayState> {
    let providers = config.usable_providers();
    let catalog = Catalog::build(&providers, &config.router)
        .context("Failed to build candidate catalog")?;
    if catalog.is_empty() {
        anyhow::bail!("Catalog is empty: no provider partition has both a key and models");
    }
    let dispatch = Arc::new(Dispatcher::from_config(&providers));
    let router = Router::new()
        .with_max_attempts(config.router.max_attempts)
        .with_retry_delay(Duration::from_millis(config.router.retry_delay_ms));
    Ok(GatewayState {
        catalog: Arc::new(catalog),
        dispatch,
        router,
        start_time: std::time::Instant::now(),
    })
}

async fn cmd_start(custom_path: &Option<PathBuf>) -> Result<()> {
    let config = RelayConfig::load(custom_path)?;
    let state = build_state(&config)?;

    info!(
        "Catalog loaded: {} candidates, fallback={:?}",
        state.catalog.len(),
        state.catalog.fallback_provider(),
    );

    let bind = format!("{}:{}", config.gateway.bind, config.gateway.port)
        .parse()
        .context("Invalid gateway bind address")?;
    let server = GatewayServer::new(bind, state.catalog.clone(), state.dispatch.clone(), state.router.clone());

    tokio::select! {
        result = server.run() => result,
        _ = signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    }
}

async fn cmd_ask(custom_path: &Option<PathBuf>, message: &str) -> Result<()> {
    let config = RelayConfig::load(custom_path)?;
    let state = build_state(&config)?;

    let request = ChatRequest {
        message: Some(message.to_string()),
        ..Default::default()
    };
    let response = handle_chat(&state, &request)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    if let Some(model) = &response.model_used {
        match &response.source {
            Some(source) => info!("Answered by {} ({})", model, source),
            None => info!("Answered by {}", model),
        }
    }
    println!("{}", response.text);

    if !response.success {
        std::process::exit(1);
    }
    Ok(())
}
