//! hcat-fm - Feedback Moderation microservice
//!
//! **Module Identity:**
//! - Name: hcat-fm (Feedback Moderation)
//! - Port: 5810
//!
//! Accepts contributor proposals for catalog artifacts and lets curators
//! approve or reject them, merging approvals into the artifact record.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use hcat_common::config::{
    config_file_path, CompiledDefaults, RootFolderInitializer, RootFolderResolver, TomlConfig,
};
use hcat_common::events::EventBus;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hcat_fm::{AppState, DEFAULT_PORT, MODULE_NAME};

/// Command-line arguments for hcat-fm
#[derive(Parser, Debug)]
#[command(name = "hcat-fm")]
#[command(about = "Feedback Moderation microservice for the heritage catalog")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "HCAT_FM_PORT")]
    port: Option<u16>,

    /// Root folder holding the catalog database
    #[arg(short, long, env = "HCAT_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Address to bind
    #[arg(short, long)]
    bind_address: Option<String>,

    /// Log filter when RUST_LOG is unset (e.g. "debug")
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml_config = TomlConfig::load_for_module(MODULE_NAME);
    let defaults = CompiledDefaults::for_current_platform();

    let log_level = args
        .log_level
        .clone()
        .unwrap_or_else(|| toml_config.logging.level.clone());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("hcat_fm={0},hcat_common={0},tower_http={0}", log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting hcat-fm (Feedback Moderation) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE"),
    );
    match config_file_path(MODULE_NAME) {
        Some(path) => info!("Config file: {}", path.display()),
        None => info!("No config file, using defaults"),
    }

    // Step 1: Resolve root folder (CLI → ENV → TOML → default)
    let root_folder = args
        .root_folder
        .unwrap_or_else(|| RootFolderResolver::new(MODULE_NAME).resolve());
    info!("Root folder: {}", root_folder.display());

    // Step 2: Create root folder if missing
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    // Step 3: Open or create database
    let db_path = initializer.database_path();
    if !initializer.database_exists() {
        warn!("Database not found, creating {}", db_path.display());
    }
    let db_pool = hcat_common::db::init_database(&db_path)
        .await
        .context("Failed to open database")?;
    info!("Database: {}", db_path.display());

    let event_capacity = toml_config
        .event_capacity
        .unwrap_or(defaults.event_capacity);
    let event_bus = EventBus::new(event_capacity);
    info!("Event bus initialized (capacity {})", event_bus.capacity());

    let state = AppState::new(db_pool, event_bus);
    let app = hcat_fm::build_router(state);

    let port = args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);
    let bind_address = args
        .bind_address
        .or(toml_config.bind_address)
        .unwrap_or(defaults.bind_address);
    let addr: SocketAddr = format!("{}:{}", bind_address, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind_address, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
