use clap::{ArgAction, Parser};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use user_info::{
    create_router, db::create_pool, version::version_lines, AppState, Config, MemoryBackend,
    Stores,
};

/// Stores per-user preferences, sessions, saved searches and bags.
#[derive(Parser, Debug)]
#[command(name = "user-info", disable_version_flag = true)]
struct Cli {
    /// Print version information and exit
    #[arg(long = "version", action = ArgAction::SetTrue)]
    version: bool,

    /// Port to listen on; overrides SERVER_PORT
    #[arg(long)]
    port: Option<u16>,

    /// Extra .env file to load before reading the environment
    #[arg(long = "env-file")]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version {
        for line in version_lines() {
            println!("{line}");
        }
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "user_info=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting user-info...");

    if let Some(path) = &cli.env_file {
        dotenvy::from_path(path)?;
        tracing::info!("Loaded environment from {}", path.display());
    }

    // Load configuration
    let mut config = Config::from_env()?;
    if let Some(port) = cli.port {
        config.server_port = port;
    }

    tracing::info!(
        "Environment: {}, Server: {}",
        config.environment,
        config.server_address()
    );

    let stores = if config.uses_memory_store() {
        tracing::warn!("Using the in-memory store; data is lost on exit");
        Stores::memory(&MemoryBackend::new())
    } else {
        let pool = create_pool(&config.database_url, config.db_max_connections).await?;
        let stores = Stores::postgres(pool);
        stores.ping().await?;
        stores
    };

    let state = AppState::new(config.clone(), stores);
    let app = create_router(state);

    // Start server
    let addr: SocketAddr = config.server_address().parse()?;
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
