//! Tollgate - Account and session token service

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;

use config::{Config, LogFormat, LoggingConfig, RevocationBackend, ensure_parent_dir};
use tollgate_api::{AppState, create_router};
use tollgate_auth::{CredentialHasher, TokenManager};
use tollgate_core::{AccountService, AuthorizationGuard, SessionManager};
use tollgate_db::Database;
use tollgate_revocation::{MemoryRevocationStore, RedisRevocationStore, RevocationStore};

/// How often expired records are dropped from the in-memory revocation store
const MEMORY_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Tollgate - Account and session token service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Bind address
    #[arg(long, env = "TOLLGATE_BIND")]
    bind: Option<String>,

    /// Port
    #[arg(short, long, env = "TOLLGATE_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration
    let config = Config::load(&args.config)?;

    // Initialize logging
    init_logging(&config.logging);

    info!("Starting Tollgate v{}", env!("CARGO_PKG_VERSION"));

    // Install the metrics recorder before anything records
    let metrics_handle = if config.metrics.enabled {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        Some(Arc::new(handle))
    } else {
        None
    };

    // Initialize database
    if let Some(path) = config.database.file_path() {
        ensure_parent_dir(&path)?;
    }
    let db = Database::new(&config.database.url).await?;

    // Credentials and tokens
    let hasher = Arc::new(CredentialHasher::new(config.auth.hashing())?);
    let ttl = chrono::Duration::minutes(config.auth.validated_ttl_minutes());
    let tokens = Arc::new(TokenManager::new(
        config.auth.jwt_secret.as_bytes(),
        ttl,
        config.auth.issuer.as_str(),
    ));

    // Revocation store
    let revocations: Arc<dyn RevocationStore> = match config.revocation.backend {
        RevocationBackend::Redis => Arc::new(RedisRevocationStore::new(
            &config.revocation.redis_url,
            &config.revocation.key_prefix,
            Duration::from_millis(config.revocation.timeout_ms),
        )?),
        RevocationBackend::Memory => {
            let store = Arc::new(MemoryRevocationStore::new());
            spawn_memory_purge(Arc::clone(&store));
            store
        }
    };

    // Session manager and account service
    let sessions = Arc::new(SessionManager::new(
        Arc::clone(&hasher),
        tokens,
        revocations,
        Arc::new(db.clone()),
        config.revocation.session_policy(),
    ));
    let accounts = AccountService::new(db, hasher, AuthorizationGuard::default());

    // Create application state
    let state = AppState::new(sessions, accounts);

    // Create router
    let app = create_router(state, metrics_handle)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(TraceLayer::new_for_http());

    // Determine bind address
    let bind_addr = args.bind.unwrap_or(config.server.bind_address);
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", bind_addr, port).parse()?;

    info!("Listening on {}", addr);
    info!(
        "Revocation backend: {:?} (liveness: {}, on unavailable: {})",
        config.revocation.backend,
        config.revocation.liveness.as_str(),
        config.revocation.on_unavailable.as_str()
    );

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Initialize logging
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    match logging.format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

/// Periodically drop expired records from the in-memory store
fn spawn_memory_purge(store: Arc<MemoryRevocationStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(MEMORY_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = store.purge_expired();
            if purged > 0 {
                debug!("Purged {} expired revocation records", purged);
            }
        }
    });
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("Shutdown signal received");
}
