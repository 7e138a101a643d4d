//! Self-contained authorization server: issues and rotates opaque bearer
//! credentials, manages verified user accounts, and gates a hierarchical
//! resource namespace through a file-based permission model.

mod app;
mod config;
mod error;
mod handlers;
mod pipeline;
mod port;
mod route;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use access_control::{AccessEvaluator, RateLimiter};
use auth_store::{KeyedLocks, RotationRegistry, Store, TokenStore, UserDirectory};

use crate::config::Config;
use crate::state::AppState;

/// Bounded so a spec with an exhausted port range fails fast rather than spinning.
const MAX_BIND_ATTEMPTS: u32 = 20;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting auth-server");

    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(String::as_str);
    let config_path = Config::resolve_path(cli_config_path);
    let config = Config::load(config_path.as_deref()).context("failed to load configuration")?;

    info!(data_dir = %config.data_dir.display(), "configuration loaded");

    let store = Arc::new(Store::new(config.data_dir.clone()));
    let directory = Arc::new(UserDirectory::new(store.clone()));
    let tokens = Arc::new(TokenStore::boot(store.clone()).await.context("failed to boot token store")?);
    let rotation =
        Arc::new(RotationRegistry::boot(store.clone()).await.context("failed to boot rotation registry")?);
    let evaluator = Arc::new(AccessEvaluator::new(store.clone(), directory.clone()));
    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit_max_attempts, config.rate_limit_window_ms));
    let router = Arc::new(route::build());
    let server_id = uuid::Uuid::new_v4().to_string();
    let config = Arc::new(config);

    let state = AppState {
        store,
        directory,
        tokens,
        rotation,
        evaluator,
        rate_limiter,
        locks: Arc::new(KeyedLocks::new()),
        router,
        config: config.clone(),
        server_id,
    };

    state::bootstrap_root(&state).await.context("failed to bootstrap root account")?;

    let listener = bind_listener(&config).await?;
    info!(addr = %listener.local_addr()?, server_id = %state.server_id, "listening");

    let app = app::build(state).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

/// Walk the configured `PortSpec` (§4.11), retrying on "address in use"
/// until a candidate binds or the spec is exhausted.
async fn bind_listener(config: &Config) -> Result<TcpListener> {
    let mut prev_port = 0u16;
    for _ in 0..MAX_BIND_ATTEMPTS {
        let candidate = config.port.get_port(prev_port).map_err(|e| anyhow::anyhow!(e))?;
        let addr = SocketAddr::from(([0, 0, 0, 0], candidate));
        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                info!(port = candidate, "port in use, trying next candidate");
                prev_port = candidate;
            }
            Err(e) => return Err(e).with_context(|| format!("failed to bind {addr}")),
        }
    }
    anyhow::bail!("exhausted {MAX_BIND_ATTEMPTS} bind attempts against the configured port spec")
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
