//! Settlement Engine Binary
//!
//! Starts the HTTP API and, when enabled, the expiry keeper.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin settlement-engine
//! ```
//!
//! # Environment Variables
//!
//! - `SETTLEMENT_CONFIG`: path to the YAML config (default: config.yaml)
//! - `RUST_LOG`: log filter (default: `info,settlement_engine=<observability.log_level>`)
//! - `OTEL_ENABLED`, `OTEL_EXPORTER_OTLP_ENDPOINT`, `OTEL_SERVICE_NAME`: span export
//!
//! Any `${VAR}` referenced by the config file is read from the environment
//! or a `.env` file.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use settlement_engine::application::ports::LoggingEventPublisher;
use settlement_engine::application::services::ExpiryKeeper;
use settlement_engine::application::use_cases::{LifecyclePorts, OptionLifecycle};
use settlement_engine::config::{Config, load_config};
use settlement_engine::infrastructure::clock::SystemClock;
use settlement_engine::infrastructure::http::{AppState, create_router};
use settlement_engine::infrastructure::persistence::{
    InMemoryCommitmentStore, InMemoryOptionRepository,
};
use settlement_engine::infrastructure::router::HttpLiquidityRouter;
use settlement_engine::infrastructure::signing::Ed25519Verifier;
use settlement_engine::observability::{MetricsConfig, init_metrics};
use settlement_engine::telemetry::init_telemetry;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let config_path =
        std::env::var("SETTLEMENT_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let config = load_config(Some(&config_path))
        .with_context(|| format!("loading configuration from {config_path}"))?;

    let _telemetry = init_telemetry(&config.observability);
    tracing::info!("Starting Settlement Engine");
    log_config(&config);

    if config.server.metrics_enabled {
        let addr = socket_addr(&config.server.bind_address, config.server.metrics_port)?;
        init_metrics(&MetricsConfig::with_addr(addr)).context("starting metrics exporter")?;
    }

    let lifecycle = Arc::new(create_lifecycle(&config)?);
    let shutdown = CancellationToken::new();

    let keeper_handle = config.keeper.enabled.then(|| {
        let keeper = ExpiryKeeper::new(
            Arc::clone(&lifecycle),
            Arc::new(SystemClock),
            config.keeper.keeper_config(),
        );
        let token = shutdown.clone();
        tokio::spawn(async move { keeper.run(token).await })
    });

    let http_handle = start_http_server(&config, lifecycle, shutdown.clone()).await?;
    tracing::info!("Settlement engine ready");

    shutdown_signal().await;
    shutdown.cancel();
    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );

    let stopped = async {
        if let Err(e) = http_handle.await {
            tracing::error!(error = %e, "HTTP server task failed");
        }
        if let Some(handle) = keeper_handle
            && let Err(e) = handle.await
        {
            tracing::error!(error = %e, "Expiry keeper task failed");
        }
    };
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, stopped).await.is_err() {
        tracing::warn!("Shutdown timed out, exiting");
    }

    tracing::info!("Settlement engine stopped");
    Ok(())
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }
    if let Ok(cwd) = std::env::current_dir() {
        for dir in cwd.ancestors().skip(1) {
            let env_path = dir.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
        }
    }
}

/// Log the loaded configuration.
fn log_config(config: &Config) {
    tracing::info!(
        http_port = config.server.http_port,
        deployment_id = %config.engine.deployment_id,
        quote_asset = %config.engine.quote_asset,
        safety_margin_bps = config.engine.safety_margin_bps,
        assets = config.engine.assets.len(),
        router = %config.router.base_url,
        keeper_enabled = config.keeper.enabled,
        "Configuration loaded"
    );
}

/// Wire the option lifecycle to its production adapters.
fn create_lifecycle(config: &Config) -> anyhow::Result<OptionLifecycle> {
    let router = Arc::new(
        HttpLiquidityRouter::new(&config.router.http_config())
            .context("creating liquidity router client")?,
    );
    let ports = LifecyclePorts {
        router: router.clone(),
        oracle: router,
        signatures: Arc::new(Ed25519Verifier),
        options: Arc::new(InMemoryOptionRepository::new()),
        commitments: Arc::new(InMemoryCommitmentStore::new()),
        events: Arc::new(LoggingEventPublisher),
        clock: Arc::new(SystemClock),
    };
    Ok(OptionLifecycle::new(config.engine.lifecycle_config(), ports))
}

fn socket_addr(bind_address: &str, port: u16) -> anyhow::Result<SocketAddr> {
    format!("{bind_address}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {bind_address}:{port}"))
}

/// Start the HTTP server; it drains connections once `shutdown` is cancelled.
async fn start_http_server(
    config: &Config,
    lifecycle: Arc<OptionLifecycle>,
    shutdown: CancellationToken,
) -> anyhow::Result<JoinHandle<()>> {
    let state = AppState {
        lifecycle,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    let app = create_router(state);

    let http_addr = socket_addr(&config.server.bind_address, config.server.http_port)?;
    let listener = TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("binding {http_addr}"))?;
    tracing::info!(%http_addr, "HTTP server listening");

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled_owned().await });
    Ok(tokio::spawn(async move {
        if let Err(e) = server.await {
            tracing::error!("HTTP server error: {e}");
        }
    }))
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        () = ctrl_c => tracing::info!("Received Ctrl+C, initiating shutdown"),
        () = terminate => tracing::info!("Received SIGTERM, initiating shutdown"),
    }
}
