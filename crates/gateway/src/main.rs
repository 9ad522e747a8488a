//! ClauseLens API Gateway
//!
//! Entry point: loads configuration, wires the database, cache and
//! generative model, then serves the HTTP API until shutdown.

use anyhow::Context;
use clauselens_common::{
    ai::create_generator,
    cache::Cache,
    config::AppConfig,
    db::{DbPool, Repository},
    metrics,
};
use clauselens_gateway::{create_router, prometheus_builder, AppState};
use metrics_exporter_prometheus::PrometheusHandle;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    init_tracing(&config);

    info!("Starting ClauseLens API Gateway v{}", clauselens_common::VERSION);

    // Initialize metrics
    let metrics_handle = init_metrics(&config)?;

    // Initialize database connection
    let db = DbPool::new(&config.database).await?;
    if config.database.run_migrations {
        db.run_migrations().await?;
    }

    info!(url = %redact(&config.cache.url), "Connecting to cache...");
    let cache = Cache::connect(&config.cache).await?;
    info!(backend = cache.backend_name(), "Cache ready");

    let generator = create_generator(&config.ai)?;
    info!(model = generator.model_name(), "Generative model ready");

    let addr = config.bind_address();

    // Create app state
    let state = AppState::new(config, Repository::new(db), cache, generator, metrics_handle)?;

    spawn_limiter_cleanup(&state);

    // Build the router
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn init_metrics(config: &AppConfig) -> anyhow::Result<Option<PrometheusHandle>> {
    if !config.observability.metrics_enabled {
        return Ok(None);
    }

    let handle = prometheus_builder()?
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    metrics::register_metrics();
    Ok(Some(handle))
}

/// Forget rate-limit buckets of users that have gone quiet
fn spawn_limiter_cleanup(state: &AppState) {
    let limiter = state.limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            limiter.retain_recent();
            limiter.shrink_to_fit();
        }
    });
}

/// Drop credentials from a connection URL before logging it
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme), Some(at)) if at > scheme => format!("{}***{}", &url[..scheme + 3], &url[at..]),
        _ => url.to_string(),
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
