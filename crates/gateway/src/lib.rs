//! ClauseLens API Gateway
//!
//! HTTP boundary for the analysis service.
//! Handles:
//! - Session authentication
//! - Multipart contract uploads
//! - Rate limiting of model-backed routes
//! - Request routing
//! - Observability (logging, metrics)

pub mod handlers;
pub mod middleware;

use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use clauselens_analysis::{AnalysisStore, AnalyzerConfig, ContractAnalyzer};
use clauselens_common::{
    ai::ContentGenerator,
    auth::SessionManager,
    cache::Cache,
    config::AppConfig,
    db::Repository,
    errors::{AppError, Result},
};
use anyhow::Context;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use middleware::rate_limit::{create_rate_limiter, UserRateLimiter};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Multipart framing allowance on top of the file size limit
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Prometheus exporter carrying the latency bucket layout
pub fn prometheus_builder() -> anyhow::Result<PrometheusBuilder> {
    let mut builder = PrometheusBuilder::new();
    for (name, buckets) in clauselens_common::metrics::histogram_buckets() {
        builder = builder
            .set_buckets_for_metric(Matcher::Full(name.clone()), buckets)
            .with_context(|| format!("Invalid histogram buckets for {}", name))?;
    }
    Ok(builder)
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repository: Repository,
    pub cache: Cache,
    pub sessions: Arc<SessionManager>,
    pub analyzer: Arc<ContractAnalyzer>,
    pub limiter: Arc<UserRateLimiter>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        repository: Repository,
        cache: Cache,
        generator: Arc<dyn ContentGenerator>,
        metrics: Option<PrometheusHandle>,
    ) -> Result<Self> {
        let secret = config
            .auth
            .session_secret
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Configuration {
                message: "auth.session_secret must be set".to_string(),
            })?;

        let sessions = SessionManager::new(
            &secret,
            config.auth.session_ttl_secs,
            config.auth.cookie_name.clone(),
        );

        let store = AnalysisStore::new(
            repository.clone(),
            cache.clone(),
            config.cache.analysis_ttl_secs,
        );
        let analyzer = ContractAnalyzer::new(
            generator,
            cache.clone(),
            store,
            AnalyzerConfig::from(&config),
        );

        let limiter = create_rate_limiter(
            config.rate_limit.requests_per_second,
            config.rate_limit.burst,
        );

        Ok(Self {
            config: Arc::new(config),
            repository,
            cache,
            sessions: Arc::new(sessions),
            analyzer: Arc::new(analyzer),
            limiter,
            metrics,
        })
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let body_limit = state.config.upload.max_bytes + MULTIPART_OVERHEAD_BYTES;

    // Model-backed routes are authenticated and rate limited per user
    let analysis_routes = Router::new()
        .route("/contracts/detect-type", post(handlers::contracts::detect_type))
        .route("/contracts/analyze", post(handlers::contracts::analyze))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::rate_limit::rate_limit_middleware,
        ))
        .layer(DefaultBodyLimit::max(body_limit));

    let api_routes = Router::new()
        // Session endpoints
        .route("/auth/current-user", get(handlers::auth::current_user))
        .route("/auth/logout", get(handlers::auth::logout))

        // Contract endpoints
        .route("/contracts/user-contracts", get(handlers::contracts::user_contracts))
        .route("/contracts/contract/{id}", get(handlers::contracts::get_contract))
        .route("/contracts/contract/{id}/feedback", post(handlers::contracts::submit_feedback))

        // Payment endpoints (read only)
        .route("/payments/membership-status", get(handlers::payments::membership_status))
        .merge(analysis_routes);

    Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/metrics", get(handlers::health::render_metrics))
        .merge(api_routes)
        .fallback(handlers::not_found)
        .layer(from_fn(middleware::metrics::track_requests))
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}
