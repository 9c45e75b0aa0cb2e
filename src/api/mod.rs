//! # Core API Gateway
//!
//! OpenAI-compatible HTTP endpoints for ClawGate.
//!
//! ## Endpoints
//!
//! - `POST /v1/chat/completions` - Chat completion (non-streaming)
//! - `GET /v1/models` - The virtual `auto` model plus one entry per backend
//! - `GET /health` - Gateway status with per-backend health
//! - `GET /metrics` - Prometheus text format
//! - `GET /v1/stats` - JSON aggregates
//! - `GET /v1/requests/recent` - Last request outcomes
//!
//! ## Example
//!
//! ```no_run
//! use clawgate::api::{create_router, AppState};
//! use clawgate::agent::build_agents;
//! use clawgate::config::GatewayConfig;
//! use clawgate::registry::Registry;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(GatewayConfig::load(Some("clawgate.toml".as_ref()))?);
//! let registry = Arc::new(Registry::from_config(&config)?);
//! let agents = build_agents(&registry)?;
//!
//! let state = Arc::new(AppState::new(config, registry, agents));
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8090").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Request Flow
//!
//! 1. Body parsed into OpenAI-compatible types; streaming requests rejected
//! 2. Classifier picks a backend (static rules, heuristics, optional model)
//! 3. Fallback executor tries candidates until one succeeds
//! 4. Upstream JSON returned with `X-ClawGate-*` provenance headers
//!
//! ## Error Handling
//!
//! Errors use the OpenAI envelope. When every backend fails the body also
//! lists the attempts:
//! ```json
//! {
//!   "error": {
//!     "message": "All backends failed: deepseek-chat (timeout: ...)",
//!     "type": "upstream_unavailable",
//!     "code": "all_backends_failed"
//!   },
//!   "attempts": [{"backend": "deepseek-chat", "kind": "timeout", "error": "..."}]
//! }
//! ```

mod completions;
pub mod error;
pub mod headers;
mod health;
mod models;
pub mod types;

pub use error::{AllBackendsFailedError, GatewayError};
pub use types::*;

use crate::agent::InferenceAgent;
use crate::config::GatewayConfig;
use crate::fallback::{FallbackExecutor, OutcomeSink};
use crate::health::HealthTracker;
use crate::metrics::MetricsCollector;
use crate::registry::Registry;
use crate::routing::{AgentClassifier, Classifier};
use axum::{
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Shared application state accessible to all handlers.
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub registry: Arc<Registry>,
    pub health: Arc<HealthTracker>,
    pub classifier: Arc<Classifier>,
    pub executor: Arc<FallbackExecutor>,
    /// Metrics collector for observability
    pub metrics_collector: Arc<MetricsCollector>,
    /// Server startup time for uptime tracking
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Wire the core components for `config`, calling upstreams through `agents`.
    pub fn new(
        config: Arc<GatewayConfig>,
        registry: Arc<Registry>,
        agents: HashMap<String, Arc<dyn InferenceAgent>>,
    ) -> Self {
        let start_time = Instant::now();

        // A recorder may already be installed (tests, embedding); fall back to a detached handle
        let prometheus_handle = crate::metrics::setup_metrics().unwrap_or_else(|e| {
            tracing::debug!("Metrics already initialized, creating new handle: {}", e);
            crate::metrics::PrometheusBuilder::new()
                .build_recorder()
                .handle()
        });
        let metrics_collector = Arc::new(MetricsCollector::new(
            Arc::clone(&registry),
            start_time,
            prometheus_handle,
        ));

        let health = Arc::new(HealthTracker::with_backends(
            config.health.clone(),
            registry.ids().map(str::to_string),
        ));

        let classifier = Arc::new(build_classifier(&config, &registry, &agents));

        let sink: Arc<dyn OutcomeSink> = metrics_collector.clone();
        let executor = Arc::new(FallbackExecutor::new(
            Arc::clone(&registry),
            Arc::clone(&health),
            agents,
            sink,
        ));

        Self {
            config,
            registry,
            health,
            classifier,
            executor,
            metrics_collector,
            start_time,
            started_at: Utc::now(),
        }
    }
}

/// Classifier for `config`, with the model-assisted layer attached when it is
/// enabled and its backend has an agent.
fn build_classifier(
    config: &GatewayConfig,
    registry: &Arc<Registry>,
    agents: &HashMap<String, Arc<dyn InferenceAgent>>,
) -> Classifier {
    let classifier = Classifier::new(Arc::clone(registry), &config.routing, &config.classifier);
    if !config.classifier.enabled {
        return classifier;
    }

    let agent = config
        .classifier
        .backend
        .as_deref()
        .and_then(|id| agents.get(id));
    match agent {
        Some(agent) => classifier.with_task_classifier(Arc::new(AgentClassifier::new(
            Arc::clone(agent),
            config.classifier.max_tokens,
        ))),
        None => {
            tracing::warn!(
                backend = ?config.classifier.backend,
                "Model-assisted classification enabled but its backend is unavailable, disabling"
            );
            classifier
        }
    }
}

/// Create the main API router with all endpoints configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.server.max_body_bytes;
    let timeout = Duration::from_secs(state.config.server.request_timeout_seconds);

    // Completions are bounded per attempt by the executor, never by the server timeout
    let completion_routes = Router::new().route("/v1/chat/completions", post(completions::handle));

    Router::new()
        .route("/v1/models", get(models::handle))
        .route("/health", get(health::handle))
        .route("/metrics", get(crate::metrics::handler::metrics_handler))
        .route("/v1/stats", get(crate::metrics::handler::stats_handler))
        .route(
            "/v1/requests/recent",
            get(crate::metrics::handler::recent_handler),
        )
        .layer(TimeoutLayer::new(timeout))
        .merge(completion_routes)
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
