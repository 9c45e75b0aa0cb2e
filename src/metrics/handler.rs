//! # Metrics HTTP Handlers
//!
//! Axum handlers for metrics endpoints.

use super::{RecentRequestsResponse, HISTORY_CAPACITY};
use crate::api::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

const DEFAULT_RECENT_LIMIT: usize = 20;

/// Handler for GET /metrics endpoint (Prometheus text format).
///
/// Always returns 200 with the Prometheus content type, even before the
/// first request has been recorded.
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let metrics = state.metrics_collector.render_metrics();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        metrics,
    )
}

/// Handler for GET /v1/stats endpoint (JSON format).
pub async fn stats_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.metrics_collector.stats())
}

#[derive(Debug, Default, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

/// Handler for GET /v1/requests/recent?limit=N.
///
/// `limit` defaults to 20 and is capped at the history capacity.
pub async fn recent_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecentQuery>,
) -> impl IntoResponse {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_RECENT_LIMIT)
        .min(HISTORY_CAPACITY);
    Json(RecentRequestsResponse {
        object: "list",
        data: state.metrics_collector.history().recent(limit),
    })
}
