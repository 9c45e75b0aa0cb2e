//! Health check endpoint handler.

use crate::api::AppState;
use crate::health::HealthSnapshot;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` while any backend is unhealthy
    pub status: String,
    pub uptime_seconds: u64,
    pub backends: Vec<BackendHealth>,
}

/// Per-backend entry of the health response.
#[derive(Debug, Serialize)]
pub struct BackendHealth {
    pub id: String,
    pub healthy: bool,
    pub consecutive_failures: u32,
    pub avg_latency_ms: f64,
    pub last_error: Option<String>,
}

impl From<HealthSnapshot> for BackendHealth {
    fn from(snapshot: HealthSnapshot) -> Self {
        Self {
            id: snapshot.backend_id,
            healthy: snapshot.healthy,
            consecutive_failures: snapshot.consecutive_failures,
            avg_latency_ms: (snapshot.avg_latency_ms * 10.0).round() / 10.0,
            last_error: snapshot.last_error,
        }
    }
}

/// GET /health - Return gateway and backend health.
pub async fn handle(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let backends: Vec<BackendHealth> = state
        .health
        .snapshot_all()
        .into_iter()
        .map(BackendHealth::from)
        .collect();

    let status = if backends.iter().all(|b| b.healthy) {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        backends,
    })
}
