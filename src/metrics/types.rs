//! # Metrics Types
//!
//! Data structures for JSON stats API responses.

use crate::fallback::RequestOutcome;
use serde::Serialize;

/// JSON response for GET /v1/stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Gateway uptime in seconds since startup
    pub uptime_seconds: u64,
    /// Lifetime totals across all backends
    pub totals: TotalStats,
    /// Per-backend breakdown, ordered by backend id
    pub backends: Vec<BackendStats>,
    /// Per-layer breakdown in pipeline order
    pub layers: Vec<LayerStats>,
    /// Per-rule breakdown, ordered by rule name
    pub rules: Vec<RuleStats>,
}

/// Lifetime request, token and cost totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TotalStats {
    pub requests: u64,
    pub successes: u64,
    pub failures: u64,
    /// Requests that tried more than one backend
    pub fallbacks: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cache_hit_tokens: u64,
    /// Cache hit tokens over prompt tokens (0.0 when no prompt tokens)
    pub cache_hit_ratio: f64,
    pub cost_usd: f64,
}

/// Per-backend statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BackendStats {
    pub id: String,
    /// Requests this backend finally served
    pub requests: u64,
    /// Attempts on this backend that failed and moved on
    pub failed_attempts: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cache_hit_tokens: u64,
    pub cost_usd: f64,
    /// Mean end-to-end latency of served requests
    pub average_latency_ms: f64,
}

/// Requests decided by one classifier layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerStats {
    pub layer: String,
    pub requests: u64,
}

/// Requests decided by one rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleStats {
    pub rule: String,
    pub requests: u64,
}

/// JSON response for GET /v1/requests/recent.
#[derive(Debug, Clone, Serialize)]
pub struct RecentRequestsResponse {
    pub object: &'static str,
    pub data: Vec<RequestOutcome>,
}
