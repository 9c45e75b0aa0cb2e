//! # Metrics Collection Module
//!
//! Turns request outcomes into Prometheus series, lifetime aggregates and a
//! short recent-request history.
//!
//! ## Overview
//!
//! This module exposes three endpoints:
//! - `GET /metrics` - Prometheus text format metrics
//! - `GET /v1/stats` - JSON format statistics
//! - `GET /v1/requests/recent` - last outcomes, newest first
//!
//! ## Metrics Tracked
//!
//! **Counters:**
//! - `clawgate_requests_total{backend, layer, status}` - Completed requests
//! - `clawgate_fallbacks_total` - Requests that tried more than one backend
//! - `clawgate_backend_failures_total{backend, kind}` - Failed attempts
//! - `clawgate_tokens_total{backend, type}` - Prompt, completion and cache hit tokens
//! - `clawgate_pricing_anomalies_total{backend}` - Completions priced without data
//! - `clawgate_backend_unhealthy_total{backend}` - Healthy to unhealthy transitions
//!
//! **Gauges:**
//! - `clawgate_cost_usd_total` - Accumulated spend in USD
//!
//! **Histograms:**
//! - `clawgate_request_duration_seconds{backend, layer}` - End-to-end duration
//! - `clawgate_backend_latency_seconds{backend}` - Successful attempt latency

pub mod handler;
pub mod history;
pub mod types;

pub use history::{RequestHistory, HISTORY_CAPACITY};
pub use types::*;

// Re-export PrometheusBuilder for building detached handles
pub use metrics_exporter_prometheus::PrometheusBuilder;

use crate::fallback::{OutcomeSink, RequestOutcome};
use crate::registry::Registry;
use crate::routing::Layer;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Label used for requests that no backend served.
const NO_BACKEND_LABEL: &str = "none";

#[derive(Default)]
struct BackendTally {
    stats: BackendStats,
    latency_sum_ms: u64,
}

#[derive(Default)]
struct Tallies {
    totals: TotalStats,
    backends: BTreeMap<String, BackendTally>,
    layers: HashMap<Layer, u64>,
    rules: BTreeMap<String, u64>,
}

impl Tallies {
    fn backend(&mut self, id: &str) -> &mut BackendTally {
        self.backends
            .entry(id.to_string())
            .or_insert_with(|| BackendTally {
                stats: BackendStats {
                    id: id.to_string(),
                    ..Default::default()
                },
                latency_sum_ms: 0,
            })
    }

    fn apply(&mut self, outcome: &RequestOutcome) {
        let totals = &mut self.totals;
        totals.requests += 1;
        if outcome.success {
            totals.successes += 1;
        } else {
            totals.failures += 1;
        }
        if outcome.used_fallback() {
            totals.fallbacks += 1;
        }
        totals.prompt_tokens += outcome.prompt_tokens;
        totals.completion_tokens += outcome.completion_tokens;
        totals.cache_hit_tokens += outcome.cache_hit_tokens;
        totals.cost_usd += outcome.cost_usd;

        *self.layers.entry(outcome.layer).or_default() += 1;
        *self.rules.entry(outcome.rule_name.clone()).or_default() += 1;

        for backend_id in &outcome.attempted {
            if outcome.final_backend.as_deref() != Some(backend_id.as_str()) {
                self.backend(backend_id).stats.failed_attempts += 1;
            }
        }

        if let Some(backend_id) = &outcome.final_backend {
            let tally = self.backend(backend_id);
            tally.stats.requests += 1;
            tally.stats.prompt_tokens += outcome.prompt_tokens;
            tally.stats.completion_tokens += outcome.completion_tokens;
            tally.stats.cache_hit_tokens += outcome.cache_hit_tokens;
            tally.stats.cost_usd += outcome.cost_usd;
            tally.latency_sum_ms += outcome.latency_ms;
            tally.stats.average_latency_ms =
                tally.latency_sum_ms as f64 / tally.stats.requests as f64;
        }
    }
}

/// Records request outcomes and serves them back as metrics and stats.
pub struct MetricsCollector {
    /// Registered backends always appear in stats, even before traffic
    registry: Arc<Registry>,
    /// Gateway startup time for uptime calculation
    start_time: Instant,
    history: RequestHistory,
    tallies: Mutex<Tallies>,
    /// Prometheus handle for rendering metrics
    prometheus_handle: metrics_exporter_prometheus::PrometheusHandle,
}

impl MetricsCollector {
    pub fn new(
        registry: Arc<Registry>,
        start_time: Instant,
        prometheus_handle: metrics_exporter_prometheus::PrometheusHandle,
    ) -> Self {
        Self {
            registry,
            start_time,
            history: RequestHistory::new(),
            tallies: Mutex::new(Tallies::default()),
            prometheus_handle,
        }
    }

    /// Get uptime in seconds since gateway startup.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn history(&self) -> &RequestHistory {
        &self.history
    }

    /// Render Prometheus metrics in text format.
    pub fn render_metrics(&self) -> String {
        self.prometheus_handle.render()
    }

    /// Lifetime aggregates for `/v1/stats`.
    pub fn stats(&self) -> StatsResponse {
        let tallies = self.tallies.lock().unwrap_or_else(|e| e.into_inner());

        let mut totals = tallies.totals.clone();
        totals.cache_hit_ratio = if totals.prompt_tokens == 0 {
            0.0
        } else {
            totals.cache_hit_tokens as f64 / totals.prompt_tokens as f64
        };

        let mut backends: BTreeMap<String, BackendStats> = self
            .registry
            .ids()
            .map(|id| {
                (
                    id.to_string(),
                    BackendStats {
                        id: id.to_string(),
                        ..Default::default()
                    },
                )
            })
            .collect();
        for (id, tally) in &tallies.backends {
            backends.insert(id.clone(), tally.stats.clone());
        }

        let layers = [Layer::Static, Layer::Heuristic, Layer::ModelAssisted]
            .into_iter()
            .map(|layer| LayerStats {
                layer: layer.as_str().to_string(),
                requests: tallies.layers.get(&layer).copied().unwrap_or(0),
            })
            .collect();

        let rules = tallies
            .rules
            .iter()
            .map(|(rule, requests)| RuleStats {
                rule: rule.clone(),
                requests: *requests,
            })
            .collect();

        StatsResponse {
            uptime_seconds: self.uptime_seconds(),
            totals,
            backends: backends.into_values().collect(),
            layers,
            rules,
        }
    }
}

impl OutcomeSink for MetricsCollector {
    fn record(&self, outcome: &RequestOutcome) {
        let backend = outcome
            .final_backend
            .clone()
            .unwrap_or_else(|| NO_BACKEND_LABEL.to_string());
        let status = if outcome.success { "success" } else { "error" };
        let layer = outcome.layer.as_str();

        metrics::counter!("clawgate_requests_total",
            "backend" => backend.clone(),
            "layer" => layer,
            "status" => status
        )
        .increment(1);
        metrics::histogram!("clawgate_request_duration_seconds",
            "backend" => backend.clone(),
            "layer" => layer
        )
        .record(outcome.latency_ms as f64 / 1000.0);

        if outcome.used_fallback() {
            metrics::counter!("clawgate_fallbacks_total").increment(1);
        }

        if outcome.success {
            for (kind, tokens) in [
                ("prompt", outcome.prompt_tokens),
                ("completion", outcome.completion_tokens),
                ("cache_hit", outcome.cache_hit_tokens),
            ] {
                metrics::counter!("clawgate_tokens_total",
                    "backend" => backend.clone(),
                    "type" => kind
                )
                .increment(tokens);
            }
            metrics::gauge!("clawgate_cost_usd_total").increment(outcome.cost_usd);
        }

        self.tallies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .apply(outcome);
        self.history.push(outcome.clone());
    }
}

/// Initialize Prometheus metrics exporter with custom histogram buckets.
///
/// Buckets are tuned for LLM completion latency in seconds:
/// [0.1, 0.25, 0.5, 1, 2.5, 5, 10, 30, 60, 120, 300].
pub fn setup_metrics(
) -> Result<metrics_exporter_prometheus::PrometheusHandle, Box<dyn std::error::Error>> {
    use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};

    let duration_buckets = &[
        0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0,
    ];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("clawgate_request_duration_seconds".to_string()),
            duration_buckets,
        )?
        .set_buckets_for_metric(
            Matcher::Full("clawgate_backend_latency_seconds".to_string()),
            duration_buckets,
        )?
        .install_recorder()?;

    Ok(handle)
}
