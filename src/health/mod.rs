//! Passive health tracking for upstream backends.
//!
//! Every backend call made by the fallback executor reports its outcome here.
//! The tracker owns all per-backend state; callers only ever see
//! [`HealthSnapshot`] copies.

mod config;
mod state;


pub use config::*;
pub use state::*;

use dashmap::DashMap;

/// Concurrent per-backend health state.
///
/// Each mutation runs under the DashMap shard lock of its entry, so the
/// failure counter and latency average of one backend always change together.
pub struct HealthTracker {
    config: HealthConfig,
    states: DashMap<String, BackendHealthState>,
}

impl HealthTracker {
    pub fn new(config: HealthConfig) -> Self {
        Self {
            config,
            states: DashMap::new(),
        }
    }

    /// Tracker pre-populated with fresh state for each id, so they show up in
    /// [`HealthTracker::snapshot_all`] before their first request.
    pub fn with_backends<I, S>(config: HealthConfig, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tracker = Self::new(config);
        for id in ids {
            tracker
                .states
                .insert(id.into(), BackendHealthState::new(&tracker.config.latency));
        }
        tracker
    }

    pub fn failure_threshold(&self) -> u32 {
        self.config.failure_threshold
    }

    pub fn record_success(&self, backend_id: &str, latency_ms: f64) {
        let previous = self
            .states
            .entry(backend_id.to_string())
            .or_insert_with(|| BackendHealthState::new(&self.config.latency))
            .apply_success(latency_ms);

        metrics::histogram!("clawgate_backend_latency_seconds", "backend" => backend_id.to_string())
            .record(latency_ms / 1000.0);

        if previous >= self.config.failure_threshold {
            tracing::info!(
                backend_id = %backend_id,
                previous_failures = previous,
                latency_ms,
                "Backend recovered"
            );
        }
    }

    pub fn record_failure(&self, backend_id: &str, description: &str) {
        let failures = self
            .states
            .entry(backend_id.to_string())
            .or_insert_with(|| BackendHealthState::new(&self.config.latency))
            .apply_failure(description);

        if failures == self.config.failure_threshold {
            metrics::counter!("clawgate_backend_unhealthy_total", "backend" => backend_id.to_string())
                .increment(1);
            tracing::warn!(
                backend_id = %backend_id,
                consecutive_failures = failures,
                error = %description,
                "Backend marked unhealthy"
            );
        } else {
            tracing::debug!(
                backend_id = %backend_id,
                consecutive_failures = failures,
                error = %description,
                "Backend failure recorded"
            );
        }
    }

    /// Consistent copy of one backend's state; `None` for ids never seen.
    pub fn snapshot(&self, backend_id: &str) -> Option<HealthSnapshot> {
        self.states
            .get(backend_id)
            .map(|state| state.snapshot(backend_id, self.config.failure_threshold))
    }

    /// Snapshots of every tracked backend, sorted by id.
    pub fn snapshot_all(&self) -> Vec<HealthSnapshot> {
        let mut all: Vec<HealthSnapshot> = self
            .states
            .iter()
            .map(|entry| entry.value().snapshot(entry.key(), self.config.failure_threshold))
            .collect();
        all.sort_by(|a, b| a.backend_id.cmp(&b.backend_id));
        all
    }

    /// Unknown backends count as healthy.
    pub fn is_healthy(&self, backend_id: &str) -> bool {
        self.states
            .get(backend_id)
            .map(|state| state.consecutive_failures < self.config.failure_threshold)
            .unwrap_or(true)
    }
}
