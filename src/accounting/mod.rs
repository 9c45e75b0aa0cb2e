//! Cost & cache accounting.
//!
//! Turns token usage reported by a backend into a USD cost using the
//! registry's per-million-token prices:
//!
//! ```text
//! cost = (hit * cache_hit_price + (prompt - hit) * input_price + completion * output_price) / 1e6
//! ```
//!
//! Pricing never fails a request. A backend without pricing data costs zero
//! and the anomaly is logged and counted.
//!
//! ## Example
//!
//! ```rust
//! use clawgate::accounting::compute_cost;
//! use clawgate::registry::Pricing;
//!
//! let pricing = Pricing {
//!     input_per_million: 0.14,
//!     cache_hit_per_million: 0.014,
//!     output_per_million: 0.28,
//! };
//! let cost = compute_cost(&pricing, 1000, 800, 200);
//! assert!((cost - 0.0000952).abs() < 1e-12);
//! ```

use crate::registry::{Pricing, Registry};
use std::sync::Arc;

const TOKENS_PER_UNIT: f64 = 1_000_000.0;

/// Cost of one completion under `pricing`.
///
/// `cache_hit_tokens` is clamped to `prompt_tokens`.
pub fn compute_cost(
    pricing: &Pricing,
    prompt_tokens: u64,
    cache_hit_tokens: u64,
    completion_tokens: u64,
) -> f64 {
    let hit = cache_hit_tokens.min(prompt_tokens);
    let miss = prompt_tokens - hit;
    (hit as f64 * pricing.cache_hit_per_million
        + miss as f64 * pricing.input_per_million
        + completion_tokens as f64 * pricing.output_per_million)
        / TOKENS_PER_UNIT
}

/// Prices completions against the backend registry.
#[derive(Clone)]
pub struct CostAccountant {
    registry: Arc<Registry>,
}

impl CostAccountant {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// USD cost of a completion served by `backend_id`.
    pub fn price(
        &self,
        backend_id: &str,
        prompt_tokens: u64,
        cache_hit_tokens: u64,
        completion_tokens: u64,
    ) -> f64 {
        let Some(backend) = self.registry.get(backend_id) else {
            metrics::counter!("clawgate_pricing_anomalies_total", "backend" => backend_id.to_string())
                .increment(1);
            tracing::warn!(
                backend_id = %backend_id,
                prompt_tokens,
                completion_tokens,
                "No pricing data for backend, recording zero cost"
            );
            return 0.0;
        };

        if cache_hit_tokens > prompt_tokens {
            tracing::debug!(
                backend_id = %backend_id,
                prompt_tokens,
                cache_hit_tokens,
                "Cache-hit tokens exceed prompt tokens, clamping"
            );
        }

        compute_cost(
            &backend.pricing,
            prompt_tokens,
            cache_hit_tokens,
            completion_tokens,
        )
    }
}
