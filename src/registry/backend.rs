//! Backend data types

use crate::config::{AdapterKind, BackendConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Resolved prices in USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Pricing {
    pub input_per_million: f64,
    pub cache_hit_per_million: f64,
    pub output_per_million: f64,
}

impl From<&crate::config::PricingConfig> for Pricing {
    fn from(config: &crate::config::PricingConfig) -> Self {
        Self {
            input_per_million: config.input,
            cache_hit_per_million: config.cache_hit.unwrap_or(config.input),
            output_per_million: config.output,
        }
    }
}

/// Connect and read timeouts for one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    pub connect: Duration,
    pub read: Duration,
}

impl Timeouts {
    /// Upper bound for one complete attempt.
    pub fn total(&self) -> Duration {
        self.connect + self.read
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            read: Duration::from_secs(120),
        }
    }
}

/// A configured upstream backend, immutable after startup.
#[derive(Debug, Clone)]
pub struct Backend {
    pub id: String,
    pub adapter: AdapterKind,
    pub url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub pricing: Pricing,
    pub timeouts: Timeouts,
    /// Names of the fallback chains listing this backend, in declaration order
    pub chains: Vec<String>,
}

impl Backend {
    pub(crate) fn from_config(config: &BackendConfig, api_key: Option<String>) -> Self {
        Self {
            id: config.id.clone(),
            adapter: config.adapter,
            url: config.url.trim_end_matches('/').to_string(),
            model: config.upstream_model().to_string(),
            api_key,
            max_tokens: config.max_tokens,
            pricing: Pricing::from(&config.pricing),
            timeouts: Timeouts {
                connect: Duration::from_secs(config.timeouts.connect_seconds),
                read: Duration::from_secs(config.timeouts.read_seconds),
            },
            chains: Vec::new(),
        }
    }

    pub fn credential_present(&self) -> bool {
        self.api_key.is_some()
    }

    /// Credential-free summary used for listings and round-trip checks.
    pub fn summary(&self) -> BackendSummary {
        BackendSummary {
            id: self.id.clone(),
            adapter: self.adapter,
            url: self.url.clone(),
            model: self.model.clone(),
            credential_present: self.credential_present(),
            pricing: self.pricing,
            chains: self.chains.clone(),
        }
    }
}

/// Ordered list of backend ids tried in sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackChain {
    pub name: String,
    pub members: Vec<String>,
}

/// Serializable view of one backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSummary {
    pub id: String,
    pub adapter: AdapterKind,
    pub url: String,
    pub model: String,
    pub credential_present: bool,
    pub pricing: Pricing,
    pub chains: Vec<String>,
}

/// Serializable view of the whole registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub backends: Vec<BackendSummary>,
    pub chains: Vec<FallbackChain>,
    /// Configured backends dropped for lack of credentials
    pub excluded: Vec<String>,
}
