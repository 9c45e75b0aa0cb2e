//! Backend Registry module.
//!
//! Static description of every usable upstream backend, built once from
//! configuration at startup and shared read-only afterwards.

mod backend;
mod error;

pub use backend::*;
pub use error::*;

use crate::config::GatewayConfig;
use std::collections::{HashMap, HashSet};

/// Chain used for backends that belong to no chain of their own.
pub const DEFAULT_CHAIN: &str = "default";

/// Immutable table of backends and fallback chains.
///
/// A backend without a resolvable credential is not part of the registry at
/// all (unless it is `auth_optional`), and it is removed from every chain.
///
/// # Examples
///
/// ```
/// use clawgate::config::{BackendConfig, GatewayConfig};
/// use clawgate::registry::Registry;
///
/// let mut config = GatewayConfig::default();
/// let mut backend = BackendConfig::new("deepseek-chat", "https://api.deepseek.com/v1");
/// backend.api_key = Some("sk-test".to_string());
/// config.backends.push(backend);
/// config.backends.push(BackendConfig::new("no-key", "https://example.com/v1"));
///
/// let registry = Registry::from_config(&config).unwrap();
/// assert_eq!(registry.len(), 1);
/// assert!(registry.get("no-key").is_none());
/// ```
#[derive(Debug, Default)]
pub struct Registry {
    backends: Vec<Backend>,
    index: HashMap<String, usize>,
    chains: Vec<FallbackChain>,
    excluded: Vec<String>,
}

impl Registry {
    pub fn from_config(config: &GatewayConfig) -> Result<Self, RegistryError> {
        let configured: HashSet<&str> = config.backends.iter().map(|b| b.id.as_str()).collect();
        let mut registry = Registry::default();
        let mut seen: HashSet<&str> = HashSet::with_capacity(config.backends.len());

        for backend_config in &config.backends {
            // Excluded backends still claim their id
            if !seen.insert(backend_config.id.as_str()) {
                return Err(RegistryError::DuplicateBackend(backend_config.id.clone()));
            }
            let api_key = backend_config.resolve_api_key();
            if api_key.is_none() && !backend_config.auth_optional {
                tracing::warn!(
                    backend_id = %backend_config.id,
                    "Backend has no API key, skipping"
                );
                registry.excluded.push(backend_config.id.clone());
                continue;
            }
            registry
                .index
                .insert(backend_config.id.clone(), registry.backends.len());
            registry
                .backends
                .push(Backend::from_config(backend_config, api_key));
        }

        for chain_config in &config.fallback_chains {
            let mut members = Vec::with_capacity(chain_config.members.len());
            for member in &chain_config.members {
                if !configured.contains(member.as_str()) {
                    return Err(RegistryError::UnknownChainMember {
                        chain: chain_config.name.clone(),
                        member: member.clone(),
                    });
                }
                if registry.index.contains_key(member) && !members.contains(member) {
                    members.push(member.clone());
                }
            }
            if members.is_empty() {
                tracing::warn!(chain = %chain_config.name, "Fallback chain has no usable members");
                continue;
            }
            for member in &members {
                if let Some(&i) = registry.index.get(member) {
                    registry.backends[i].chains.push(chain_config.name.clone());
                }
            }
            registry.chains.push(FallbackChain {
                name: chain_config.name.clone(),
                members,
            });
        }

        tracing::info!(
            backends = registry.backends.len(),
            excluded = registry.excluded.len(),
            chains = registry.chains.len(),
            "Backend registry loaded"
        );
        Ok(registry)
    }

    pub fn get(&self, id: &str) -> Option<&Backend> {
        self.index.get(id).map(|&i| &self.backends[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Backends in configuration order.
    pub fn backends(&self) -> impl Iterator<Item = &Backend> {
        self.backends.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.backends.iter().map(|b| b.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn chain(&self, name: &str) -> Option<&FallbackChain> {
        self.chains.iter().find(|c| c.name == name)
    }

    pub fn chains(&self) -> &[FallbackChain] {
        &self.chains
    }

    /// Chains listing `id`, in declaration order.
    pub fn chains_containing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a FallbackChain> {
        self.chains
            .iter()
            .filter(move |c| c.members.iter().any(|m| m == id))
    }

    /// Ids dropped at load time for lack of credentials.
    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            backends: self.backends.iter().map(Backend::summary).collect(),
            chains: self.chains.clone(),
            excluded: self.excluded.clone(),
        }
    }
}
