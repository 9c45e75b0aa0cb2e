//! Fallback executor
//!
//! Drives a classified request through its candidate backends. Each candidate
//! is tried at most once, healthy candidates first, and every attempt is
//! reported to the health tracker before the next one starts. A request ends
//! with exactly one [`RequestOutcome`] handed to the configured sink.

mod error;
mod outcome;
#[cfg(test)]
mod tests;

pub use error::FallbackError;
pub use outcome::{summarize_attempts, AttemptRecord, NullSink, OutcomeSink, RequestOutcome};

use crate::accounting::CostAccountant;
use crate::agent::{AgentError, InferenceAgent};
use crate::api::types::{ChatCompletionRequest, ChatCompletionResponse, Usage};
use crate::health::HealthTracker;
use crate::logging::truncate_detail;
use crate::registry::{Registry, DEFAULT_CHAIN};
use crate::routing::{ClassificationResult, Layer};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Upper bound on failure descriptions stored in health state and outcomes.
pub const MAX_FAILURE_DESCRIPTION_CHARS: usize = 200;

/// A successful dispatch and its provenance.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub response: ChatCompletionResponse,
    pub backend_id: String,
    pub layer: Layer,
    pub rule_name: String,
    pub cost_usd: f64,
    pub usage: Usage,
    pub attempted: Vec<String>,
}

/// Executes requests against backends with health-aware fallback.
pub struct FallbackExecutor {
    registry: Arc<Registry>,
    health: Arc<HealthTracker>,
    agents: HashMap<String, Arc<dyn InferenceAgent>>,
    accountant: CostAccountant,
    sink: Arc<dyn OutcomeSink>,
}

impl FallbackExecutor {
    pub fn new(
        registry: Arc<Registry>,
        health: Arc<HealthTracker>,
        agents: HashMap<String, Arc<dyn InferenceAgent>>,
        sink: Arc<dyn OutcomeSink>,
    ) -> Self {
        Self {
            accountant: CostAccountant::new(Arc::clone(&registry)),
            registry,
            health,
            agents,
            sink,
        }
    }

    /// Ordered candidates for `chosen`: itself, then the members of every
    /// chain listing it, deduplicated.
    ///
    /// A backend in no chain falls back on the `default` chain. Unregistered
    /// ids never appear.
    pub fn candidates(&self, chosen: &str) -> Vec<String> {
        let mut candidates: Vec<String> = Vec::new();
        let mut push = |id: &str| {
            if self.registry.contains(id) && !candidates.iter().any(|c| c == id) {
                candidates.push(id.to_string());
            }
        };

        push(chosen);
        let mut in_chain = false;
        for chain in self.registry.chains_containing(chosen) {
            in_chain = true;
            for member in &chain.members {
                push(member);
            }
        }
        if !in_chain {
            if let Some(chain) = self.registry.chain(DEFAULT_CHAIN) {
                for member in &chain.members {
                    push(member);
                }
            }
        }
        candidates
    }

    /// Run `request` through the candidates of `classification`.
    pub async fn execute(
        &self,
        request_id: &str,
        request: ChatCompletionRequest,
        classification: &ClassificationResult,
    ) -> Result<Dispatch, FallbackError> {
        let started = Instant::now();
        let mut remaining = self.candidates(&classification.backend_id);

        if remaining.is_empty() {
            let error = FallbackError::NoCandidates {
                backend_id: classification.backend_id.clone(),
            };
            tracing::error!(
                request_id = %request_id,
                backend_id = %classification.backend_id,
                "No candidates for request"
            );
            self.emit_failure(request_id, classification, started, Vec::new(), &error);
            return Err(error);
        }

        let mut attempted: Vec<String> = Vec::with_capacity(remaining.len());
        let mut failures: Vec<AttemptRecord> = Vec::new();

        while !remaining.is_empty() {
            let next = remaining
                .iter()
                .position(|id| self.health.is_healthy(id))
                .unwrap_or(0);
            let backend_id = remaining.remove(next);
            attempted.push(backend_id.clone());

            tracing::debug!(
                request_id = %request_id,
                backend_id = %backend_id,
                attempt = attempted.len(),
                "Trying backend"
            );

            let attempt_started = Instant::now();
            match self.call_backend(&backend_id, request.clone()).await {
                Ok(response) => {
                    let latency_ms = attempt_started.elapsed().as_secs_f64() * 1000.0;
                    self.health.record_success(&backend_id, latency_ms);
                    return Ok(self.complete(
                        request_id,
                        classification,
                        started,
                        backend_id,
                        response,
                        attempted,
                    ));
                }
                Err(e) => {
                    let kind = e.kind();
                    let description = truncate_detail(&e.to_string(), MAX_FAILURE_DESCRIPTION_CHARS);
                    self.health.record_failure(&backend_id, &description);
                    metrics::counter!("clawgate_backend_failures_total",
                        "backend" => backend_id.clone(),
                        "kind" => kind.as_str()
                    )
                    .increment(1);
                    tracing::warn!(
                        request_id = %request_id,
                        backend_id = %backend_id,
                        kind = %kind,
                        error = %description,
                        remaining = remaining.len(),
                        "Backend attempt failed"
                    );
                    failures.push(AttemptRecord {
                        backend: backend_id,
                        kind,
                        error: description,
                    });
                }
            }
        }

        let error = FallbackError::Exhausted { attempts: failures };
        tracing::error!(
            request_id = %request_id,
            attempted = ?attempted,
            "All backends failed"
        );
        self.emit_failure(request_id, classification, started, attempted, &error);
        Err(error)
    }

    async fn call_backend(
        &self,
        backend_id: &str,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, AgentError> {
        let agent = self.agents.get(backend_id).ok_or_else(|| {
            AgentError::Configuration(format!("No agent for backend '{}'", backend_id))
        })?;
        let deadline = self
            .registry
            .get(backend_id)
            .map(|b| b.timeouts.total())
            .unwrap_or_default();

        match tokio::time::timeout(deadline, agent.chat_completion(request)).await {
            Ok(result) => result,
            Err(_) => Err(AgentError::Timeout(deadline.as_millis() as u64)),
        }
    }

    fn complete(
        &self,
        request_id: &str,
        classification: &ClassificationResult,
        started: Instant,
        backend_id: String,
        response: ChatCompletionResponse,
        attempted: Vec<String>,
    ) -> Dispatch {
        let usage = response.usage.clone().unwrap_or_default();
        let cache_hit_tokens = usage.cache_hit_tokens().min(usage.prompt_tokens);
        let cost_usd = self.accountant.price(
            &backend_id,
            usage.prompt_tokens,
            cache_hit_tokens,
            usage.completion_tokens,
        );
        let latency_ms = started.elapsed().as_millis() as u64;

        tracing::info!(
            request_id = %request_id,
            backend_id = %backend_id,
            layer = %classification.layer,
            rule = %classification.rule_name,
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            cache_hit_tokens,
            cost_usd,
            latency_ms,
            attempts = attempted.len(),
            "Request completed"
        );

        self.sink.record(&RequestOutcome {
            request_id: request_id.to_string(),
            timestamp: chrono::Utc::now(),
            final_backend: Some(backend_id.clone()),
            layer: classification.layer,
            rule_name: classification.rule_name.clone(),
            category: classification.category.clone(),
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            cache_hit_tokens,
            cost_usd,
            success: true,
            latency_ms,
            attempted: attempted.clone(),
            error: None,
        });

        Dispatch {
            response,
            backend_id,
            layer: classification.layer,
            rule_name: classification.rule_name.clone(),
            cost_usd,
            usage,
            attempted,
        }
    }

    fn emit_failure(
        &self,
        request_id: &str,
        classification: &ClassificationResult,
        started: Instant,
        attempted: Vec<String>,
        error: &FallbackError,
    ) {
        self.sink.record(&RequestOutcome {
            request_id: request_id.to_string(),
            timestamp: chrono::Utc::now(),
            final_backend: None,
            layer: classification.layer,
            rule_name: classification.rule_name.clone(),
            category: classification.category.clone(),
            prompt_tokens: 0,
            completion_tokens: 0,
            cache_hit_tokens: 0,
            cost_usd: 0.0,
            success: false,
            latency_ms: started.elapsed().as_millis() as u64,
            attempted,
            error: Some(error.to_string()),
        });
    }
}
