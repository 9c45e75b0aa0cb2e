use super::*;
use crate::api::types::{ChatMessage, Choice};
use crate::config::{AdapterKind, BackendConfig, FallbackChainConfig, GatewayConfig, PricingConfig};
use crate::health::HealthConfig;
use async_trait::async_trait;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Scripted agent: fails with `failure` when set, otherwise answers.
struct ScriptedAgent {
    id: String,
    failure: Option<AgentError>,
    delay: Duration,
    usage: Usage,
    calls: AtomicUsize,
}

#[async_trait]
impl InferenceAgent for ScriptedAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn adapter(&self) -> AdapterKind {
        AdapterKind::OpenaiCompat
    }

    async fn chat_completion(
        &self,
        _request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        Ok(ChatCompletionResponse {
            id: "cmpl-1".into(),
            object: "chat.completion".into(),
            created: 0,
            model: self.id.clone(),
            choices: vec![Choice {
                index: 0,
                message: ChatMessage::new("assistant", "ok"),
                finish_reason: Some("stop".into()),
            }],
            usage: Some(self.usage.clone()),
            extra: Default::default(),
        })
    }
}

#[derive(Default)]
struct RecordingSink {
    outcomes: Mutex<Vec<RequestOutcome>>,
}

impl OutcomeSink for RecordingSink {
    fn record(&self, outcome: &RequestOutcome) {
        self.outcomes.lock().unwrap().push(outcome.clone());
    }
}

struct Harness {
    executor: FallbackExecutor,
    health: Arc<HealthTracker>,
    sink: Arc<RecordingSink>,
    agents: HashMap<String, Arc<ScriptedAgent>>,
}

fn backend(id: &str) -> BackendConfig {
    let mut backend = BackendConfig::new(id, format!("https://{}.example.com/v1", id));
    backend.api_key = Some("sk-test".into());
    backend.pricing = PricingConfig {
        input: 0.14,
        cache_hit: Some(0.014),
        output: 0.28,
    };
    backend
}

/// Build an executor over `ids` (one chain named "default") with scripted failures.
fn harness(ids: &[&str], failures: &[(&str, AgentError)]) -> Harness {
    harness_with(ids, failures, |_| {})
}

fn harness_with(
    ids: &[&str],
    failures: &[(&str, AgentError)],
    tweak: impl FnOnce(&mut GatewayConfig),
) -> Harness {
    let mut config = GatewayConfig::default();
    config.backends = ids.iter().map(|id| backend(id)).collect();
    config.fallback_chains = vec![FallbackChainConfig {
        name: "default".into(),
        members: ids.iter().map(|id| id.to_string()).collect(),
    }];
    tweak(&mut config);

    let registry = Arc::new(Registry::from_config(&config).unwrap());
    let health = Arc::new(HealthTracker::with_backends(
        HealthConfig::default(),
        registry.ids(),
    ));
    let sink = Arc::new(RecordingSink::default());

    let mut scripted = HashMap::new();
    let mut agents: HashMap<String, Arc<dyn InferenceAgent>> = HashMap::new();
    for id in registry.ids() {
        let agent = Arc::new(ScriptedAgent {
            id: id.to_string(),
            failure: failures
                .iter()
                .find(|(f, _)| *f == id)
                .map(|(_, e)| e.clone()),
            delay: Duration::ZERO,
            usage: Usage {
                prompt_tokens: 1000,
                completion_tokens: 200,
                total_tokens: 1200,
                prompt_cache_hit_tokens: Some(800),
                ..Default::default()
            },
            calls: AtomicUsize::new(0),
        });
        scripted.insert(id.to_string(), agent.clone());
        agents.insert(id.to_string(), agent);
    }

    Harness {
        executor: FallbackExecutor::new(registry, health.clone(), agents, sink.clone()),
        health,
        sink,
        agents: scripted,
    }
}

fn classified(backend_id: &str) -> ClassificationResult {
    ClassificationResult {
        backend_id: backend_id.to_string(),
        layer: Layer::Heuristic,
        rule_name: "simple-query".to_string(),
        category: Some("simple".to_string()),
    }
}

fn request() -> ChatCompletionRequest {
    ChatCompletionRequest::new("auto", vec![ChatMessage::user("status check")])
}

fn failures(h: &Harness, id: &str) -> u32 {
    h.health.snapshot(id).unwrap().consecutive_failures
}

#[tokio::test]
async fn test_timeout_falls_back_to_next_candidate() {
    let h = harness(&["a", "b", "c"], &[("a", AgentError::Timeout(130_000))]);

    let dispatch = h
        .executor
        .execute("req-1", request(), &classified("a"))
        .await
        .unwrap();

    assert_eq!(dispatch.backend_id, "b");
    assert_eq!(dispatch.attempted, vec!["a", "b"]);
    assert_eq!(failures(&h, "a"), 1);
    assert_eq!(failures(&h, "b"), 0);
    assert_eq!(h.agents["c"].calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        h.health.snapshot("a").unwrap().last_error.as_deref(),
        Some("Request timeout after 130000ms")
    );

    let outcomes = h.sink.outcomes.lock().unwrap();
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].success);
    assert_eq!(outcomes[0].final_backend.as_deref(), Some("b"));
    assert_eq!(outcomes[0].attempted, vec!["a", "b"]);
}

#[tokio::test]
async fn test_all_candidates_fail() {
    let h = harness(
        &["a", "b", "c"],
        &[
            ("a", AgentError::Timeout(1000)),
            ("b", AgentError::Connection("refused".into())),
            (
                "c",
                AgentError::Upstream {
                    status: 503,
                    message: "overloaded".into(),
                },
            ),
        ],
    );

    let err = h
        .executor
        .execute("req-2", request(), &classified("a"))
        .await
        .unwrap_err();

    let attempts = err.attempts();
    assert_eq!(attempts.len(), 3);
    let backends: Vec<&str> = attempts.iter().map(|a| a.backend.as_str()).collect();
    assert_eq!(backends, vec!["a", "b", "c"]);
    assert_eq!(attempts[0].kind, crate::agent::FailureKind::Timeout);
    assert_eq!(attempts[1].kind, crate::agent::FailureKind::Connection);
    assert_eq!(attempts[2].kind, crate::agent::FailureKind::UpstreamStatus);
    for id in ["a", "b", "c"] {
        assert_eq!(failures(&h, id), 1);
    }
    assert!(err.to_string().starts_with("All backends failed: a (timeout"));

    let outcomes = h.sink.outcomes.lock().unwrap();
    assert_eq!(outcomes.len(), 1);
    assert!(!outcomes[0].success);
    assert_eq!(outcomes[0].final_backend, None);
    assert_eq!(outcomes[0].cost_usd, 0.0);
    assert_eq!(outcomes[0].attempted.len(), 3);
}

#[tokio::test]
async fn test_success_prices_cached_usage() {
    let h = harness(&["a"], &[]);
    let dispatch = h
        .executor
        .execute("req-3", request(), &classified("a"))
        .await
        .unwrap();

    let expected = 800.0 * 0.014e-6 + 200.0 * 0.14e-6 + 200.0 * 0.28e-6;
    assert!((dispatch.cost_usd - expected).abs() < 1e-15);
    assert_eq!(dispatch.layer, Layer::Heuristic);
    assert_eq!(dispatch.rule_name, "simple-query");

    let outcome = &h.sink.outcomes.lock().unwrap()[0];
    assert_eq!(outcome.cache_hit_tokens, 800);
    assert_eq!(outcome.prompt_tokens, 1000);
}

#[tokio::test]
async fn test_unhealthy_candidates_are_tried_last() {
    let h = harness(
        &["a", "b", "c"],
        &[("a", AgentError::InvalidResponse("eof".into()))],
    );
    for _ in 0..3 {
        h.health.record_failure("b", "HTTP 500");
    }
    assert!(!h.health.is_healthy("b"));

    let dispatch = h
        .executor
        .execute("req-4", request(), &classified("a"))
        .await
        .unwrap();
    assert_eq!(dispatch.attempted, vec!["a", "c"]);
    assert_eq!(h.agents["b"].calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_all_unhealthy_still_attempted_in_order() {
    let h = harness(&["a", "b"], &[]);
    for id in ["a", "b"] {
        for _ in 0..5 {
            h.health.record_failure(id, "down");
        }
    }
    let dispatch = h
        .executor
        .execute("req-5", request(), &classified("a"))
        .await
        .unwrap();
    assert_eq!(dispatch.backend_id, "a");
    assert_eq!(failures(&h, "a"), 0);
}

#[tokio::test]
async fn test_candidates_follow_chain_membership() {
    let h = harness_with(&["a", "b", "c", "d"], &[], |config| {
        config.fallback_chains = vec![
            FallbackChainConfig {
                name: "default".into(),
                members: vec!["c".into(), "a".into()],
            },
            FallbackChainConfig {
                name: "reasoning".into(),
                members: vec!["b".into(), "d".into(), "a".into()],
            },
        ];
    });

    assert_eq!(h.executor.candidates("b"), vec!["b", "d", "a"]);
    assert_eq!(h.executor.candidates("a"), vec!["a", "c", "b", "d"]);
    assert_eq!(h.executor.candidates("ghost"), vec!["c", "a"]);
}

#[tokio::test]
async fn test_no_candidates_without_registered_backends() {
    let h = harness(&[], &[]);
    let err = h
        .executor
        .execute("req-6", request(), &classified("missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, FallbackError::NoCandidates { .. }));
    assert_eq!(h.sink.outcomes.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_slow_backend_hits_timeout_backstop() {
    let h = harness_with(&["slow", "fast"], &[], |config| {
        config.backends[0].timeouts.connect_seconds = 0;
        config.backends[0].timeouts.read_seconds = 1;
    });

    let slow = Arc::new(ScriptedAgent {
        id: "slow".into(),
        failure: None,
        delay: Duration::from_secs(30),
        usage: Usage::default(),
        calls: AtomicUsize::new(0),
    });
    let mut agents: HashMap<String, Arc<dyn InferenceAgent>> = HashMap::new();
    agents.insert("slow".into(), slow);
    agents.insert("fast".into(), h.agents["fast"].clone());
    let executor = FallbackExecutor::new(
        Arc::clone(&h.executor.registry),
        h.health.clone(),
        agents,
        Arc::new(NullSink),
    );

    let dispatch = executor
        .execute("req-7", request(), &classified("slow"))
        .await
        .unwrap();
    assert_eq!(dispatch.backend_id, "fast");
    assert_eq!(failures(&h, "slow"), 1);
    assert_eq!(
        h.health.snapshot("slow").unwrap().last_error.as_deref(),
        Some("Request timeout after 1000ms")
    );
}

#[tokio::test]
async fn test_long_error_description_truncated() {
    let h = harness(
        &["a"],
        &[(
            "a",
            AgentError::Upstream {
                status: 500,
                message: "x".repeat(1000),
            },
        )],
    );
    let err = h
        .executor
        .execute("req-8", request(), &classified("a"))
        .await
        .unwrap_err();
    let description = &err.attempts()[0].error;
    assert_eq!(description.chars().count(), MAX_FAILURE_DESCRIPTION_CHARS + 3);
}

proptest! {
    #[test]
    fn prop_each_candidate_attempted_at_most_once(
        fail_mask in proptest::collection::vec(any::<bool>(), 1..6),
        chosen in 0usize..6,
    ) {
        let ids: Vec<String> = (0..fail_mask.len()).map(|i| format!("b{}", i)).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let failing: Vec<(&str, AgentError)> = id_refs
            .iter()
            .zip(&fail_mask)
            .filter(|(_, fail)| **fail)
            .map(|(id, _)| (*id, AgentError::Connection("refused".into())))
            .collect();
        let h = harness(&id_refs, &failing);
        let chosen = &ids[chosen % ids.len()];

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let result = runtime.block_on(h.executor.execute("req", request(), &classified(chosen)));

        let candidates = h.executor.candidates(chosen);
        let outcome = h.sink.outcomes.lock().unwrap()[0].clone();
        prop_assert!(outcome.attempted.len() <= candidates.len());
        for agent in h.agents.values() {
            prop_assert!(agent.calls.load(Ordering::SeqCst) <= 1);
        }
        let mut deduped = outcome.attempted.clone();
        deduped.sort();
        deduped.dedup();
        prop_assert_eq!(deduped.len(), outcome.attempted.len());
        prop_assert_eq!(result.is_ok(), fail_mask.iter().any(|f| !f));
    }
}
