//! Shared test utilities for ClawGate integration tests.
//!
//! Provides builders for backend configs, wiremock upstream responses and a
//! fully wired router so each test file only states what it checks.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use clawgate::agent::build_agents;
use clawgate::api::{create_router, AppState};
use clawgate::config::{BackendConfig, FallbackChainConfig, GatewayConfig, PricingConfig};
use clawgate::registry::Registry;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the OpenAI-compatible adapter posts to for a backend at `{server}/v1`.
pub const COMPLETIONS_PATH: &str = "/v1/chat/completions";

// =============================================================================
// Upstream Responses
// =============================================================================

/// OpenAI-shaped completion body with DeepSeek-style cache fields.
pub fn completion_body(content: &str, prompt: u64, completion: u64, cache_hit: u64) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "upstream-model",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": prompt,
            "completion_tokens": completion,
            "total_tokens": prompt + completion,
            "prompt_cache_hit_tokens": cache_hit,
            "prompt_cache_miss_tokens": prompt - cache_hit
        }
    })
}

/// Mount a successful completion on `server`.
pub async fn mount_success(server: &MockServer, content: &str) {
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(content, 10, 5, 0)))
        .mount(server)
        .await;
}

/// Mount an upstream error status on `server`.
pub async fn mount_status(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_string("upstream unavailable"))
        .mount(server)
        .await;
}

// =============================================================================
// Configuration Builders
// =============================================================================

/// OpenAI-compatible backend pointing at `server`, with a test credential.
pub fn backend(id: &str, server: &MockServer) -> BackendConfig {
    let mut config = BackendConfig::new(id, format!("{}/v1", server.uri()));
    config.api_key = Some(format!("sk-{}", id));
    config.timeouts.connect_seconds = 1;
    config.timeouts.read_seconds = 5;
    config
}

pub fn priced(mut config: BackendConfig, input: f64, cache_hit: f64, output: f64) -> BackendConfig {
    config.pricing = PricingConfig {
        input,
        cache_hit: Some(cache_hit),
        output,
    };
    config
}

/// Gateway config with the given backends chained, in order, as `default`.
pub fn gateway_config(backends: Vec<BackendConfig>) -> GatewayConfig {
    let members = backends.iter().map(|b| b.id.clone()).collect();
    GatewayConfig {
        backends,
        fallback_chains: vec![FallbackChainConfig {
            name: "default".to_string(),
            members,
        }],
        ..Default::default()
    }
}

// =============================================================================
// App Builders
// =============================================================================

pub fn build_state(config: GatewayConfig) -> Arc<AppState> {
    let registry = Arc::new(Registry::from_config(&config).unwrap());
    let agents = build_agents(&registry).unwrap();
    Arc::new(AppState::new(Arc::new(config), registry, agents))
}

pub fn build_app(config: GatewayConfig) -> (axum::Router, Arc<AppState>) {
    let state = build_state(config);
    (create_router(Arc::clone(&state)), state)
}

// =============================================================================
// Request Helpers
// =============================================================================

pub fn chat_request(model: &str, content: &str) -> Request<Body> {
    let body = json!({
        "model": model,
        "messages": [{"role": "user", "content": content}]
    });
    Request::builder()
        .method("POST")
        .uri("/v1/chat/completions")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn send(app: &axum::Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn header<'a>(response: &'a Response<Body>, name: &str) -> &'a str {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
