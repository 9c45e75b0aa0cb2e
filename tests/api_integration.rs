//! Integration tests for the HTTP surface.
//!
//! Upstreams are wiremock servers; the router is driven in-process.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::*;
use serde_json::json;
use wiremock::MockServer;

#[tokio::test]
async fn test_completion_returns_upstream_body_and_provenance_headers() {
    let upstream = MockServer::start().await;
    mount_success(&upstream, "hello from upstream").await;
    let (app, _) = build_app(gateway_config(vec![backend("primary", &upstream)]));

    let response = send(&app, chat_request("auto", "hi there, how are you doing today?")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-clawgate-provider"), "primary");
    assert_eq!(header(&response, "x-clawgate-layer"), "heuristic");
    assert_eq!(header(&response, "x-clawgate-rule"), "no-match");
    assert!(header(&response, "x-clawgate-request-id").starts_with("clawgate-"));
    assert_eq!(header(&response, "x-clawgate-cost-usd"), "0.00000000");

    let body = body_json(response).await;
    assert_eq!(body["choices"][0]["message"]["content"], "hello from upstream");
    assert_eq!(body["usage"]["prompt_tokens"], 10);
}

#[tokio::test]
async fn test_explicit_backend_model_pins_request() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    mount_success(&first, "first").await;
    mount_success(&second, "second").await;
    let (app, _) = build_app(gateway_config(vec![
        backend("first", &first),
        backend("second", &second),
    ]));

    let response = send(&app, chat_request("second", "anything")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-clawgate-provider"), "second");
    assert_eq!(header(&response, "x-clawgate-layer"), "static");
    assert_eq!(header(&response, "x-clawgate-rule"), "explicit-backend");
}

#[tokio::test]
async fn test_streaming_request_rejected() {
    let upstream = MockServer::start().await;
    let (app, _) = build_app(gateway_config(vec![backend("primary", &upstream)]));

    let body = json!({
        "model": "auto",
        "stream": true,
        "messages": [{"role": "user", "content": "hi"}]
    });
    let request = Request::builder()
        .method("POST")
        .uri("/v1/chat/completions")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(header(&response, "x-clawgate-request-id").starts_with("clawgate-"));
    let body = body_json(response).await;
    assert_eq!(body["error"]["type"], "invalid_request_error");
    assert!(upstream.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_json_is_client_error() {
    let upstream = MockServer::start().await;
    let (app, _) = build_app(gateway_config(vec![backend("primary", &upstream)]));

    let request = Request::builder()
        .method("POST")
        .uri("/v1/chat/completions")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = send(&app, request).await;

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_no_backends_is_service_unavailable() {
    let (app, _) = build_app(Default::default());

    let response = send(&app, chat_request("auto", "hello")).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "service_unavailable");
}

#[tokio::test]
async fn test_models_lists_auto_and_backends() {
    let upstream = MockServer::start().await;
    let (app, _) = build_app(gateway_config(vec![
        backend("primary", &upstream),
        backend("secondary", &upstream),
    ]));

    let body = body_json(send(&app, get("/v1/models")).await).await;

    assert_eq!(body["object"], "list");
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["auto", "primary", "secondary"]);
}

#[tokio::test]
async fn test_health_reports_every_backend() {
    let upstream = MockServer::start().await;
    let (app, _) = build_app(gateway_config(vec![
        backend("primary", &upstream),
        backend("secondary", &upstream),
    ]));

    let response = send(&app, get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    let backends = body["backends"].as_array().unwrap();
    assert_eq!(backends.len(), 2);
    assert_eq!(backends[0]["id"], "primary");
    assert_eq!(backends[0]["healthy"], true);
    assert_eq!(backends[0]["consecutive_failures"], 0);
    assert!(backends[0]["last_error"].is_null());
}

#[tokio::test]
async fn test_metrics_endpoint_serves_prometheus_text() {
    let (app, _) = build_app(Default::default());

    let response = send(&app, get("/metrics")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(header(&response, "content-type").starts_with("text/plain"));
}

#[tokio::test]
async fn test_stats_and_recent_requests_after_traffic() {
    let upstream = MockServer::start().await;
    mount_success(&upstream, "ok").await;
    let (app, _) = build_app(gateway_config(vec![backend("primary", &upstream)]));

    for _ in 0..3 {
        let response = send(&app, chat_request("auto", "a question about nothing")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let stats = body_json(send(&app, get("/v1/stats")).await).await;
    assert_eq!(stats["totals"]["requests"], 3);
    assert_eq!(stats["totals"]["successes"], 3);
    assert_eq!(stats["totals"]["prompt_tokens"], 30);
    assert_eq!(stats["backends"][0]["id"], "primary");
    assert_eq!(stats["backends"][0]["requests"], 3);

    let recent = body_json(send(&app, get("/v1/requests/recent?limit=2")).await).await;
    let data = recent["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["final_backend"], "primary");
    assert_eq!(data[0]["success"], true);
    assert_eq!(data[0]["layer"], "heuristic");
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (app, _) = build_app(Default::default());
    let response = send(&app, get("/unknown/path")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
