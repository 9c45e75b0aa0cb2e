//! Chat completions endpoint handler.

use crate::api::{
    error::GatewayError,
    headers::{transport_markers, ProvenanceHeaders, REQUEST_ID_HEADER},
    ApiError, AppState, ChatCompletionRequest,
};
use crate::logging::{generate_request_id, preview_text};
use crate::routing::RequestView;
use axum::{
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{debug, info};

/// POST /v1/chat/completions - Classify, dispatch with fallback, return the
/// upstream response annotated with provenance headers.
pub async fn handle(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ChatCompletionRequest>,
) -> Response {
    let request_id = generate_request_id();
    let mut response = match complete(&state, &request_id, &headers, request).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    };
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}

async fn complete(
    state: &AppState,
    request_id: &str,
    headers: &HeaderMap,
    request: ChatCompletionRequest,
) -> Result<Response, GatewayError> {
    if request.stream {
        return Err(ApiError::bad_request(
            "Streaming responses are not supported; send \"stream\": false",
        )
        .into());
    }

    let markers = transport_markers(headers, &state.config.server.marker_headers);
    let view = RequestView::from_request(&request, markers);

    if state.config.logging.enable_content_logging {
        debug!(
            request_id = %request_id,
            preview = %preview_text(view.last_user_text()),
            "Request content"
        );
    }

    let classification = state.classifier.classify(&view).await;
    info!(
        request_id = %request_id,
        model = %request.model,
        backend_id = %classification.backend_id,
        layer = %classification.layer,
        rule = %classification.rule_name,
        category = classification.category.as_deref().unwrap_or("-"),
        "Request classified"
    );

    let dispatch = state
        .executor
        .execute(request_id, request, &classification)
        .await?;

    let mut response = Json(&dispatch.response).into_response();
    ProvenanceHeaders::from_dispatch(&dispatch, request_id).inject_into(response.headers_mut());
    Ok(response)
}
