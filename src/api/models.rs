//! Models listing endpoint handler.

use crate::api::{AppState, AUTO_MODEL};
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

/// Models list response in OpenAI format.
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub object: String,
    pub data: Vec<ModelObject>,
}

/// Individual model object.
#[derive(Debug, Serialize)]
pub struct ModelObject {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
    /// Upstream model a backend entry forwards to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_model: Option<String>,
}

/// GET /v1/models - The virtual `auto` model followed by one entry per backend.
///
/// Requesting a backend id as the model pins the request to that backend.
pub async fn handle(State(state): State<Arc<AppState>>) -> Json<ModelsResponse> {
    let created = state.started_at.timestamp();

    let mut data = vec![ModelObject {
        id: AUTO_MODEL.to_string(),
        object: "model".to_string(),
        created,
        owned_by: "clawgate".to_string(),
        upstream_model: None,
    }];
    data.extend(state.registry.backends().map(|backend| ModelObject {
        id: backend.id.clone(),
        object: "model".to_string(),
        created,
        owned_by: backend.adapter.as_str().to_string(),
        upstream_model: Some(backend.model.clone()),
    }));

    Json(ModelsResponse {
        object: "list".to_string(),
        data,
    })
}
