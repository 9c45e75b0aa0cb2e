//! Gateway errors returned by the completions endpoint.
//!
//! Plain request problems use the OpenAI error envelope from [`ApiError`].
//! Exhausted fallback adds the list of failed attempts next to it so clients
//! can see which upstreams were tried.

use super::types::{ApiError, ApiErrorBody};
use crate::fallback::{AttemptRecord, FallbackError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// 502 body listing every failed attempt.
#[derive(Debug, Clone, Serialize)]
pub struct AllBackendsFailedError {
    /// Standard OpenAI error envelope
    pub error: ApiErrorBody,
    pub attempts: Vec<AttemptRecord>,
}

impl AllBackendsFailedError {
    pub fn new(message: &str, attempts: Vec<AttemptRecord>) -> Self {
        Self {
            error: ApiError::bad_gateway(message).error,
            attempts,
        }
    }
}

impl IntoResponse for AllBackendsFailedError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_GATEWAY, Json(self)).into_response()
    }
}

/// Any error the completions handler can return.
#[derive(Debug)]
pub enum GatewayError {
    Api(ApiError),
    AllBackendsFailed(AllBackendsFailedError),
}

impl From<ApiError> for GatewayError {
    fn from(err: ApiError) -> Self {
        GatewayError::Api(err)
    }
}

impl From<FallbackError> for GatewayError {
    fn from(err: FallbackError) -> Self {
        match &err {
            FallbackError::Exhausted { attempts } => GatewayError::AllBackendsFailed(
                AllBackendsFailedError::new(&err.to_string(), attempts.clone()),
            ),
            FallbackError::NoCandidates { .. } => {
                GatewayError::Api(ApiError::service_unavailable(&err.to_string()))
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            GatewayError::Api(err) => err.into_response(),
            GatewayError::AllBackendsFailed(err) => err.into_response(),
        }
    }
}
