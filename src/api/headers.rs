//! X-ClawGate-* response headers.
//!
//! Every successful completion carries its provenance in response headers,
//! leaving the upstream JSON body untouched.

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::fallback::Dispatch;
use crate::routing::Layer;

pub const PROVIDER_HEADER: &str = "x-clawgate-provider";
pub const LAYER_HEADER: &str = "x-clawgate-layer";
pub const RULE_HEADER: &str = "x-clawgate-rule";
pub const COST_HEADER: &str = "x-clawgate-cost-usd";
pub const REQUEST_ID_HEADER: &str = "x-clawgate-request-id";

/// Provenance of one served request.
#[derive(Debug, Clone)]
pub struct ProvenanceHeaders {
    /// Backend that produced the response
    pub provider: String,
    pub layer: Layer,
    pub rule: String,
    pub cost_usd: f64,
    pub request_id: String,
}

impl ProvenanceHeaders {
    pub fn from_dispatch(dispatch: &Dispatch, request_id: &str) -> Self {
        Self {
            provider: dispatch.backend_id.clone(),
            layer: dispatch.layer,
            rule: dispatch.rule_name.clone(),
            cost_usd: dispatch.cost_usd,
            request_id: request_id.to_string(),
        }
    }

    /// Inject headers into an axum HeaderMap.
    ///
    /// Values that are not valid header text are skipped.
    pub fn inject_into(&self, headers: &mut HeaderMap) {
        let cost = format!("{:.8}", self.cost_usd);
        for (name, value) in [
            (PROVIDER_HEADER, self.provider.as_str()),
            (LAYER_HEADER, self.layer.as_str()),
            (RULE_HEADER, self.rule.as_str()),
            (COST_HEADER, cost.as_str()),
            (REQUEST_ID_HEADER, self.request_id.as_str()),
        ] {
            if let Ok(value) = HeaderValue::from_str(value) {
                headers.insert(HeaderName::from_static(name), value);
            }
        }
    }
}

/// Values of the configured marker headers present on a request.
///
/// Header names match case-insensitively; repeated headers yield one value each.
pub fn transport_markers(headers: &HeaderMap, marker_headers: &[String]) -> Vec<String> {
    marker_headers
        .iter()
        .filter_map(|name| HeaderName::from_bytes(name.to_ascii_lowercase().as_bytes()).ok())
        .flat_map(|name| {
            headers
                .get_all(&name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}
