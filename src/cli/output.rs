//! Output formatting helpers for CLI commands

use crate::registry::{BackendSummary, Pricing, RegistrySnapshot};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde_json::json;

/// View model for backend display
#[derive(Debug, Clone, serde::Serialize)]
pub struct BackendView {
    pub id: String,
    pub adapter: String,
    pub model: String,
    /// Excluded backends have no credential and never receive traffic
    pub credential: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pricing: Option<Pricing>,
    pub chains: Vec<String>,
}

impl From<&BackendSummary> for BackendView {
    fn from(backend: &BackendSummary) -> Self {
        Self {
            id: backend.id.clone(),
            adapter: backend.adapter.as_str().to_string(),
            model: backend.model.clone(),
            credential: backend.credential_present,
            pricing: Some(backend.pricing),
            chains: backend.chains.clone(),
        }
    }
}

impl BackendView {
    fn excluded(id: &str) -> Self {
        Self {
            id: id.to_string(),
            adapter: "-".to_string(),
            model: "-".to_string(),
            credential: false,
            pricing: None,
            chains: Vec::new(),
        }
    }
}

/// Registered backends followed by the ones excluded for missing credentials.
pub fn backend_views(snapshot: &RegistrySnapshot) -> Vec<BackendView> {
    snapshot
        .backends
        .iter()
        .map(BackendView::from)
        .chain(snapshot.excluded.iter().map(|id| BackendView::excluded(id)))
        .collect()
}

/// `$in / $cache_hit / $out` per million tokens.
pub fn format_pricing(pricing: &Pricing) -> String {
    format!(
        "${} / ${} / ${}",
        pricing.input_per_million, pricing.cache_hit_per_million, pricing.output_per_million
    )
}

/// Format backends as a table
pub fn format_backends_table(backends: &[BackendView]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "ID",
        "Adapter",
        "Model",
        "Credential",
        "Price/M (in / hit / out)",
        "Chains",
    ]);

    for b in backends {
        let credential = if b.credential {
            "present".green().to_string()
        } else {
            "missing".red().to_string()
        };
        let pricing = b
            .pricing
            .as_ref()
            .map(format_pricing)
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            Cell::new(&b.id),
            Cell::new(&b.adapter),
            Cell::new(&b.model),
            Cell::new(credential),
            Cell::new(pricing),
            Cell::new(b.chains.join(", ")),
        ]);
    }

    table.to_string()
}

/// Format backends as JSON
pub fn format_backends_json(backends: &[BackendView]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&json!({
        "backends": backends
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_backend_view() -> BackendView {
        BackendView {
            id: "deepseek-chat".to_string(),
            adapter: "openai".to_string(),
            model: "deepseek-chat".to_string(),
            credential: true,
            pricing: Some(Pricing {
                input_per_million: 0.14,
                cache_hit_per_million: 0.014,
                output_per_million: 0.28,
            }),
            chains: vec!["default".to_string()],
        }
    }

    #[test]
    fn test_format_backends_table_empty() {
        let output = format_backends_table(&[]);
        assert!(output.contains("ID"));
        assert!(output.contains("Credential"));
    }

    #[test]
    fn test_format_backends_table_with_data() {
        let backends = vec![create_test_backend_view(), BackendView::excluded("gemini-pro")];
        let output = format_backends_table(&backends);
        assert!(output.contains("deepseek-chat"));
        assert!(output.contains("$0.14 / $0.014 / $0.28"));
        assert!(output.contains("present"));
        assert!(output.contains("gemini-pro"));
        assert!(output.contains("missing"));
    }

    #[test]
    fn test_format_backends_json_valid() {
        let backends = vec![create_test_backend_view()];
        let output = format_backends_json(&backends).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["backends"][0]["id"], "deepseek-chat");
        assert_eq!(parsed["backends"][0]["credential"], true);
        assert_eq!(parsed["backends"][0]["chains"][0], "default");
    }

    #[test]
    fn test_excluded_backend_has_no_pricing_in_json() {
        let output = format_backends_json(&[BackendView::excluded("ghost")]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert!(parsed["backends"][0].get("pricing").is_none());
    }
}
