//! Backends command implementation

use crate::cli::output::{backend_views, format_backends_json, format_backends_table};
use crate::cli::BackendsArgs;
use crate::config::GatewayConfig;
use crate::registry::Registry;

/// Handle `clawgate backends`: resolve the registry from config and render it.
pub fn handle_backends(args: &BackendsArgs) -> Result<String, Box<dyn std::error::Error>> {
    let config = GatewayConfig::load(Some(&args.config))?.with_env_overrides();
    let registry = Registry::from_config(&config)?;
    let views = backend_views(&registry.snapshot());

    if args.json {
        Ok(format_backends_json(&views)?)
    } else {
        Ok(format_backends_table(&views))
    }
}
