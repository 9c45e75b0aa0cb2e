//! Config command handlers

use crate::cli::{ConfigInitArgs, ConfigValidateArgs};
use crate::config::GatewayConfig;
use crate::registry::Registry;
use std::fs;

const EXAMPLE_CONFIG: &str = include_str!("../../clawgate.example.toml");

/// Handle `clawgate config init` command
pub fn handle_config_init(args: &ConfigInitArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.output.exists() && !args.force {
        return Err(format!(
            "File already exists: {}. Use --force to overwrite.",
            args.output.display()
        )
        .into());
    }

    fs::write(&args.output, EXAMPLE_CONFIG)?;

    println!("✓ Configuration file created: {}", args.output.display());
    println!("  Export the API keys it references, then run `clawgate serve`.");

    Ok(())
}

/// Handle `clawgate config validate`: parse, validate and resolve the registry.
///
/// Returns a one-line summary on success.
pub fn handle_config_validate(
    args: &ConfigValidateArgs,
) -> Result<String, Box<dyn std::error::Error>> {
    let config = GatewayConfig::load(Some(&args.config))?.with_env_overrides();
    config.validate()?;
    let registry = Registry::from_config(&config)?;

    let mut summary = format!(
        "✓ {} is valid: {} backends ({} excluded), {} fallback chains, {} rules",
        args.config.display(),
        registry.len(),
        registry.excluded().len(),
        registry.chains().len(),
        config.routing.rules.len()
    );
    if !registry.excluded().is_empty() {
        summary.push_str(&format!(
            "\n  missing credentials: {}",
            registry.excluded().join(", ")
        ));
    }
    Ok(summary)
}
