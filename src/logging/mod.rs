//! Structured logging helpers
//!
//! Filter construction for the tracing subscriber, request id generation and
//! small field helpers shared by the routing and fallback paths.

pub mod fields;
pub mod middleware;

pub use fields::{preview_text, truncate_detail};
pub use middleware::generate_request_id;

/// Build filter directives string from LoggingConfig
///
/// Returns `"<level>,clawgate::<component>=<level>,..."`. Components are
/// sorted so the output is stable.
///
/// # Examples
///
/// ```
/// use clawgate::config::logging::{LogFormat, LoggingConfig};
/// use clawgate::logging::build_filter_directives;
/// use std::collections::HashMap;
///
/// let mut component_levels = HashMap::new();
/// component_levels.insert("routing".to_string(), "debug".to_string());
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     format: LogFormat::Pretty,
///     component_levels: Some(component_levels),
///     enable_content_logging: false,
/// };
///
/// assert_eq!(build_filter_directives(&config), "info,clawgate::routing=debug");
/// ```
pub fn build_filter_directives(config: &crate::config::LoggingConfig) -> String {
    let mut filter_str = config.level.clone();

    if let Some(component_levels) = &config.component_levels {
        let mut components: Vec<_> = component_levels.iter().collect();
        components.sort();
        for (component, level) in components {
            filter_str.push_str(&format!(",clawgate::{}={}", component, level));
        }
    }

    filter_str
}
