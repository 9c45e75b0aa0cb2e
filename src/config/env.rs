//! `${VAR}` / `${VAR:-default}` expansion over parsed TOML values

use regex::{Captures, Regex};
use std::sync::LazyLock;

static ENV_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env pattern is a valid regex"));

/// Expand environment references in one string.
///
/// Unset variables without a default are left verbatim so that a missing
/// credential stays recognisable as `${NAME}` downstream.
pub fn expand_str(value: &str) -> String {
    ENV_PATTERN
        .replace_all(value, |caps: &Captures<'_>| {
            let expr = &caps[1];
            match expr.split_once(":-") {
                Some((name, default)) => std::env::var(name)
                    .ok()
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| default.to_string()),
                None => std::env::var(expr).unwrap_or_else(|_| caps[0].to_string()),
            }
        })
        .into_owned()
}

/// Recursively expand every string in a TOML document.
pub fn expand_value(value: &mut toml::Value) {
    match value {
        toml::Value::String(s) => {
            if s.contains("${") {
                *s = expand_str(s);
            }
        }
        toml::Value::Array(items) => items.iter_mut().for_each(expand_value),
        toml::Value::Table(table) => table.iter_mut().for_each(|(_, v)| expand_value(v)),
        _ => {}
    }
}
