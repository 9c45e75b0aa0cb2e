//! ClawGate - local LLM API gateway
//!
//! Accepts OpenAI-style chat completions, picks an upstream backend from the
//! shape of each request, and falls back across backends when one fails.
//! Every served request is priced from its token usage, including prompt
//! cache hits.

pub mod accounting;
pub mod agent;
pub mod api;
pub mod cli;
pub mod config;
pub mod fallback;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod registry;
pub mod routing;
