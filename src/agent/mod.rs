//! Agent abstraction layer over upstream wire protocols.
//!
//! An [`InferenceAgent`] performs one non-streaming chat completion against one
//! backend. Adapters translate to and from the OpenAI schema; the fallback
//! executor only ever sees OpenAI-shaped responses or a typed [`AgentError`].

use async_trait::async_trait;

pub mod error;
pub mod factory;
pub mod google;
pub mod openai;

pub use error::{AgentError, FailureKind};
pub use factory::{build_agents, create_agent};

use crate::api::types::{ChatCompletionRequest, ChatCompletionResponse};
use crate::config::AdapterKind;

/// Unified interface for upstream backends.
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as `Arc<dyn InferenceAgent>`.
/// All async methods use `async_trait` for compatibility with trait objects.
///
/// # Cancellation Safety
///
/// Dropping the future aborts the in-flight HTTP request.
#[async_trait]
pub trait InferenceAgent: Send + Sync + 'static {
    /// Backend id this agent serves.
    fn id(&self) -> &str;

    fn adapter(&self) -> AdapterKind;

    /// Execute a non-streaming chat completion.
    ///
    /// The agent replaces `request.model` with its upstream model name and
    /// fills `max_tokens` from the backend default when the caller left it out.
    ///
    /// # Returns
    ///
    /// - `Ok(ChatCompletionResponse)` on success, `usage` populated when the upstream reports it
    /// - `Err(AgentError::Upstream)` if backend returned error (4xx, 5xx)
    /// - `Err(AgentError::Connection | Network)` if the transport failed
    /// - `Err(AgentError::Timeout)` if request exceeded deadline
    /// - `Err(AgentError::InvalidResponse)` if response doesn't match the expected format
    async fn chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, AgentError>;
}
