//! Fallback executor errors

use super::outcome::{summarize_attempts, AttemptRecord};
use thiserror::Error;

/// Caller-visible failures of the fallback executor.
#[derive(Debug, Clone, Error)]
pub enum FallbackError {
    /// Every candidate was tried once and failed.
    #[error("All backends failed: {}", summarize_attempts(.attempts))]
    Exhausted { attempts: Vec<AttemptRecord> },

    /// No registered backend can serve the classified request.
    #[error("No registered backend available for '{backend_id}'")]
    NoCandidates { backend_id: String },
}

impl FallbackError {
    pub fn attempts(&self) -> &[AttemptRecord] {
        match self {
            FallbackError::Exhausted { attempts } => attempts,
            FallbackError::NoCandidates { .. } => &[],
        }
    }
}
