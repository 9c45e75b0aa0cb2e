//! Recent request history
//!
//! Fixed-size ring of the last [`HISTORY_CAPACITY`] request outcomes, served
//! by `GET /v1/requests/recent`.

use crate::fallback::RequestOutcome;
use std::collections::VecDeque;
use std::sync::RwLock;

pub const HISTORY_CAPACITY: usize = 100;

/// Ring buffer of completed request outcomes.
pub struct RequestHistory {
    entries: RwLock<VecDeque<RequestOutcome>>,
    capacity: usize,
}

impl RequestHistory {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append an outcome, evicting the oldest one when full.
    pub fn push(&self, outcome: RequestOutcome) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(outcome);
    }

    /// Up to `limit` outcomes, newest first.
    pub fn recent(&self, limit: usize) -> Vec<RequestOutcome> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RequestHistory {
    fn default() -> Self {
        Self::new()
    }
}
