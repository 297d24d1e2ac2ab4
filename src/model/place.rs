//! Place entity.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A place: holds a non-negative token count representing a discrete
/// molecule count or a scaled concentration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Place {
    /// Stable, unique, immutable identifier.
    pub id: String,
    /// Free-text label.
    pub label: String,
    /// Current token count. Invariant: always `>= 0`.
    pub tokens: u64,
    /// Reset target for `reset()`. Immutable during simulation.
    pub initial_marking: u64,
    /// Free-form metadata, opaque to the kernel.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Place {
    /// Construct a place with `tokens` initialized to `initial_marking`.
    pub fn new(id: impl Into<String>, label: impl Into<String>, initial_marking: u64) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            tokens: initial_marking,
            initial_marking,
            metadata: HashMap::new(),
        }
    }

    /// Restore `tokens` to `initial_marking`.
    pub fn reset(&mut self) {
        self.tokens = self.initial_marking;
    }
}
