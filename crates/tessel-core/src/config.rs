// ── Orchestrator configuration ──

use serde::{Deserialize, Serialize};

const DEFAULT_MAX_IN_FLIGHT: usize = 8;

/// Tuning for request execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Requests executed concurrently; further actions queue.
    pub max_in_flight: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}
