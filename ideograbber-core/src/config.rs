use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::reduce::{DEFAULT_BUDGET_BYTES, DEFAULT_MAX_ITERATIONS};

/// Tunables for a replication run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationConfig {
    /// Byte ceiling for uploaded attachment images.
    #[serde(default = "default_budget_bytes")]
    pub budget_bytes: usize,
    /// Bound on re-encode passes before giving up on an attachment.
    #[serde(default = "default_max_reduce_iterations")]
    pub max_reduce_iterations: u32,
    /// Fixed delay between consecutive creation attempts, in milliseconds. 0 disables it.
    #[serde(default)]
    pub pacing_ms: u64,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            budget_bytes: DEFAULT_BUDGET_BYTES,
            max_reduce_iterations: DEFAULT_MAX_ITERATIONS,
            pacing_ms: 0,
        }
    }
}

impl ReplicationConfig {
    pub fn trace_loaded(&self) {
        info!(
            budget_bytes = self.budget_bytes,
            max_reduce_iterations = self.max_reduce_iterations,
            pacing_ms = self.pacing_ms,
            "Loaded ReplicationConfig"
        );
        debug!(?self, "ReplicationConfig loaded (full debug)");
    }
}

fn default_budget_bytes() -> usize {
    DEFAULT_BUDGET_BYTES
}

fn default_max_reduce_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}
