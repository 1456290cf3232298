//! Agent run result structures

use serde::{Deserialize, Serialize};

use super::types::PluginResult;
use crate::output::RunEnding;

/// Result of one agent run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentExecution {
    /// Task id of the run
    pub task_id: String,

    /// Answer shown to the user, canned when the run did not finish normally
    pub answer: String,

    /// How the loop terminated
    pub ending: RunEnding,

    /// Number of planning requests issued
    pub planning_calls: usize,

    /// Tool invocations in chronological order
    pub results: Vec<PluginResult>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl AgentExecution {
    /// Whether the model produced the answer
    pub fn success(&self) -> bool {
        self.ending == RunEnding::Answered
    }
}
