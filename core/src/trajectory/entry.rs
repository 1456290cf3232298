//! Trajectory entry structures

use crate::agent::{Action, ReactAgentResult};
use crate::llm::LlmMessage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single entry in the run trajectory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryEntry {
    /// Unique identifier for this entry
    pub id: String,

    /// Timestamp when this entry was created
    pub timestamp: DateTime<Utc>,

    /// Type of entry
    pub entry_type: EntryType,

    /// Planning iteration the entry belongs to
    pub step: usize,
}

/// Type of trajectory entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntryType {
    /// Run started
    TaskStart {
        task_id: String,
        input: String,
        tools: Vec<String>,
    },

    /// Planning request sent
    LlmRequest {
        messages: Vec<LlmMessage>,
        model: String,
        provider: String,
    },

    /// Planning response received, raw and decoded
    LlmResponse {
        content: String,
        decision: Option<ReactAgentResult>,
        elapsed_ms: u64,
    },

    /// Tool invocation started
    ToolCall { action: Action },

    /// Tool observation received
    ToolResult { tool: String, result: String },

    /// Run finished
    TaskComplete {
        success: bool,
        answer: String,
        planning_calls: usize,
        duration_ms: u64,
    },

    /// Error occurred
    Error {
        error: String,
        context: Option<String>,
    },
}

impl TrajectoryEntry {
    fn new(entry_type: EntryType, step: usize) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            entry_type,
            step,
        }
    }

    /// Create a run start entry
    pub fn task_start(task_id: String, input: String, tools: Vec<String>) -> Self {
        Self::new(
            EntryType::TaskStart {
                task_id,
                input,
                tools,
            },
            0,
        )
    }

    /// Create a planning request entry
    pub fn llm_request(
        messages: Vec<LlmMessage>,
        model: String,
        provider: String,
        step: usize,
    ) -> Self {
        Self::new(
            EntryType::LlmRequest {
                messages,
                model,
                provider,
            },
            step,
        )
    }

    /// Create a planning response entry
    pub fn llm_response(
        content: String,
        decision: Option<ReactAgentResult>,
        elapsed_ms: u64,
        step: usize,
    ) -> Self {
        Self::new(
            EntryType::LlmResponse {
                content,
                decision,
                elapsed_ms,
            },
            step,
        )
    }

    /// Create a tool call entry
    pub fn tool_call(action: Action, step: usize) -> Self {
        Self::new(EntryType::ToolCall { action }, step)
    }

    /// Create a tool result entry
    pub fn tool_result(tool: String, result: String, step: usize) -> Self {
        Self::new(EntryType::ToolResult { tool, result }, step)
    }

    /// Create a run completion entry
    pub fn task_complete(
        success: bool,
        answer: String,
        planning_calls: usize,
        duration_ms: u64,
    ) -> Self {
        Self::new(
            EntryType::TaskComplete {
                success,
                answer,
                planning_calls,
                duration_ms,
            },
            planning_calls,
        )
    }

    /// Create an error entry
    pub fn error(error: String, context: Option<String>, step: usize) -> Self {
        Self::new(EntryType::Error { error, context }, step)
    }
}
