//! Output abstraction layer for agent runs
//!
//! The agent loop reports what it does through [`AgentOutput`]; the CLI
//! renders the events, other hosts can forward them to their own UI.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agent::ReactAgentResult;

/// Error type returned by output handlers
pub type OutputError = Box<dyn std::error::Error + Send + Sync>;

/// Null output handler that discards all events
pub struct NullOutput;

#[async_trait]
impl AgentOutput for NullOutput {
    async fn emit_event(&self, _event: AgentEvent) -> Result<(), OutputError> {
        Ok(())
    }
}

/// Status of tool execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolExecutionStatus {
    /// Tool is currently executing
    Executing,
    /// Tool returned an observation
    Success,
    /// Tool failed with an error
    Error,
}

/// Tool execution information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExecutionInfo {
    /// Tool name for the model
    pub tool_name: String,
    /// Tool name for the user
    pub display_name: String,
    /// Raw tool input
    pub input: String,
    /// Current execution status
    pub status: ToolExecutionStatus,
    /// Observation, once the tool returned
    pub result: Option<String>,
    /// Failure message, if the tool failed
    pub error: Option<String>,
    /// Timestamp of status change
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEnding {
    /// The model produced a final answer
    Answered,
    /// The planning ceiling was reached
    IterationLimit,
    /// A stop was requested at an iteration boundary
    Stopped,
    /// A stop severed an in-flight planning request
    Aborted,
}

/// Events that can be emitted during an agent run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AgentEvent {
    /// Run started
    RunStarted {
        task_id: String,
        input: String,
        tools: Vec<String>,
    },
    /// Planning call about to be sent
    PlanningStarted { iteration: usize },
    /// Planning call decoded
    PlanningResolved {
        iteration: usize,
        decision: ReactAgentResult,
    },
    /// User facing progress note for a displayed tool
    Progress { message: String },
    /// Tool execution started
    ToolExecutionStarted { tool_info: ToolExecutionInfo },
    /// Tool execution completed
    ToolExecutionCompleted { tool_info: ToolExecutionInfo },
    /// Run finished
    RunCompleted {
        answer: String,
        ending: RunEnding,
        planning_calls: usize,
    },
    /// General message or log
    Message { level: MessageLevel, content: String },
}

/// Message severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageLevel {
    Debug,
    Info,
    Normal,
    Warning,
    Error,
}

/// Abstract output interface for agent runs
#[async_trait]
pub trait AgentOutput: Send + Sync {
    /// Emit an agent event
    async fn emit_event(&self, event: AgentEvent) -> Result<(), OutputError>;

    /// Emit a message with specified level
    async fn emit_message(&self, level: MessageLevel, content: &str) -> Result<(), OutputError> {
        self.emit_event(AgentEvent::Message {
            level,
            content: content.to_string(),
        })
        .await
    }

    /// Emit debug message
    async fn debug(&self, content: &str) -> Result<(), OutputError> {
        self.emit_message(MessageLevel::Debug, content).await
    }

    /// Emit warning message
    async fn warning(&self, content: &str) -> Result<(), OutputError> {
        self.emit_message(MessageLevel::Warning, content).await
    }

    /// Emit error message
    async fn error(&self, content: &str) -> Result<(), OutputError> {
        self.emit_message(MessageLevel::Error, content).await
    }

    /// Flush any buffered output
    async fn flush(&self) -> Result<(), OutputError> {
        Ok(())
    }
}
