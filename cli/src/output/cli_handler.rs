//! CLI output handler implementation

use async_trait::async_trait;
use colored::Colorize;
use reagent_core::output::{
    AgentEvent, AgentOutput, MessageLevel, OutputError, ToolExecutionInfo, ToolExecutionStatus,
};
use reagent_core::ReactAgentResult;
use tracing::{debug, error, info, warn};

/// Observations longer than this are cut when echoed
const OBSERVATION_PREVIEW_CHARS: usize = 400;

/// CLI output configuration
#[derive(Debug, Clone, Default)]
pub struct CliOutputConfig {
    /// Echo model thoughts and tool observations
    pub show_details: bool,
}

/// CLI output handler that formats events for terminal display
pub struct CliOutputHandler {
    config: CliOutputConfig,
}

impl CliOutputHandler {
    /// Create a new CLI output handler
    pub fn new(config: CliOutputConfig) -> Self {
        Self { config }
    }

    fn format_tool_status(&self, tool_info: &ToolExecutionInfo) -> String {
        let dot = match tool_info.status {
            ToolExecutionStatus::Executing => "●".white(),
            ToolExecutionStatus::Success => "●".green(),
            ToolExecutionStatus::Error => "●".red(),
        };
        format!("{} {}", dot, tool_info.display_name.bold())
    }

    fn format_tool_result(&self, tool_info: &ToolExecutionInfo) -> Option<String> {
        if let Some(error) = &tool_info.error {
            return Some(format!("  ⎿ {}", error.red()));
        }
        if !self.config.show_details {
            return None;
        }
        let result = tool_info.result.as_ref()?;
        Some(format!(
            "  ⎿ {}",
            truncate_chars(result, OBSERVATION_PREVIEW_CHARS).bright_black()
        ))
    }
}

/// At most `max` characters of `text`, with an ellipsis when cut
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((index, _)) => format!("{}…", &text[..index]),
        None => text.to_string(),
    }
}

#[async_trait]
impl AgentOutput for CliOutputHandler {
    async fn emit_event(&self, event: AgentEvent) -> Result<(), OutputError> {
        match event {
            AgentEvent::RunStarted {
                task_id,
                input,
                tools,
            } => {
                debug!("Run {} started: {}", task_id, input);
                debug!("Offered tools: {}", tools.join(", "));
            }

            AgentEvent::PlanningStarted { iteration } => {
                debug!("Planning step {}", iteration);
            }

            AgentEvent::PlanningResolved { decision, .. } => {
                if let ReactAgentResult::Action(action) = decision {
                    if self.config.show_details && !action.thought.is_empty() {
                        println!("{}", action.thought.bright_black());
                    }
                }
            }

            AgentEvent::Progress { message } => {
                println!("{}", message.cyan());
            }

            AgentEvent::ToolExecutionStarted { tool_info } => {
                debug!("{}", self.format_tool_status(&tool_info));
            }

            AgentEvent::ToolExecutionCompleted { tool_info } => {
                if self.config.show_details || tool_info.status == ToolExecutionStatus::Error {
                    println!("{}", self.format_tool_status(&tool_info));
                }
                if let Some(result_display) = self.format_tool_result(&tool_info) {
                    println!("{}", result_display);
                }
            }

            AgentEvent::RunCompleted {
                ending,
                planning_calls,
                ..
            } => {
                debug!("Run finished ({:?}) after {} planning calls", ending, planning_calls);
            }

            AgentEvent::Message { level, content } => match level {
                MessageLevel::Debug => debug!("{}", content),
                MessageLevel::Info => info!("{}", content),
                MessageLevel::Normal => println!("{}", content),
                MessageLevel::Warning => warn!("{}", content),
                MessageLevel::Error => error!("{}", content),
            },
        }

        Ok(())
    }

    async fn flush(&self) -> Result<(), OutputError> {
        use std::io::Write;
        std::io::stdout().flush().map_err(|e| e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel…");
        assert_eq!(truncate_chars("日本語テキスト", 3), "日本語…");
    }
}
