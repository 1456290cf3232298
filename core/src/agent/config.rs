//! Agent configuration structures

use serde::{Deserialize, Serialize};

use super::parser::ResponseParser;
use super::prompt::ScratchpadStyle;

/// Prompt format and matching response grammar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentMode {
    /// Single-turn `Thought` / `Action` prompt
    #[default]
    Agent,
    /// Chat prompt with history, answered in fenced JSON
    Conversational,
}

impl AgentMode {
    /// Parser for responses to this mode's prompts
    pub fn parser(&self) -> ResponseParser {
        match self {
            AgentMode::Agent => ResponseParser::LineBased,
            AgentMode::Conversational => ResponseParser::FencedJson,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentMode::Agent => "agent",
            AgentMode::Conversational => "conversational",
        }
    }

    /// Parse a mode name as given on the command line
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "agent" => Some(AgentMode::Agent),
            "conversational" | "conv" => Some(AgentMode::Conversational),
            _ => None,
        }
    }
}

/// Answers the loop produces without asking the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMessages {
    /// Answer when the planning ceiling is exceeded
    pub no_result: String,

    /// Answer when the run is cancelled
    pub stopped: String,

    /// Suffix of the progress note for displayed tools
    pub executing: String,
}

impl Default for AgentMessages {
    fn default() -> Self {
        Self {
            no_result: "No Result".to_string(),
            stopped: "Conversation stopped".to_string(),
            executing: "executing...".to_string(),
        }
    }
}

/// Configuration for an agent run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Prompt format and response grammar
    #[serde(default)]
    pub mode: AgentMode,

    /// Tool actions allowed before the run gives up
    pub max_planning_iterations: usize,

    /// Token budget for prior conversation in conversational mode
    pub history_token_budget: usize,

    /// Whether the line-based scratchpad ends with a `Thought:` line
    #[serde(default)]
    pub scratchpad_style: ScratchpadStyle,

    /// Localized canned answers
    #[serde(default)]
    pub messages: AgentMessages,

    /// Sampling temperature for planning calls
    pub temperature: f32,

    /// Stop sequences sent with every planning call
    pub stop_sequences: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            mode: AgentMode::default(),
            max_planning_iterations: 5,
            history_token_budget: 500,
            scratchpad_style: ScratchpadStyle::default(),
            messages: AgentMessages::default(),
            temperature: 0.0,
            stop_sequences: vec!["\nObservation:".to_string()],
        }
    }
}

impl AgentConfig {
    /// Start from the defaults
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder {
            config: AgentConfig::default(),
        }
    }

    /// Parser matching the configured mode
    pub fn parser(&self) -> ResponseParser {
        self.mode.parser()
    }
}

/// Builder for [`AgentConfig`]
pub struct AgentConfigBuilder {
    config: AgentConfig,
}

impl AgentConfigBuilder {
    pub fn mode(mut self, mode: AgentMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn max_planning_iterations(mut self, max: usize) -> Self {
        self.config.max_planning_iterations = max;
        self
    }

    pub fn history_token_budget(mut self, budget: usize) -> Self {
        self.config.history_token_budget = budget;
        self
    }

    pub fn scratchpad_style(mut self, style: ScratchpadStyle) -> Self {
        self.config.scratchpad_style = style;
        self
    }

    pub fn messages(mut self, messages: AgentMessages) -> Self {
        self.config.messages = messages;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    pub fn stop_sequences(mut self, stop: Vec<String>) -> Self {
        self.config.stop_sequences = stop;
        self
    }

    pub fn build(self) -> AgentConfig {
        self.config
    }
}
