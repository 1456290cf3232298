//! Agent planning loop, prompts and response parsing

pub mod config;
pub mod context;
pub mod core;
pub mod execution;
pub mod history;
pub mod parser;
pub mod prompt;
pub mod stop;
pub mod types;

pub use config::{AgentConfig, AgentConfigBuilder, AgentMessages, AgentMode};
pub use context::{TaskExecutionContext, DEFAULT_LOCALE};
pub use self::core::AgentCore;
pub use execution::AgentExecution;
pub use history::{create_agent_history, serialize_messages};
pub use parser::{strip_quotes, ResponseParser, POSITIVITY_THRESHOLD};
pub use prompt::{PromptAssembler, RenderedPrompt, ScratchpadStyle};
pub use stop::StopSignal;
pub use types::{Action, ApiRef, ChatMessage, PluginInfo, PluginResult, ReactAgentResult};
