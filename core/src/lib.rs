//! # reagent Core
//!
//! Core library for reagent, a ReAct agent engine over chat-completion
//! models.
//!
//! The engine builds planning prompts from the conversation, the offered
//! tools and the observations gathered so far, decodes the model's reply
//! into either a tool action or a final answer, and loops until an answer,
//! the planning ceiling or a stop request.

pub mod agent;
pub mod config;
pub mod encoding;
pub mod error;
pub mod llm;
pub mod output;
pub mod tools;
pub mod trajectory;

// Re-export commonly used types
pub use agent::{
    AgentConfig, AgentCore, AgentExecution, AgentMode, ReactAgentResult, ResponseParser,
    StopSignal, TaskExecutionContext,
};
pub use config::{ModelParams, PluginSettings, Protocol, ResolvedLlmConfig};
pub use encoding::{EncodingProvider, LexicalEncodingProvider, TiktokenEncodingProvider};
pub use error::{Error, Result};
pub use tools::ToolRegistry;
pub use trajectory::TrajectoryRecorder;

/// Current version of the reagent-core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing for the library
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

/// Initialize tracing with a specific debug mode
///
/// `RUST_LOG` takes precedence when set.
pub fn init_tracing_with_debug(debug: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if debug { "debug" } else { "info" })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
