//! Error types and handling for reagent core

use thiserror::Error;

/// Result type alias for reagent operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for reagent core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// LLM client errors
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Tool lookup and execution errors
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// Agent run errors
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    /// Model response could not be decoded
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Trajectory recording errors
    #[error("Trajectory error: {0}")]
    Trajectory(#[from] TrajectoryError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Prompt template errors
    #[error("Template error: {0}")]
    Template(String),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for field '{field}': {value}")]
    InvalidValue { field: String, value: String },

    #[error("Unsupported protocol: {protocol}")]
    UnsupportedProtocol { protocol: String },
}

/// LLM client errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Empty response from model")]
    EmptyResponse,
}

/// Tool lookup and execution errors
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Tool {name} not found")]
    NotFound { name: String },

    #[error("invalid tool: {name}")]
    Invalid { name: String },

    #[error("Tool execution failed: {name} - {message}")]
    ExecutionFailed { name: String, message: String },

    #[error("Invalid tool input: {message}")]
    InvalidInput { message: String },
}

/// Errors raised while decoding a model response
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Error parsing JSON: {message}")]
    InvalidJson { message: String },

    #[error("Error parsing JSON: response does not contain a JSON document")]
    MissingDocument,
}

/// Agent run errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Invalid task: {message}")]
    InvalidTask { message: String },

    #[error("Token encoding unavailable for model {model}")]
    EncodingUnavailable { model: String },
}

/// Trajectory recording errors
#[derive(Error, Debug)]
pub enum TrajectoryError {
    #[error("Failed to record trajectory: {message}")]
    RecordingFailed { message: String },

    #[error("Failed to load trajectory: {path}")]
    LoadFailed { path: String },
}

impl Error {
    /// Whether this error reports a tool name the registry does not know
    pub fn is_tool_not_found(&self) -> bool {
        matches!(self, Error::Tool(ToolError::NotFound { .. }))
    }

    /// Whether this error reports an undecodable model response
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Error::Parse(_))
    }

    /// The offending tool name, when the error is about a specific tool
    pub fn tool_name(&self) -> Option<&str> {
        match self {
            Error::Tool(ToolError::NotFound { name })
            | Error::Tool(ToolError::Invalid { name })
            | Error::Tool(ToolError::ExecutionFailed { name, .. }) => Some(name),
            _ => None,
        }
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Generic(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Generic(msg.to_string())
    }
}

impl From<handlebars::TemplateError> for Error {
    fn from(err: handlebars::TemplateError) -> Self {
        Error::Template(err.to_string())
    }
}

impl From<handlebars::RenderError> for Error {
    fn from(err: handlebars::RenderError) -> Self {
        Error::Template(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_not_found_carries_name() {
        let err: Error = ToolError::NotFound {
            name: "nonExistingTool".to_string(),
        }
        .into();

        assert!(err.is_tool_not_found());
        assert!(!err.is_parse_error());
        assert_eq!(err.tool_name(), Some("nonExistingTool"));
        assert!(err.to_string().contains("Tool nonExistingTool not found"));
    }

    #[test]
    fn test_parse_error_classification() {
        let err: Error = ParseError::MissingDocument.into();
        assert!(err.is_parse_error());
        assert_eq!(err.tool_name(), None);
    }
}
