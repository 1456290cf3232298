//! Minimal configuration types for reagent core
//!
//! Core only accepts fully resolved, validated configuration.
//! All discovery, loading, and merging happens in CLI layer.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Supported LLM protocols
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    /// OpenAI-compatible API (includes OpenAI, many proxies, local models)
    #[serde(rename = "openai_compat")]
    OpenAICompat,
    /// Azure OpenAI API
    #[serde(rename = "azure_openai")]
    AzureOpenAI,
}

impl Protocol {
    /// Get the protocol name as a string
    pub fn as_str(&self) -> &str {
        match self {
            Protocol::OpenAICompat => "openai_compat",
            Protocol::AzureOpenAI => "azure_openai",
        }
    }

    /// Get the default base URL for this protocol
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            Protocol::OpenAICompat => Some("https://api.openai.com/v1"),
            Protocol::AzureOpenAI => None, // Requires custom endpoint
        }
    }

    /// Parse a protocol name as written in config files and flags
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "openai" | "openai_compat" => Some(Protocol::OpenAICompat),
            "azure" | "azure_openai" => Some(Protocol::AzureOpenAI),
            _ => None,
        }
    }
}

/// Model parameters for LLM requests
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelParams {
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Top-p sampling parameter
    pub top_p: Option<f32>,
    /// Azure deployment id (Azure only)
    pub deployment_id: Option<String>,
    /// Azure API version (Azure only)
    pub api_version: Option<String>,
    /// Model used for embedding requests
    pub embedding_model: Option<String>,
    /// Azure deployment serving embeddings (Azure only)
    pub embedding_deployment_id: Option<String>,
}

/// A fully resolved LLM configuration ready for use by core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedLlmConfig {
    /// The protocol to use
    pub protocol: Protocol,
    /// Base URL for the API
    pub base_url: String,
    /// API key for authentication
    pub api_key: String,
    /// Model name/identifier
    pub model: String,
    /// Model parameters
    #[serde(default)]
    pub params: ModelParams,
    /// Additional headers for requests
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl ResolvedLlmConfig {
    /// Create a new resolved LLM config
    pub fn new(protocol: Protocol, base_url: String, api_key: String, model: String) -> Self {
        Self {
            protocol,
            base_url,
            api_key,
            model,
            params: ModelParams::default(),
            headers: HashMap::new(),
        }
    }

    /// Set model parameters
    pub fn with_params(mut self, params: ModelParams) -> Self {
        self.params = params;
        self
    }

    /// Add multiple headers
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.api_key.is_empty() {
            return Err("API key cannot be empty".to_string());
        }

        if self.model.is_empty() {
            return Err("Model name cannot be empty".to_string());
        }

        if self.base_url.is_empty() {
            return Err("Base URL cannot be empty".to_string());
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err("Base URL must start with http:// or https://".to_string());
        }

        if let Some(top_p) = self.params.top_p {
            if !(0.0..=1.0).contains(&top_p) {
                return Err("Top-p must be between 0.0 and 1.0".to_string());
            }
        }

        if self.protocol == Protocol::AzureOpenAI && self.params.deployment_id.is_none() {
            return Err("Azure OpenAI requires a deployment id".to_string());
        }

        Ok(())
    }
}

/// Where tools come from and how the built-in ones reach their backends
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginSettings {
    /// Manifest URLs, each returning `{"urls": [...]}` of plugin descriptors
    #[serde(default)]
    pub manifest_urls: Vec<String>,
    /// Names of internal plugins to expose (e.g. `python_interpreter`)
    #[serde(default)]
    pub internal_plugins: Vec<String>,
    /// Endpoint receiving `{language, code}` for the python interpreter
    pub python_interpreter_backend: Option<String>,
    /// Google Custom Search API key
    pub google_api_key: Option<String>,
    /// Google Custom Search engine id
    pub google_cse_id: Option<String>,
}

impl PluginSettings {
    /// Split a comma separated environment value into trimmed, non-empty entries
    pub fn split_list(value: &str) -> Vec<String> {
        value
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect()
    }
}
