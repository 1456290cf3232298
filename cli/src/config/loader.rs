//! Simple CLI configuration loader for reagent
//!
//! Implements single-source priority loading with flag overrides:
//! 1. --config file/dir (highest priority)
//! 2. Current working directory: ./reagent.json or ./.reagent/config.json
//! 3. Git repository root: <repo_root>/.reagent/config.json
//! 4. User config dir: <config dir>/reagent/config.json
//! 5. Environment variables only (no files)
//!
//! Plugin settings missing from the file are taken from the environment.

use anyhow::{anyhow, Context, Result};
use reagent_core::agent::{AgentConfig, AgentMode, ScratchpadStyle};
use reagent_core::{ModelParams, PluginSettings, Protocol, ResolvedLlmConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_AZURE_API_VERSION: &str = "2023-05-15";

/// Raw configuration file format (simple single-file schema)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawConfig {
    /// Protocol to use
    pub protocol: Option<String>,
    /// API key (can be "env:VAR_NAME" for environment variable)
    pub api_key: Option<String>,
    /// Base URL (optional, uses protocol default if not specified)
    pub base_url: Option<String>,
    /// Model name
    pub model: Option<String>,
    /// Model parameters (optional)
    #[serde(default)]
    pub params: ModelParams,
    /// Additional headers (optional)
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Plugin sources and backends
    #[serde(default)]
    pub plugins: PluginSettings,
    /// Agent loop settings
    #[serde(default)]
    pub agent: RawAgentConfig,
}

/// Agent settings accepted in the config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawAgentConfig {
    pub mode: Option<AgentMode>,
    pub max_planning_iterations: Option<usize>,
    pub history_token_budget: Option<usize>,
    pub scratchpad_style: Option<ScratchpadStyle>,
    pub locale: Option<String>,
}

/// Everything the commands need, resolved and validated
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub llm: ResolvedLlmConfig,
    pub plugins: PluginSettings,
    pub agent: AgentConfig,
    /// Locale from the config file, if any
    pub locale: Option<String>,
    /// `DEBUG_AGENT_LLM_LOGGING=true`
    pub verbose_llm: bool,
}

/// CLI configuration loader
pub struct CliConfigLoader {
    /// Override config file/directory path
    config_override: Option<PathBuf>,
    /// Flag overrides
    protocol_override: Option<String>,
    api_key_override: Option<String>,
    base_url_override: Option<String>,
    model_override: Option<String>,
    /// Replacement for the process environment
    env: Option<HashMap<String, String>>,
}

impl CliConfigLoader {
    /// Create a new loader
    pub fn new() -> Self {
        Self {
            config_override: None,
            protocol_override: None,
            api_key_override: None,
            base_url_override: None,
            model_override: None,
            env: None,
        }
    }

    /// Set config file/directory override
    pub fn with_config_override(mut self, path: PathBuf) -> Self {
        self.config_override = Some(path);
        self
    }

    /// Set protocol override
    pub fn with_protocol_override(mut self, protocol: String) -> Self {
        self.protocol_override = Some(protocol);
        self
    }

    /// Set API key override
    pub fn with_api_key_override(mut self, api_key: String) -> Self {
        self.api_key_override = Some(api_key);
        self
    }

    /// Set base URL override
    pub fn with_base_url_override(mut self, base_url: String) -> Self {
        self.base_url_override = Some(base_url);
        self
    }

    /// Set model override
    pub fn with_model_override(mut self, model: String) -> Self {
        self.model_override = Some(model);
        self
    }

    /// Read variables from `env` instead of the process environment
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    fn var(&self, name: &str) -> Option<String> {
        let value = match &self.env {
            Some(env) => env.get(name).cloned(),
            None => std::env::var(name).ok(),
        };
        value.filter(|value| !value.is_empty())
    }

    /// Load and resolve configuration
    pub async fn load(&self) -> Result<CliConfig> {
        let config = self.load_raw().await?;
        self.resolve_config(config)
    }

    /// Load only the plugin settings, no model credentials needed
    pub async fn load_plugins(&self) -> Result<PluginSettings> {
        let config = self.load_raw().await?;
        Ok(self.resolve_plugins(config.plugins))
    }

    async fn load_raw(&self) -> Result<RawConfig> {
        // Step 1: Find and load base configuration
        let mut config = if let Some(override_path) = &self.config_override {
            let expanded = shellexpand::tilde(&override_path.to_string_lossy()).into_owned();
            let path = PathBuf::from(expanded);
            self.load_from_path(&path).await.with_context(|| {
                format!("Failed to load config from override path: {}", path.display())
            })?
        } else {
            self.search_and_load().await?
        };

        // Step 2: Apply flag overrides
        if let Some(protocol) = &self.protocol_override {
            config.protocol = Some(protocol.clone());
        }
        if let Some(api_key) = &self.api_key_override {
            config.api_key = Some(api_key.clone());
        }
        if let Some(base_url) = &self.base_url_override {
            config.base_url = Some(base_url.clone());
        }
        if let Some(model) = &self.model_override {
            config.model = Some(model.clone());
        }

        Ok(config)
    }

    /// Search for config in priority order
    async fn search_and_load(&self) -> Result<RawConfig> {
        let cwd = std::env::current_dir()?;
        let candidates = [
            Some(cwd.join("reagent.json")),
            Some(cwd.join(".reagent").join("config.json")),
            find_git_root(&cwd).map(|root| root.join(".reagent").join("config.json")),
            dirs::config_dir().map(|dir| dir.join("reagent").join("config.json")),
        ];

        for path in candidates.into_iter().flatten() {
            if path.is_file() {
                tracing::debug!("Using config file {}", path.display());
                return self.load_file(&path).await;
            }
        }

        tracing::debug!("No config file found, using environment only");
        Ok(RawConfig::default())
    }

    /// Load configuration from a specific path (file or directory)
    async fn load_from_path(&self, path: &Path) -> Result<RawConfig> {
        if path.is_file() {
            self.load_file(path).await
        } else if path.is_dir() {
            let config_file = path.join("config.json");
            if config_file.exists() {
                self.load_file(&config_file).await
            } else {
                Err(anyhow!(
                    "No config.json found in directory: {}",
                    path.display()
                ))
            }
        } else {
            Err(anyhow!("Config path does not exist: {}", path.display()))
        }
    }

    /// Load a single config file
    async fn load_file(&self, path: &Path) -> Result<RawConfig> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn resolve_protocol(&self, config: &RawConfig) -> Result<Protocol> {
        let name = config
            .protocol
            .clone()
            .or_else(|| self.var("REAGENT_PROTOCOL"));
        match name {
            Some(name) => Protocol::parse(&name).ok_or_else(|| anyhow!("Unknown protocol: {}", name)),
            None if self.var("OPENAI_API_KEY").is_none()
                && self.var("AZURE_OPENAI_API_KEY").is_some() =>
            {
                Ok(Protocol::AzureOpenAI)
            }
            None => Ok(Protocol::OpenAICompat),
        }
    }

    /// Resolve raw config and environment into the final config
    fn resolve_config(&self, config: RawConfig) -> Result<CliConfig> {
        let protocol = self.resolve_protocol(&config)?;
        let azure = protocol == Protocol::AzureOpenAI;

        // Resolve API key (handle env: prefix)
        let api_key = match config.api_key.clone() {
            Some(key) => match key.strip_prefix("env:") {
                Some(var_name) => self
                    .var(var_name)
                    .with_context(|| format!("Environment variable not found: {}", var_name))?,
                None => key,
            },
            None => {
                let var_name = if azure { "AZURE_OPENAI_API_KEY" } else { "OPENAI_API_KEY" };
                self.var(var_name).ok_or_else(|| {
                    anyhow!(
                        "No API key found. Please create a reagent.json file or set {}",
                        var_name
                    )
                })?
            }
        };

        let base_url = match config.base_url.clone() {
            Some(url) => url,
            None if azure => self.var("AZURE_OPENAI_BASE_URL").unwrap_or_default(),
            None => self
                .var("OPENAI_API_HOST")
                .map(|host| openai_base_url(&host))
                .or_else(|| protocol.default_base_url().map(str::to_string))
                .unwrap_or_default(),
        };

        let model = config
            .model
            .clone()
            .or_else(|| self.var("OPENAI_MODEL"))
            .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());

        let mut params = config.params.clone();
        if azure {
            params.deployment_id = params
                .deployment_id
                .or_else(|| self.var("AZURE_DEPLOYMENT_ID"));
            params.embedding_deployment_id = params
                .embedding_deployment_id
                .or_else(|| self.var("AZURE_DEPLOYMENT_ID_EMBEDDINGS"));
            params.api_version = params
                .api_version
                .or_else(|| self.var("OPENAI_API_VERSION"))
                .or_else(|| Some(DEFAULT_AZURE_API_VERSION.to_string()));
        }

        let llm = ResolvedLlmConfig::new(protocol, base_url, api_key, model)
            .with_params(params)
            .with_headers(config.headers.clone());
        llm.validate()
            .map_err(|e| anyhow!("Configuration validation failed: {}", e))?;

        let plugins = self.resolve_plugins(config.plugins);

        let mut agent = AgentConfig::default();
        if let Some(mode) = config.agent.mode {
            agent.mode = mode;
        }
        if let Some(max) = config.agent.max_planning_iterations {
            agent.max_planning_iterations = max;
        }
        if let Some(budget) = config.agent.history_token_budget {
            agent.history_token_budget = budget;
        }
        if let Some(style) = config.agent.scratchpad_style {
            agent.scratchpad_style = style;
        }

        Ok(CliConfig {
            llm,
            plugins,
            agent,
            locale: config.agent.locale,
            verbose_llm: self.var("DEBUG_AGENT_LLM_LOGGING").as_deref() == Some("true"),
        })
    }

    fn resolve_plugins(&self, mut plugins: PluginSettings) -> PluginSettings {
        if plugins.manifest_urls.is_empty() {
            plugins.manifest_urls = self
                .var("PLUGINS_JSON_URLS")
                .map(|v| PluginSettings::split_list(&v))
                .unwrap_or_default();
        }
        if plugins.internal_plugins.is_empty() {
            plugins.internal_plugins = self
                .var("PLUGINS_INTERNAL")
                .map(|v| PluginSettings::split_list(&v))
                .unwrap_or_default();
        }
        plugins.python_interpreter_backend = plugins
            .python_interpreter_backend
            .or_else(|| self.var("PYTHON_INTERPRETER_BACKEND"));
        plugins.google_api_key = plugins.google_api_key.or_else(|| self.var("GOOGLE_API_KEY"));
        plugins.google_cse_id = plugins.google_cse_id.or_else(|| self.var("GOOGLE_CSE_ID"));
        plugins
    }
}

impl Default for CliConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// `OPENAI_API_HOST` names the host; the API lives under `/v1`
fn openai_base_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.ends_with("/v1") {
        host.to_string()
    } else {
        format!("{}/v1", host)
    }
}

/// Find git repository root
fn find_git_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_file_with_env_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reagent.json");
        std::fs::write(
            &path,
            r#"{
                "protocol": "openai",
                "api_key": "env:MY_KEY",
                "model": "gpt-4",
                "plugins": {"internal_plugins": ["wikipedia"]},
                "agent": {"mode": "conversational", "max_planning_iterations": 3, "locale": "ja"}
            }"#,
        )
        .unwrap();

        let config = CliConfigLoader::new()
            .with_config_override(path)
            .with_env(env(&[("MY_KEY", "sk-test"), ("PLUGINS_INTERNAL", "google_search")]))
            .load()
            .await
            .unwrap();
        assert_eq!(config.llm.api_key, "sk-test");
        assert_eq!(config.llm.model, "gpt-4");
        assert_eq!(config.llm.base_url, "https://api.openai.com/v1");
        assert_eq!(config.plugins.internal_plugins, vec!["wikipedia"]);
        assert_eq!(config.agent.mode, AgentMode::Conversational);
        assert_eq!(config.agent.max_planning_iterations, 3);
        assert_eq!(config.locale.as_deref(), Some("ja"));
    }

    #[tokio::test]
    async fn test_directory_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"api_key": "sk-dir", "model": "gpt-4"}"#,
        )
        .unwrap();
        let config = CliConfigLoader::new()
            .with_config_override(dir.path().to_path_buf())
            .with_model_override("gpt-3.5-turbo".to_string())
            .with_env(HashMap::new())
            .load()
            .await
            .unwrap();
        assert_eq!(config.llm.api_key, "sk-dir");
        assert_eq!(config.llm.model, "gpt-3.5-turbo");
    }

    #[tokio::test]
    async fn test_plugins_without_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reagent.json");
        std::fs::write(&path, r#"{"plugins": {"python_interpreter_backend": "http://py.local"}}"#)
            .unwrap();
        let plugins = CliConfigLoader::new()
            .with_config_override(path)
            .with_env(env(&[("PLUGINS_INTERNAL", "python_interpreter,wikipedia")]))
            .load_plugins()
            .await
            .unwrap();
        assert_eq!(plugins.internal_plugins, vec!["python_interpreter", "wikipedia"]);
        assert_eq!(plugins.python_interpreter_backend.as_deref(), Some("http://py.local"));
    }

    #[test]
    fn test_env_only_openai() {
        let loader = CliConfigLoader::new().with_env(env(&[
            ("OPENAI_API_KEY", "sk-env"),
            ("OPENAI_API_HOST", "https://proxy.local/"),
            ("PLUGINS_JSON_URLS", "https://a.test/plugins.json, https://b.test/plugins.json"),
            ("DEBUG_AGENT_LLM_LOGGING", "true"),
        ]));
        let config = loader.resolve_config(RawConfig::default()).unwrap();
        assert_eq!(config.llm.protocol, Protocol::OpenAICompat);
        assert_eq!(config.llm.base_url, "https://proxy.local/v1");
        assert_eq!(config.llm.model, "gpt-3.5-turbo");
        assert_eq!(config.plugins.manifest_urls.len(), 2);
        assert!(config.verbose_llm);
    }

    #[test]
    fn test_env_only_azure() {
        let loader = CliConfigLoader::new().with_env(env(&[
            ("AZURE_OPENAI_API_KEY", "az-key"),
            ("AZURE_OPENAI_BASE_URL", "https://res.openai.azure.com"),
            ("AZURE_DEPLOYMENT_ID", "chat"),
            ("AZURE_DEPLOYMENT_ID_EMBEDDINGS", "embed"),
        ]));
        let config = loader.resolve_config(RawConfig::default()).unwrap();
        assert_eq!(config.llm.protocol, Protocol::AzureOpenAI);
        assert_eq!(config.llm.params.deployment_id.as_deref(), Some("chat"));
        assert_eq!(config.llm.params.embedding_deployment_id.as_deref(), Some("embed"));
        assert_eq!(config.llm.params.api_version.as_deref(), Some("2023-05-15"));
    }

    #[test]
    fn test_missing_key_is_an_error() {
        let loader = CliConfigLoader::new().with_env(HashMap::new());
        let err = loader.resolve_config(RawConfig::default()).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));

        let loader = CliConfigLoader::new().with_env(env(&[("REAGENT_PROTOCOL", "anthropic")]));
        assert!(loader.resolve_config(RawConfig::default()).is_err());
    }
}
