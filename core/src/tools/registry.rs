//! Tool registry
//!
//! The registry owns the process-wide tool cache. Internal plugins and
//! remote manifest plugins are loaded once, on first use, and shared by
//! every run until the process exits.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::config::PluginSettings;
use crate::error::{Error, Result};
use crate::llm::Embedder;
use crate::tools::builtin::{
    api_tools, webpage_tools, GoogleSearchFactory, PythonInterpreterFactory, RemotePluginTool,
    WikipediaFactory,
};
use crate::tools::Tool;

/// Factory for internal plugins selectable by name
pub trait ToolFactory: Send + Sync {
    /// Name of the tool this factory creates
    fn tool_name(&self) -> &str;

    /// Create the tool from the plugin settings
    fn create(&self, settings: &PluginSettings, http: &reqwest::Client) -> Result<Arc<dyn Tool>>;
}

/// Where manifests, plugin descriptors and API specs are fetched from
#[async_trait]
pub trait ManifestSource: Send + Sync {
    /// Fetch and decode a JSON document
    async fn fetch_json(&self, url: &str) -> Result<Value>;

    /// Fetch a text document
    async fn fetch_text(&self, url: &str) -> Result<String>;
}

/// Manifest source backed by HTTP
pub struct HttpManifestSource {
    client: reqwest::Client,
}

impl HttpManifestSource {
    /// Create a source using the given client
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Generic(format!(
                "Failed to fetch {} with status {}",
                url, status
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl ManifestSource for HttpManifestSource {
    async fn fetch_json(&self, url: &str) -> Result<Value> {
        Ok(self.get(url).await?.json().await?)
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        Ok(self.get(url).await?.text().await?)
    }
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    urls: Vec<String>,
}

/// Registry of every tool an agent may be offered
pub struct ToolRegistry {
    settings: PluginSettings,
    factories: HashMap<String, Box<dyn ToolFactory>>,
    static_tools: Vec<Arc<dyn Tool>>,
    source: Arc<dyn ManifestSource>,
    http: reqwest::Client,
    api_tools: Vec<Arc<dyn Tool>>,
    webpage_tools: Vec<Arc<dyn Tool>>,
    cache: OnceCell<Vec<Arc<dyn Tool>>>,
}

/// Builder for [`ToolRegistry`]
pub struct ToolRegistryBuilder {
    settings: PluginSettings,
    factories: Vec<Box<dyn ToolFactory>>,
    static_tools: Vec<Arc<dyn Tool>>,
    source: Option<Arc<dyn ManifestSource>>,
    http: Option<reqwest::Client>,
    embedder: Option<Arc<dyn Embedder>>,
}

impl ToolRegistryBuilder {
    /// Register an internal plugin factory
    pub fn with_factory(mut self, factory: Box<dyn ToolFactory>) -> Self {
        self.factories.push(factory);
        self
    }

    /// Add a tool that is always listed
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.static_tools.push(tool);
        self
    }

    /// Fetch manifests from a custom source
    pub fn with_manifest_source(mut self, source: Arc<dyn ManifestSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// HTTP client shared by the built-in tools
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Embedder used to rank webpage chunks
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Build the registry
    pub fn build(self) -> ToolRegistry {
        let http = self.http.unwrap_or_default();
        let source = self
            .source
            .unwrap_or_else(|| Arc::new(HttpManifestSource::new(http.clone())));
        let factories = self
            .factories
            .into_iter()
            .map(|factory| (factory.tool_name().to_string(), factory))
            .collect();

        ToolRegistry {
            api_tools: api_tools(http.clone()),
            webpage_tools: webpage_tools(http.clone(), self.embedder),
            settings: self.settings,
            factories,
            static_tools: self.static_tools,
            source,
            http,
            cache: OnceCell::new(),
        }
    }
}

impl ToolRegistry {
    /// Start a registry with the built-in internal plugin factories
    pub fn builder(settings: PluginSettings) -> ToolRegistryBuilder {
        ToolRegistryBuilder {
            settings,
            factories: vec![
                Box::new(PythonInterpreterFactory),
                Box::new(GoogleSearchFactory),
                Box::new(WikipediaFactory),
            ],
            static_tools: Vec::new(),
            source: None,
            http: None,
            embedder: None,
        }
    }

    /// Create a registry fetching manifests over HTTP
    pub fn new(settings: PluginSettings) -> Self {
        Self::builder(settings).build()
    }

    /// Names of the internal plugins this registry can create
    pub fn internal_plugin_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Configured internal plugins plus remote plugins, loaded once
    ///
    /// Concurrent first callers share a single load.
    pub async fn list_tools(&self) -> Vec<Arc<dyn Tool>> {
        self.cache.get_or_init(|| self.load()).await.clone()
    }

    /// Requested tools plus the capability tools they need
    ///
    /// HTTP API tools join when any requested tool describes an API,
    /// webpage tools when any does not.
    pub async fn list_tools_filtered(&self, names: &[String]) -> Vec<Arc<dyn Tool>> {
        let plugins: Vec<Arc<dyn Tool>> = self
            .list_tools()
            .await
            .into_iter()
            .filter(|tool| names.iter().any(|name| name == tool.name()))
            .collect();

        let mut result = Vec::new();
        if plugins.iter().any(|tool| tool.info().api.is_some()) {
            result.extend(self.api_tools.iter().cloned());
        }
        if plugins.iter().any(|tool| tool.info().api.is_none()) {
            result.extend(self.webpage_tools.iter().cloned());
        }
        result.extend(plugins);
        result
    }

    /// Every tool, including the capability tools never listed on their own
    pub async fn list_all_tools(&self) -> Vec<Arc<dyn Tool>> {
        let mut result: Vec<Arc<dyn Tool>> = self.api_tools.clone();
        result.extend(self.webpage_tools.iter().cloned());
        result.extend(self.list_tools().await);
        result
    }

    async fn load(&self) -> Vec<Arc<dyn Tool>> {
        let mut tools: Vec<Arc<dyn Tool>> = self.static_tools.clone();

        for name in &self.settings.internal_plugins {
            let Some(factory) = self.factories.get(name) else {
                tracing::warn!("Unknown internal plugin {}.", name);
                continue;
            };
            match factory.create(&self.settings, &self.http) {
                Ok(tool) => tools.push(tool),
                Err(e) => tracing::warn!("Failed to create internal plugin {}: {}", name, e),
            }
        }

        for manifest_url in &self.settings.manifest_urls {
            let urls = match self.fetch_manifest(manifest_url).await {
                Ok(urls) => urls,
                Err(e) => {
                    tracing::warn!("Failed to load plugin list from {}: {}", manifest_url, e);
                    continue;
                }
            };
            let loaded = futures::future::join_all(
                urls.iter()
                    .map(|url| RemotePluginTool::load(self.source.as_ref(), url)),
            )
            .await;
            for (url, result) in urls.iter().zip(loaded) {
                match result {
                    Ok(tool) => tools.push(Arc::new(tool)),
                    Err(e) => tracing::warn!("Failed to load plugin from {}: {}", url, e),
                }
            }
        }

        let mut seen = HashSet::new();
        tools.retain(|tool| {
            let fresh = seen.insert(tool.name().to_string());
            if !fresh {
                tracing::warn!("Duplicate tool {} skipped.", tool.name());
            }
            fresh
        });

        tracing::info!("Loaded {} tools", tools.len());
        tools
    }

    async fn fetch_manifest(&self, url: &str) -> Result<Vec<String>> {
        let manifest: Manifest = serde_json::from_value(self.source.fetch_json(url).await?)?;
        Ok(manifest.urls)
    }
}
