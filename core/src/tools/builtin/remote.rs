//! Plugins described by a remote `ai-plugin.json` descriptor

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::agent::{Action, ApiRef, PluginInfo, TaskExecutionContext};
use crate::error::{Error, Result};
use crate::tools::registry::ManifestSource;
use crate::tools::Tool;

#[derive(Debug, Deserialize)]
struct Descriptor {
    name_for_model: String,
    name_for_human: String,
    #[serde(default)]
    description_for_human: String,
    #[serde(default)]
    logo_url: Option<String>,
    api: ApiRef,
}

/// A remote plugin whose execution hands the model the plugin's API spec
///
/// The model is expected to call it once, then talk to the API through the
/// HTTP capability tools.
#[derive(Debug)]
pub struct RemotePluginTool {
    info: PluginInfo,
    api_spec: String,
}

impl RemotePluginTool {
    /// Fetch the descriptor at `url` and the API spec it points to
    pub async fn load(source: &dyn ManifestSource, url: &str) -> Result<Self> {
        let descriptor: Descriptor = serde_json::from_value(source.fetch_json(url).await?)?;

        let spec_url = Url::parse(url)
            .and_then(|base| base.join(&descriptor.api.url))
            .map_err(|e| Error::Generic(format!("Invalid API url {}: {}", descriptor.api.url, e)))?;
        let spec = source.fetch_text(spec_url.as_str()).await?;

        let info = PluginInfo {
            description_for_model: format!(
                "Call this tool to get the OpenAPI spec (and usage guide) for interacting with the {name} API. \
You should only call this ONCE! What is the {name} API useful for? {description}",
                name = descriptor.name_for_human,
                description = descriptor.description_for_human,
            ),
            name_for_model: descriptor.name_for_model,
            name_for_human: descriptor.name_for_human,
            display_for_user: true,
            logo_url: descriptor.logo_url,
            api: Some(ApiRef {
                kind: descriptor.api.kind,
                url: spec_url.to_string(),
            }),
            description_for_human: descriptor.description_for_human,
        };
        let api_spec = format!(
            "Usage Guide: {}\n\nOpenAPI Spec: {}",
            info.description_for_human,
            spec.trim()
        );

        tracing::debug!("Loaded plugin {} from {}", info.name_for_model, url);
        Ok(Self { info, api_spec })
    }

    /// Usage guide and API spec returned on execution
    pub fn api_spec(&self) -> &str {
        &self.api_spec
    }
}

#[async_trait]
impl Tool for RemotePluginTool {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    async fn execute(&self, _context: &TaskExecutionContext, _action: &Action) -> Result<String> {
        Ok(self.api_spec.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    struct OnePlugin;

    #[async_trait]
    impl ManifestSource for OnePlugin {
        async fn fetch_json(&self, url: &str) -> Result<Value> {
            match url {
                "https://shop.test/.well-known/ai-plugin.json" => Ok(json!({
                    "schema_version": "v1",
                    "name_for_model": "shop",
                    "name_for_human": "Shop",
                    "description_for_human": "Find products.",
                    "description_for_model": "ignored",
                    "api": {"type": "openapi", "url": "../openapi.yaml"}
                })),
                "https://bare.test/ai-plugin.json" => Ok(json!({
                    "name_for_model": "bare",
                    "name_for_human": "Bare"
                })),
                _ => Err(Error::Generic(format!("unreachable: {}", url))),
            }
        }

        async fn fetch_text(&self, url: &str) -> Result<String> {
            match url {
                "https://shop.test/openapi.yaml" => Ok("\n  openapi: 3.0.1\n".to_string()),
                _ => Err(Error::Generic(format!("unreachable: {}", url))),
            }
        }
    }

    #[tokio::test]
    async fn test_load_resolves_spec_relative_to_descriptor() {
        let tool = RemotePluginTool::load(&OnePlugin, "https://shop.test/.well-known/ai-plugin.json")
            .await
            .unwrap();
        assert_eq!(tool.name(), "shop");
        assert!(tool.info().display_for_user);
        assert_eq!(
            tool.api_spec(),
            "Usage Guide: Find products.\n\nOpenAPI Spec: openapi: 3.0.1"
        );
        assert!(tool
            .info()
            .description_for_model
            .starts_with("Call this tool to get the OpenAPI spec (and usage guide) for interacting with the Shop API."));
        assert_eq!(
            tool.info().api.as_ref().unwrap().url,
            "https://shop.test/openapi.yaml"
        );
    }

    #[tokio::test]
    async fn test_descriptor_without_api_fails() {
        assert!(RemotePluginTool::load(&OnePlugin, "https://bare.test/ai-plugin.json")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_unreachable_spec_fails() {
        struct NoSpec;

        #[async_trait]
        impl ManifestSource for NoSpec {
            async fn fetch_json(&self, _url: &str) -> Result<Value> {
                Ok(json!({
                    "name_for_model": "x",
                    "name_for_human": "X",
                    "api": {"type": "openapi", "url": "https://x.test/spec.yaml"}
                }))
            }

            async fn fetch_text(&self, url: &str) -> Result<String> {
                Err(Error::Generic(format!("unreachable: {}", url)))
            }
        }

        let err = RemotePluginTool::load(&NoSpec, "https://x.test/ai-plugin.json")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("spec.yaml"));
    }
}
