//! Google Custom Search plugin

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::agent::{Action, PluginInfo, TaskExecutionContext};
use crate::config::PluginSettings;
use crate::error::{ConfigError, Result};
use crate::tools::{Tool, ToolFactory};

const SEARCH_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";
const MAX_RESULTS: usize = 5;

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

/// Render search items as the observation text
fn format_results(response: &SearchResponse) -> String {
    if response.items.is_empty() {
        return "No good Google Search Result was found".to_string();
    }
    response
        .items
        .iter()
        .take(MAX_RESULTS)
        .map(|item| format!("{}\n{}\n{}", item.title, item.link, item.snippet.replace('\n', " ")))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Web search through the Custom Search JSON API
pub struct GoogleSearchTool {
    info: PluginInfo,
    api_key: String,
    cse_id: String,
    http: reqwest::Client,
}

impl GoogleSearchTool {
    pub fn new(api_key: String, cse_id: String, http: reqwest::Client) -> Self {
        let mut info = PluginInfo::new(
            "google_search",
            "Google Search",
            "Search the web with Google.",
        )
        .displayed();
        info.description_for_model = "A wrapper around Google Search. \
Useful for when you need to answer questions about current events. \
Input should be a search query. The output will be titles, links and snippets of the top results."
            .to_string();
        Self {
            info,
            api_key,
            cse_id,
            http,
        }
    }
}

#[async_trait]
impl Tool for GoogleSearchTool {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    async fn execute(&self, context: &TaskExecutionContext, action: &Action) -> Result<String> {
        let num = MAX_RESULTS.to_string();
        let response: SearchResponse = self
            .http
            .get(SEARCH_ENDPOINT)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cse_id.as_str()),
                ("q", action.plugin_input.trim()),
                ("hl", context.language()),
                ("num", num.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(format_results(&response))
    }
}

/// Creates the search tool when credentials are configured
pub struct GoogleSearchFactory;

impl ToolFactory for GoogleSearchFactory {
    fn tool_name(&self) -> &str {
        "google_search"
    }

    fn create(&self, settings: &PluginSettings, http: &reqwest::Client) -> Result<Arc<dyn Tool>> {
        let api_key = settings
            .google_api_key
            .clone()
            .ok_or_else(|| ConfigError::MissingField {
                field: "google_api_key".to_string(),
            })?;
        let cse_id = settings
            .google_cse_id
            .clone()
            .ok_or_else(|| ConfigError::MissingField {
                field: "google_cse_id".to_string(),
            })?;
        Ok(Arc::new(GoogleSearchTool::new(api_key, cse_id, http.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_results() {
        let response: SearchResponse = serde_json::from_value(serde_json::json!({
            "items": [
                {"title": "Rust", "link": "https://www.rust-lang.org", "snippet": "A language\nfor everyone"},
                {"title": "Cargo", "link": "https://doc.rust-lang.org/cargo"}
            ]
        }))
        .unwrap();
        assert_eq!(
            format_results(&response),
            "Rust\nhttps://www.rust-lang.org\nA language for everyone\n\nCargo\nhttps://doc.rust-lang.org/cargo\n"
        );
        assert_eq!(
            format_results(&SearchResponse::default()),
            "No good Google Search Result was found"
        );
    }

    #[test]
    fn test_factory_requires_credentials() {
        let http = reqwest::Client::new();
        let mut settings = PluginSettings {
            google_api_key: Some("key".to_string()),
            ..Default::default()
        };
        let err = GoogleSearchFactory.create(&settings, &http).err().unwrap();
        assert!(err.to_string().contains("google_cse_id"));

        settings.google_cse_id = Some("cse".to_string());
        assert_eq!(
            GoogleSearchFactory.create(&settings, &http).unwrap().name(),
            "google_search"
        );
    }
}
