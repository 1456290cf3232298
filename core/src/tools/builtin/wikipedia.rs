//! Wikipedia search plugin

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, LazyLock};

use crate::agent::{Action, PluginInfo, TaskExecutionContext};
use crate::config::PluginSettings;
use crate::error::Result;
use crate::tools::{Tool, ToolFactory};

const MAX_RESULTS: usize = 3;

static MARKUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    query: Option<SearchQuery>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
    #[serde(default)]
    snippet: String,
}

fn format_results(response: &SearchResponse) -> String {
    let hits = response
        .query
        .as_ref()
        .map(|q| q.search.as_slice())
        .unwrap_or_default();
    if hits.is_empty() {
        return "No good Wikipedia Search Result was found".to_string();
    }
    hits.iter()
        .take(MAX_RESULTS)
        .map(|hit| {
            let snippet = MARKUP.replace_all(&hit.snippet, "").replace("&quot;", "\"");
            format!("Page: {}\nSummary: {}", hit.title, snippet)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Searches the Wikipedia edition matching the caller's language
pub struct WikipediaTool {
    info: PluginInfo,
    http: reqwest::Client,
}

impl WikipediaTool {
    pub fn new(http: reqwest::Client) -> Self {
        let mut info =
            PluginInfo::new("wikipedia", "Wikipedia", "Search articles on Wikipedia.").displayed();
        info.description_for_model = "A wrapper around Wikipedia. \
Useful for when you need to answer general questions about people, places, companies, facts, historical events, or other subjects. \
Input should be a search query."
            .to_string();
        Self { info, http }
    }

    /// MediaWiki API endpoint for a language code
    pub fn endpoint(language: &str) -> String {
        format!("https://{}.wikipedia.org/w/api.php", language)
    }
}

#[async_trait]
impl Tool for WikipediaTool {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    async fn execute(&self, context: &TaskExecutionContext, action: &Action) -> Result<String> {
        let limit = MAX_RESULTS.to_string();
        let response: SearchResponse = self
            .http
            .get(Self::endpoint(context.language()))
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("format", "json"),
                ("srsearch", action.plugin_input.trim()),
                ("srlimit", limit.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(format_results(&response))
    }
}

/// Creates the Wikipedia tool, which needs no credentials
pub struct WikipediaFactory;

impl ToolFactory for WikipediaFactory {
    fn tool_name(&self) -> &str {
        "wikipedia"
    }

    fn create(&self, _settings: &PluginSettings, http: &reqwest::Client) -> Result<Arc<dyn Tool>> {
        Ok(Arc::new(WikipediaTool::new(http.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_results_strips_markup() {
        let response: SearchResponse = serde_json::from_value(serde_json::json!({
            "query": {"search": [
                {"title": "Rust (programming language)", "snippet": "<span class=\"searchmatch\">Rust</span> is a &quot;safe&quot; language"}
            ]}
        }))
        .unwrap();
        assert_eq!(
            format_results(&response),
            "Page: Rust (programming language)\nSummary: Rust is a \"safe\" language"
        );
        assert_eq!(
            format_results(&SearchResponse::default()),
            "No good Wikipedia Search Result was found"
        );
    }

    #[test]
    fn test_endpoint_follows_language() {
        assert_eq!(WikipediaTool::endpoint("ja"), "https://ja.wikipedia.org/w/api.php");
    }
}
