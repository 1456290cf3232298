//! Capability tools for raw HTTP access
//!
//! These tools are never listed on their own. The registry offers the API
//! pair next to plugins that describe an API, and the webpage pair next to
//! plugins that do not.

use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::agent::{Action, PluginInfo, TaskExecutionContext};
use crate::error::{Result, ToolError};
use crate::llm::{cosine_similarity, Embedder};
use crate::tools::utils::{chunk_text_by_token_size, extract_text_from_html, extract_url};
use crate::tools::Tool;

/// Request headers never forwarded to third parties
const DROPPED_HEADERS: &[&str] = &[
    "host",
    "content-length",
    "connection",
    "cookie",
    "authorization",
    "accept-encoding",
];

const CHUNK_TOKENS: usize = 200;
const MAX_CHUNKS: usize = 10;
const TOP_CHUNKS: usize = 5;

const POST_INPUT_ERROR: &str =
    "ERROR: Action Input must be a json with two keys: \"url\" and \"data\".";

const POST_DESCRIPTION_TAIL: &str = "Input should be a json string with two keys: \"url\" and \"data\".
The value of \"url\" should be a string, and the value of \"data\" should be a dictionary of
key-value pairs you want to POST to the url as a JSON body.
Be careful to always use double quotes for strings in the json string
The output will be the text response of the POST request.";

/// Caller headers that may travel with outgoing requests
pub fn forwarded_headers(headers: &HashMap<String, String>) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let lower = name.to_ascii_lowercase();
        if DROPPED_HEADERS.contains(&lower.as_str()) {
            continue;
        }
        let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(lower.as_bytes()),
            HeaderValue::from_str(value),
        ) else {
            continue;
        };
        map.insert(name, value);
    }
    map
}

#[derive(Debug, Deserialize)]
struct PostInput {
    url: String,
    #[serde(default)]
    data: Value,
}

/// The API pair: `requests_get_api` and `requests_post_api`
pub fn api_tools(http: reqwest::Client) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(RequestsGetTool::new(http.clone())),
        Arc::new(RequestsPostTool::new(http)),
    ]
}

/// The webpage pair: `requests_get_webpage_content` and `requests_post_webpage`
pub fn webpage_tools(
    http: reqwest::Client,
    embedder: Option<Arc<dyn Embedder>>,
) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(RequestsGetWebpageTool::new(http.clone(), embedder)),
        Arc::new(RequestsPostWebpageTool::new(http)),
    ]
}

/// GET an API endpoint and return the body
pub struct RequestsGetTool {
    info: PluginInfo,
    http: reqwest::Client,
}

impl RequestsGetTool {
    pub fn new(http: reqwest::Client) -> Self {
        let mut info = PluginInfo::new(
            "requests_get_api",
            "requests_get_api",
            "Use this when you want to GET to a web using API.",
        );
        info.description_for_model = "A portal to the internet. Use this when you need to get specific content using API.
Input should be a url (i.e. https://www.google.com). The output will be the text response of the GET request."
            .to_string();
        Self { info, http }
    }
}

#[async_trait]
impl Tool for RequestsGetTool {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    async fn execute(&self, context: &TaskExecutionContext, action: &Action) -> Result<String> {
        let response = self
            .http
            .get(action.plugin_input.trim())
            .headers(forwarded_headers(&context.headers))
            .send()
            .await?;
        Ok(response.text().await?)
    }
}

/// POST JSON to an API endpoint
pub struct RequestsPostTool {
    info: PluginInfo,
    http: reqwest::Client,
}

impl RequestsPostTool {
    pub fn new(http: reqwest::Client) -> Self {
        let mut info = PluginInfo::new(
            "requests_post_api",
            "requests_post_api",
            "Use this when you want to POST to an API endpoint.",
        );
        info.description_for_model = format!(
            "Use this when you want to POST to an API endpoint.\n{}",
            POST_DESCRIPTION_TAIL
        );
        Self { info, http }
    }
}

#[async_trait]
impl Tool for RequestsPostTool {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    /// Failures come back as observations so the model can correct itself
    async fn execute(&self, context: &TaskExecutionContext, action: &Action) -> Result<String> {
        let input: PostInput = match serde_json::from_str(&action.plugin_input) {
            Ok(input) => input,
            Err(e) if e.is_syntax() || e.is_eof() => return Ok(POST_INPUT_ERROR.to_string()),
            Err(e) => return Ok(e.to_string()),
        };

        let mut headers = forwarded_headers(&context.headers);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let sent = self
            .http
            .post(&input.url)
            .headers(headers)
            .json(&input.data)
            .send()
            .await;
        match sent {
            Ok(response) => Ok(response.text().await.unwrap_or_else(|e| e.to_string())),
            Err(e) => Ok(e.to_string()),
        }
    }
}

/// Read the parts of a webpage most relevant to the current thought
pub struct RequestsGetWebpageTool {
    info: PluginInfo,
    http: reqwest::Client,
    embedder: Option<Arc<dyn Embedder>>,
}

impl RequestsGetWebpageTool {
    pub fn new(http: reqwest::Client, embedder: Option<Arc<dyn Embedder>>) -> Self {
        let mut info = PluginInfo::new(
            "requests_get_webpage_content",
            "Get Webpage",
            "Use this when you want to GET a text content of the webpage.",
        )
        .displayed();
        info.description_for_model = "A portal to the internet. Use this when you need to get specific content from a website.
Input should be a url (i.e. https://www.google.com). The output will be the text response of the GET request."
            .to_string();
        Self {
            info,
            http,
            embedder,
        }
    }
}

/// Order chunks by similarity to `thought` and keep the best ones
///
/// Without an embedder the chunks keep page order.
pub async fn rank_chunks(
    embedder: Option<&dyn Embedder>,
    thought: &str,
    chunks: Vec<String>,
) -> Result<Vec<String>> {
    let Some(embedder) = embedder else {
        return Ok(chunks.into_iter().take(TOP_CHUNKS).collect());
    };
    if chunks.is_empty() {
        return Ok(chunks);
    }

    let embeddings = try_join_all(chunks.iter().map(|chunk| embedder.embed(chunk))).await?;
    let target = embedder.embed(thought).await?;

    let mut scored: Vec<(f32, String)> = embeddings
        .iter()
        .map(|embedding| cosine_similarity(&target, embedding))
        .zip(chunks)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    Ok(scored
        .into_iter()
        .take(TOP_CHUNKS)
        .map(|(_, chunk)| chunk)
        .collect())
}

#[async_trait]
impl Tool for RequestsGetWebpageTool {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    async fn execute(&self, context: &TaskExecutionContext, action: &Action) -> Result<String> {
        let url = extract_url(&action.plugin_input).ok_or_else(|| ToolError::ExecutionFailed {
            name: self.info.name_for_model.clone(),
            message: "invalid input.".to_string(),
        })?;
        tracing::debug!("fetch({}): {}", self.info.name_for_model, url);

        let html = self
            .http
            .get(&url)
            .headers(forwarded_headers(&context.headers))
            .send()
            .await?
            .text()
            .await?;
        let text = extract_text_from_html(&html);

        let chunks = {
            let encoding = context.encoding()?;
            let mut chunks = chunk_text_by_token_size(&*encoding, &text, CHUNK_TOKENS);
            chunks.truncate(MAX_CHUNKS);
            chunks
        };

        let ranked = rank_chunks(self.embedder.as_deref(), &action.thought, chunks).await?;
        Ok(ranked.join("\n\n"))
    }
}

/// POST JSON to a webpage
pub struct RequestsPostWebpageTool {
    info: PluginInfo,
    http: reqwest::Client,
}

impl RequestsPostWebpageTool {
    pub fn new(http: reqwest::Client) -> Self {
        let mut info = PluginInfo::new(
            "requests_post_webpage",
            "requests_post_webpage",
            "Use this when you want to POST to a webpage.",
        );
        info.description_for_model = format!(
            "Use this when you want to POST to a webpage.\n{}",
            POST_DESCRIPTION_TAIL
        );
        Self { info, http }
    }
}

#[async_trait]
impl Tool for RequestsPostWebpageTool {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    async fn execute(&self, context: &TaskExecutionContext, action: &Action) -> Result<String> {
        let input: PostInput = match serde_json::from_str(&action.plugin_input) {
            Ok(input) => input,
            Err(e) => return Ok(e.to_string()),
        };

        let sent = self
            .http
            .post(&input.url)
            .headers(forwarded_headers(&context.headers))
            .body(input.data.to_string())
            .send()
            .await;
        match sent {
            Ok(response) => Ok(response.text().await.unwrap_or_else(|e| e.to_string())),
            Err(e) => Ok(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::LexicalEncodingProvider;

    fn context() -> TaskExecutionContext {
        let headers = HashMap::from([
            ("Host".to_string(), "chat.local".to_string()),
            ("Cookie".to_string(), "session=1".to_string()),
            ("Authorization".to_string(), "Bearer x".to_string()),
            ("X-Request-Id".to_string(), "abc".to_string()),
            ("Accept-Language".to_string(), "ja,en".to_string()),
        ]);
        TaskExecutionContext::new(
            headers,
            "gpt-3.5-turbo",
            false,
            Arc::new(LexicalEncodingProvider::new()),
        )
    }

    fn action(tool: &dyn Tool, input: &str) -> Action {
        Action {
            thought: "I need to look this up".to_string(),
            plugin: tool.info().public(),
            plugin_input: input.to_string(),
        }
    }

    /// Embeds text as [count of 'rust', count of other words]
    struct KeywordEmbedder;

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let words: Vec<&str> = text.split_whitespace().collect();
            let hits = words.iter().filter(|w| w.eq_ignore_ascii_case("rust")).count();
            Ok(vec![hits as f32, (words.len() - hits) as f32])
        }
    }

    #[test]
    fn test_forwarded_headers_drop_credentials() {
        let headers = forwarded_headers(&context().headers);
        assert!(headers.get("host").is_none());
        assert!(headers.get("cookie").is_none());
        assert!(headers.get("authorization").is_none());
        assert_eq!(headers.get("x-request-id").unwrap(), "abc");
        assert_eq!(headers.get("accept-language").unwrap(), "ja,en");
    }

    #[test]
    fn test_capability_tool_descriptors() {
        let http = reqwest::Client::new();
        let api: Vec<String> = api_tools(http.clone())
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        assert_eq!(api, vec!["requests_get_api", "requests_post_api"]);

        let web = webpage_tools(http, None);
        assert_eq!(web[0].name(), "requests_get_webpage_content");
        assert_eq!(web[0].info().name_for_human, "Get Webpage");
        assert!(web[0].info().display_for_user);
        assert!(!web[1].info().display_for_user);
        assert!(web[1].info().description_for_model.contains("\"url\" and \"data\""));
    }

    #[tokio::test]
    async fn test_post_api_rejects_malformed_json() {
        let tool = RequestsPostTool::new(reqwest::Client::new());
        let result = tool
            .execute(&context(), &action(&tool, "{url: nope"))
            .await
            .unwrap();
        assert_eq!(result, POST_INPUT_ERROR);
    }

    #[tokio::test]
    async fn test_post_webpage_reports_errors_as_observation() {
        let tool = RequestsPostWebpageTool::new(reqwest::Client::new());
        let result = tool
            .execute(&context(), &action(&tool, "not json"))
            .await
            .unwrap();
        assert!(!result.is_empty());
    }

    #[tokio::test]
    async fn test_get_webpage_requires_url() {
        let tool = RequestsGetWebpageTool::new(reqwest::Client::new(), None);
        let err = tool
            .execute(&context(), &action(&tool, "nothing to fetch"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid input."));
    }

    #[tokio::test]
    async fn test_rank_chunks_by_similarity() {
        let chunks = vec![
            "cooking pasta at home".to_string(),
            "rust borrow checker rust".to_string(),
            "the weather today".to_string(),
            "rust and cargo".to_string(),
        ];
        let ranked = rank_chunks(Some(&KeywordEmbedder), "rust", chunks)
            .await
            .unwrap();
        assert_eq!(ranked[0], "rust borrow checker rust");
        assert_eq!(ranked[1], "rust and cargo");
        assert_eq!(ranked.len(), 4);
    }

    #[tokio::test]
    async fn test_rank_chunks_without_embedder_keeps_order() {
        let chunks: Vec<String> = (0..8).map(|i| format!("chunk {}", i)).collect();
        let ranked = rank_chunks(None, "anything", chunks).await.unwrap();
        assert_eq!(ranked.len(), 5);
        assert_eq!(ranked[0], "chunk 0");
        assert!(rank_chunks(Some(&KeywordEmbedder), "x", Vec::new())
            .await
            .unwrap()
            .is_empty());
    }
}
