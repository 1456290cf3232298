//! OpenAI client implementation using async-openai library
//!
//! The same client serves the public OpenAI endpoint, OpenAI-compatible
//! proxies and Azure OpenAI deployments; only the async-openai `Config`
//! differs.

use crate::config::{Protocol, ResolvedLlmConfig};
use crate::error::{ConfigError, Error, LlmError, Result};
use crate::llm::{
    ChatOptions, Embedder, FinishReason, LlmClient, LlmMessage, LlmResponse, MessageRole, Usage,
};
use async_openai::{
    config::{AzureConfig, Config, OpenAIConfig},
    types::{
        ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestUserMessage, CreateChatCompletionRequestArgs,
        CreateEmbeddingRequestArgs, Stop,
    },
    Client,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::HashMap;
use std::sync::Arc;

/// Embedding model used when the configuration names none
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

const AZURE_DEFAULT_API_VERSION: &str = "2023-05-15";

/// OpenAI client using async-openai library
pub struct OpenAiClient<C: Config> {
    client: Client<C>,
    model: String,
    embedding_model: String,
    provider: &'static str,
}

impl OpenAiClient<OpenAIConfig> {
    /// Create a client for the OpenAI API or a compatible endpoint
    pub fn new(config: &ResolvedLlmConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(LlmError::Authentication {
                message: "No API key found for OpenAI".to_string(),
            }
            .into());
        }

        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);
        if !config.base_url.is_empty() {
            openai_config = openai_config.with_api_base(config.base_url.trim_end_matches('/'));
        }

        Ok(Self {
            client: Client::with_config(openai_config).with_http_client(http_client(config)?),
            model: config.model.clone(),
            embedding_model: embedding_model(config),
            provider: "openai",
        })
    }
}

impl OpenAiClient<AzureConfig> {
    /// Create a client for an Azure OpenAI deployment
    ///
    /// `deployment_id` selects which deployment the requests are routed to,
    /// so chat and embeddings use separate clients.
    pub fn azure(config: &ResolvedLlmConfig, deployment_id: &str) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(LlmError::Authentication {
                message: "No API key found for Azure OpenAI".to_string(),
            }
            .into());
        }

        let api_version = config
            .params
            .api_version
            .clone()
            .unwrap_or_else(|| AZURE_DEFAULT_API_VERSION.to_string());

        let azure_config = AzureConfig::new()
            .with_api_base(config.base_url.trim_end_matches('/'))
            .with_api_key(&config.api_key)
            .with_deployment_id(deployment_id)
            .with_api_version(api_version);

        Ok(Self {
            client: Client::with_config(azure_config).with_http_client(http_client(config)?),
            model: config.model.clone(),
            embedding_model: embedding_model(config),
            provider: "azure_openai",
        })
    }
}

/// Configured extra headers as a header map
pub fn default_headers(headers: &HashMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let invalid = || ConfigError::InvalidValue {
            field: "headers".to_string(),
            value: name.clone(),
        };
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
        let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

/// HTTP client sending the configured extra headers with every request
fn http_client(config: &ResolvedLlmConfig) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .default_headers(default_headers(&config.headers)?)
        .build()?)
}

fn embedding_model(config: &ResolvedLlmConfig) -> String {
    config
        .params
        .embedding_model
        .clone()
        .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string())
}

impl<C: Config> OpenAiClient<C> {
    /// Convert our internal message format to async-openai format
    fn convert_messages(&self, messages: Vec<LlmMessage>) -> Vec<ChatCompletionRequestMessage> {
        messages
            .into_iter()
            .map(|message| match message.role {
                MessageRole::System => {
                    ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                        content: message.content.into(),
                        name: None,
                    })
                }
                MessageRole::User => {
                    ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                        content: message.content.into(),
                        name: None,
                    })
                }
                MessageRole::Assistant => {
                    ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                        content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                            message.content,
                        )),
                        ..Default::default()
                    })
                }
            })
            .collect()
    }

    /// Convert async-openai response to our internal format
    fn convert_response(
        &self,
        response: async_openai::types::CreateChatCompletionResponse,
    ) -> Result<LlmResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse)?;

        let usage = response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        let finish_reason = choice.finish_reason.map(|reason| match reason {
            async_openai::types::FinishReason::Stop => FinishReason::Stop,
            async_openai::types::FinishReason::Length => FinishReason::Length,
            async_openai::types::FinishReason::ToolCalls => FinishReason::ToolCalls,
            async_openai::types::FinishReason::ContentFilter => FinishReason::ContentFilter,
            async_openai::types::FinishReason::FunctionCall => FinishReason::ToolCalls,
        });

        Ok(LlmResponse {
            content: choice.message.content.unwrap_or_default(),
            usage,
            model: response.model,
            finish_reason,
        })
    }
}

#[async_trait]
impl<C: Config + Send + Sync> LlmClient for OpenAiClient<C> {
    async fn chat_completion(
        &self,
        messages: Vec<LlmMessage>,
        options: ChatOptions,
    ) -> Result<LlmResponse> {
        let mut request_builder = CreateChatCompletionRequestArgs::default();
        request_builder.model(&self.model);
        request_builder.messages(self.convert_messages(messages));

        if let Some(max_tokens) = options.max_tokens {
            request_builder.max_tokens(max_tokens);
        }
        if let Some(temperature) = options.temperature {
            request_builder.temperature(temperature);
        }
        if let Some(top_p) = options.top_p {
            request_builder.top_p(top_p);
        }
        if let Some(stop) = options.stop.filter(|s| !s.is_empty()) {
            request_builder.stop(Stop::StringArray(stop));
        }

        let request = request_builder.build().map_err(|e| {
            tracing::error!("Failed to build OpenAI request: {}", e);
            LlmError::InvalidRequest {
                message: format!("Failed to build request: {}", e),
            }
        })?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            tracing::error!("OpenAI API call failed: {}", e);
            LlmError::ApiError {
                status: 500, // async-openai doesn't expose status codes directly
                message: e.to_string(),
            }
        })?;

        self.convert_response(response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        self.provider
    }
}

#[async_trait]
impl<C: Config + Send + Sync> Embedder for OpenAiClient<C> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.embedding_model)
            .input(text)
            .build()
            .map_err(|e| LlmError::InvalidRequest {
                message: format!("Failed to build embedding request: {}", e),
            })?;

        let response = self.client.embeddings().create(request).await.map_err(|e| {
            tracing::error!("OpenAI embedding call failed: {}", e);
            LlmError::ApiError {
                status: 500,
                message: e.to_string(),
            }
        })?;

        response
            .data
            .into_iter()
            .next()
            .map(|e| e.embedding)
            .ok_or_else(|| LlmError::EmptyResponse.into())
    }
}

/// Create the chat client for a resolved configuration
pub fn create_client(config: &ResolvedLlmConfig) -> Result<Arc<dyn LlmClient>> {
    config
        .validate()
        .map_err(|message| Error::Config(ConfigError::InvalidValue {
            field: "llm".to_string(),
            value: message,
        }))?;

    match config.protocol {
        Protocol::OpenAICompat => Ok(Arc::new(OpenAiClient::new(config)?)),
        Protocol::AzureOpenAI => {
            let deployment = config.params.deployment_id.as_deref().ok_or_else(|| {
                ConfigError::MissingField {
                    field: "deployment_id".to_string(),
                }
            })?;
            Ok(Arc::new(OpenAiClient::azure(config, deployment)?))
        }
    }
}

/// Create the embedding client for a resolved configuration
///
/// Azure routes embeddings through their own deployment and falls back to
/// the chat deployment when none is configured.
pub fn create_embedder(config: &ResolvedLlmConfig) -> Result<Arc<dyn Embedder>> {
    match config.protocol {
        Protocol::OpenAICompat => Ok(Arc::new(OpenAiClient::new(config)?)),
        Protocol::AzureOpenAI => {
            let deployment = config
                .params
                .embedding_deployment_id
                .as_deref()
                .or(config.params.deployment_id.as_deref())
                .ok_or_else(|| ConfigError::MissingField {
                    field: "embedding_deployment_id".to_string(),
                })?;
            Ok(Arc::new(OpenAiClient::azure(config, deployment)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelParams;

    fn config(protocol: Protocol) -> ResolvedLlmConfig {
        ResolvedLlmConfig::new(
            protocol,
            "https://example.openai.azure.com/".to_string(),
            "sk-test".to_string(),
            "gpt-3.5-turbo".to_string(),
        )
    }

    #[test]
    fn test_create_openai_client() {
        let client = create_client(&config(Protocol::OpenAICompat)).unwrap();
        assert_eq!(client.model_name(), "gpt-3.5-turbo");
        assert_eq!(client.provider_name(), "openai");
    }

    #[test]
    fn test_azure_client_needs_deployment() {
        assert!(create_client(&config(Protocol::AzureOpenAI)).is_err());

        let cfg = config(Protocol::AzureOpenAI).with_params(ModelParams {
            deployment_id: Some("gpt35".to_string()),
            ..Default::default()
        });
        let client = create_client(&cfg).unwrap();
        assert_eq!(client.provider_name(), "azure_openai");
        assert!(create_embedder(&cfg).is_ok());
    }

    #[test]
    fn test_extra_headers() {
        let headers = HashMap::from([
            ("X-Proxy-Token".to_string(), "abc".to_string()),
            ("OpenAI-Organization".to_string(), "org-1".to_string()),
        ]);
        let map = default_headers(&headers).unwrap();
        assert_eq!(map.get("x-proxy-token").unwrap(), "abc");
        assert_eq!(map.get("openai-organization").unwrap(), "org-1");

        let cfg = config(Protocol::OpenAICompat).with_headers(headers);
        assert!(OpenAiClient::new(&cfg).is_ok());
    }

    #[test]
    fn test_invalid_header_rejected() {
        let bad_name = HashMap::from([("bad header".to_string(), "x".to_string())]);
        assert!(default_headers(&bad_name).is_err());

        let bad_value = HashMap::from([("x-token".to_string(), "line\nbreak".to_string())]);
        let cfg = config(Protocol::OpenAICompat).with_headers(bad_value);
        assert!(OpenAiClient::new(&cfg).is_err());
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let mut cfg = config(Protocol::OpenAICompat);
        cfg.api_key.clear();
        assert!(OpenAiClient::new(&cfg).is_err());
    }

    #[test]
    fn test_convert_messages_preserves_order() {
        let client = OpenAiClient::new(&config(Protocol::OpenAICompat)).unwrap();
        let converted = client.convert_messages(vec![
            LlmMessage::system("s"),
            LlmMessage::user("u"),
            LlmMessage::assistant("a"),
        ]);
        assert!(matches!(converted[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(converted[1], ChatCompletionRequestMessage::User(_)));
        assert!(matches!(converted[2], ChatCompletionRequestMessage::Assistant(_)));
    }
}
