//! Data exchanged between the planner, the parser and the tools

use serde::{Deserialize, Serialize};

use crate::llm::MessageRole;

/// Kind of API a remote plugin exposes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiRef {
    /// API type, `openapi` for remote plugins
    #[serde(rename = "type")]
    pub kind: String,

    /// Location of the API spec
    pub url: String,
}

/// The public description of a tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginInfo {
    /// Machine key the model uses to pick the tool
    pub name_for_model: String,

    /// Name shown to the end user
    pub name_for_human: String,

    /// Description shown to the end user
    pub description_for_human: String,

    /// Description injected verbatim into the prompt
    pub description_for_model: String,

    /// Whether invocations are surfaced to the end user
    #[serde(default)]
    pub display_for_user: bool,

    /// Optional logo
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,

    /// Present on tools that talk to a described API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiRef>,
}

impl PluginInfo {
    /// Describe a tool with the same text for humans and the model
    pub fn new(name: &str, name_for_human: &str, description: &str) -> Self {
        Self {
            name_for_model: name.to_string(),
            name_for_human: name_for_human.to_string(),
            description_for_human: description.to_string(),
            description_for_model: description.to_string(),
            display_for_user: false,
            logo_url: None,
            api: None,
        }
    }

    /// Surface invocations of this tool to the end user
    pub fn displayed(mut self) -> Self {
        self.display_for_user = true;
        self
    }

    /// Mark this tool as backed by an API
    pub fn with_api(mut self, api: ApiRef) -> Self {
        self.api = Some(api);
        self
    }

    /// The public fields without the API reference
    pub fn public(&self) -> Self {
        Self {
            api: None,
            ..self.clone()
        }
    }
}

/// Decision to invoke a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// Model reasoning, empty in the fenced JSON dialect
    pub thought: String,

    /// Tool to invoke
    pub plugin: PluginInfo,

    /// Raw, tool specific payload
    pub plugin_input: String,
}

/// An action paired with the tool's output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginResult {
    /// The executed action
    pub action: Action,

    /// Raw tool output, the observation
    pub result: String,
}

/// Outcome of one planning call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReactAgentResult {
    /// Invoke a tool
    Action(Action),

    /// Final answer for the user
    Answer { answer: String },
}

impl ReactAgentResult {
    /// Build an answer result
    pub fn answer<S: Into<String>>(answer: S) -> Self {
        Self::Answer {
            answer: answer.into(),
        }
    }

    /// Whether this is a final answer
    pub fn is_answer(&self) -> bool {
        matches!(self, Self::Answer { .. })
    }
}

/// A turn of the surrounding conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    /// Create a message
    pub fn new<S: Into<String>>(role: MessageRole, content: S) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_serializes_tagged() {
        let action = ReactAgentResult::Action(Action {
            thought: "t".to_string(),
            plugin: PluginInfo::new("tool1", "Tool 1", "first tool"),
            plugin_input: "input".to_string(),
        });
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["type"], "action");
        assert_eq!(value["plugin"]["nameForModel"], "tool1");
        assert_eq!(value["pluginInput"], "input");

        let answer = serde_json::to_value(ReactAgentResult::answer("done")).unwrap();
        assert_eq!(answer, serde_json::json!({"type": "answer", "answer": "done"}));
    }

    #[test]
    fn test_public_drops_api() {
        let info = PluginInfo::new("todo", "Todo", "todo list").with_api(ApiRef {
            kind: "openapi".to_string(),
            url: "https://example.com/openapi.yaml".to_string(),
        });
        assert!(info.public().api.is_none());
        assert_eq!(info.public().name_for_model, "todo");
    }
}
