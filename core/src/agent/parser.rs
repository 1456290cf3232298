//! Model response parsing
//!
//! Planning responses are free-form text. Two grammars are understood, one
//! per prompt format:
//!
//! - [`ResponseParser::LineBased`]: `Thought:` / `Action:` / `Action Input:`
//!   lines, or a `Final Answer:` optionally followed by a `Positivity:` score.
//! - [`ResponseParser::FencedJson`]: a JSON object with `action` and
//!   `action_input`, usually inside a fenced code block.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

use super::types::{Action, PluginInfo, ReactAgentResult};
use crate::error::{ParseError, Result, ToolError};

const FINAL_ANSWER_MARKER: &str = "Final Answer:";
const POSITIVITY_MARKER: &str = "Positivity:";
const FINAL_ANSWER_ACTION: &str = "Final Answer";

/// Minimum self-reported positivity that accepts an answer outright
pub const POSITIVITY_THRESHOLD: f64 = 9.0;

static POSITIVITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\nPositivity:(.*)").unwrap());
static THOUGHT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Thought:(.*)(\n|$)").unwrap());
static ACTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Action:(.*)(\n|$)").unwrap());
static ACTION_INPUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Action Input: (.*)(\n|$)").unwrap());
static LEADING_FLOAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?").unwrap());
static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(\w+)?\s*([\s\S]+?)\s*```").unwrap());

/// Grammar used to decode planning responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseParser {
    /// `Thought` / `Action` / `Final Answer` lines
    LineBased,
    /// JSON object with `action` and `action_input`
    FencedJson,
}

impl ResponseParser {
    /// Decode a raw model response against the tools offered to the model
    pub fn parse(&self, tools: &[PluginInfo], text: &str) -> Result<ReactAgentResult> {
        match self {
            ResponseParser::LineBased => parse_line_based(tools, text),
            ResponseParser::FencedJson => parse_fenced_json(tools, text),
        }
    }
}

fn find_tool<'a>(tools: &'a [PluginInfo], name: &str) -> Option<&'a PluginInfo> {
    tools.iter().find(|tool| tool.name_for_model == name)
}

fn capture<'t>(pattern: &Regex, text: &'t str) -> Option<&'t str> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Leading floating point prefix of a string, `"9.5 (high)"` gives 9.5
fn leading_float(text: &str) -> Option<f64> {
    LEADING_FLOAT
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

fn extract_answer(text: &str) -> String {
    let Some(start) = text.rfind(FINAL_ANSWER_MARKER) else {
        return String::new();
    };
    let answer = text[start + FINAL_ANSWER_MARKER.len()..].trim();
    match answer.find(POSITIVITY_MARKER) {
        Some(end) => answer[..end].trim().to_string(),
        None => answer.to_string(),
    }
}

fn parse_line_based(tools: &[PluginInfo], text: &str) -> Result<ReactAgentResult> {
    let answer = extract_answer(text);

    let positivity = capture(&POSITIVITY, text).and_then(|score| leading_float(score.trim()));
    if positivity.is_some_and(|score| score >= POSITIVITY_THRESHOLD) && !answer.is_empty() {
        return Ok(ReactAgentResult::answer(answer));
    }

    let thought = capture(&THOUGHT, text).map(str::trim).unwrap_or_default();
    let action = if thought.is_empty() {
        ""
    } else {
        capture(&ACTION, text)
            .map(|action| strip_quotes(action.trim()))
            .unwrap_or_default()
    };

    if thought.is_empty() || action.is_empty() || action.contains("None") {
        return Ok(ReactAgentResult::answer(answer));
    }

    let Some(tool) = find_tool(tools, action) else {
        if !answer.is_empty() {
            tracing::debug!("model named unknown tool {}, using its final answer", action);
            return Ok(ReactAgentResult::answer(answer));
        }
        return Err(ToolError::NotFound {
            name: action.to_string(),
        }
        .into());
    };

    let input = capture(&ACTION_INPUT, text).unwrap_or_default();
    Ok(ReactAgentResult::Action(Action {
        thought: thought.to_string(),
        plugin: tool.public(),
        plugin_input: strip_quotes(input.trim()).to_string(),
    }))
}

/// JSON document carried by a fenced JSON response
fn json_document(text: &str) -> Option<&str> {
    if let Some(content) = FENCE.captures(text).and_then(|caps| caps.get(2)) {
        return Some(content.as_str());
    }
    text.starts_with('{').then_some(text)
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

fn parse_fenced_json(tools: &[PluginInfo], text: &str) -> Result<ReactAgentResult> {
    let trimmed = text.trim();
    let document = json_document(trimmed).ok_or(ParseError::MissingDocument)?;

    let value: Value = serde_json::from_str(document).map_err(|e| {
        tracing::debug!("Error parsing JSON: {}", e);
        ParseError::InvalidJson {
            message: e.to_string(),
        }
    })?;
    let Value::Object(mut object) = value else {
        return Err(ParseError::InvalidJson {
            message: "expected a JSON object".to_string(),
        }
        .into());
    };

    let action = match object.remove("action") {
        Some(Value::String(action)) => action,
        _ => {
            return Err(ParseError::InvalidJson {
                message: "missing string field `action`".to_string(),
            }
            .into())
        }
    };
    let input = object
        .remove("action_input")
        .map(value_to_text)
        .unwrap_or_default();

    if action == FINAL_ANSWER_ACTION {
        return Ok(ReactAgentResult::answer(input));
    }

    let tool = find_tool(tools, &action).ok_or(ToolError::NotFound { name: action })?;
    Ok(ReactAgentResult::Action(Action {
        thought: String::new(),
        plugin: tool.clone(),
        plugin_input: input,
    }))
}

fn strip(text: &str, quote: char) -> &str {
    text.strip_prefix(quote)
        .and_then(|rest| rest.strip_suffix(quote))
        .filter(|inner| !inner.contains('\n'))
        .unwrap_or(text)
}

/// Remove one layer of surrounding double quotes, then of single quotes
///
/// `"'x'"` becomes `x`, `'a' 'b'` becomes `a' 'b`.
pub fn strip_quotes(text: &str) -> &str {
    strip(strip(text, '"'), '\'')
}
