//! Prompt assembly for planning calls
//!
//! Templates are rendered with handlebars in strict mode and without HTML
//! escaping, so tool descriptions and observations reach the model verbatim.

use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::types::{ChatMessage, PluginInfo, PluginResult};
use crate::error::Result;
use crate::llm::LlmMessage;

const AGENT_SYSTEM_PREFIX: &str = "Answer the following questions as best you can.
Use the language {{locale}} for your thought and final answer.
You have access to the following tools:

{{tool_descriptions}}";

const AGENT_FORMAT: &str = "ALWAYS use the following format in your response::

Question: the input question you must answer
Thought: you should always think about what to do
Action: the action to take, should be one of [{{tool_names}}].
Action Input: the input to the action
Observation: the result of the action. you have no need to output this item.
... (this Thought/Action/Action Input/Observation can repeat N times.)
Thought: I now know the final answer
Final Answer: the final answer to the original input question
Positivity: the positivity of the final answer. the range is 0 - 10
";

const AGENT_SYSTEM_SUFFIX: &str =
    "Begin! Reminder to always use the exact characters `Final Answer` when responding.";

const AGENT_USER: &str = "
Question: {{input}}
{{agent_scratchpad}}";

const CONVERSATIONAL_SYSTEM: &str = "Assistant is a large language model trained by OpenAI.

Assistant is designed to be able to assist with a wide range of tasks, from answering simple questions to providing in-depth explanations and discussions on a wide range of topics. Assistant is able to generate human-like text based on the input it receives, allowing it to engage in natural-sounding conversations and provide responses that are coherent and relevant to the topic at hand.

Assistant uses the language {{locale}} for its responses.";

const CONVERSATIONAL_FORMAT: &str = "RESPONSE FORMAT INSTRUCTIONS
----------------------------

When responding to me, please output a response in one of two formats:

**Option 1:**
Use this if you want the human to use a tool.
Markdown code snippet formatted in the following schema:

```json
{
    \"action\": string, \\\\ The action to take. Must be one of {{tool_names}}
    \"action_input\": string \\\\ The input to the action
}
```

**Option #2:**
Use this if you want to respond directly to the human. Markdown code snippet formatted in the following schema:

```json
{
    \"action\": \"Final Answer\",
    \"action_input\": string \\\\ You should put what you want to return to use here
}
```";

const CONVERSATIONAL_TOOLS: &str = "TOOLS
------
Assistant can ask the user to use tools to look up information that may be helpful in answering the users original question. The tools the human can use are:

{{tools}}

{{format_instructions}}

USER'S INPUT
--------------------
Here is the user's input (remember to respond with a markdown code snippet of a json blob with a single action, and NOTHING else):

{{input}}";

const CONVERSATIONAL_TOOL_RESPONSE: &str = "TOOL RESPONSE:
---------------------
{{observation}}

USER'S INPUT
--------------------

Okay, so what is the response to my last comment? If using information obtained from the tools you must mention it explicitly without mentioning the tool names - I have forgotten all TOOL RESPONSES! Remember to respond with a markdown code snippet of a json blob with a single action, and NOTHING else.";

const SCRATCHPAD_HEADER: &str =
    "This was your previous work (but I haven't seen any of it! I only see what you return as final answer):\n";

/// Observations longer than this many lines are set off with `"""`
const MAX_BARE_OBSERVATION_LINES: usize = 5;

/// How the scratchpad ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScratchpadStyle {
    /// Four-line blocks only
    #[default]
    Plain,
    /// Blocks followed by a `Thought:` line the model continues from
    ContinueWithThought,
}

/// System and user message of a line-based planning call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub system: String,
    pub user: String,
}

impl RenderedPrompt {
    /// The prompt as chat messages
    pub fn into_messages(self) -> Vec<LlmMessage> {
        vec![LlmMessage::system(self.system), LlmMessage::user(self.user)]
    }
}

/// `name: description` lines for the tool catalog
pub fn tool_descriptions(tools: &[PluginInfo]) -> String {
    tools
        .iter()
        .map(|tool| format!("{}: {}", tool.name_for_model, tool.description_for_model))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Comma separated tool names
pub fn tool_names(tools: &[PluginInfo]) -> String {
    tools
        .iter()
        .map(|tool| tool.name_for_model.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render prior tool invocations in chronological order
pub fn render_scratchpad(results: &[PluginResult], style: ScratchpadStyle) -> String {
    let mut scratchpad = String::new();
    if !results.is_empty() {
        scratchpad.push_str(SCRATCHPAD_HEADER);
        for result in results {
            let observation = if result.result.split('\n').count() > MAX_BARE_OBSERVATION_LINES {
                format!("\"\"\"\n{}\n\"\"\"", result.result)
            } else {
                result.result.clone()
            };
            scratchpad.push_str(&format!(
                "Thought: {}\nAction: {}\nAction Input: {}\nObservation: {}\n",
                result.action.thought,
                result.action.plugin.name_for_model,
                result.action.plugin_input,
                observation
            ));
        }
    }
    if style == ScratchpadStyle::ContinueWithThought {
        scratchpad.push_str("Thought:");
    }
    scratchpad
}

/// Renders planning prompts for both response grammars
pub struct PromptAssembler {
    registry: Handlebars<'static>,
}

impl PromptAssembler {
    /// Compile the built-in templates
    pub fn new() -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        registry.set_strict_mode(true);

        registry.register_template_string(
            "agent_system",
            format!("{AGENT_SYSTEM_PREFIX}\n\n{AGENT_FORMAT}\n\n{AGENT_SYSTEM_SUFFIX}"),
        )?;
        registry.register_template_string("agent_user", AGENT_USER)?;
        registry.register_template_string("conversational_system", CONVERSATIONAL_SYSTEM)?;
        registry.register_template_string("conversational_format", CONVERSATIONAL_FORMAT)?;
        registry.register_template_string("conversational_tools", CONVERSATIONAL_TOOLS)?;
        registry
            .register_template_string("conversational_tool_response", CONVERSATIONAL_TOOL_RESPONSE)?;

        Ok(Self { registry })
    }

    /// System and user message for the line-based grammar
    pub fn render_agent(
        &self,
        locale: &str,
        tools: &[PluginInfo],
        input: &str,
        results: &[PluginResult],
        style: ScratchpadStyle,
    ) -> Result<RenderedPrompt> {
        let system = self.registry.render(
            "agent_system",
            &json!({
                "locale": locale,
                "tool_descriptions": tool_descriptions(tools),
                "tool_names": tool_names(tools),
            }),
        )?;
        let user = self.registry.render(
            "agent_user",
            &json!({
                "input": input,
                "agent_scratchpad": render_scratchpad(results, style),
            }),
        )?;
        Ok(RenderedPrompt { system, user })
    }

    /// Messages for the fenced JSON grammar
    ///
    /// Order: system prompt, trimmed history, the user's input with the tool
    /// catalog, then one assistant message per tool response.
    pub fn render_conversational(
        &self,
        locale: &str,
        tools: &[PluginInfo],
        input: &str,
        results: &[PluginResult],
        history: &[ChatMessage],
    ) -> Result<Vec<LlmMessage>> {
        let system = self
            .registry
            .render("conversational_system", &json!({ "locale": locale }))?;
        let format_instructions = self.registry.render(
            "conversational_format",
            &json!({ "tool_names": tool_names(tools) }),
        )?;
        let user = self.registry.render(
            "conversational_tools",
            &json!({
                "tools": tool_descriptions(tools),
                "format_instructions": format_instructions,
                "input": input,
            }),
        )?;

        let mut messages = vec![LlmMessage::system(system)];
        messages.extend(history.iter().map(|message| LlmMessage {
            role: message.role,
            content: message.content.clone(),
        }));
        messages.push(LlmMessage::user(user));
        for result in results {
            let response = self.registry.render(
                "conversational_tool_response",
                &json!({ "observation": result.result }),
            )?;
            messages.push(LlmMessage::assistant(response));
        }
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::types::Action;
    use crate::llm::MessageRole;

    fn tools() -> Vec<PluginInfo> {
        vec![
            PluginInfo::new("search", "Search", "search the web"),
            PluginInfo::new("calc", "Calculator", "evaluate <math> & more"),
        ]
    }

    fn result(observation: &str) -> PluginResult {
        PluginResult {
            action: Action {
                thought: "look it up".to_string(),
                plugin: PluginInfo::new("search", "Search", "search the web"),
                plugin_input: "rust".to_string(),
            },
            result: observation.to_string(),
        }
    }

    #[test]
    fn test_empty_scratchpad() {
        assert_eq!(render_scratchpad(&[], ScratchpadStyle::Plain), "");
        assert_eq!(render_scratchpad(&[], ScratchpadStyle::ContinueWithThought), "Thought:");
    }

    #[test]
    fn test_scratchpad_blocks() {
        let pad = render_scratchpad(&[result("found it")], ScratchpadStyle::Plain);
        assert_eq!(
            pad,
            format!(
                "{}Thought: look it up\nAction: search\nAction Input: rust\nObservation: found it\n",
                SCRATCHPAD_HEADER
            )
        );
    }

    #[test]
    fn test_long_observation_is_quoted() {
        let five = "1\n2\n3\n4\n5";
        let six = "1\n2\n3\n4\n5\n6";
        let pad = render_scratchpad(&[result(five), result(six)], ScratchpadStyle::Plain);
        assert!(pad.contains("Observation: 1\n2\n3\n4\n5\n"));
        assert!(pad.contains("Observation: \"\"\"\n1\n2\n3\n4\n5\n6\n\"\"\"\n"));
    }

    #[test]
    fn test_continue_style_ends_with_thought() {
        let pad = render_scratchpad(&[result("ok")], ScratchpadStyle::ContinueWithThought);
        assert!(pad.ends_with("Observation: ok\nThought:"));
    }

    #[test]
    fn test_render_agent_prompt() {
        let assembler = PromptAssembler::new().unwrap();
        let prompt = assembler
            .render_agent("ja", &tools(), "What is Rust?", &[], ScratchpadStyle::Plain)
            .unwrap();

        assert!(prompt.system.starts_with("Answer the following questions"));
        assert!(prompt.system.contains("Use the language ja"));
        assert!(prompt.system.contains("search: search the web\ncalc: evaluate <math> & more"));
        assert!(prompt.system.contains("should be one of [search, calc]."));
        assert!(prompt.system.ends_with("`Final Answer` when responding."));
        assert_eq!(prompt.user, "\nQuestion: What is Rust?\n");

        let messages = prompt.into_messages();
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[1].role, MessageRole::User);
    }

    #[test]
    fn test_render_conversational_order() {
        let assembler = PromptAssembler::new().unwrap();
        let history = vec![
            ChatMessage::new(MessageRole::User, "hi"),
            ChatMessage::new(MessageRole::Assistant, "hello"),
        ];
        let messages = assembler
            .render_conversational("en", &tools(), "weather?", &[result("sunny")], &history)
            .unwrap();

        assert_eq!(messages.len(), 5);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[1].content, "hi");
        assert_eq!(messages[2].content, "hello");
        assert_eq!(messages[3].role, MessageRole::User);
        assert!(messages[3].content.contains("Must be one of search, calc"));
        assert!(messages[3].content.ends_with("weather?"));
        assert_eq!(messages[4].role, MessageRole::Assistant);
        assert!(messages[4].content.starts_with("TOOL RESPONSE:\n---------------------\nsunny\n"));
    }
}
