//! Conversation history trimming

use super::types::ChatMessage;
use crate::encoding::TokenEncoding;

fn is_chat_model(model: &str) -> bool {
    model.contains("gpt-3.5-turbo") || model.contains("gpt-4")
}

/// Serialize messages in the chat markup used to budget prompts
///
/// Chat models separate roles and messages with newlines, older completion
/// models use `<|im_sep|>` and no separator.
pub fn serialize_messages(model: &str, messages: &[ChatMessage]) -> String {
    let (msg_sep, role_sep) = if is_chat_model(model) {
        ("\n", "\n")
    } else {
        ("", "<|im_sep|>")
    };

    let body = messages
        .iter()
        .map(|message| {
            format!(
                "<|im_start|>{}{}{}<|im_end|>",
                message.role.as_str(),
                role_sep,
                message.content
            )
        })
        .collect::<Vec<_>>()
        .join(msg_sep);
    format!("{}{}<|im_start|>assistant{}", body, msg_sep, role_sep)
}

/// Keep the newest messages whose serialization fits in `max_tokens`
///
/// Messages are considered newest first and the first one that does not fit
/// ends the selection. The kept messages are returned in chronological order.
pub fn create_agent_history(
    encoding: &dyn TokenEncoding,
    model: &str,
    max_tokens: usize,
    messages: &[ChatMessage],
) -> Vec<ChatMessage> {
    let mut kept: Vec<ChatMessage> = Vec::new();
    for message in messages.iter().rev() {
        kept.push(message.clone());
        let length = encoding.count(&serialize_messages(model, &kept));
        if length > max_tokens {
            kept.pop();
            break;
        }
    }
    kept.reverse();
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::LexicalEncoding;
    use crate::llm::MessageRole;

    #[test]
    fn test_serialize_chat_model() {
        let messages = vec![
            ChatMessage::new(MessageRole::User, "hi"),
            ChatMessage::new(MessageRole::Assistant, "hello"),
        ];
        assert_eq!(
            serialize_messages("gpt-3.5-turbo", &messages),
            "<|im_start|>user\nhi<|im_end|>\n<|im_start|>assistant\nhello<|im_end|>\n<|im_start|>assistant\n"
        );
    }

    #[test]
    fn test_serialize_completion_model() {
        let messages = vec![ChatMessage::new(MessageRole::User, "hi")];
        assert_eq!(
            serialize_messages("text-davinci-003", &messages),
            "<|im_start|>user<|im_sep|>hi<|im_end|><|im_start|>assistant<|im_sep|>"
        );
    }

    #[test]
    fn test_history_keeps_newest_within_budget() {
        let encoding = LexicalEncoding::new();
        let messages = vec![
            ChatMessage::new(MessageRole::User, "first question with many many words in it"),
            ChatMessage::new(MessageRole::Assistant, "first reply"),
            ChatMessage::new(MessageRole::User, "second"),
        ];

        let all = create_agent_history(&encoding, "gpt-4", 10_000, &messages);
        assert_eq!(all, messages);

        let budget = encoding.count(&serialize_messages("gpt-4", &messages[1..]));
        let trimmed = create_agent_history(&encoding, "gpt-4", budget, &messages);
        assert_eq!(trimmed, messages[1..].to_vec());

        assert!(create_agent_history(&encoding, "gpt-4", 1, &messages).is_empty());
    }
}
