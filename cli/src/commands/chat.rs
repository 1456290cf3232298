//! Interactive chat command

use anyhow::{Context, Result};
use colored::Colorize;
use reagent_core::agent::ChatMessage;
use reagent_core::llm::MessageRole;
use reagent_core::output::RunEnding;
use reagent_core::{AgentExecution, StopSignal};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;

use super::{install_interrupt_handler, Session, SessionOptions};
use crate::config::CliConfigLoader;

/// Read questions from stdin until EOF or `exit`, keeping the conversation
pub async fn chat_command(config_loader: CliConfigLoader, options: SessionOptions) -> Result<()> {
    let session = Session::open(config_loader, options).await?;

    let stop = StopSignal::new();
    let running = Arc::new(AtomicBool::new(false));
    install_interrupt_handler(stop.clone(), running.clone())?;

    println!(
        "{}",
        "Ask a question. Ctrl-C stops the current answer, `exit` quits.".bright_black()
    );

    let mut history: Vec<ChatMessage> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{} ", ">".green().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "exit" || input == "quit" {
            break;
        }

        let context = session.context();
        running.store(true, Ordering::SeqCst);
        let outcome = session
            .agent
            .run(&context, &session.tools, input, &history, &stop)
            .await;
        running.store(false, Ordering::SeqCst);

        match outcome {
            Ok(execution) => {
                println!("{}", execution.answer.bold());
                remember_turn(&mut history, input, execution);
            }
            Err(e) => error!("{}", e),
        }
    }

    session.save_trajectory().await
}

/// Keep a turn in the history only when the model actually answered it
fn remember_turn(history: &mut Vec<ChatMessage>, input: &str, execution: AgentExecution) {
    if execution.ending != RunEnding::Answered {
        return;
    }
    history.push(ChatMessage::new(MessageRole::User, input));
    history.push(ChatMessage::new(MessageRole::Assistant, execution.answer));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn execution(answer: &str, ending: RunEnding) -> AgentExecution {
        AgentExecution {
            task_id: "t".to_string(),
            answer: answer.to_string(),
            ending,
            planning_calls: 1,
            results: Vec::new(),
            duration_ms: 0,
        }
    }

    #[test]
    fn test_only_answered_turns_are_remembered() {
        let mut history = Vec::new();
        remember_turn(&mut history, "hi", execution("hello", RunEnding::Answered));
        remember_turn(&mut history, "slow", execution("Conversation stopped", RunEnding::Stopped));
        remember_turn(&mut history, "slower", execution("Conversation stopped", RunEnding::Aborted));
        remember_turn(&mut history, "loop", execution("No Result", RunEnding::IterationLimit));

        assert_eq!(
            history,
            vec![
                ChatMessage::new(MessageRole::User, "hi"),
                ChatMessage::new(MessageRole::Assistant, "hello"),
            ]
        );
    }
}
