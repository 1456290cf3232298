//! Single question command

use anyhow::Result;
use colored::Colorize;
use reagent_core::StopSignal;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

use super::{install_interrupt_handler, Session, SessionOptions};
use crate::config::CliConfigLoader;

/// Answer one question and exit
pub async fn run_command(
    question: String,
    config_loader: CliConfigLoader,
    options: SessionOptions,
) -> Result<()> {
    info!("Question: {}", question);

    let session = Session::open(config_loader, options).await?;
    let stop = StopSignal::new();
    install_interrupt_handler(stop.clone(), Arc::new(AtomicBool::new(true)))?;

    let context = session.context();
    let execution = session
        .agent
        .run(&context, &session.tools, &question, &[], &stop)
        .await?;

    println!("{}", execution.answer.bold());
    session.save_trajectory().await?;

    if !execution.success() {
        info!(
            "Run ended without an answer from the model ({:?})",
            execution.ending
        );
    }
    Ok(())
}
