//! Single planning step command

use anyhow::Result;

use super::{Session, SessionOptions};
use crate::config::CliConfigLoader;

/// Ask the model for the next step and print the decoded decision as JSON
///
/// No tool is run.
pub async fn plan_command(
    question: String,
    config_loader: CliConfigLoader,
    options: SessionOptions,
) -> Result<()> {
    let session = Session::open(config_loader, options).await?;
    let context = session.context();

    let decision = session
        .agent
        .plan(&context, &session.tools, &question, &[], &[])
        .await?;

    println!("{}", serde_json::to_string_pretty(&decision)?);
    session.save_trajectory().await
}
