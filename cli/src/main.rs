//! # reagent CLI
//!
//! Command-line interface for reagent, a ReAct agent that answers questions
//! by planning with a chat model and calling tools.
//!
//! ## Usage
//!
//! - `reagent` - Start a chat session
//! - `reagent "question"` - Answer a single question
//! - `reagent plan "question"` - Print the model's next step as JSON
//! - `reagent parse --dialect line` - Decode a model response from stdin
//! - `reagent tools` - Show available tools

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use reagent_core::AgentMode;
use std::path::PathBuf;

mod commands;
mod config;
mod output;

use commands::parse::Dialect;
use commands::{chat_command, parse_command, plan_command, run_command, tools_command};
use commands::SessionOptions;
use config::CliConfigLoader;

/// reagent - a ReAct agent for chat completion models
#[derive(Parser)]
#[command(name = "reagent")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Answer questions with a tool-using ReAct agent")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file or directory path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Protocol to use (openai, azure_openai)
    #[arg(long, global = true)]
    protocol: Option<String>,

    /// API key override
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Base URL override
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Model name override
    #[arg(long, global = true)]
    model: Option<String>,

    /// Enable verbose logging, including planning requests
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Prompt format: agent or conversational
    #[arg(long, global = true)]
    mode: Option<String>,

    /// Comma separated plugin names offered to the model
    #[arg(long, global = true, value_delimiter = ',')]
    tools: Vec<String>,

    /// Answer language, sent to tools as accept-language
    #[arg(long, global = true)]
    locale: Option<String>,

    /// Output trajectory file
    #[arg(long, global = true)]
    trajectory_file: Option<PathBuf>,

    /// Tool actions allowed before giving up
    #[arg(long, global = true)]
    max_iterations: Option<usize>,

    /// The question to answer (if provided, runs in single-question mode)
    question: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a chat session
    Chat,

    /// Run one planning step and print the decision
    Plan {
        /// The question to plan for
        question: String,
    },

    /// Decode a model response read from stdin
    Parse {
        /// Response grammar
        #[arg(long, value_enum, default_value = "line")]
        dialect: Dialect,

        /// Tool name the response may refer to, repeatable
        #[arg(long = "tool")]
        tool: Vec<String>,
    },

    /// Show available tools
    Tools,
}

/// Build a configuration loader from CLI arguments
fn build_config_loader(cli: &Cli) -> CliConfigLoader {
    let mut loader = CliConfigLoader::new();

    if let Some(config_path) = &cli.config {
        loader = loader.with_config_override(config_path.clone());
    }

    if let Some(protocol) = &cli.protocol {
        loader = loader.with_protocol_override(protocol.clone());
    }

    if let Some(api_key) = &cli.api_key {
        loader = loader.with_api_key_override(api_key.clone());
    }

    if let Some(base_url) = &cli.base_url {
        loader = loader.with_base_url_override(base_url.clone());
    }

    if let Some(model) = &cli.model {
        loader = loader.with_model_override(model.clone());
    }

    loader
}

fn session_options(cli: &Cli) -> Result<SessionOptions> {
    let mode = match &cli.mode {
        Some(name) => {
            Some(AgentMode::parse(name).ok_or_else(|| anyhow!("Unknown mode: {}", name))?)
        }
        None => None,
    };

    Ok(SessionOptions {
        mode,
        tools: cli.tools.clone(),
        locale: cli.locale.clone(),
        trajectory_file: cli.trajectory_file.clone(),
        max_iterations: cli.max_iterations,
        verbose: cli.verbose,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    reagent_core::init_tracing_with_debug(cli.verbose);

    let config_loader = build_config_loader(&cli);
    let options = session_options(&cli)?;

    match (cli.question, cli.command) {
        (Some(question), None) => run_command(question, config_loader, options).await,
        (Some(_), Some(_)) => {
            tracing::error!("Error: Cannot specify both a question and a subcommand");
            std::process::exit(1);
        }
        (None, Some(Commands::Plan { question })) => {
            plan_command(question, config_loader, options).await
        }
        (None, Some(Commands::Parse { dialect, tool })) => parse_command(dialect, tool).await,
        (None, Some(Commands::Tools)) => tools_command(config_loader).await,
        (None, Some(Commands::Chat)) | (None, None) => chat_command(config_loader, options).await,
    }
}
