//! Offline response decoding command

use anyhow::{Context, Result};
use clap::ValueEnum;
use reagent_core::agent::PluginInfo;
use reagent_core::ResponseParser;
use tokio::io::AsyncReadExt;

/// Response grammar accepted by `reagent parse`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Dialect {
    /// `Thought:` / `Action:` / `Action Input:` lines
    Line,
    /// Fenced JSON document with `action` and `action_input`
    Json,
}

impl From<Dialect> for ResponseParser {
    fn from(dialect: Dialect) -> Self {
        match dialect {
            Dialect::Line => ResponseParser::LineBased,
            Dialect::Json => ResponseParser::FencedJson,
        }
    }
}

/// Decode a model response read from stdin and print the decision as JSON
///
/// `tools` are the names offered to the model; an action naming anything
/// else is an error.
pub async fn parse_command(dialect: Dialect, tools: Vec<String>) -> Result<()> {
    let mut text = String::new();
    tokio::io::stdin()
        .read_to_string(&mut text)
        .await
        .context("Failed to read response from stdin")?;

    let infos: Vec<PluginInfo> = tools
        .iter()
        .map(|name| PluginInfo::new(name, name, ""))
        .collect();

    let decision = ResponseParser::from(dialect).parse(&infos, &text)?;
    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}
