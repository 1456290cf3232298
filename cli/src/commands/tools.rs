//! Tools listing command

use anyhow::Result;
use colored::Colorize;
use reagent_core::ToolRegistry;
use tracing::info;

use crate::config::CliConfigLoader;

/// Show every tool the configured plugins provide
///
/// Only plugin settings are read, so no model credentials are needed.
pub async fn tools_command(config_loader: CliConfigLoader) -> Result<()> {
    info!("Listing available tools");

    let plugins = config_loader.load_plugins().await?;
    let registry = ToolRegistry::new(plugins);

    println!("🛠️  Available Tools\n");

    for tool in registry.list_all_tools().await {
        let info = tool.info();
        println!("📦 {} ({})", info.name_for_human.bold(), info.name_for_model);
        // First line only
        let first_line = info
            .description_for_human
            .lines()
            .next()
            .unwrap_or_default();
        println!("   {}\n", first_line);
    }

    let known = registry.internal_plugin_names().join(", ");
    println!(
        "{}",
        format!("Internal plugins (PLUGINS_INTERNAL): {}", known).bright_black()
    );

    Ok(())
}
