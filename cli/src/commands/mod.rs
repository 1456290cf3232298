//! CLI command implementations

pub mod chat;
pub mod parse;
pub mod plan;
pub mod run;
pub mod tools;

pub use chat::chat_command;
pub use parse::parse_command;
pub use plan::plan_command;
pub use run::run_command;
pub use tools::tools_command;

use anyhow::{Context, Result};
use reagent_core::llm::{create_client, create_embedder};
use reagent_core::{
    AgentCore, AgentMode, EncodingProvider, StopSignal, TiktokenEncodingProvider,
    TaskExecutionContext, ToolRegistry, TrajectoryRecorder,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::CliConfigLoader;
use crate::output::{CliOutputConfig, CliOutputHandler};

/// Flags shared by every command that talks to the model
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub mode: Option<AgentMode>,
    pub tools: Vec<String>,
    pub locale: Option<String>,
    pub trajectory_file: Option<PathBuf>,
    pub max_iterations: Option<usize>,
    pub verbose: bool,
}

/// A configured agent plus what it takes to start runs with it
pub struct Session {
    pub agent: AgentCore,
    pub tools: Vec<String>,
    encodings: Arc<dyn EncodingProvider>,
    model: String,
    locale: Option<String>,
    verbose_llm: bool,
    recorder: Option<Arc<TrajectoryRecorder>>,
}

impl Session {
    /// Resolve configuration and build the agent
    pub async fn open(loader: CliConfigLoader, options: SessionOptions) -> Result<Self> {
        let config = loader.load().await?;
        info!("🤖 Using protocol: {}", config.llm.protocol.as_str());
        info!("🤖 Using model: {}", config.llm.model);

        let mut agent_config = config.agent.clone();
        if let Some(mode) = options.mode {
            agent_config.mode = mode;
        }
        if let Some(max) = options.max_iterations {
            agent_config.max_planning_iterations = max;
        }
        debug!("Agent mode: {}", agent_config.mode.as_str());

        let llm = create_client(&config.llm).context("Failed to create model client")?;

        let mut builder = ToolRegistry::builder(config.plugins.clone());
        match create_embedder(&config.llm) {
            Ok(embedder) => builder = builder.with_embedder(embedder),
            Err(e) => warn!("Embeddings unavailable, webpage chunks will not be ranked: {}", e),
        }
        let registry = Arc::new(builder.build());

        let output = Arc::new(CliOutputHandler::new(CliOutputConfig {
            show_details: options.verbose,
        }));
        let mut agent = AgentCore::new(agent_config, llm, registry)?.with_output(output);

        let recorder = options.trajectory_file.as_ref().map(|path| {
            info!("📊 Trajectory file: {}", path.display());
            Arc::new(TrajectoryRecorder::with_file(path))
        });
        if let Some(recorder) = &recorder {
            agent = agent.with_trajectory_recorder(recorder.clone());
        }

        Ok(Self {
            agent,
            tools: options.tools,
            encodings: Arc::new(TiktokenEncodingProvider::new()),
            model: config.llm.model.clone(),
            locale: options.locale.or(config.locale),
            verbose_llm: config.verbose_llm || options.verbose,
            recorder,
        })
    }

    /// Context for a new run, the locale travels as `accept-language`
    pub fn context(&self) -> TaskExecutionContext {
        let mut headers = HashMap::new();
        if let Some(locale) = &self.locale {
            headers.insert("accept-language".to_string(), locale.clone());
        }
        TaskExecutionContext::new(
            headers,
            self.model.clone(),
            self.verbose_llm,
            self.encodings.clone(),
        )
    }

    /// Write the trajectory file, if one was requested
    pub async fn save_trajectory(&self) -> Result<()> {
        if let Some(recorder) = &self.recorder {
            recorder.save().await?;
            if let Some(path) = recorder.file_path() {
                info!("📊 Trajectory saved to: {}", path.display());
            }
        }
        Ok(())
    }
}

/// Route Ctrl-C to `stop` while a run is active, exit otherwise
///
/// The handler can only be installed once per process.
pub fn install_interrupt_handler(stop: StopSignal, running: Arc<AtomicBool>) -> Result<()> {
    ctrlc::set_handler(move || {
        if running.load(Ordering::SeqCst) {
            stop.stop();
        } else {
            std::process::exit(130);
        }
    })
    .context("Failed to install Ctrl-C handler")
}
