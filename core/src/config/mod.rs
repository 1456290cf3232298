//! Minimal configuration module for reagent core
//!
//! Only exports pure data types. All loading logic is in CLI layer.

pub mod types;

pub use types::{ModelParams, PluginSettings, Protocol, ResolvedLlmConfig};
