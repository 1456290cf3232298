//! Tool system and built-in tools

pub mod base;
pub mod builtin;
pub mod registry;
pub mod utils;

pub use base::{Tool, ToolExecutor};
pub use registry::{HttpManifestSource, ManifestSource, ToolFactory, ToolRegistry};
