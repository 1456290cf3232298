//! Base tool trait and executor

use crate::agent::{Action, PluginInfo, TaskExecutionContext};
use crate::error::{Result, ToolError};
use async_trait::async_trait;
use std::sync::Arc;

use super::registry::ToolRegistry;

/// Trait for all tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Public description of the tool
    fn info(&self) -> &PluginInfo;

    /// Machine key the model uses for this tool
    fn name(&self) -> &str {
        &self.info().name_for_model
    }

    /// Whether the tool can be invoked, descriptor-only tools return false
    fn executable(&self) -> bool {
        true
    }

    /// Run the tool and return its observation
    async fn execute(&self, context: &TaskExecutionContext, action: &Action) -> Result<String>;
}

/// Resolves actions against the complete registry and runs them
///
/// Lookup deliberately ignores which subset was offered to the model.
#[derive(Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
}

impl ToolExecutor {
    /// Create an executor over a registry
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Find a tool by exact name in the complete registry
    pub async fn resolve(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.registry
            .list_all_tools()
            .await
            .into_iter()
            .find(|tool| tool.name() == name)
    }

    /// Execute an action, propagating the tool's own errors unchanged
    pub async fn execute(&self, context: &TaskExecutionContext, action: &Action) -> Result<String> {
        let name = &action.plugin.name_for_model;
        let tool = self.resolve(name).await.ok_or_else(|| ToolError::NotFound {
            name: name.clone(),
        })?;
        if !tool.executable() {
            return Err(ToolError::Invalid { name: name.clone() }.into());
        }

        tracing::debug!("executing tool {} for task {}", name, context.task_id);
        tool.execute(context, action).await
    }
}
