//! Tool registry used by the runtime to list and execute tools.

use std::sync::Arc;

use proto::{ToolDefinition, ToolError, ToolResult};
use tools::Tool;
use tracing::{debug, warn};

/// Registry of available tools, kept in registration order.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Creates an empty tool registry.
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool
    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.register_shared(Arc::new(tool));
    }

    /// Registers an already shared tool. A later tool replaces an earlier one
    /// with the same name in place.
    pub fn register_shared(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        debug!("Registering tool: {name}");
        if let Some(slot) = self.tools.iter_mut().find(|t| t.name() == name) {
            warn!("Tool '{name}' registered twice; keeping the latest");
            *slot = tool;
        } else {
            self.tools.push(tool);
        }
    }

    /// Get tool definitions for the LLM
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition::new(t.name(), t.description(), t.parameters_schema()))
            .collect()
    }

    /// Execute a tool call
    pub async fn execute(&self, call_id: &str, name: &str, args: serde_json::Value) -> ToolResult {
        if let Some(tool) = self.tools.iter().find(|t| t.name() == name) {
            debug!("Executing tool: {name} (call_id: {call_id})");
            tool.execute(call_id, args).await
        } else {
            ToolResult::error(call_id, name, ToolError::NotFound(name.to_string()).to_string())
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
