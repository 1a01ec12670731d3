//! Tool trait and the browser tools the agent drives.
//!
//! The agent runtime sees only [`Tool`]; everything behind it talks to a
//! single shared [`BrowserHandle`].

pub mod browser;

pub use browser::{
    BrowserEngine, BrowserHandle, BrowserSession, ChromiumEngine, PageDriver, SessionOptions,
    browser_tools,
};

use async_trait::async_trait;
use proto::ToolResult;

/// Trait that all tools must implement
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name exposed to the LLM.
    fn name(&self) -> &str;
    /// Human-readable description for tool selection.
    fn description(&self) -> &str;
    /// JSON schema for accepted tool arguments.
    fn parameters_schema(&self) -> serde_json::Value;
    /// Executes the tool with the given call id and JSON args.
    async fn execute(&self, call_id: &str, args: serde_json::Value) -> ToolResult;
}
