//! Shared protocol types for the agent runtime, browser tools, and CLI.
//!
//! This crate defines serializable message/tool structures, progress events,
//! and strongly-typed error enums shared across the workspace.

pub mod error;
pub mod event;
pub mod message;
pub mod tool;

/// Re-export of all protocol error types.
pub use error::*;
/// Re-export of runtime progress events.
pub use event::ProgressEvent;
/// Re-export of conversation identity types.
pub use message::{Role, SessionId};
/// Re-export of tool call definition and result types.
pub use tool::{ToolCall, ToolDefinition, ToolResult};
