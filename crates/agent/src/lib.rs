//! Agent runtime, session state, and LLM adapter interfaces.

pub mod llm;
pub mod prompt;
pub mod runtime;
pub mod session;
pub mod tool_registry;

/// Chat request/response models and provider interfaces.
pub use llm::{ChatMessage, ChatRequest, ChatResponse, LlmProvider, OpenAiProvider, TokenUsage};
/// Main runtime orchestration loop.
pub use runtime::{AgentRuntime, Next, should_continue};
/// Transcript and per-operator session state.
pub use session::{SessionState, Transcript};
/// Runtime tool registry.
pub use tool_registry::ToolRegistry;
