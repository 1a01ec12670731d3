/// Real-time progress events emitted during agent processing.
///
/// These events are sent via `tokio::sync::mpsc` from `AgentRuntime::run()`
/// so that the CLI can display live tool-call status while the
/// decide/act loop runs.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// The LLM is being consulted (round N of the loop).
    LlmThinking { round: usize },
    /// A tool call has been dispatched but has not yet completed.
    ToolCallStarted {
        call_id: String,
        tool_name: String,
        args: serde_json::Value,
    },
    /// A tool call has finished executing.
    ToolCallFinished {
        call_id: String,
        tool_name: String,
        output: String,
        is_error: bool,
    },
}
