//! Decide/act control loop between the LLM and the browser tools.

use std::sync::Arc;

use proto::{LlmError, ProgressEvent, Role, ToolCall};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    llm::{ChatMessage, ChatRequest, ChatResponse, LlmProvider},
    prompt::build_system_prompt,
    session::{SessionState, Transcript},
    tool_registry::ToolRegistry,
};

const DEFAULT_TARGET_URL: &str = "http://localhost:5000";
const MAX_TOOL_RESULT_CHARS: usize = 16_000;

/// What the loop does after a decide step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// The last assistant message requested tools.
    Act,
    /// Nothing is pending; the last assistant text is the answer.
    Halt,
}

/// Routes on the last transcript message: pending tool calls mean act.
pub fn should_continue(transcript: &Transcript) -> Next {
    match transcript.last() {
        Some(msg)
            if msg.role == Role::Assistant
                && msg.tool_calls.as_ref().is_some_and(|calls| !calls.is_empty()) =>
        {
            Next::Act
        }
        _ => Next::Halt,
    }
}

/// The agent runtime: manages the decide/act loop
pub struct AgentRuntime {
    llm: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    model: String,
    temperature: Option<f32>,
    max_tool_rounds: usize,
    system_prompt: String,
}

impl AgentRuntime {
    /// Creates a runtime with the default target site in its prompt.
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        model: impl Into<String>,
        max_tool_rounds: usize,
    ) -> Self {
        Self {
            llm,
            tools,
            model: model.into(),
            temperature: None,
            max_tool_rounds,
            system_prompt: build_system_prompt(DEFAULT_TARGET_URL),
        }
    }

    /// Points the system prompt at a different target site.
    pub fn with_target_url(mut self, target_url: &str) -> Self {
        self.system_prompt = build_system_prompt(target_url);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Returns the active model id.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Runs one operator instruction to completion.
    ///
    /// Appends the instruction, then alternates decide and act until the
    /// model answers without requesting tools. An LLM failure ends the run
    /// at once and leaves the transcript as it was at that point. Tool
    /// failures are reported to the model as tool messages.
    pub async fn run(
        &self,
        state: &mut SessionState,
        input: &str,
        progress: Option<&mpsc::Sender<ProgressEvent>>,
    ) -> Result<String, proto::Error> {
        state.transcript.push(ChatMessage::user(input));
        let tool_defs = self.tools.definitions();
        let mut round = 0;

        loop {
            if round >= self.max_tool_rounds {
                warn!(
                    "Max tool rounds ({}) reached for session {}",
                    self.max_tool_rounds, state.id
                );
                return Err(proto::Error::Llm(LlmError::MaxToolRoundsExceeded));
            }

            // decide
            if let Some(tx) = progress {
                let _ = tx.try_send(ProgressEvent::LlmThinking { round });
            }
            let req = ChatRequest {
                messages: self.request_messages(&state.transcript),
                tools: tool_defs.clone(),
                model: self.model.clone(),
                temperature: self.temperature,
            };
            debug!("LLM call (round {round}) for session {}", state.id);
            let t0 = std::time::Instant::now();
            let response = self.llm.chat(req).await.map_err(proto::Error::Llm)?;
            debug!(elapsed_ms = %t0.elapsed().as_millis(), round = %round, "LLM response received");

            match response {
                ChatResponse::Text(text, usage) => {
                    state.usage.add(&usage);
                    state.transcript.push(ChatMessage::assistant(text));
                }
                ChatResponse::ToolCalls(text, tool_calls, usage) => {
                    state.usage.add(&usage);
                    debug!(
                        "Tool calls requested: {:?}",
                        tool_calls.iter().map(|tc| &tc.name).collect::<Vec<_>>()
                    );
                    state.transcript.push(ChatMessage {
                        role: Role::Assistant,
                        content: text.unwrap_or_default(),
                        tool_call_id: None,
                        tool_name: None,
                        tool_calls: Some(tool_calls),
                    });
                }
            }

            match should_continue(&state.transcript) {
                Next::Halt => {
                    let text = state
                        .transcript
                        .last()
                        .map(|m| m.content.clone())
                        .unwrap_or_default();
                    info!(
                        prompt_tokens = state.usage.prompt_tokens,
                        completion_tokens = state.usage.completion_tokens,
                        "Agent final response for session {}: {text:.50}",
                        state.id
                    );
                    return Ok(text);
                }
                Next::Act => {
                    self.act(state, progress).await;
                    round += 1;
                }
            }
        }
    }

    /// Executes the pending tool calls in order, one tool message each.
    async fn act(&self, state: &mut SessionState, progress: Option<&mpsc::Sender<ProgressEvent>>) {
        let calls: Vec<ToolCall> = state
            .transcript
            .last()
            .and_then(|m| m.tool_calls.clone())
            .unwrap_or_default();

        for tc in &calls {
            if let Some(tx) = progress {
                let _ = tx.try_send(ProgressEvent::ToolCallStarted {
                    call_id: tc.id.clone(),
                    tool_name: tc.name.clone(),
                    args: tc.arguments.clone(),
                });
            }

            let result = self
                .tools
                .execute(&tc.id, &tc.name, tc.arguments.clone())
                .await;
            if result.is_error {
                warn!(tool = %tc.name, error = %result.output, "Tool call failed");
            }

            if let Some(tx) = progress {
                let _ = tx.try_send(ProgressEvent::ToolCallFinished {
                    call_id: tc.id.clone(),
                    tool_name: tc.name.clone(),
                    output: result.output.clone(),
                    is_error: result.is_error,
                });
            }

            let status = if result.is_error { "error" } else { "ok" };
            state
                .results
                .push(format!("{} [{status}]: {}", tc.name, result.output));
            let llm_output = truncate_tool_result(&result.output, MAX_TOOL_RESULT_CHARS);
            state
                .transcript
                .push(ChatMessage::tool_result(&tc.id, &tc.name, llm_output));
        }
    }

    fn request_messages(&self, transcript: &Transcript) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(transcript.len() + 1);
        messages.push(ChatMessage::system(self.system_prompt.clone()));
        messages.extend(transcript.messages().iter().cloned());
        messages
    }
}

/// Truncates a tool result to at most `max_chars` characters.
/// If the result is longer, it appends a note with how many characters were cut.
fn truncate_tool_result(output: &str, max_chars: usize) -> String {
    let total_chars = output.chars().count();
    if total_chars <= max_chars {
        return output.to_string();
    }

    let kept = output.chars().take(max_chars).collect::<String>();
    let cut = total_chars - max_chars;
    format!("{kept}\n...[output truncated: {cut} chars omitted]")
}
