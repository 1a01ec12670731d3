//! Per-operator session: transcript, result log, and token usage.

use chrono::{DateTime, Utc};
use proto::SessionId;

use crate::llm::{ChatMessage, TokenUsage};

/// Ordered, append-only conversation history.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// State carried across instructions until the operator clears it.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub id: SessionId,
    pub started_at: DateTime<Utc>,
    pub transcript: Transcript,
    /// One line per executed tool call.
    pub results: Vec<String>,
    pub usage: TokenUsage,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            id: SessionId::new(),
            started_at: Utc::now(),
            transcript: Transcript::new(),
            results: Vec::new(),
            usage: TokenUsage::default(),
        }
    }

    /// Discards everything and starts a fresh session.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_appends_in_order() {
        let mut transcript = Transcript::new();
        assert!(transcript.is_empty());
        assert!(transcript.last().is_none());

        transcript.push(ChatMessage::user("open the login page"));
        transcript.push(ChatMessage::assistant("done"));

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages()[0].content, "open the login page");
        assert_eq!(transcript.last().map(|m| m.content.as_str()), Some("done"));
    }

    #[test]
    fn reset_gives_new_id_and_empty_state() {
        let mut state = SessionState::new();
        let first_id = state.id.clone();
        let first_start = state.started_at;
        state.transcript.push(ChatMessage::user("hi"));
        state.results.push("navigate_to_url: ok".to_string());
        state.usage.prompt_tokens = 12;

        state.reset();

        assert_ne!(state.id, first_id);
        assert!(state.started_at >= first_start);
        assert!(state.transcript.is_empty());
        assert!(state.results.is_empty());
        assert_eq!(state.usage.prompt_tokens, 0);
    }
}
