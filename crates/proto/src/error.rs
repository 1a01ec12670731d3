use thiserror::Error;

/// Top-level error type
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration loading/validation error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// LLM provider error.
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Tool registration/execution error.
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// Browser session error.
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),
}

impl Error {
    /// Returns true when the error means the agent cannot talk to its LLM
    /// until the operator fixes configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::Llm(LlmError::Configuration(_))
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field has an invalid value and reason.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// Filesystem read error.
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error.
    #[error("TOML parse error: {0}")]
    Toml(String),
}

/// LLM provider errors
#[derive(Debug, Error)]
pub enum LlmError {
    /// Credential missing, placeholder, or rejected by the provider.
    #[error("{0}")]
    Configuration(String),

    /// Remote API failure.
    #[error("{0}")]
    Api(String),

    /// Provider response schema/content was invalid.
    #[error("Invalid response from LLM: {0}")]
    InvalidResponse(String),

    /// Runtime exceeded configured tool-call rounds.
    #[error("Max tool rounds exceeded")]
    MaxToolRoundsExceeded,

    /// Serialization/deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Tool execution errors
#[derive(Debug, Error)]
pub enum ToolError {
    /// Requested tool is unknown.
    #[error("Tool '{0}' not found")]
    NotFound(String),

    /// Tool call arguments are invalid.
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),
}

/// Browser session errors
#[derive(Debug, Error)]
pub enum BrowserError {
    /// An operation ran before `initialize`.
    #[error("Browser not initialized")]
    SessionNotInitialized,

    /// `initialize` ran twice without `close` in between.
    #[error("Browser already initialized")]
    AlreadyInitialized,

    /// The browser process could not be started.
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    /// Page load failed or timed out.
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// No element matched within the element timeout.
    #[error("Element '{selector}' not found within {timeout_ms}ms")]
    ElementNotFound { selector: String, timeout_ms: u64 },

    /// Filesystem write error (screenshots).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other failure reported by the automation engine.
    #[error("Browser protocol error: {0}")]
    Protocol(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_config_error_variant() {
        let err = ConfigError::InvalidValue {
            field: "agent.max_tool_rounds".to_string(),
            reason: "must be at least 1".to_string(),
        };
        assert!(err.to_string().contains("agent.max_tool_rounds"));
        assert!(err.to_string().contains("must be at least 1"));
    }

    #[test]
    fn wraps_llm_error_into_top_level_error() {
        let err: Error = LlmError::MaxToolRoundsExceeded.into();
        assert!(err.to_string().contains("Max tool rounds exceeded"));
        assert!(!err.is_configuration());
    }

    #[test]
    fn configuration_errors_are_flagged() {
        let err: Error = LlmError::Configuration("OpenAI API key not configured".into()).into();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("API key not configured"));

        let err: Error = ConfigError::Toml("bad".into()).into();
        assert!(err.is_configuration());
    }

    #[test]
    fn browser_errors_render_selector_and_url() {
        let err = BrowserError::ElementNotFound {
            selector: "#loginBtn".to_string(),
            timeout_ms: 500,
        };
        assert_eq!(err.to_string(), "Element '#loginBtn' not found within 500ms");

        let err = BrowserError::Navigation {
            url: "http://localhost:5000".to_string(),
            reason: "net::ERR_CONNECTION_REFUSED".to_string(),
        };
        assert!(err.to_string().contains("http://localhost:5000"));
        assert!(err.to_string().contains("ERR_CONNECTION_REFUSED"));

        let wrapped: Error = BrowserError::SessionNotInitialized.into();
        assert!(wrapped.to_string().contains("Browser not initialized"));
    }

    #[test]
    fn wraps_tool_errors() {
        let tool_err: Error = ToolError::InvalidArgs("missing selector".to_string()).into();
        assert!(tool_err.to_string().contains("Tool error"));
        assert_eq!(
            ToolError::NotFound("teleport".into()).to_string(),
            "Tool 'teleport' not found"
        );
    }
}
