use serde::{Deserialize, Serialize};

/// A tool invocation requested by the LLM inside an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned call id, echoed back by the matching result.
    pub id: String,
    /// Registered tool name.
    pub name: String,
    /// JSON object of arguments.
    pub arguments: serde_json::Value,
}

/// Schema descriptor advertised to the LLM for one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the accepted arguments.
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// Outcome of executing one tool call, folded back into the transcript as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Id of the call this result answers.
    pub call_id: String,
    pub tool_name: String,
    /// Human-readable status text.
    pub output: String,
    /// Whether the tool failed.
    pub is_error: bool,
}

impl ToolResult {
    /// Creates a successful result.
    pub fn success(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            output: output.into(),
            is_error: false,
        }
    }

    /// Creates a failed result carrying the error text.
    pub fn error(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            output: error.into(),
            is_error: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_call_round_trips_through_json() {
        let call = ToolCall {
            id: "c1".to_string(),
            name: "click_element".to_string(),
            arguments: serde_json::json!({"selector":"#loginBtn"}),
        };
        let json = serde_json::to_value(&call).expect("serialize");
        assert_eq!(json["arguments"]["selector"], "#loginBtn");
        let back: ToolCall = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, call);
    }

    #[test]
    fn tool_result_constructors_set_error_flag() {
        let ok = ToolResult::success("c1", "navigate_to_url", "Navigated");
        assert!(!ok.is_error);
        assert_eq!(ok.call_id, "c1");
        assert_eq!(ok.output, "Navigated");

        let err = ToolResult::error("c2", "click_element", "Element '#x' not found");
        assert!(err.is_error);
        assert_eq!(err.tool_name, "click_element");
    }

    #[test]
    fn tool_definition_keeps_schema() {
        let def = ToolDefinition::new(
            "get_page_text",
            "Read text",
            serde_json::json!({"type":"object","required":["selector"]}),
        );
        assert_eq!(def.parameters["required"][0], "selector");
    }
}
