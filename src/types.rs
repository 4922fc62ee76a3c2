use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fully-formed request. The provider just sends it.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub model: String,
    pub max_tokens: u32,
    pub system: Option<String>,
    pub messages: Vec<Value>,
}

impl InferenceRequest {
    /// Single-turn request: one system instruction, one user message.
    pub fn single_turn(
        model: impl Into<String>,
        max_tokens: u32,
        system: &str,
        user: &str,
    ) -> Self {
        Self {
            model: model.into(),
            max_tokens,
            system: Some(system.to_string()),
            messages: vec![serde_json::json!({ "role": "user", "content": user })],
        }
    }
}

/// What came back from the LLM.
#[derive(Debug, Clone)]
pub struct InferenceResponse {
    pub stop_reason: StopReason,
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

impl InferenceResponse {
    /// All text blocks joined with newlines.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(|b| match b {
                ContentBlock::Text(t) => t.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
}

/// A content block in the model's response.
#[derive(Debug, Clone)]
pub enum ContentBlock {
    Text(String),
}

/// Token usage for a single inference call.
#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// One of the three fixed tool categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Diagnosis,
    Settings,
    Troubleshoot,
}

impl Capability {
    pub const ALL: [Capability; 3] = [
        Capability::Diagnosis,
        Capability::Settings,
        Capability::Troubleshoot,
    ];

    /// Public tool name exposed over HTTP and the CLI.
    pub fn tool_name(self) -> &'static str {
        match self {
            Capability::Diagnosis => "run_diagnosis",
            Capability::Settings => "get_pc_settings",
            Capability::Troubleshoot => "execute_troubleshooting",
        }
    }

    pub fn from_tool_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.tool_name() == name)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tool_name())
    }
}

impl FromStr for Capability {
    type Err = crate::error::ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tool_name(s).ok_or_else(|| crate::error::ToolError::UnknownTool(s.to_string()))
    }
}

/// A request coming in from the boundary (HTTP or CLI).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRequest {
    pub capability: Capability,
    pub input_text: String,
}

impl ToolRequest {
    pub fn new(capability: Capability, input_text: impl Into<String>) -> Self {
        Self {
            capability,
            input_text: input_text.into(),
        }
    }
}

/// A user prompt and the model's raw answer to it.
#[derive(Debug, Clone)]
pub struct LlmExchange {
    pub user_prompt: String,
    pub raw_response: String,
    /// The reply stopped at the token limit.
    pub truncated: bool,
}

/// Outcome of one tool call, as handed back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub tool: Capability,
    pub input_text: String,
    pub result: String,
    pub is_error: bool,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_names_round_trip() {
        for cap in Capability::ALL {
            assert_eq!(Capability::from_tool_name(cap.tool_name()), Some(cap));
        }
    }

    #[test]
    fn unknown_tool_name_is_rejected() {
        let err = "format_disk".parse::<Capability>().unwrap_err();
        assert_eq!(err.kind(), "unknown_tool");
    }

    #[test]
    fn response_text_joins_blocks() {
        let resp = InferenceResponse {
            stop_reason: StopReason::EndTurn,
            content: vec![ContentBlock::Text("a".into()), ContentBlock::Text("b".into())],
            usage: Usage::default(),
        };
        assert_eq!(resp.text(), "a\nb");
    }

    #[test]
    fn single_turn_carries_system_and_user() {
        let req = InferenceRequest::single_turn("m", 10, "sys", "hi");
        assert_eq!(req.system.as_deref(), Some("sys"));
        assert_eq!(req.messages[0]["role"], "user");
        assert_eq!(req.messages[0]["content"], "hi");
    }
}
