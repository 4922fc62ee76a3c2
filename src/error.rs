#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("API returned {status}: {body}")]
    ApiError { status: u16, body: String },
    #[error("failed to parse response: {0}")]
    Parse(String),
    #[error("request timed out after {0}s")]
    Timeout(u64),
}

/// Everything that can stop a tool pipeline before it produces output.
/// A command that runs and exits non-zero is not an error.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("LLM request failed: {0}")]
    LlmRequest(#[from] InferenceError),
    #[error("could not parse action from model reply: {message} (raw response: {raw:?})")]
    ActionParse { message: String, raw: String },
    #[error("model action has no command field: {action}")]
    MissingCommand { action: String },
    #[error("failed to execute command: {0}")]
    CommandExecution(String),
    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

impl ToolError {
    /// Short machine-friendly label, used in logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::Configuration(_) => "configuration",
            ToolError::LlmRequest(_) => "llm_request",
            ToolError::ActionParse { .. } => "action_parse",
            ToolError::MissingCommand { .. } => "missing_command",
            ToolError::CommandExecution(_) => "command_execution",
            ToolError::UnknownTool(_) => "unknown_tool",
        }
    }
}
