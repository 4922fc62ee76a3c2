use serde_json::{json, Value};

/// Progress events for a streamed tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolEvent {
    Started { tool: String },
    Completed { result: String },
    Error { message: String },
}

impl ToolEvent {
    /// Wire shape sent to streaming clients.
    pub fn to_json(&self) -> Value {
        match self {
            ToolEvent::Started { tool } => json!({ "status": "started", "tool": tool }),
            ToolEvent::Completed { result } => json!({ "status": "completed", "result": result }),
            ToolEvent::Error { message } => json!({ "error": message }),
        }
    }
}
