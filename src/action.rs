use serde_json::{Map, Value};

use crate::error::ToolError;

/// JSON object the model returned describing what to run.
///
/// Only `command` is required before execution; `explanation` is shown to the
/// user when present. Any other keys are kept as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredAction {
    fields: Map<String, Value>,
}

impl StructuredAction {
    /// Parse extracted model text. Anything that is not a JSON object is rejected.
    pub fn parse(extracted: &str, raw_response: &str) -> Result<Self, ToolError> {
        let value: Value =
            serde_json::from_str(extracted).map_err(|e| ToolError::ActionParse {
                message: e.to_string(),
                raw: raw_response.to_string(),
            })?;
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(ToolError::ActionParse {
                message: format!("expected a JSON object, got {}", json_kind(&other)),
                raw: raw_response.to_string(),
            }),
        }
    }

    /// The command to run, if present as a non-empty string.
    pub fn command(&self) -> Option<&str> {
        self.str_field("command")
    }

    pub fn explanation(&self) -> Option<&str> {
        self.str_field("explanation")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The command, or a missing-command error carrying the whole action.
    pub fn require_command(&self) -> Result<&str, ToolError> {
        self.command().ok_or_else(|| ToolError::MissingCommand {
            action: Value::Object(self.fields.clone()).to_string(),
        })
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_object_with_command() {
        let action = StructuredAction::parse(
            r#"{"command": "echo hello", "explanation": "test echo"}"#,
            "raw",
        )
        .unwrap();
        assert_eq!(action.command(), Some("echo hello"));
        assert_eq!(action.explanation(), Some("test echo"));
        assert_eq!(action.require_command().unwrap(), "echo hello");
    }

    #[test]
    fn garbage_is_parse_error_with_raw_text() {
        let err = StructuredAction::parse("I cannot help with that", "I cannot help with that")
            .unwrap_err();
        match err {
            ToolError::ActionParse { raw, .. } => assert_eq!(raw, "I cannot help with that"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_object_json_is_rejected() {
        let err = StructuredAction::parse("[1, 2]", "[1, 2]").unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn missing_or_blank_command() {
        let no_cmd = StructuredAction::parse(r#"{"explanation": "nothing to do"}"#, "").unwrap();
        assert!(matches!(
            no_cmd.require_command(),
            Err(ToolError::MissingCommand { .. })
        ));

        let blank = StructuredAction::parse(r#"{"command": "   "}"#, "").unwrap();
        assert!(blank.command().is_none());

        let not_string = StructuredAction::parse(r#"{"command": 42}"#, "").unwrap();
        assert!(not_string.command().is_none());
    }

    #[test]
    fn extra_keys_survive() {
        let action = StructuredAction::parse(r#"{"command": "ls", "risk": "low"}"#, "").unwrap();
        assert_eq!(action.get("risk"), Some(&json!("low")));
        assert_eq!(action.into_value()["command"], "ls");
    }
}
