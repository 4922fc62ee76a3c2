//! Pulls a JSON payload out of raw model text.
//!
//! Models often wrap JSON in markdown fences (```` ```json ... ``` ````). The
//! scanner walks the text line by line with two states, outside and inside a
//! fence. A fence line flips the state and is itself discarded, which also
//! drops any language tag on the opening line.

use std::str::FromStr;

use crate::error::ToolError;

const FENCE: &str = "```";

/// How to treat replies containing more than one fenced block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FenceMode {
    /// Collect every line inside any fence pair; later blocks are concatenated.
    #[default]
    Toggle,
    /// Collect only the first complete fenced block; ignore everything after it.
    FirstBlock,
}

impl FromStr for FenceMode {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "toggle" => Ok(FenceMode::Toggle),
            "first" | "first_block" => Ok(FenceMode::FirstBlock),
            other => Err(ToolError::Configuration(format!(
                "unknown fence mode {other:?}, expected \"toggle\" or \"first\""
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Outside,
    Inside,
}

/// Extract using the default [`FenceMode::Toggle`] behaviour. Never fails.
pub fn extract_json_block(raw_text: &str) -> String {
    extract_with_mode(raw_text, FenceMode::Toggle)
}

pub fn extract_with_mode(raw_text: &str, mode: FenceMode) -> String {
    let trimmed = raw_text.trim();
    if !trimmed.starts_with(FENCE) {
        return trimmed.to_string();
    }

    let mut state = ScanState::Outside;
    let mut collected: Vec<&str> = Vec::new();

    for line in trimmed.lines() {
        if line.trim().starts_with(FENCE) {
            state = match state {
                ScanState::Outside => ScanState::Inside,
                ScanState::Inside => {
                    if mode == FenceMode::FirstBlock {
                        break;
                    }
                    ScanState::Outside
                }
            };
            continue;
        }
        if state == ScanState::Inside {
            collected.push(line);
        }
    }

    collected.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn parsed(raw: &str) -> Value {
        serde_json::from_str(&extract_json_block(raw)).unwrap()
    }

    #[test]
    fn plain_json_is_returned_trimmed() {
        assert_eq!(
            extract_json_block("  {\"command\": \"echo test\"}\n"),
            "{\"command\": \"echo test\"}"
        );
    }

    #[test]
    fn literal_fixtures_parse() {
        let expected = json!({"command": "echo test"});
        assert_eq!(parsed("{\"command\": \"echo test\"}"), expected);
        assert_eq!(parsed("```json\n{\"command\": \"echo test\"}\n```"), expected);
        assert_eq!(parsed("```\n{\"command\": \"echo test\"}\n```"), expected);
    }

    #[test]
    fn multiline_body_is_kept_intact() {
        let raw = "```json\n{\n  \"command\": \"df -h\",\n  \"explanation\": \"disk\"\n}\n```";
        assert_eq!(
            extract_json_block(raw),
            "{\n  \"command\": \"df -h\",\n  \"explanation\": \"disk\"\n}"
        );
    }

    #[test]
    fn unclosed_fence_collects_to_end() {
        assert_eq!(extract_json_block("```json\n{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn prose_before_fence_is_not_scanned() {
        let raw = "Sure!\n```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json_block(raw), raw);
    }

    #[test]
    fn toggle_mode_concatenates_blocks() {
        let raw = "```\n{\"a\": 1}\n```\nsome prose\n```\n{\"b\": 2}\n```";
        assert_eq!(extract_json_block(raw), "{\"a\": 1}\n{\"b\": 2}");
    }

    #[test]
    fn first_block_mode_ignores_trailing_blocks() {
        let raw = "```\n{\"a\": 1}\n```\nsome prose\n```\n{\"b\": 2}\n```";
        assert_eq!(extract_with_mode(raw, FenceMode::FirstBlock), "{\"a\": 1}");
    }

    #[test]
    fn garbage_passes_through() {
        assert_eq!(
            extract_json_block("I cannot help with that"),
            "I cannot help with that"
        );
    }

    #[test]
    fn fence_mode_parses() {
        assert_eq!("toggle".parse::<FenceMode>().unwrap(), FenceMode::Toggle);
        assert_eq!("FIRST".parse::<FenceMode>().unwrap(), FenceMode::FirstBlock);
        assert!("both".parse::<FenceMode>().is_err());
    }
}
