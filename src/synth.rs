use std::sync::Arc;

use tracing::{debug, warn};

use crate::action::StructuredAction;
use crate::error::ToolError;
use crate::exec;
use crate::extract::{extract_with_mode, FenceMode};
use crate::llm::LlmClient;
use crate::prompts;
use crate::types::{Capability, LlmExchange, StopReason};

/// Turns a capability plus free text into a structured action via one LLM call.
pub struct CommandSynthesizer {
    llm: Arc<LlmClient>,
    fence_mode: FenceMode,
    os_label: String,
}

impl CommandSynthesizer {
    pub fn new(llm: Arc<LlmClient>) -> Self {
        Self {
            llm,
            fence_mode: FenceMode::default(),
            os_label: crate::host::os_label(),
        }
    }

    pub fn with_fence_mode(mut self, mode: FenceMode) -> Self {
        self.fence_mode = mode;
        self
    }

    pub fn with_os_label(mut self, label: impl Into<String>) -> Self {
        self.os_label = label.into();
        self
    }

    pub fn system_prompt(&self, capability: Capability) -> String {
        prompts::system_prompt(capability, &self.os_label, exec::shell_label())
    }

    /// Ask the model for an action. Not retried on failure. The caller checks
    /// for a `command` before running anything.
    pub async fn synthesize_action(
        &self,
        capability: Capability,
        input_text: &str,
    ) -> Result<StructuredAction, ToolError> {
        let system_prompt = self.system_prompt(capability);
        let response = self.llm.complete(&system_prompt, input_text).await?;
        let exchange = LlmExchange {
            user_prompt: input_text.to_string(),
            raw_response: response.text(),
            truncated: response.stop_reason == StopReason::MaxTokens,
        };
        self.parse_exchange(capability, &exchange)
    }

    fn parse_exchange(
        &self,
        capability: Capability,
        exchange: &LlmExchange,
    ) -> Result<StructuredAction, ToolError> {
        let extracted = extract_with_mode(&exchange.raw_response, self.fence_mode);
        debug!(tool = %capability, extracted = %extracted, "model reply extracted");

        StructuredAction::parse(&extracted, &exchange.raw_response)
            .map_err(|e| match e {
                ToolError::ActionParse { message, raw } if exchange.truncated => {
                    ToolError::ActionParse {
                        message: format!("{message} (reply was cut off at the max_tokens limit)"),
                        raw,
                    }
                }
                other => other,
            })
            .inspect_err(|e| {
                warn!(
                    tool = %capability,
                    user_prompt = %exchange.user_prompt,
                    error = %e,
                    "model reply was not a JSON action"
                );
            })
    }
}
