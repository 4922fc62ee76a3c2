use std::time::Duration;

use tracing::{debug, warn};

use crate::config::Settings;
use crate::error::{InferenceError, ToolError};
use crate::inference::{self, InferenceProvider};
use crate::types::{InferenceRequest, InferenceResponse, StopReason};

/// Uniform `(system, user) -> text` call over whichever provider was configured.
///
/// A client without a provider is valid: every call on it fails with a
/// configuration error and never touches the network.
pub struct LlmClient {
    provider: Option<Box<dyn InferenceProvider>>,
    provider_name: &'static str,
    model: String,
    max_tokens: u32,
    timeout: Duration,
}

impl LlmClient {
    pub fn new(
        provider: impl InferenceProvider + 'static,
        provider_name: &'static str,
        model: impl Into<String>,
    ) -> Self {
        let defaults = Settings::default();
        Self {
            provider: Some(Box::new(provider)),
            provider_name,
            model: model.into(),
            max_tokens: defaults.max_tokens,
            timeout: defaults.llm_timeout,
        }
    }

    /// Client with no provider behind it.
    pub fn unconfigured() -> Self {
        let defaults = Settings::default();
        Self {
            provider: None,
            provider_name: "none",
            model: String::new(),
            max_tokens: defaults.max_tokens,
            timeout: defaults.llm_timeout,
        }
    }

    /// Pick the provider from resolved settings. Missing credentials yield an
    /// unconfigured client rather than an error so the process can still start.
    pub fn from_settings(settings: &Settings) -> Result<Self, ToolError> {
        let Some(credential) = settings.credential.as_ref() else {
            warn!("no LLM credential configured; tool calls will fail");
            return Ok(Self::unconfigured()
                .with_max_tokens(settings.max_tokens)
                .with_timeout(settings.llm_timeout));
        };
        let provider = inference::create_provider(settings)?;
        Ok(Self {
            provider: Some(provider),
            provider_name: credential.provider_name(),
            model: credential.model().to_string(),
            max_tokens: settings.max_tokens,
            timeout: settings.llm_timeout,
        })
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    /// Provider and model in use, e.g. `openai (gpt-4o-mini)`.
    pub fn describe(&self) -> String {
        if self.provider.is_none() {
            return "none".into();
        }
        format!("{} ({})", self.provider_name, self.model)
    }

    /// One call, no retries. Returns the model's complete text output.
    pub async fn get_llm_response(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ToolError> {
        Ok(self.complete(system_prompt, user_prompt).await?.text())
    }

    /// Same call, keeping the stop reason and usage.
    pub async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<InferenceResponse, ToolError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(inference::no_credential)?;

        let request = InferenceRequest::single_turn(
            self.model.clone(),
            self.max_tokens,
            system_prompt,
            user_prompt,
        );

        debug!(provider = self.provider_name, model = %self.model, "llm request");

        let response = tokio::time::timeout(self.timeout, provider.infer(request))
            .await
            .map_err(|_| InferenceError::Timeout(self.timeout.as_secs()))??;

        debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "llm response"
        );
        if response.stop_reason == StopReason::MaxTokens {
            warn!(max_tokens = self.max_tokens, "llm reply cut off at max_tokens");
        }
        Ok(response)
    }
}
