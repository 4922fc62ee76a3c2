pub mod anthropic;
pub mod azure;
pub mod openai;

use async_trait::async_trait;

use crate::config::{Credential, Settings};
use crate::error::{InferenceError, ToolError};
use crate::types::{InferenceRequest, InferenceResponse};

/// Pure LLM API call. No state, no history, no retries.
/// Request in, response out.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    async fn infer(&self, request: InferenceRequest) -> Result<InferenceResponse, InferenceError>;
}

/// Blanket impl so `Box<dyn InferenceProvider>` can be passed where an
/// `impl InferenceProvider` is expected.
#[async_trait]
impl InferenceProvider for Box<dyn InferenceProvider> {
    async fn infer(&self, request: InferenceRequest) -> Result<InferenceResponse, InferenceError> {
        (**self).infer(request).await
    }
}

/// Build the provider matching the configured credential.
/// Fails with a configuration error when no credential was found.
pub fn create_provider(settings: &Settings) -> Result<Box<dyn InferenceProvider>, ToolError> {
    let credential = settings.credential.as_ref().ok_or_else(no_credential)?;

    // Transport-level timeout on top of the one LlmClient enforces.
    let client = reqwest::Client::builder()
        .timeout(settings.llm_timeout)
        .build()
        .map_err(|e| ToolError::Configuration(format!("failed to build HTTP client: {e}")))?;

    let provider: Box<dyn InferenceProvider> = match credential {
        Credential::OpenAi {
            api_key, base_url, ..
        } => Box::new(
            OpenAiProvider::new(base_url.clone())
                .with_api_key(api_key.clone())
                .with_client(client),
        ),
        Credential::Anthropic {
            api_key, base_url, ..
        } => Box::new(
            AnthropicProvider::with_client(client, api_key.clone()).with_base_url(base_url.clone()),
        ),
        Credential::Azure {
            api_key,
            endpoint,
            deployment,
            api_version,
        } => Box::new(
            AzureOpenAiProvider::new(endpoint.clone(), deployment.clone(), api_key.clone())
                .with_api_version(api_version.clone())
                .with_client(client),
        ),
    };
    Ok(provider)
}

pub(crate) fn no_credential() -> ToolError {
    ToolError::Configuration(format!(
        "no LLM API key found; set one of {}",
        crate::config::CREDENTIAL_VARS.join(", ")
    ))
}

pub use anthropic::AnthropicProvider;
pub use azure::AzureOpenAiProvider;
pub use openai::OpenAiProvider;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_without_credential_is_configuration_error() {
        let err = create_provider(&Settings::default()).err().unwrap();
        assert!(matches!(err, ToolError::Configuration(_)));
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn factory_builds_each_provider() {
        for credential in [
            Credential::OpenAi {
                api_key: "k".into(),
                base_url: "http://localhost".into(),
                model: "m".into(),
            },
            Credential::Anthropic {
                api_key: "k".into(),
                base_url: "http://localhost".into(),
                model: "m".into(),
            },
            Credential::Azure {
                api_key: "k".into(),
                endpoint: "http://localhost".into(),
                deployment: "d".into(),
                api_version: "v".into(),
            },
        ] {
            let settings = Settings {
                credential: Some(credential),
                ..Settings::default()
            };
            assert!(create_provider(&settings).is_ok());
        }
    }
}
