use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::openai::{chat_messages, parse_chat_completion};
use super::InferenceProvider;
use crate::error::InferenceError;
use crate::types::{InferenceRequest, InferenceResponse};

/// Azure OpenAI. Same wire format as OpenAI chat completions, but routed by
/// deployment name and authenticated with an `api-key` header.
pub struct AzureOpenAiProvider {
    client: reqwest::Client,
    endpoint: String,
    deployment: String,
    api_key: String,
    api_version: String,
}

impl AzureOpenAiProvider {
    pub fn new(
        endpoint: impl Into<String>,
        deployment: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            deployment: deployment.into(),
            api_key: api_key.into(),
            api_version: "2024-02-15-preview".into(),
        }
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }
}

#[async_trait]
impl InferenceProvider for AzureOpenAiProvider {
    async fn infer(&self, request: InferenceRequest) -> Result<InferenceResponse, InferenceError> {
        let body = json!({
            "max_tokens": request.max_tokens,
            "messages": chat_messages(request.system.as_deref(), &request.messages),
        });

        debug!(deployment = %self.deployment, "azure inference request");

        let resp = self
            .client
            .post(self.url())
            .header("api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| InferenceError::Request(e.to_string()))?;

        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| InferenceError::Request(e.to_string()))?;

        if status != 200 {
            return Err(InferenceError::ApiError { status, body: text });
        }

        parse_chat_completion(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_includes_deployment_and_version() {
        let p = AzureOpenAiProvider::new("https://acme.openai.azure.com/", "ops", "k")
            .with_api_version("2024-06-01");
        assert_eq!(
            p.url(),
            "https://acme.openai.azure.com/openai/deployments/ops/chat/completions?api-version=2024-06-01"
        );
    }
}
