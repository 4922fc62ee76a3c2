use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::InferenceProvider;
use crate::error::InferenceError;
use crate::types::{ContentBlock, InferenceRequest, InferenceResponse, StopReason, Usage};

/// Claude API client via Anthropic's messages endpoint.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_key)
    }

    pub fn with_client(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: "https://api.anthropic.com".into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl InferenceProvider for AnthropicProvider {
    async fn infer(&self, request: InferenceRequest) -> Result<InferenceResponse, InferenceError> {
        let mut body = serde_json::json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "messages": request.messages,
        });

        if let Some(ref system) = request.system {
            body["system"] = Value::String(system.clone());
        }

        debug!(model = %request.model, "anthropic inference request");

        let resp = self
            .client
            .post(format!("{}/v1/messages", self.base_url.trim_end_matches('/')))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
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

        parse_messages_response(&text)
    }
}

fn parse_messages_response(text: &str) -> Result<InferenceResponse, InferenceError> {
    let parsed: Value =
        serde_json::from_str(text).map_err(|e| InferenceError::Parse(e.to_string()))?;

    let stop_reason = match parsed["stop_reason"].as_str().unwrap_or("end_turn") {
        "max_tokens" => StopReason::MaxTokens,
        _ => StopReason::EndTurn,
    };

    // Only text blocks matter here; anything else is skipped.
    let content: Vec<ContentBlock> = parsed["content"]
        .as_array()
        .map(|blocks| {
            blocks
                .iter()
                .filter(|b| b["type"] == "text")
                .map(|b| ContentBlock::Text(b["text"].as_str().unwrap_or("").to_string()))
                .collect()
        })
        .unwrap_or_default();

    if content.is_empty() {
        return Err(InferenceError::Parse("response contained no text".into()));
    }

    let usage = Usage {
        input_tokens: parsed["usage"]["input_tokens"].as_u64().unwrap_or(0) as u32,
        output_tokens: parsed["usage"]["output_tokens"].as_u64().unwrap_or(0) as u32,
    };

    Ok(InferenceResponse {
        stop_reason,
        content,
        usage,
    })
}
