use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::InferenceProvider;
use crate::error::InferenceError;
use crate::types::{ContentBlock, InferenceRequest, InferenceResponse, StopReason, Usage};

/// OpenAI-compatible provider. Works with OpenAI itself, vLLM, LM Studio,
/// OpenRouter, or any server that implements `/v1/chat/completions`.
///
/// The base URL is the server root, e.g. `https://api.openai.com`. A base
/// that already ends in `/v1` is accepted as well.
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: None,
        }
    }

    /// Set an API key (required for OpenAI, OpenRouter, etc.).
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{base}/chat/completions")
        } else {
            format!("{base}/v1/chat/completions")
        }
    }
}

/// Our message list in chat-completions shape, system prompt first.
pub(crate) fn chat_messages(system: Option<&str>, messages: &[Value]) -> Vec<Value> {
    let mut out = Vec::with_capacity(messages.len() + 1);
    if let Some(sys) = system {
        out.push(json!({ "role": "system", "content": sys }));
    }
    out.extend(messages.iter().cloned());
    out
}

/// Parse a `/chat/completions` response body. Shared with the Azure provider.
pub(crate) fn parse_chat_completion(text: &str) -> Result<InferenceResponse, InferenceError> {
    let parsed: Value =
        serde_json::from_str(text).map_err(|e| InferenceError::Parse(e.to_string()))?;

    let choice = parsed["choices"]
        .get(0)
        .ok_or_else(|| InferenceError::Parse("response contained no choices".into()))?;

    let stop_reason = match choice["finish_reason"].as_str().unwrap_or("stop") {
        "length" => StopReason::MaxTokens,
        "stop" => StopReason::EndTurn,
        other => {
            debug!(finish_reason = %other, "unknown finish_reason, treating as EndTurn");
            StopReason::EndTurn
        }
    };

    let text = choice["message"]["content"]
        .as_str()
        .ok_or_else(|| InferenceError::Parse("choice has no message content".into()))?;

    let usage = Usage {
        input_tokens: parsed["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        output_tokens: parsed["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
    };

    Ok(InferenceResponse {
        stop_reason,
        content: vec![ContentBlock::Text(text.to_string())],
        usage,
    })
}

#[async_trait]
impl InferenceProvider for OpenAiProvider {
    async fn infer(&self, request: InferenceRequest) -> Result<InferenceResponse, InferenceError> {
        let messages = chat_messages(request.system.as_deref(), &request.messages);

        let body = json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "messages": messages,
        });

        debug!(
            model = %request.model,
            messages = messages.len(),
            "openai inference request"
        );

        let mut req = self
            .client
            .post(self.url())
            .header("content-type", "application/json");

        if let Some(ref key) = self.api_key {
            req = req.header("authorization", format!("Bearer {key}"));
        }

        let resp = req
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
    fn system_prompt_goes_first() {
        let msgs = chat_messages(Some("sys"), &[json!({"role": "user", "content": "hi"})]);
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0]["role"], "system");
        assert_eq!(msgs[1]["content"], "hi");
    }

    #[test]
    fn url_tolerates_trailing_slash_and_v1() {
        for base in [
            "https://api.openai.com",
            "https://api.openai.com/",
            "https://api.openai.com/v1",
            "https://api.openai.com/v1/",
        ] {
            assert_eq!(
                OpenAiProvider::new(base).url(),
                "https://api.openai.com/v1/chat/completions"
            );
        }
    }

    #[test]
    fn parses_first_choice() {
        let body = r#"{
            "choices": [{"finish_reason": "stop", "message": {"role": "assistant", "content": "hello"}}],
            "usage": {"prompt_tokens": 3, "completion_tokens": 1}
        }"#;
        let resp = parse_chat_completion(body).unwrap();
        assert_eq!(resp.text(), "hello");
        assert_eq!(resp.usage.output_tokens, 1);
    }

    #[test]
    fn length_maps_to_max_tokens() {
        let body = r#"{"choices": [{"finish_reason": "length", "message": {"content": "{"}}]}"#;
        assert_eq!(
            parse_chat_completion(body).unwrap().stop_reason,
            StopReason::MaxTokens
        );
    }

    #[test]
    fn missing_choices_is_parse_error() {
        assert!(matches!(
            parse_chat_completion(r#"{"choices": []}"#).unwrap_err(),
            InferenceError::Parse(_)
        ));
    }
}
