//! Anthropic native provider implementation.
//!
//! Uses Anthropic's Messages API directly.
//!
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - Seed text is sent as a trailing assistant turn (prefill), so the model
//!   continues from it; the returned text starts with the seed.

use async_trait::async_trait;
use reprompt_core::{Completion, CompletionProvider, CompletionRequest, ProviderError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http::{build_client, error_for_status, retry_after, transport_error};

const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Anthropic native Messages API provider.
pub struct AnthropicProvider {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            model: model.into(),
            client: build_client(),
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let mut messages = vec![AnthropicMessage {
            role: "user".into(),
            content: request.prompt.clone(),
        }];
        // The API rejects a final assistant turn ending in whitespace.
        let prefill = request.seed_text.trim_end();
        if !prefill.is_empty() {
            messages.push(AnthropicMessage {
                role: "assistant".into(),
                content: prefill.to_string(),
            });
        }

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });
        if !request.stop.is_empty() {
            body["stop_sequences"] = serde_json::json!(request.stop);
        }
        body
    }

    fn to_completion(
        resp: AnthropicResponse,
        request: &CompletionRequest,
    ) -> Result<Completion, ProviderError> {
        if resp.stop_reason.as_deref() == Some("refusal") {
            return Err(ProviderError::Rejected("model refused to answer".into()));
        }

        let mut text = request.seed_text.trim_end().to_string();
        for block in &resp.content {
            if let ResponseContentBlock::Text { text: part } = block {
                text.push_str(part);
            }
        }

        Ok(Completion {
            text,
            input_tokens: resp.usage.input_tokens,
            output_tokens: resp.usage.output_tokens,
            model: resp.model,
        })
    }
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = self.request_body(&request);

        debug!(
            provider = "anthropic",
            model = %self.model,
            prompt_len = request.prompt.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        if status != 200 {
            let retry = retry_after(response.headers());
            let error_body = response.text().await.unwrap_or_default();
            return Err(error_for_status("Anthropic", status, error_body, retry));
        }

        let api_resp: AnthropicResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse Anthropic response: {e}"))
        })?;

        Self::to_completion(api_resp, &request)
    }
}

// --- Anthropic API types ---

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    model: String,
    content: Vec<ResponseContentBlock>,
    usage: AnthropicUsage,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> AnthropicResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn constructor() {
        let provider = AnthropicProvider::new("sk-ant-test", "claude-2.1");
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.model(), "claude-2.1");
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn constructor_with_base_url() {
        let provider =
            AnthropicProvider::new("sk-ant-test", "claude-2.1").with_base_url("http://localhost:9999/");
        assert_eq!(provider.base_url, "http://localhost:9999");
    }

    #[test]
    fn body_without_seed_has_single_user_turn() {
        let provider = AnthropicProvider::new("k", "claude-2.1");
        let body = provider.request_body(&CompletionRequest::new("What is 2+2?", 64));
        assert_eq!(body["model"], "claude-2.1");
        assert_eq!(body["max_tokens"], 64);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
        assert!(body.get("stop_sequences").is_none());
    }

    #[test]
    fn seed_text_becomes_trimmed_prefill() {
        let provider = AnthropicProvider::new("k", "claude-2.1");
        let request = CompletionRequest::new("prompt", 64).with_seed_text("Question: why? \n");
        let body = provider.request_body(&request);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[1]["content"], "Question: why?");
    }

    #[test]
    fn parse_text_response() {
        let resp = parse(
            r#"{
                "id": "msg_01",
                "model": "claude-2.1",
                "content": [{"type": "text", "text": "{\"answer\": \"4\"}"}],
                "usage": {"input_tokens": 10, "output_tokens": 5},
                "stop_reason": "end_turn"
            }"#,
        );
        let completion =
            AnthropicProvider::to_completion(resp, &CompletionRequest::new("p", 8)).unwrap();
        assert_eq!(completion.text, "{\"answer\": \"4\"}");
        assert_eq!(completion.input_tokens, 10);
        assert_eq!(completion.output_tokens, 5);
        assert_eq!(completion.model, "claude-2.1");
    }

    #[test]
    fn completion_starts_with_seed_text() {
        let resp = parse(
            r#"{"model": "claude-2.1",
                "content": [{"type": "text", "text": " {\"page\": 3}"}],
                "usage": {"input_tokens": 1, "output_tokens": 1}}"#,
        );
        let request = CompletionRequest::new("p", 8).with_seed_text("Answer:");
        let completion = AnthropicProvider::to_completion(resp, &request).unwrap();
        assert_eq!(completion.text, "Answer: {\"page\": 3}");
    }

    #[test]
    fn unknown_blocks_are_ignored() {
        let resp = parse(
            r#"{"model": "m",
                "content": [{"type": "thinking", "thinking": "hmm"}, {"type": "text", "text": "ok"}],
                "usage": {"input_tokens": 1, "output_tokens": 1}}"#,
        );
        let completion =
            AnthropicProvider::to_completion(resp, &CompletionRequest::new("p", 8)).unwrap();
        assert_eq!(completion.text, "ok");
    }

    #[test]
    fn refusal_is_rejection() {
        let resp = parse(
            r#"{"model": "m", "content": [], "stop_reason": "refusal",
                "usage": {"input_tokens": 1, "output_tokens": 0}}"#,
        );
        let err =
            AnthropicProvider::to_completion(resp, &CompletionRequest::new("p", 8)).unwrap_err();
        assert!(err.is_rejection());
    }
}
