//! OpenAI chat completions provider.
//!
//! Any endpoint exposing `/chat/completions` works (Azure proxies, vLLM,
//! OpenRouter) as long as the model name is accepted there. The prompt is
//! sent as a single user message. Seed text cannot be prefilled through this
//! API, so it is appended to the prompt instead.

use async_trait::async_trait;
use reprompt_core::{Completion, CompletionProvider, CompletionRequest, ProviderError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http::{build_client, error_for_status, retry_after, transport_error};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// An OpenAI-compatible chat completions provider.
pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    organization: Option<String>,
    model: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            organization: None,
            model: model.into(),
            client: build_client(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Bill requests to a specific organization.
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    fn user_content(request: &CompletionRequest) -> String {
        if request.seed_text.is_empty() {
            request.prompt.clone()
        } else {
            format!("{}\n\n{}", request.prompt, request.seed_text)
        }
    }

    fn request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let messages = vec![ApiMessage {
            role: "user".into(),
            content: Some(Self::user_content(request)),
        }];
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "stream": false,
        });
        if !request.stop.is_empty() {
            body["stop"] = serde_json::json!(request.stop);
        }
        body
    }

    fn to_completion(resp: ApiResponse) -> Result<Completion, ProviderError> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".into()))?;

        if choice.finish_reason.as_deref() == Some("content_filter") {
            return Err(ProviderError::Rejected(
                "completion stopped by content filter".into(),
            ));
        }

        let usage = resp.usage.unwrap_or_default();
        Ok(Completion {
            text: choice.message.content.unwrap_or_default(),
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            model: resp.model,
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(&request);

        debug!(
            provider = "openai",
            model = %self.model,
            prompt_len = request.prompt.len(),
            "Sending completion request"
        );

        let mut builder = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");
        if let Some(org) = &self.organization {
            builder = builder.header("OpenAI-Organization", org);
        }

        let response = builder.json(&body).send().await.map_err(transport_error)?;

        let status = response.status().as_u16();
        if status != 200 {
            let retry = retry_after(response.headers());
            let error_body = response.text().await.unwrap_or_default();
            return Err(error_for_status("OpenAI", status, error_body, retry));
        }

        let api_response: ApiResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse response: {e}"))
        })?;

        Self::to_completion(api_response)
    }
}

// --- OpenAI API types ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    model: String,
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
