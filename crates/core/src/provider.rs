//! Completion provider trait: the abstraction over LLM backends.
//!
//! A provider turns a single prompt into generated text and reports the
//! token usage of the call. It owns nothing about retries; those are layered
//! on top by wrapping one provider in another.
//!
//! Implementations: Anthropic, OpenAI, and the retrying wrapper.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;

/// One completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The full prompt text.
    pub prompt: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Temperature (0.0 = deterministic)
    #[serde(default)]
    pub temperature: f32,

    /// Text the answer should start with ("words in mouth"). Empty for none.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub seed_text: String,

    /// Stop sequences
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
}

impl CompletionRequest {
    /// Create a request with deterministic sampling and no seed text.
    pub fn new(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens,
            temperature: 0.0,
            seed_text: String::new(),
            stop: Vec::new(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_seed_text(mut self, seed_text: impl Into<String>) -> Self {
        self.seed_text = seed_text.into();
        self
    }
}

/// A completed generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    /// Generated text, including any seed text the provider was primed with.
    pub text: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    /// Which model actually responded
    pub model: String,
}

/// The core completion trait.
///
/// The prompt runner calls `complete()` without knowing which backend is
/// in use.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai", "anthropic").
    fn name(&self) -> &str;

    /// The model requests are sent to.
    fn model(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<Completion, ProviderError>;
}

#[async_trait]
impl<T: CompletionProvider + ?Sized> CompletionProvider for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn model(&self) -> &str {
        (**self).model()
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<Completion, ProviderError> {
        (**self).complete(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl CompletionProvider for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn model(&self) -> &str {
            "echo-1"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> std::result::Result<Completion, ProviderError> {
            Ok(Completion {
                text: format!("{}{}", request.seed_text, request.prompt),
                input_tokens: 1,
                output_tokens: 1,
                model: self.model().into(),
            })
        }
    }

    #[test]
    fn request_defaults() {
        let req = CompletionRequest::new("hi", 16);
        assert_eq!(req.temperature, 0.0);
        assert!(req.seed_text.is_empty());
        assert!(req.stop.is_empty());
    }

    #[test]
    fn request_serialization_skips_empty_seed() {
        let json = serde_json::to_string(&CompletionRequest::new("hi", 16)).unwrap();
        assert!(!json.contains("seed_text"));

        let json = serde_json::to_string(&CompletionRequest::new("hi", 16).with_seed_text("{"))
            .unwrap();
        assert!(json.contains("seed_text"));
    }

    #[tokio::test]
    async fn provider_is_object_safe() {
        let provider: Box<dyn CompletionProvider> = Box::new(Echo);
        let out = provider
            .complete(CompletionRequest::new("world", 4).with_seed_text("hello "))
            .await
            .unwrap();
        assert_eq!(out.text, "hello world");
        assert_eq!(out.model, "echo-1");
    }
}
