//! Completion providers and token counters for Reprompt.
//!
//! All providers implement [`reprompt_core::CompletionProvider`]. The
//! factory selects one from configuration and wraps it in a
//! [`RetryingProvider`].

pub mod anthropic;
pub mod factory;
mod http;
pub mod openai;
pub mod retry;
pub mod tokenizer;

pub use anthropic::AnthropicProvider;
pub use factory::{build_base_provider, build_provider, MODEL_CLASSES};
pub use openai::OpenAiProvider;
pub use retry::{RetryPolicy, RetryingProvider};
#[cfg(feature = "hf-tokenizer")]
pub use tokenizer::HfTokenizerCounter;
pub use tokenizer::{build_counter, HeuristicCounter, TiktokenCounter};
