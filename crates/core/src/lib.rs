//! # Reprompt Core
//!
//! Domain types, traits, and error definitions for the Reprompt long-context
//! evaluation harness. Every other crate in the workspace depends inward on
//! this one.
//!
//! ## Design Philosophy
//!
//! The two external capabilities the harness relies on are defined here as
//! traits; implementations live in their respective crates:
//! - [`TokenCounter`]: text → token count for one model
//! - [`CompletionProvider`]: prompt → generated text + token usage
//!
//! This keeps the context-assembly engine free of network and tokenizer
//! dependencies and makes every stage testable with stubs.

pub mod error;
pub mod example;
pub mod json;
pub mod provider;
pub mod tokens;

// Re-export key types at crate root for ergonomics
pub use error::{DatasetError, Error, ProviderError, Result, TokenizeError};
pub use example::{Answer, ExampleKey, MaterializedExample, RawExample, NOT_AVAILABLE};
pub use json::first_json_object;
pub use provider::{Completion, CompletionProvider, CompletionRequest};
pub use tokens::TokenCounter;
