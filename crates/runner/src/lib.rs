//! # Reprompt Runner
//!
//! Turns materialized examples into provider prompts, runs them, and
//! persists one JSON record per run at a path derived from the run
//! parameters.
//!
//! ```text
//! RunSpec ──▶ DatasetAdapter::get ──▶ PromptBuilder ──▶ CompletionProvider
//!                                                             │
//!                              results/{mode}/.../a{pos}.json ◀┘
//! ```

pub mod prompt;
pub mod record;
pub mod response;
pub mod runner;
pub mod strategy;
pub mod sweep;

#[cfg(test)]
pub(crate) mod test_support;

pub use prompt::{BuiltPrompt, PromptBuilder};
pub use record::{output_path, Response, RunRecord, CONTENT_BLOCKED};
pub use response::ModelAnswer;
pub use runner::{PromptRunner, RunOutcome};
pub use strategy::{RunSpec, Strategy};
pub use sweep::{Sweep, SweepKind, SweepPlan, SweepSummary, SweepVariant, DEFAULT_REPEAT_INTERVAL};
