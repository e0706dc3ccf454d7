//! Token counters used to measure pages.

use std::sync::Arc;

use reprompt_config::AppConfig;
use reprompt_core::{Error, TokenCounter, TokenizeError};
use tiktoken_rs::CoreBPE;
use tracing::warn;

/// BPE counter backed by `tiktoken-rs`.
///
/// Accepts either an encoding name (`cl100k_base`, `o200k_base`, ...) or a
/// model name. Models tiktoken does not know, such as Claude models, are
/// measured with `cl100k_base`.
pub struct TiktokenCounter {
    model: String,
    bpe: CoreBPE,
}

impl TiktokenCounter {
    pub fn new(model_or_encoding: &str) -> Result<Self, Error> {
        let bpe = match model_or_encoding {
            "cl100k_base" => tiktoken_rs::cl100k_base(),
            "o200k_base" => tiktoken_rs::o200k_base(),
            "p50k_base" => tiktoken_rs::p50k_base(),
            "r50k_base" => tiktoken_rs::r50k_base(),
            model => tiktoken_rs::get_bpe_from_model(model).or_else(|_| {
                warn!(model, "No tiktoken encoding for model, using cl100k_base");
                tiktoken_rs::cl100k_base()
            }),
        }
        .map_err(|e| Error::config(format!("Failed to load tiktoken encoding: {e}")))?;

        Ok(Self {
            model: model_or_encoding.to_string(),
            bpe,
        })
    }
}

impl TokenCounter for TiktokenCounter {
    fn model(&self) -> &str {
        &self.model
    }

    fn count(&self, text: &str) -> Result<usize, TokenizeError> {
        Ok(self.bpe.encode_ordinary(text).len())
    }
}

/// Rough estimate of one token per four characters.
///
/// Needs no vocabulary files, which makes it suitable for dry runs and
/// offline testing.
#[derive(Debug, Clone)]
pub struct HeuristicCounter {
    model: String,
}

impl HeuristicCounter {
    pub const CHARS_PER_TOKEN: usize = 4;

    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

impl TokenCounter for HeuristicCounter {
    fn model(&self) -> &str {
        &self.model
    }

    fn count(&self, text: &str) -> Result<usize, TokenizeError> {
        Ok(text.chars().count().div_ceil(Self::CHARS_PER_TOKEN))
    }
}

/// Counter backed by a HuggingFace `tokenizer.json`.
#[cfg(feature = "hf-tokenizer")]
pub struct HfTokenizerCounter {
    model: String,
    tokenizer: tokenizers::Tokenizer,
}

#[cfg(feature = "hf-tokenizer")]
impl HfTokenizerCounter {
    pub fn from_file(path: &std::path::Path) -> Result<Self, Error> {
        let tokenizer = tokenizers::Tokenizer::from_file(path).map_err(|e| {
            Error::config(format!("Failed to load tokenizer {}: {e}", path.display()))
        })?;
        Ok(Self {
            model: path.display().to_string(),
            tokenizer,
        })
    }
}

#[cfg(feature = "hf-tokenizer")]
impl TokenCounter for HfTokenizerCounter {
    fn model(&self) -> &str {
        &self.model
    }

    fn count(&self, text: &str) -> Result<usize, TokenizeError> {
        self.tokenizer
            .encode(text, false)
            .map(|encoding| encoding.len())
            .map_err(|e| TokenizeError {
                model: self.model.clone(),
                len: text.len(),
                reason: e.to_string(),
            })
    }
}

/// Build the counter selected by `config.tokenizer`.
pub fn build_counter(config: &AppConfig) -> Result<Arc<dyn TokenCounter>, Error> {
    let target = config.tokenizer.encoding.as_deref().unwrap_or(&config.model);
    match config.tokenizer.kind.as_str() {
        "tiktoken" => Ok(Arc::new(TiktokenCounter::new(target)?)),
        "heuristic" => Ok(Arc::new(HeuristicCounter::new(target))),
        "huggingface" => build_hf_counter(config),
        other => Err(Error::config(format!(
            "Unknown tokenizer kind '{other}' (expected tiktoken, heuristic or huggingface)"
        ))),
    }
}

#[cfg(feature = "hf-tokenizer")]
fn build_hf_counter(config: &AppConfig) -> Result<Arc<dyn TokenCounter>, Error> {
    let path = config
        .tokenizer
        .path
        .as_deref()
        .ok_or_else(|| Error::config("tokenizer.path is required for the huggingface tokenizer"))?;
    Ok(Arc::new(HfTokenizerCounter::from_file(path)?))
}

#[cfg(not(feature = "hf-tokenizer"))]
fn build_hf_counter(_config: &AppConfig) -> Result<Arc<dyn TokenCounter>, Error> {
    Err(Error::config(
        "huggingface tokenizer requested but reprompt was built without the hf-tokenizer feature",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_rounds_up() {
        let counter = HeuristicCounter::new("offline");
        assert_eq!(counter.count("").unwrap(), 0);
        assert_eq!(counter.count("abcd").unwrap(), 1);
        assert_eq!(counter.count("abcde").unwrap(), 2);
        assert_eq!(counter.model(), "offline");
    }

    #[test]
    fn tiktoken_counts_words() {
        let counter = TiktokenCounter::new("cl100k_base").unwrap();
        assert_eq!(counter.count("hello world").unwrap(), 2);
        assert_eq!(counter.count("").unwrap(), 0);
    }

    #[test]
    fn tiktoken_falls_back_for_unknown_models() {
        let counter = TiktokenCounter::new("claude-2.1").unwrap();
        assert_eq!(counter.model(), "claude-2.1");
        assert!(counter.count("some text").unwrap() > 0);
    }

    #[test]
    fn tiktoken_is_deterministic() {
        let counter = TiktokenCounter::new("gpt-4").unwrap();
        let text = "\n<PAGE {PAGE}>\nThe quick brown fox.\n</PAGE {PAGE}>\n";
        assert_eq!(counter.count(text).unwrap(), counter.count(text).unwrap());
    }

    #[test]
    fn build_counter_by_kind() {
        let mut config = AppConfig::default();
        config.tokenizer.kind = "heuristic".into();
        let counter = build_counter(&config).unwrap();
        assert_eq!(counter.model(), config.model);

        config.tokenizer.kind = "sentencepiece".into();
        assert!(build_counter(&config).is_err());
    }

    #[cfg(not(feature = "hf-tokenizer"))]
    #[test]
    fn huggingface_requires_feature() {
        let mut config = AppConfig::default();
        config.tokenizer.kind = "huggingface".into();
        let err = build_counter(&config).err().unwrap();
        assert!(err.to_string().contains("hf-tokenizer"));
    }
}
