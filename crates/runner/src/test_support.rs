//! Fixtures shared by the runner tests.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use reprompt_core::{
    Completion, CompletionProvider, CompletionRequest, ProviderError, TokenCounter, TokenizeError,
};
use reprompt_datasets::{DatasetAdapter, DatasetKind};

/// One token per whitespace-separated word.
pub struct WordCounter;

impl TokenCounter for WordCounter {
    fn model(&self) -> &str {
        "words"
    }

    fn count(&self, text: &str) -> Result<usize, TokenizeError> {
        Ok(text.split_whitespace().count())
    }
}

/// Replays canned results in order and records every prompt it receives.
pub struct Scripted {
    script: Mutex<Vec<Result<String, ProviderError>>>,
    prompts: Mutex<Vec<String>>,
}

impl Scripted {
    pub fn new(mut script: Vec<Result<String, ProviderError>>) -> Self {
        script.reverse();
        Self {
            script: Mutex::new(script),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with `text`.
    pub fn repeating(text: &str, times: usize) -> Self {
        Self::new((0..times).map(|_| Ok(text.to_string())).collect())
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl CompletionProvider for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.prompt);
        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_else(|| Err(ProviderError::InvalidResponse("script exhausted".into())));
        next.map(|text| Completion {
            text: format!("{}{}", request.seed_text, text),
            input_tokens: 100,
            output_tokens: 10,
            model: "scripted-1".into(),
        })
    }
}

/// A four-topic SQuAD file where topic `i` has paragraph
/// `paragraph number i`, question `question i?` and answer `Answer i`.
/// Every page costs 7 words.
pub fn write_squad(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("squad.json");
    let topics: Vec<_> = (0..4)
        .map(|i| {
            serde_json::json!({
                "title": format!("t{i}"),
                "paragraphs": [{
                    "context": format!("paragraph number {i}"),
                    "qas": [{"question": format!("question {i}?"), "answers": [{"text": format!("Answer {i}")}]}]
                }]
            })
        })
        .collect();
    std::fs::write(&path, serde_json::json!({ "data": topics }).to_string()).unwrap();
    path
}

pub fn squad_adapter(dir: &Path) -> (DatasetAdapter, std::path::PathBuf) {
    let path = write_squad(dir);
    let adapter = DatasetAdapter::open(DatasetKind::Squad, &path, Arc::new(WordCounter)).unwrap();
    (adapter, path)
}
