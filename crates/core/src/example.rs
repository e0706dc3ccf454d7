//! Example types: what a dataset produces and what the assembler returns.

use serde::{Deserialize, Serialize};

/// Sentinel answer used when the gold passage is deliberately omitted.
pub const NOT_AVAILABLE: &str = "n/a";

/// The expected answer to a question.
///
/// Some corpora provide a single reference string, others a list of
/// acceptable aliases. Serialized untagged so a record holds either a JSON
/// string or a JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Text(String),
    Many(Vec<String>),
}

impl Answer {
    /// The `"n/a"` sentinel.
    pub fn not_available() -> Self {
        Self::Text(NOT_AVAILABLE.into())
    }

    /// Whether this is the `"n/a"` sentinel.
    pub fn is_not_available(&self) -> bool {
        matches!(self, Self::Text(t) if t == NOT_AVAILABLE)
    }

    /// All acceptable answer strings.
    pub fn candidates(&self) -> Vec<&str> {
        match self {
            Self::Text(t) => vec![t.as_str()],
            Self::Many(list) => list.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for Answer {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Answer {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<String>> for Answer {
    fn from(list: Vec<String>) -> Self {
        Self::Many(list)
    }
}

impl std::fmt::Display for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(t) => f.write_str(t),
            Self::Many(list) => f.write_str(&list.join(" | ")),
        }
    }
}

/// A normalized question/answer/gold/filler tuple.
///
/// Produced once per question id by a dataset adapter; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawExample {
    pub question: String,
    pub answer: Answer,
    /// The passage that actually contains the answer.
    pub gold_passage: String,
    /// Distractor passages in the dataset's natural order.
    pub filler_passages: Vec<String>,
}

/// The fully assembled document for one
/// `(question_id, answer_position, total_context)` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterializedExample {
    pub question: String,
    /// The true answer, or the `"n/a"` sentinel when the gold passage was
    /// omitted on purpose.
    pub answer: Answer,
    /// 1-based page holding the gold passage, or the last emitted page when
    /// the gold passage never made it into the document.
    pub gold_page_number: usize,
    /// Paginated document, trimmed of surrounding whitespace.
    pub document: String,
    /// Number of pages emitted.
    pub page_count: usize,
    /// Byte offset in `document` where each page ends, in page order.
    #[serde(default)]
    pub page_ends: Vec<usize>,
    /// Token cost of all emitted pages.
    pub emitted_tokens: usize,
    /// Whether the gold page is physically present in the document.
    pub gold_inserted: bool,
}

/// Cache key for materialized examples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExampleKey {
    pub question_id: usize,
    /// Token offset for the gold passage; negative omits it.
    pub answer_position: i64,
    /// Token budget for the document.
    pub total_context: usize,
}

impl MaterializedExample {
    /// The document cut at its page boundaries. A document without
    /// recorded boundaries is returned as a single page.
    pub fn pages(&self) -> Vec<&str> {
        if self.document.is_empty() {
            return Vec::new();
        }
        if self.page_ends.is_empty() {
            return vec![self.document.as_str()];
        }

        let mut pages = Vec::with_capacity(self.page_ends.len());
        let mut start = 0;
        for &end in &self.page_ends {
            let end = end.clamp(start, self.document.len());
            pages.push(&self.document[start..end]);
            start = end;
        }
        if let Some(last) = pages.last_mut() {
            let begin = start - last.len();
            *last = &self.document[begin..];
        }
        pages
    }
}

impl ExampleKey {
    pub fn new(question_id: usize, answer_position: i64, total_context: usize) -> Self {
        Self {
            question_id,
            answer_position,
            total_context,
        }
    }
}
