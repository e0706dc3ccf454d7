//! Persisted run records.
//!
//! One JSON file per run. The scoring layer reads `answer`, `page` and
//! `response`; the rest is kept for inspection and usage accounting.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use reprompt_core::{Answer, Result};
use reprompt_datasets::DatasetKind;
use serde::{Deserialize, Serialize};

use crate::response::ModelAnswer;
use crate::strategy::{RunSpec, Strategy};

/// Stored in place of a response when the provider refused the prompt.
pub const CONTENT_BLOCKED: &str = "CONTENT BLOCKED";

/// What came back from the model.
///
/// Serialized as the parsed object, `null` when nothing usable came back,
/// or the [`CONTENT_BLOCKED`] string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<ResponseRepr>", into = "Option<ResponseRepr>")]
pub enum Response {
    Answer(ModelAnswer),
    Blocked,
    #[default]
    Unparsed,
}

impl Response {
    /// The parsed answer, if any.
    pub fn answer(&self) -> Option<&ModelAnswer> {
        match self {
            Response::Answer(a) => Some(a),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ResponseRepr {
    Answer(ModelAnswer),
    Sentinel(String),
}

impl From<Option<ResponseRepr>> for Response {
    fn from(repr: Option<ResponseRepr>) -> Self {
        match repr {
            Some(ResponseRepr::Answer(a)) => Response::Answer(a),
            Some(ResponseRepr::Sentinel(s)) if s == CONTENT_BLOCKED => Response::Blocked,
            _ => Response::Unparsed,
        }
    }
}

impl From<Response> for Option<ResponseRepr> {
    fn from(response: Response) -> Self {
        match response {
            Response::Answer(a) => Some(ResponseRepr::Answer(a)),
            Response::Blocked => Some(ResponseRepr::Sentinel(CONTENT_BLOCKED.into())),
            Response::Unparsed => None,
        }
    }
}

/// The artifact written for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub dataset: DatasetKind,
    pub question_id: usize,
    pub answer_position: i64,
    pub total_context: usize,
    pub question: String,
    /// Expected answer, `"n/a"` when the gold passage was omitted.
    pub answer: Answer,
    /// Page holding the gold passage.
    pub page: usize,
    #[serde(default)]
    pub response: Response,
    /// Raw model output.
    #[serde(default)]
    pub output: Option<String>,
    pub mode: String,
    #[serde(default)]
    pub subfolder: String,
    #[serde(default)]
    pub strategy: Strategy,
    pub model: String,
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
    #[serde(default)]
    pub reminders: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl RunRecord {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the record, replacing any previous artifact atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// Where the record of `spec` lives:
/// `{results_dir}/{mode}/{dataset}/{model_tag}/c{ctx}/{subfolder}/q{qid}/a{pos}.json`.
///
/// An empty subfolder is left out.
pub fn output_path(results_dir: &Path, spec: &RunSpec, model_tag: &str) -> PathBuf {
    let mut path = results_dir
        .join(&spec.mode)
        .join(spec.dataset.as_str())
        .join(model_tag)
        .join(format!("c{}", spec.total_context));
    if !spec.subfolder.is_empty() {
        path.push(&spec.subfolder);
    }
    path.join(format!("q{}", spec.question_id))
        .join(format!("a{}.json", spec.answer_position))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(response: Response) -> RunRecord {
        RunRecord {
            dataset: DatasetKind::Squad,
            question_id: 2,
            answer_position: 10_000,
            total_context: 40_000,
            question: "q?".into(),
            answer: Answer::from("paris"),
            page: 5,
            response,
            output: Some("{}".into()),
            mode: "analysis/reprompt_tuning".into(),
            subfolder: "5k".into(),
            strategy: Strategy::reprompt(5000),
            model: "gpt-4".into(),
            input_tokens: 10,
            output_tokens: 2,
            reminders: 7,
            error: None,
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn response_wire_forms() {
        let blocked = serde_json::to_value(record(Response::Blocked)).unwrap();
        assert_eq!(blocked["response"], CONTENT_BLOCKED);

        let unparsed = serde_json::to_value(record(Response::Unparsed)).unwrap();
        assert!(unparsed["response"].is_null());

        let answered = serde_json::to_value(record(Response::Answer(ModelAnswer {
            answer: Some("Paris".into()),
            page: Some(5),
        })))
        .unwrap();
        assert_eq!(answered["response"]["answer"], "Paris");
        assert_eq!(answered["response"]["page"], 5);
        assert!(answered.get("error").is_none());
    }

    #[test]
    fn unknown_sentinel_reads_as_unparsed() {
        let response: Response = serde_json::from_str("\"garbled\"").unwrap();
        assert_eq!(response, Response::Unparsed);
        let response: Response = serde_json::from_str("\"CONTENT BLOCKED\"").unwrap();
        assert_eq!(response, Response::Blocked);
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep").join("a0.json");
        let original = record(Response::Answer(ModelAnswer::default()));
        original.save(&path).unwrap();

        assert_eq!(RunRecord::load(&path).unwrap(), original);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn path_layout() {
        let spec = RunSpec::new(DatasetKind::PubMed, 7, 20_000, 40_000)
            .with_mode("analysis/page_retrieval")
            .with_subfolder("page-only");
        assert_eq!(
            output_path(Path::new("results"), &spec, "gpt4"),
            Path::new("results/analysis/page_retrieval/pubmed/gpt4/c40000/page-only/q7/a20000.json")
        );

        let spec = RunSpec::new(DatasetKind::Nq, 0, -1, 10_000).with_mode("default");
        assert_eq!(
            output_path(Path::new("/r"), &spec, "claude"),
            Path::new("/r/default/nq/claude/c10000/q0/a-1.json")
        );
    }
}
