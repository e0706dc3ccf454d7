//! Parsing model output into an answer.

use reprompt_core::first_json_object;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The structured answer a model was asked to produce.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelAnswer {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub page: Option<i64>,
}

impl ModelAnswer {
    /// Extract the first JSON object in `output`.
    ///
    /// Lenient about field types: numeric answers are stringified, page
    /// numbers may arrive as strings or floats. Returns `None` when the
    /// output holds no JSON object at all.
    pub fn parse(output: &str) -> Option<Self> {
        let object = first_json_object(output)?;
        Some(Self {
            answer: object.get("answer").and_then(answer_text),
            page: object.get("page").and_then(page_number),
        })
    }
}

fn answer_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(answer_text)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        other => Some(other.to_string()),
    }
}

fn page_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s
            .trim()
            .trim_start_matches(|c: char| !c.is_ascii_digit() && c != '-')
            .parse()
            .ok(),
        _ => None,
    }
}
