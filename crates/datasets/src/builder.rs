//! Builds the PubMed corpus directory.
//!
//! Two steps, run in order by `reprompt build-pubmed`:
//! 1. [`collect_abstracts`] normalizes a raw abstract dump into
//!    `abstracts.json`.
//! 2. [`generate_questions`] asks a completion provider for one
//!    question/answer pair per selected abstract and writes
//!    `questions.json`.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use reprompt_core::{
    first_json_object, CompletionProvider, CompletionRequest, Error, ProviderError, Result,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::corpus::read_json;
use crate::pubmed::{PubMedAbstract, PubMedQuestion, ABSTRACTS_FILE, QUESTIONS_FILE};

const QUESTION_MAX_TOKENS: u32 = 256;

/// Accepted shapes of the raw abstract dump.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SourceDump {
    Records(Vec<SourceRecord>),
    ById(BTreeMap<String, String>),
}

#[derive(Debug, Deserialize)]
struct SourceRecord {
    #[serde(default, alias = "pmid", alias = "PMID")]
    id: Option<Value>,
    #[serde(default, alias = "ArticleTitle")]
    title: Option<String>,
    #[serde(default, alias = "abstract", alias = "AbstractText")]
    text: Option<String>,
}

fn id_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Normalize `source` into `{out_dir}/abstracts.json`.
///
/// Records without abstract text are skipped, duplicate ids keep their first
/// occurrence and missing ids are replaced by the record's position. Returns
/// the number of abstracts written.
pub fn collect_abstracts(source: &Path, out_dir: &Path) -> Result<usize> {
    let dump: SourceDump = read_json(source)?;

    let candidates: Vec<(String, String, String)> = match dump {
        SourceDump::Records(records) => records
            .into_iter()
            .enumerate()
            .map(|(i, r)| {
                (
                    r.id.map(id_string).unwrap_or_else(|| i.to_string()),
                    r.title.unwrap_or_default(),
                    r.text.unwrap_or_default(),
                )
            })
            .collect(),
        SourceDump::ById(map) => map
            .into_iter()
            .map(|(id, text)| (id, String::new(), text))
            .collect(),
    };

    let mut seen = HashSet::new();
    let mut abstracts = Vec::new();
    for (id, title, text) in candidates {
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            continue;
        }
        if !seen.insert(id.clone()) {
            debug!(%id, "Skipping duplicate abstract");
            continue;
        }
        abstracts.push(PubMedAbstract {
            id,
            title: title.trim().to_string(),
            text,
        });
    }

    std::fs::create_dir_all(out_dir)?;
    let path = out_dir.join(ABSTRACTS_FILE);
    std::fs::write(&path, serde_json::to_string_pretty(&abstracts)?)?;
    info!(count = abstracts.len(), path = %path.display(), "Wrote abstracts");
    Ok(abstracts.len())
}

/// Indices of `count` abstracts spread evenly over `total`.
fn spread(total: usize, count: usize) -> Vec<usize> {
    if total == 0 || count == 0 {
        return Vec::new();
    }
    let step = (total / count).max(1);
    (0..total).step_by(step).take(count).collect()
}

fn question_prompt(abstract_: &PubMedAbstract) -> String {
    format!(
        "Below is the abstract of a biomedical research paper.\n\n\
         <ABSTRACT>\n{}\n</ABSTRACT>\n\n\
         Write one factual question that can only be answered by reading this abstract, \
         together with its short answer of a few words. The question must make sense \
         to a reader who does not see the abstract. Respond with a JSON object of the form \
         {{\"question\": \"...\", \"answer\": \"...\"}} and nothing else.",
        abstract_.passage()
    )
}

fn parse_question(abstract_id: &str, output: &str) -> Option<PubMedQuestion> {
    let object = first_json_object(output)?;
    let field = |name: &str| {
        object
            .get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    Some(PubMedQuestion {
        abstract_id: abstract_id.to_string(),
        question: field("question")?,
        answer: field("answer")?,
    })
}

/// Generate up to `num_questions` questions from `{out_dir}/abstracts.json`
/// and write `{out_dir}/questions.json`.
///
/// Blocked prompts and unparsable answers are skipped. Authentication and
/// configuration failures abort the build. Returns the number of questions
/// written.
pub async fn generate_questions(
    provider: &dyn CompletionProvider,
    out_dir: &Path,
    num_questions: usize,
) -> Result<usize> {
    let abstracts: Vec<PubMedAbstract> = read_json(&out_dir.join(ABSTRACTS_FILE))?;

    let mut questions = Vec::new();
    for index in spread(abstracts.len(), num_questions) {
        let abstract_ = &abstracts[index];
        let request = CompletionRequest::new(question_prompt(abstract_), QUESTION_MAX_TOKENS);

        match provider.complete(request).await {
            Ok(completion) => match parse_question(&abstract_.id, &completion.text) {
                Some(question) => questions.push(question),
                None => warn!(id = %abstract_.id, "Unparsable question, skipping abstract"),
            },
            Err(e @ (ProviderError::AuthenticationFailed(_) | ProviderError::NotConfigured(_))) => {
                return Err(Error::Provider(e));
            }
            Err(e) => warn!(
                id = %abstract_.id,
                error = %e,
                "Question generation failed, skipping abstract"
            ),
        }
    }

    let path = out_dir.join(QUESTIONS_FILE);
    std::fs::write(&path, serde_json::to_string_pretty(&questions)?)?;
    info!(count = questions.len(), path = %path.display(), "Wrote questions");
    Ok(questions.len())
}
