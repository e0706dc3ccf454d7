//! PubMed abstracts with generated questions.
//!
//! The corpus directory holds two files written by the builder:
//!
//! - `abstracts.json`: `[{"id", "title", "text"}]`
//! - `questions.json`: `[{"abstract_id", "question", "answer"}]`
//!
//! Each question's gold passage is the abstract it was generated from; every
//! other abstract is filler.

use std::path::{Path, PathBuf};

use reprompt_core::{Answer, DatasetError, RawExample};
use serde::{Deserialize, Serialize};

use crate::corpus::{malformed, read_json};

pub const ABSTRACTS_FILE: &str = "abstracts.json";
pub const QUESTIONS_FILE: &str = "questions.json";

/// One normalized abstract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubMedAbstract {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub text: String,
}

impl PubMedAbstract {
    /// The passage placed on a page.
    pub fn passage(&self) -> String {
        if self.title.is_empty() {
            self.text.clone()
        } else {
            format!("{}\n{}", self.title, self.text)
        }
    }
}

/// A question generated from one abstract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubMedQuestion {
    pub abstract_id: String,
    pub question: String,
    pub answer: String,
}

#[derive(Debug)]
pub struct PubMedCorpus {
    dir: PathBuf,
    abstracts: Vec<PubMedAbstract>,
    questions: Vec<PubMedQuestion>,
}

impl PubMedCorpus {
    pub fn load(dir: &Path) -> Result<Self, DatasetError> {
        let abstracts = read_json(&dir.join(ABSTRACTS_FILE))?;
        let questions = read_json(&dir.join(QUESTIONS_FILE))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            abstracts,
            questions,
        })
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn abstracts(&self) -> &[PubMedAbstract] {
        &self.abstracts
    }

    pub fn raw_example(&self, question_id: usize) -> Result<RawExample, DatasetError> {
        let question = self.questions.get(question_id).ok_or(DatasetError::InvalidIndex {
            question_id,
            len: self.questions.len(),
        })?;
        let gold = self
            .abstracts
            .iter()
            .find(|a| a.id == question.abstract_id)
            .ok_or_else(|| {
                malformed(
                    &self.dir.join(QUESTIONS_FILE),
                    format!(
                        "question {question_id} refers to unknown abstract {}",
                        question.abstract_id
                    ),
                )
            })?;

        Ok(RawExample {
            question: question.question.clone(),
            answer: Answer::Text(question.answer.clone()),
            gold_passage: gold.passage().trim().to_string(),
            filler_passages: self
                .abstracts
                .iter()
                .filter(|a| a.id != gold.id)
                .map(PubMedAbstract::passage)
                .collect(),
        })
    }
}
