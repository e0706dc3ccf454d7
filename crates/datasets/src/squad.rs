//! SQuAD v2 training set.
//!
//! One question per topic: the first question of the topic's first
//! paragraph. Every paragraph of every other topic serves as filler.

use std::path::{Path, PathBuf};

use reprompt_core::{Answer, DatasetError, RawExample};
use serde::Deserialize;

use crate::corpus::{malformed, read_json};

#[derive(Debug, Deserialize)]
struct SquadFile {
    data: Vec<SquadTopic>,
}

#[derive(Debug, Deserialize)]
struct SquadTopic {
    paragraphs: Vec<SquadParagraph>,
}

#[derive(Debug, Deserialize)]
struct SquadParagraph {
    context: String,
    qas: Vec<SquadQa>,
}

#[derive(Debug, Deserialize)]
struct SquadQa {
    question: String,
    #[serde(default)]
    answers: Vec<SquadAnswer>,
}

#[derive(Debug, Deserialize)]
struct SquadAnswer {
    text: String,
}

#[derive(Debug)]
pub struct SquadCorpus {
    path: PathBuf,
    topics: Vec<SquadTopic>,
}

impl SquadCorpus {
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let file: SquadFile = read_json(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            topics: file.data,
        })
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn raw_example(&self, question_id: usize) -> Result<RawExample, DatasetError> {
        let topic = self.topics.get(question_id).ok_or(DatasetError::InvalidIndex {
            question_id,
            len: self.topics.len(),
        })?;
        let paragraph = topic
            .paragraphs
            .first()
            .ok_or_else(|| {
                malformed(&self.path, format!("topic {question_id} has no paragraphs"))
            })?;
        let qa = paragraph
            .qas
            .first()
            .ok_or_else(|| malformed(&self.path, format!("topic {question_id} has no questions")))?;
        let answer = qa.answers.first().ok_or_else(|| {
            malformed(
                &self.path,
                format!("first question of topic {question_id} is unanswerable"),
            )
        })?;

        let filler_passages = self
            .topics
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != question_id)
            .flat_map(|(_, topic)| topic.paragraphs.iter().map(|p| p.context.clone()))
            .collect();

        Ok(RawExample {
            question: qa.question.clone(),
            answer: Answer::Text(answer.text.to_lowercase()),
            gold_passage: paragraph.context.trim().to_string(),
            filler_passages,
        })
    }
}
