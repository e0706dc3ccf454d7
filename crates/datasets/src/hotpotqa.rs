//! HotPotQA, restricted to the `hard` split of the training set.
//!
//! A topic lists ten paragraphs as `[title, [sentences]]`, of which the
//! `supporting_facts` titles are the ones needed for the answer. The gold
//! passage joins the supporting paragraphs; the rest of the topic comes first
//! in the filler, followed by every paragraph of the other hard topics.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use reprompt_core::{Answer, DatasetError, RawExample};
use serde::Deserialize;

use crate::corpus::{malformed, read_json};

const HARD_LEVEL: &str = "hard";

#[derive(Debug, Deserialize)]
struct HotPotTopic {
    question: String,
    answer: String,
    supporting_facts: Vec<(String, usize)>,
    context: Vec<(String, Vec<String>)>,
    #[serde(default)]
    level: String,
}

fn paragraph(title: &str, sentences: &[String]) -> String {
    format!("{title}: {}", sentences.concat().trim())
}

#[derive(Debug)]
pub struct HotPotQaCorpus {
    path: PathBuf,
    topics: Vec<HotPotTopic>,
}

impl HotPotQaCorpus {
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let all: Vec<HotPotTopic> = read_json(path)?;
        let topics = all.into_iter().filter(|t| t.level == HARD_LEVEL).collect();
        Ok(Self {
            path: path.to_path_buf(),
            topics,
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

        let supporting: HashSet<&str> = topic
            .supporting_facts
            .iter()
            .map(|(title, _)| title.as_str())
            .collect();

        let (gold, rest): (Vec<_>, Vec<_>) = topic
            .context
            .iter()
            .partition(|(title, _)| supporting.contains(title.as_str()));

        if gold.is_empty() {
            return Err(malformed(
                &self.path,
                format!("hard topic {question_id} has no supporting paragraphs"),
            ));
        }

        let gold_passage = gold
            .iter()
            .map(|(title, sentences)| paragraph(title, sentences))
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut filler_passages: Vec<String> = rest
            .iter()
            .map(|(title, sentences)| paragraph(title, sentences))
            .collect();
        filler_passages.extend(
            self.topics
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != question_id)
                .flat_map(|(_, other)| other.context.iter())
                .map(|(title, sentences)| paragraph(title, sentences)),
        );

        Ok(RawExample {
            question: topic.question.clone(),
            answer: Answer::Text(topic.answer.clone()),
            gold_passage,
            filler_passages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_fixture(dir: &Path) -> PathBuf {
        let path = dir.join("hotpot_train_v1.1.json");
        let data = serde_json::json!([
            {
                "_id": "1", "type": "bridge", "level": "hard",
                "question": "Which city hosts the museum founded by Ada?",
                "answer": "Lyon",
                "supporting_facts": [["Ada", 0], ["Museum", 1]],
                "context": [
                    ["Noise", ["Unrelated ", "text."]],
                    ["Ada", ["Ada founded the museum."]],
                    ["Museum", ["The museum is old.", " It is in Lyon."]]
                ]
            },
            {
                "_id": "2", "type": "comparison", "level": "easy",
                "question": "Skipped?", "answer": "yes",
                "supporting_facts": [["X", 0]],
                "context": [["X", ["x."]]]
            },
            {
                "_id": "3", "type": "bridge", "level": "hard",
                "question": "Who wrote Y?", "answer": "Z",
                "supporting_facts": [["Y", 0]],
                "context": [["Y", ["Y was written by Z."]], ["W", ["W is a river."]]]
            }
        ]);
        std::fs::write(&path, data.to_string()).unwrap();
        path
    }

    #[test]
    fn keeps_only_hard_topics() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = HotPotQaCorpus::load(&write_fixture(dir.path())).unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.raw_example(1).unwrap().question, "Who wrote Y?");
    }

    #[test]
    fn gold_joins_supporting_paragraphs() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = HotPotQaCorpus::load(&write_fixture(dir.path())).unwrap();

        let raw = corpus.raw_example(0).unwrap();
        assert_eq!(raw.answer, Answer::Text("Lyon".into()));
        assert_eq!(
            raw.gold_passage,
            "Ada: Ada founded the museum.\n\nMuseum: The museum is old. It is in Lyon."
        );
    }

    #[test]
    fn filler_is_own_distractors_then_other_topics() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = HotPotQaCorpus::load(&write_fixture(dir.path())).unwrap();

        let raw = corpus.raw_example(0).unwrap();
        assert_eq!(
            raw.filler_passages,
            vec![
                "Noise: Unrelated text.",
                "Y: Y was written by Z.",
                "W: W is a river.",
            ]
        );
    }
}
