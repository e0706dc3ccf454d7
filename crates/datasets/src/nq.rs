//! Natural Questions (open, Contriever-retrieved documents).
//!
//! JSON lines, optionally gzip-compressed. Only the first 255 lines are
//! used, minus a handful whose gold annotation is unusable.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use reprompt_core::{Answer, DatasetError, RawExample};
use serde::Deserialize;

use crate::corpus::{malformed, open_existing};

const LINE_LIMIT: usize = 255;
const SKIPPED_LINES: [usize; 5] = [13, 32, 40, 164, 216];

#[derive(Debug, Clone, Deserialize)]
struct NqRecord {
    question: String,
    answers: Vec<String>,
    ctxs: Vec<NqContext>,
    nq_annotated_gold: NqGold,
}

#[derive(Debug, Clone, Deserialize)]
struct NqContext {
    text: String,
    #[serde(default)]
    hasanswer: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct NqGold {
    chunked_long_answer: String,
}

#[derive(Debug)]
pub struct NqCorpus {
    records: Vec<NqRecord>,
}

impl NqCorpus {
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let file = open_existing(path)?;
        let reader: Box<dyn Read> = if path.extension().is_some_and(|ext| ext == "gz") {
            Box::new(MultiGzDecoder::new(file))
        } else {
            Box::new(file)
        };
        Self::from_reader(BufReader::new(reader), path)
    }

    /// Parse JSON lines from `reader`; `path` is only used in error messages.
    pub fn from_reader(reader: impl BufRead, path: &Path) -> Result<Self, DatasetError> {
        let mut records = Vec::new();
        for (index, line) in reader.lines().enumerate().take(LINE_LIMIT) {
            let line = line.map_err(|e| malformed(path, e))?;
            if SKIPPED_LINES.contains(&index) || line.trim().is_empty() {
                continue;
            }
            let record: NqRecord = serde_json::from_str(&line)
                .map_err(|e| malformed(path, format!("line {}: {e}", index + 1)))?;
            records.push(record);
        }
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn raw_example(&self, question_id: usize) -> Result<RawExample, DatasetError> {
        let record = self
            .records
            .get(question_id)
            .ok_or(DatasetError::InvalidIndex {
                question_id,
                len: self.records.len(),
            })?;

        Ok(RawExample {
            question: record.question.clone(),
            answer: Answer::Many(record.answers.clone()),
            gold_passage: record.nq_annotated_gold.chunked_long_answer.trim().to_string(),
            filler_passages: record
                .ctxs
                .iter()
                .filter(|ctx| !ctx.hasanswer)
                .map(|ctx| ctx.text.clone())
                .collect(),
        })
    }
}
