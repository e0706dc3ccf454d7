//! Loaded corpora behind a single normalizer.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use reprompt_config::DatasetPaths;
use reprompt_core::{DatasetError, RawExample};
use serde::de::DeserializeOwned;
use tracing::info;

use crate::hotpotqa::HotPotQaCorpus;
use crate::kind::DatasetKind;
use crate::nq::NqCorpus;
use crate::pubmed::PubMedCorpus;
use crate::squad::SquadCorpus;

/// A corpus loaded into memory.
#[derive(Debug)]
pub enum Corpus {
    Nq(NqCorpus),
    Squad(SquadCorpus),
    HotPotQa(HotPotQaCorpus),
    PubMed(PubMedCorpus),
}

impl Corpus {
    /// Load the corpus of `kind` from `path` (a directory for PubMed, a file
    /// for the others).
    pub fn load(kind: DatasetKind, path: &Path) -> Result<Self, DatasetError> {
        let corpus = match kind {
            DatasetKind::Nq => Corpus::Nq(NqCorpus::load(path)?),
            DatasetKind::Squad => Corpus::Squad(SquadCorpus::load(path)?),
            DatasetKind::HotPotQa => Corpus::HotPotQa(HotPotQaCorpus::load(path)?),
            DatasetKind::PubMed => Corpus::PubMed(PubMedCorpus::load(path)?),
        };
        info!(dataset = %kind, questions = corpus.len(), path = %path.display(), "Loaded dataset");
        Ok(corpus)
    }

    /// Load the corpus of `kind` from its configured location.
    pub fn load_configured(kind: DatasetKind, paths: &DatasetPaths) -> Result<Self, DatasetError> {
        Self::load(kind, configured_path(kind, paths))
    }

    pub fn kind(&self) -> DatasetKind {
        match self {
            Corpus::Nq(_) => DatasetKind::Nq,
            Corpus::Squad(_) => DatasetKind::Squad,
            Corpus::HotPotQa(_) => DatasetKind::HotPotQa,
            Corpus::PubMed(_) => DatasetKind::PubMed,
        }
    }

    /// Number of addressable question ids.
    pub fn len(&self) -> usize {
        match self {
            Corpus::Nq(c) => c.len(),
            Corpus::Squad(c) => c.len(),
            Corpus::HotPotQa(c) => c.len(),
            Corpus::PubMed(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Normalize question `question_id` into a [`RawExample`].
    pub fn raw_example(&self, question_id: usize) -> Result<RawExample, DatasetError> {
        let len = self.len();
        if question_id >= len {
            return Err(DatasetError::InvalidIndex { question_id, len });
        }
        match self {
            Corpus::Nq(c) => c.raw_example(question_id),
            Corpus::Squad(c) => c.raw_example(question_id),
            Corpus::HotPotQa(c) => c.raw_example(question_id),
            Corpus::PubMed(c) => c.raw_example(question_id),
        }
    }
}

/// The configured location of `kind`'s backing data.
pub fn configured_path(kind: DatasetKind, paths: &DatasetPaths) -> &Path {
    match kind {
        DatasetKind::Nq => &paths.nq,
        DatasetKind::Squad => &paths.squad,
        DatasetKind::HotPotQa => &paths.hotpotqa,
        DatasetKind::PubMed => &paths.pubmed_dir,
    }
}

pub(crate) fn malformed(path: &Path, reason: impl ToString) -> DatasetError {
    DatasetError::Malformed {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

pub(crate) fn open_existing(path: &Path) -> Result<File, DatasetError> {
    if !path.exists() {
        return Err(DatasetError::MissingData {
            path: PathBuf::from(path),
        });
    }
    File::open(path).map_err(|e| malformed(path, e))
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, DatasetError> {
    let file = open_existing(path)?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| malformed(path, e))
}
