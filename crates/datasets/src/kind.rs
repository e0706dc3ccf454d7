use std::fmt;
use std::str::FromStr;

use reprompt_core::DatasetError;
use serde::{Deserialize, Serialize};

/// The closed set of supported corpora.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Nq,
    Squad,
    #[serde(rename = "hotpotqa")]
    HotPotQa,
    #[serde(rename = "pubmed")]
    PubMed,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 4] = [
        DatasetKind::Nq,
        DatasetKind::Squad,
        DatasetKind::HotPotQa,
        DatasetKind::PubMed,
    ];

    /// Identifier used in CLI arguments, config files and result paths.
    pub fn as_str(self) -> &'static str {
        match self {
            DatasetKind::Nq => "nq",
            DatasetKind::Squad => "squad",
            DatasetKind::HotPotQa => "hotpotqa",
            DatasetKind::PubMed => "pubmed",
        }
    }

    /// Short label used in report tables.
    pub fn label(self) -> &'static str {
        match self {
            DatasetKind::Nq => "NQ",
            DatasetKind::Squad => "SQ",
            DatasetKind::HotPotQa => "HP",
            DatasetKind::PubMed => "PM",
        }
    }

    /// Whether the corpus has a meaningful page-retrieval task.
    pub fn supports_page_retrieval(self) -> bool {
        !matches!(self, DatasetKind::Nq | DatasetKind::HotPotQa)
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetKind {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nq" => Ok(DatasetKind::Nq),
            "squad" => Ok(DatasetKind::Squad),
            "hotpotqa" => Ok(DatasetKind::HotPotQa),
            "pubmed" => Ok(DatasetKind::PubMed),
            _ => Err(DatasetError::Unsupported(s.to_string())),
        }
    }
}
