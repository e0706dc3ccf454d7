//! # Reprompt Scoring
//!
//! Reads persisted run records, scores them against the expected answer or
//! gold page, and writes the summary tables.

pub mod metrics;
pub mod report;

use std::path::PathBuf;

pub use metrics::{fuzzy_match, fuzzy_match_any, normalize};
pub use report::{
    analysis_rows, calculate_score, collect_files, compute_scores, generate_analysis_tables,
    render_analysis_table, tabulate_scores, AnalysisRow, MainTable, ScoreMode, ANALYSIS_METHODS,
};

/// Scoring errors.
#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid run record {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}
