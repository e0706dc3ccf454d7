//! Usage data types.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::TelemetryError;

/// How one evaluation run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The model answered and the record was written.
    Completed,
    /// The provider refused the prompt; a blocked record was written.
    Blocked,
    /// Retries were exhausted or the run could not be assembled.
    Failed,
    /// An artifact already existed and overwrite was off.
    Skipped,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunStatus::Completed => "completed",
            RunStatus::Blocked => "blocked",
            RunStatus::Failed => "failed",
            RunStatus::Skipped => "skipped",
        })
    }
}

/// Cumulative usage of one model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Provider calls that returned a completion.
    pub calls: u64,
    pub completed: u64,
    pub blocked: u64,
    pub failed: u64,
    pub skipped: u64,
    pub cost_usd: f64,
}

impl ModelUsage {
    pub fn runs(&self) -> u64 {
        self.completed + self.blocked + self.failed + self.skipped
    }

    pub(crate) fn count(&mut self, status: RunStatus) {
        match status {
            RunStatus::Completed => self.completed += 1,
            RunStatus::Blocked => self.blocked += 1,
            RunStatus::Failed => self.failed += 1,
            RunStatus::Skipped => self.skipped += 1,
        }
    }

    fn absorb(&mut self, other: &ModelUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.calls += other.calls;
        self.completed += other.completed;
        self.blocked += other.blocked;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.cost_usd += other.cost_usd;
    }
}

/// A point-in-time view of the ledger, keyed by model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub models: BTreeMap<String, ModelUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UsageSnapshot {
    pub fn total_input_tokens(&self) -> u64 {
        self.models.values().map(|m| m.input_tokens).sum()
    }

    pub fn total_output_tokens(&self) -> u64 {
        self.models.values().map(|m| m.output_tokens).sum()
    }

    pub fn total_cost_usd(&self) -> f64 {
        self.models.values().map(|m| m.cost_usd).sum()
    }

    pub fn total_runs(&self) -> u64 {
        self.models.values().map(ModelUsage::runs).sum()
    }

    /// Add `other`'s counters into this snapshot.
    pub fn merge(&mut self, other: &UsageSnapshot) {
        for (model, usage) in &other.models {
            self.models.entry(model.clone()).or_default().absorb(usage);
        }
        self.updated_at = self.updated_at.max(other.updated_at);
    }

    /// Read a snapshot previously written by [`save`](Self::save).
    /// A missing file is an empty snapshot.
    pub fn load(path: &Path) -> Result<Self, TelemetryError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), TelemetryError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
