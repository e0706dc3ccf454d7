//! Parameter sweeps over datasets, context lengths, questions and answer
//! positions.
//!
//! Runs execute one at a time. A run that fails is counted and the sweep
//! moves on; only configuration problems (bad credentials, unknown model
//! class) stop it. A dataset whose files are missing is skipped.

use std::fmt;
use std::str::FromStr;

use reprompt_config::SweepConfig;
use reprompt_core::{DatasetError, Error, ProviderError, Result};
use reprompt_datasets::{DatasetAdapter, DatasetKind};
use reprompt_telemetry::RunStatus;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::runner::PromptRunner;
use crate::strategy::{RunSpec, Strategy};

/// Reminder interval of the standard reprompt strategy.
pub const DEFAULT_REPEAT_INTERVAL: usize = 10_000;

/// Which family of strategies a sweep runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepKind {
    /// Baseline against the standard reprompt strategy.
    Comparison,
    /// Interval tuning, reminder mechanisms and page retrieval.
    Analysis,
}

impl SweepKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SweepKind::Comparison => "comparison",
            SweepKind::Analysis => "analysis",
        }
    }

    /// The strategies this sweep runs on `dataset`, each with its result
    /// folder.
    pub fn variants(self, dataset: DatasetKind) -> Vec<SweepVariant> {
        match self {
            SweepKind::Comparison => vec![
                SweepVariant::new("baseline_vs_reprompt", "baseline", Strategy::baseline()),
                SweepVariant::new(
                    "baseline_vs_reprompt",
                    "reprompt",
                    Strategy::reprompt(DEFAULT_REPEAT_INTERVAL),
                ),
            ],
            SweepKind::Analysis => {
                let mut variants = vec![
                    SweepVariant::new(
                        "analysis/reprompt_tuning",
                        "5k",
                        Strategy::reprompt(5_000),
                    ),
                    SweepVariant::new(
                        "analysis/reprompt_tuning",
                        "20k",
                        Strategy::reprompt(20_000),
                    ),
                    SweepVariant::new(
                        "analysis/reprompt_mechanism",
                        "repeat-before-answer",
                        Strategy::reprompt(DEFAULT_REPEAT_INTERVAL).with_repeat_before_answer(),
                    ),
                    SweepVariant::new(
                        "analysis/reprompt_mechanism",
                        "repeat-at-beginning",
                        Strategy::reprompt(DEFAULT_REPEAT_INTERVAL).with_repeat_at_beginning(),
                    ),
                    SweepVariant::new(
                        "analysis/reprompt_mechanism",
                        "repeat-tag-only",
                        Strategy::reprompt(DEFAULT_REPEAT_INTERVAL).with_repeat_tag_only(),
                    ),
                ];
                if dataset.supports_page_retrieval() {
                    variants.push(SweepVariant::new(
                        "analysis/page_retrieval",
                        "answer-only",
                        Strategy::baseline(),
                    ));
                    variants.push(SweepVariant::new(
                        "analysis/page_retrieval",
                        "page-only",
                        Strategy::baseline().page_only(),
                    ));
                }
                variants
            }
        }
    }
}

impl fmt::Display for SweepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SweepKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "comparison" | "baseline_vs_reprompt" => Ok(SweepKind::Comparison),
            "analysis" => Ok(SweepKind::Analysis),
            other => Err(format!(
                "unknown sweep '{other}' (expected comparison or analysis)"
            )),
        }
    }
}

/// One strategy of a sweep together with where its results go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepVariant {
    pub mode: String,
    pub subfolder: String,
    pub strategy: Strategy,
}

impl SweepVariant {
    fn new(mode: &str, subfolder: &str, strategy: Strategy) -> Self {
        Self {
            mode: mode.into(),
            subfolder: subfolder.into(),
            strategy,
        }
    }
}

/// The full grid of a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepPlan {
    pub kind: SweepKind,
    pub datasets: Vec<DatasetKind>,
    pub context_lengths: Vec<usize>,
    pub answer_step: usize,
    pub question_count: usize,
    pub hotpotqa_question_count: usize,
}

impl SweepPlan {
    pub fn from_config(
        kind: SweepKind,
        config: &SweepConfig,
    ) -> std::result::Result<Self, DatasetError> {
        let datasets = config
            .datasets
            .iter()
            .map(|name| name.parse())
            .collect::<std::result::Result<Vec<DatasetKind>, _>>()?;
        Ok(Self {
            kind,
            datasets,
            context_lengths: config.context_lengths.clone(),
            answer_step: config.answer_step,
            question_count: config.question_count,
            hotpotqa_question_count: config.hotpotqa_question_count,
        })
    }

    pub fn question_count(&self, dataset: DatasetKind) -> usize {
        match dataset {
            DatasetKind::HotPotQa => self.hotpotqa_question_count,
            _ => self.question_count,
        }
    }

    /// `0, step, 2·step, ...` up to and including `total_context`.
    /// HotPotQA only runs with the gold passage at the start.
    pub fn answer_positions(&self, dataset: DatasetKind, total_context: usize) -> Vec<i64> {
        if dataset == DatasetKind::HotPotQa {
            return vec![0];
        }
        (0..=total_context)
            .step_by(self.answer_step.max(1))
            .map(|p| p as i64)
            .collect()
    }

    /// Every run of `dataset`, given that it has `available` questions.
    pub fn specs(&self, dataset: DatasetKind, available: usize) -> Vec<RunSpec> {
        let questions = self.question_count(dataset).min(available);
        let variants = self.kind.variants(dataset);
        let mut specs = Vec::new();
        for &total_context in &self.context_lengths {
            let positions = self.answer_positions(dataset, total_context);
            for question_id in 0..questions {
                for &answer_position in &positions {
                    for variant in &variants {
                        specs.push(
                            RunSpec::new(dataset, question_id, answer_position, total_context)
                                .with_mode(variant.mode.clone())
                                .with_subfolder(variant.subfolder.clone())
                                .with_strategy(variant.strategy.clone()),
                        );
                    }
                }
            }
        }
        specs
    }
}

/// Tally of a finished sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    pub completed: usize,
    pub blocked: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Datasets whose files could not be loaded.
    pub unavailable: Vec<DatasetKind>,
}

impl SweepSummary {
    pub fn total(&self) -> usize {
        self.completed + self.blocked + self.failed + self.skipped
    }

    fn count(&mut self, status: RunStatus) {
        match status {
            RunStatus::Completed => self.completed += 1,
            RunStatus::Blocked => self.blocked += 1,
            RunStatus::Failed => self.failed += 1,
            RunStatus::Skipped => self.skipped += 1,
        }
    }
}

/// Errors that make every remaining run pointless.
fn is_fatal(error: &Error) -> bool {
    matches!(
        error,
        Error::Config { .. }
            | Error::Provider(
                ProviderError::AuthenticationFailed(_) | ProviderError::NotConfigured(_)
            )
    )
}

/// Drives a [`SweepPlan`] through a [`PromptRunner`].
pub struct Sweep<'a> {
    runner: &'a PromptRunner,
    plan: &'a SweepPlan,
}

impl<'a> Sweep<'a> {
    pub fn new(runner: &'a PromptRunner, plan: &'a SweepPlan) -> Self {
        Self { runner, plan }
    }

    /// Run the plan. `open` loads the adapter for one dataset; each adapter,
    /// and with it its caches, is dropped once its dataset is done.
    pub async fn run<F>(&self, open: F) -> Result<SweepSummary>
    where
        F: Fn(DatasetKind) -> std::result::Result<DatasetAdapter, DatasetError>,
    {
        let mut summary = SweepSummary::default();

        for &dataset in &self.plan.datasets {
            let adapter = match open(dataset) {
                Ok(adapter) => adapter,
                Err(DatasetError::Unsupported(name)) => {
                    return Err(DatasetError::Unsupported(name).into());
                }
                Err(e) => {
                    warn!(%dataset, error = %e, "Dataset unavailable, skipping");
                    summary.unavailable.push(dataset);
                    continue;
                }
            };

            let specs = self.plan.specs(dataset, adapter.len());
            info!(
                %dataset,
                sweep = %self.plan.kind,
                runs = specs.len(),
                "Starting dataset"
            );

            for spec in &specs {
                match self.runner.run(&adapter, spec).await {
                    Ok(outcome) => summary.count(outcome.status),
                    Err(e) if is_fatal(&e) => {
                        error!(error = %e, "Aborting sweep");
                        return Err(e);
                    }
                    Err(e) => {
                        warn!(
                            %dataset,
                            question_id = spec.question_id,
                            answer_position = spec.answer_position,
                            total_context = spec.total_context,
                            error = %e,
                            "Run failed"
                        );
                        summary.count(RunStatus::Failed);
                    }
                }
            }
        }

        info!(
            completed = summary.completed,
            blocked = summary.blocked,
            failed = summary.failed,
            skipped = summary.skipped,
            "Sweep finished"
        );
        Ok(summary)
    }
}
