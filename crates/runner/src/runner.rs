//! Executes single evaluation runs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use reprompt_config::AppConfig;
use reprompt_core::{
    Answer, CompletionProvider, CompletionRequest, DatasetError, Error, MaterializedExample,
    ProviderError, Result,
};
use reprompt_datasets::DatasetAdapter;
use reprompt_telemetry::{RunStatus, UsageLedger};
use tracing::{debug, info, warn};

use crate::prompt::{BuiltPrompt, PromptBuilder};
use crate::record::{output_path, Response, RunRecord};
use crate::response::ModelAnswer;
use crate::strategy::RunSpec;

/// The result of [`PromptRunner::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub status: RunStatus,
    /// The artifact for this run.
    pub path: PathBuf,
}

/// Turns run specs into provider calls and persisted records.
pub struct PromptRunner {
    provider: Arc<dyn CompletionProvider>,
    results_dir: PathBuf,
    /// Short model name used in result paths, e.g. `gpt4`.
    model_tag: String,
    max_tokens: u32,
    temperature: f32,
    /// Re-run specs whose artifact already exists.
    overwrite: bool,
    ledger: Option<Arc<UsageLedger>>,
}

impl PromptRunner {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        results_dir: impl Into<PathBuf>,
        model_tag: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            results_dir: results_dir.into(),
            model_tag: model_tag.into(),
            max_tokens: 512,
            temperature: 0.0,
            overwrite: false,
            ledger: None,
        }
    }

    /// A runner using the generation settings and result layout of `config`.
    pub fn from_config(provider: Arc<dyn CompletionProvider>, config: &AppConfig) -> Self {
        Self::new(provider, config.results_dir.clone(), config.model_tag())
            .with_max_tokens(config.max_tokens)
            .with_temperature(config.temperature)
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_ledger(mut self, ledger: Arc<UsageLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    pub fn model_tag(&self) -> &str {
        &self.model_tag
    }

    /// The artifact path for `spec`.
    pub fn output_path(&self, spec: &RunSpec) -> PathBuf {
        output_path(&self.results_dir, spec, &self.model_tag)
    }

    /// Execute one run and persist its record.
    ///
    /// A refused prompt is recorded as blocked. A provider failure that
    /// survived retries, a malformed example or an untokenizable passage is
    /// recorded as failed with its error. All of these return `Ok`. Missing
    /// credentials are returned as errors without writing anything.
    pub async fn run(&self, adapter: &DatasetAdapter, spec: &RunSpec) -> Result<RunOutcome> {
        let path = self.output_path(spec);
        if path.exists() && !self.overwrite {
            debug!(path = %path.display(), "Artifact exists, skipping run");
            self.record_status(RunStatus::Skipped);
            return Ok(RunOutcome {
                status: RunStatus::Skipped,
                path,
            });
        }

        let outcome = self.execute(adapter, spec, &path).await;
        match &outcome {
            Ok(status) => self.record_status(*status),
            Err(_) => self.record_status(RunStatus::Failed),
        }
        let status = outcome?;

        info!(
            dataset = %spec.dataset,
            question_id = spec.question_id,
            answer_position = spec.answer_position,
            total_context = spec.total_context,
            mode = %spec.mode,
            subfolder = %spec.subfolder,
            %status,
            "Run finished"
        );
        Ok(RunOutcome { status, path })
    }

    async fn execute(
        &self,
        adapter: &DatasetAdapter,
        spec: &RunSpec,
        path: &Path,
    ) -> Result<RunStatus> {
        let mut record = self.blank_record(spec);

        let (example, built) = match Self::prepare(adapter, spec) {
            Ok(prepared) => prepared,
            Err(e) if is_example_failure(&e) => {
                warn!(path = %path.display(), error = %e, "Could not build prompt for run");
                record.error = Some(e.to_string());
                record.save(path)?;
                return Ok(RunStatus::Failed);
            }
            Err(e) => return Err(e),
        };

        record.question = example.question.clone();
        record.answer = example.answer.clone();
        record.page = example.gold_page_number;
        record.reminders = built.reminders;

        let request = CompletionRequest::new(built.prompt, self.max_tokens)
            .with_temperature(self.temperature)
            .with_seed_text(built.seed_text);

        let status = match self.provider.complete(request).await {
            Ok(completion) => {
                if let Some(ledger) = &self.ledger {
                    ledger.record_completion(
                        self.provider.model(),
                        completion.input_tokens,
                        completion.output_tokens,
                    );
                }
                record.response = ModelAnswer::parse(&completion.text)
                    .map(Response::Answer)
                    .unwrap_or_default();
                if record.response == Response::Unparsed {
                    warn!(path = %path.display(), "No JSON object in model output");
                }
                record.input_tokens = completion.input_tokens;
                record.output_tokens = completion.output_tokens;
                record.output = Some(completion.text);
                RunStatus::Completed
            }
            Err(e) if e.is_rejection() => {
                warn!(path = %path.display(), error = %e, "Prompt rejected by provider");
                record.response = Response::Blocked;
                record.error = Some(e.to_string());
                RunStatus::Blocked
            }
            Err(
                e @ (ProviderError::AuthenticationFailed(_) | ProviderError::NotConfigured(_)),
            ) => return Err(Error::Provider(e)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Provider call failed");
                record.error = Some(e.to_string());
                RunStatus::Failed
            }
        };

        record.completed_at = Utc::now();
        record.save(path)?;
        Ok(status)
    }

    fn prepare(
        adapter: &DatasetAdapter,
        spec: &RunSpec,
    ) -> Result<(Arc<MaterializedExample>, BuiltPrompt)> {
        let example = adapter.get(spec.question_id, spec.answer_position, spec.total_context)?;
        let built = PromptBuilder::new(adapter.counter().as_ref()).build(&example, &spec.strategy)?;
        Ok((example, built))
    }

    /// A record with the run parameters filled in and nothing observed yet.
    fn blank_record(&self, spec: &RunSpec) -> RunRecord {
        RunRecord {
            dataset: spec.dataset,
            question_id: spec.question_id,
            answer_position: spec.answer_position,
            total_context: spec.total_context,
            question: String::new(),
            answer: Answer::not_available(),
            page: 0,
            response: Response::Unparsed,
            output: None,
            mode: spec.mode.clone(),
            subfolder: spec.subfolder.clone(),
            strategy: spec.strategy.clone(),
            model: self.provider.model().to_string(),
            input_tokens: 0,
            output_tokens: 0,
            reminders: 0,
            error: None,
            completed_at: Utc::now(),
        }
    }

    fn record_status(&self, status: RunStatus) {
        if let Some(ledger) = &self.ledger {
            ledger.record_run(self.provider.model(), status);
        }
    }
}

/// Failures confined to one example: a bad question id, a malformed
/// dataset entry or an untokenizable passage.
fn is_example_failure(e: &Error) -> bool {
    matches!(
        e,
        Error::Dataset(DatasetError::InvalidIndex { .. } | DatasetError::Malformed { .. })
            | Error::Tokenize(_)
    )
}
