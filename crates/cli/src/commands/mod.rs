//! Subcommand implementations and the helpers they share.

pub mod doctor;
pub mod init;
pub mod materialize;
pub mod pubmed;
pub mod run;
pub mod sweep;
pub mod tables;
pub mod usage;

use std::path::PathBuf;
use std::sync::Arc;

use reprompt_config::AppConfig;
use reprompt_core::{DatasetError, TokenCounter};
use reprompt_datasets::{configured_path, DatasetAdapter, DatasetKind};
use reprompt_runner::Strategy;
use reprompt_telemetry::{UsageLedger, UsageSnapshot};

use crate::StrategyArgs;

/// File below the results directory holding cumulative usage.
const USAGE_FILE: &str = "usage.json";

pub fn usage_path(config: &AppConfig) -> PathBuf {
    config.results_dir.join(USAGE_FILE)
}

/// Load the adapter for `kind` with the configured tokenizer.
pub fn open_adapter(
    config: &AppConfig,
    kind: DatasetKind,
) -> Result<DatasetAdapter, Box<dyn std::error::Error>> {
    let counter = reprompt_providers::build_counter(config)?;
    Ok(load_adapter(config, kind, counter)?)
}

/// Load the adapter for `kind` from its configured path.
pub fn load_adapter(
    config: &AppConfig,
    kind: DatasetKind,
    counter: Arc<dyn TokenCounter>,
) -> Result<DatasetAdapter, DatasetError> {
    DatasetAdapter::open(kind, configured_path(kind, &config.datasets), counter)
}

/// Fold this process's usage into the usage file.
pub fn save_usage(
    config: &AppConfig,
    ledger: &UsageLedger,
) -> Result<UsageSnapshot, Box<dyn std::error::Error>> {
    let path = usage_path(config);
    let mut total = UsageSnapshot::load(&path)?;
    total.merge(&ledger.snapshot());
    total.save(&path)?;
    Ok(total)
}

pub fn new_ledger() -> Arc<UsageLedger> {
    Arc::new(UsageLedger::new())
}

impl StrategyArgs {
    pub fn to_strategy(&self) -> Strategy {
        let mut strategy = match self.repeat_interval {
            Some(interval) => Strategy::reprompt(interval),
            None => Strategy::baseline(),
        };
        strategy.repeat_before_answer = self.repeat_before_answer;
        strategy.repeat_at_beginning = self.repeat_at_beginning;
        strategy.repeat_tag_only = self.repeat_tag_only;
        strategy.return_page_only = self.page_only;
        strategy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_from_flags() {
        let args = StrategyArgs {
            repeat_interval: Some(5000),
            repeat_tag_only: true,
            ..StrategyArgs::default()
        };
        let strategy = args.to_strategy();
        assert_eq!(strategy.reminder_interval(), Some(5000));
        assert!(strategy.repeat_tag_only);
        assert!(!strategy.return_page_only);

        assert_eq!(StrategyArgs::default().to_strategy(), Strategy::baseline());
    }
}
