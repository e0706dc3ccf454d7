//! `reprompt run`: execute a single evaluation run.

use reprompt_config::AppConfig;
use reprompt_datasets::DatasetKind;
use reprompt_runner::{PromptRunner, RunRecord, RunSpec};

use super::{new_ledger, open_adapter, save_usage};
use crate::{ExampleArgs, StrategyArgs};

pub async fn run(
    args: ExampleArgs,
    strategy: StrategyArgs,
    mode: String,
    subfolder: String,
    overwrite: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let kind: DatasetKind = args.dataset.parse()?;
    let provider = reprompt_providers::build_provider(&config)?;
    let adapter = open_adapter(&config, kind)?;

    let ledger = new_ledger();
    let runner = PromptRunner::from_config(provider, &config)
        .with_overwrite(overwrite)
        .with_ledger(ledger.clone());

    let spec = RunSpec::new(kind, args.question, args.position, args.context)
        .with_mode(mode)
        .with_subfolder(subfolder)
        .with_strategy(strategy.to_strategy());

    let outcome = runner.run(&adapter, &spec).await?;
    save_usage(&config, &ledger)?;

    println!("{}: {}", outcome.status, outcome.path.display());
    if let Ok(record) = RunRecord::load(&outcome.path) {
        println!("{}", serde_json::to_string_pretty(&record.response)?);
    }

    Ok(())
}
