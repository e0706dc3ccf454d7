//! `reprompt sweep`: execute a parameter sweep.

use reprompt_config::AppConfig;
use reprompt_runner::{PromptRunner, Sweep, SweepKind, SweepPlan};

use super::{load_adapter, new_ledger, save_usage};

pub async fn run(
    kind: &str,
    datasets: Vec<String>,
    context_lengths: Vec<usize>,
    questions: Option<usize>,
    overwrite: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load()?;
    if !datasets.is_empty() {
        config.sweep.datasets = datasets;
    }
    if !context_lengths.is_empty() {
        config.sweep.context_lengths = context_lengths;
    }
    if let Some(n) = questions {
        config.sweep.question_count = n;
        config.sweep.hotpotqa_question_count = n;
    }

    let kind: SweepKind = kind.parse()?;
    let plan = SweepPlan::from_config(kind, &config.sweep)?;
    let provider = reprompt_providers::build_provider(&config)?;
    let counter = reprompt_providers::build_counter(&config)?;

    let ledger = new_ledger();
    let runner = PromptRunner::from_config(provider, &config)
        .with_overwrite(overwrite)
        .with_ledger(ledger.clone());

    let result = Sweep::new(&runner, &plan)
        .run(|dataset| load_adapter(&config, dataset, counter.clone()))
        .await;

    let usage = save_usage(&config, &ledger)?;
    let summary = result?;

    println!("🧪 Sweep `{kind}` finished");
    println!("─────────────────────────────────────");
    println!("  Completed: {}", summary.completed);
    println!("  Blocked:   {}", summary.blocked);
    println!("  Failed:    {}", summary.failed);
    println!("  Skipped:   {}", summary.skipped);
    for dataset in &summary.unavailable {
        println!("  ⚠️  {dataset} unavailable");
    }
    println!(
        "  Usage so far: {} input / {} output tokens, ${:.4}",
        usage.total_input_tokens(),
        usage.total_output_tokens(),
        usage.total_cost_usd()
    );

    Ok(())
}
