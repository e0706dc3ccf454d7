//! `reprompt usage`: show accumulated token usage and cost.

use reprompt_config::AppConfig;
use reprompt_telemetry::UsageSnapshot;

use super::usage_path;

pub async fn run(reset: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let path = usage_path(&config);

    if reset {
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        println!("Usage reset ({})", path.display());
        return Ok(());
    }

    let snapshot = UsageSnapshot::load(&path)?;
    if snapshot.models.is_empty() {
        println!("No usage recorded yet in {}", path.display());
        return Ok(());
    }

    println!("📊 Usage Snapshot");
    println!("─────────────────────────────────────");
    println!(
        "{:<28} {:>12} {:>10} {:>8} {:>8} {:>8} {:>8} {:>10}",
        "Model", "Input", "Output", "Done", "Blocked", "Failed", "Skipped", "Cost"
    );
    for (model, usage) in &snapshot.models {
        println!(
            "{:<28} {:>12} {:>10} {:>8} {:>8} {:>8} {:>8} ${:>9.4}",
            model,
            usage.input_tokens,
            usage.output_tokens,
            usage.completed,
            usage.blocked,
            usage.failed,
            usage.skipped,
            usage.cost_usd
        );
    }
    println!();
    println!("  Runs:       {}", snapshot.total_runs());
    println!(
        "  Tokens:     {} input / {} output",
        snapshot.total_input_tokens(),
        snapshot.total_output_tokens()
    );
    println!("  Total cost: ${:.4}", snapshot.total_cost_usd());
    if let Some(updated) = snapshot.updated_at {
        println!("  Updated:    {}", updated.format("%Y-%m-%d %H:%M:%S UTC"));
    }

    Ok(())
}
