//! Thread-safe usage ledger.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::Utc;
use tracing::debug;

use crate::model::{ModelUsage, RunStatus, UsageSnapshot};
use crate::pricing::PricingTable;

/// Accumulates token usage, cost and run outcomes per model.
///
/// Shared by every run in a process; the provider call of each run reports
/// its token usage here and the runner reports how the run ended.
pub struct UsageLedger {
    pricing: PricingTable,
    totals: RwLock<HashMap<String, ModelUsage>>,
}

impl UsageLedger {
    /// Create a ledger with the built-in pricing table.
    pub fn new() -> Self {
        Self::with_pricing(PricingTable::with_defaults())
    }

    pub fn with_pricing(pricing: PricingTable) -> Self {
        Self {
            pricing,
            totals: RwLock::new(HashMap::new()),
        }
    }

    pub fn pricing(&self) -> &PricingTable {
        &self.pricing
    }

    /// Record the token usage of one successful provider call.
    pub fn record_completion(&self, model: &str, input_tokens: u32, output_tokens: u32) {
        let cost =
            self.pricing
                .compute_cost(model, u64::from(input_tokens), u64::from(output_tokens));
        let mut totals = self.totals.write().unwrap_or_else(PoisonError::into_inner);
        let usage = totals.entry(model.to_string()).or_default();
        usage.input_tokens += u64::from(input_tokens);
        usage.output_tokens += u64::from(output_tokens);
        usage.calls += 1;
        usage.cost_usd += cost;
        debug!(model, input_tokens, output_tokens, cost_usd = cost, "Recorded completion");
    }

    /// Record how one run ended.
    pub fn record_run(&self, model: &str, status: RunStatus) {
        self.totals
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(model.to_string())
            .or_default()
            .count(status);
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        let totals = self.totals.read().unwrap_or_else(PoisonError::into_inner);
        UsageSnapshot {
            models: totals
                .iter()
                .map(|(model, usage)| (model.clone(), usage.clone()))
                .collect(),
            updated_at: Some(Utc::now()),
        }
    }
}

impl Default for UsageLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::ModelPricing;
    use std::sync::Arc;

    #[test]
    fn accumulates_tokens_and_cost() {
        let ledger = UsageLedger::new();
        ledger.record_completion("gpt-4-1106-preview", 1000, 100);
        ledger.record_completion("gpt-4-1106-preview", 1000, 100);

        let snapshot = ledger.snapshot();
        let usage = &snapshot.models["gpt-4-1106-preview"];
        assert_eq!(usage.input_tokens, 2000);
        assert_eq!(usage.output_tokens, 200);
        assert_eq!(usage.calls, 2);
        // 2 × (1000 × $10 + 100 × $30) / 1M
        assert!((usage.cost_usd - 0.026).abs() < 1e-10);
    }

    #[test]
    fn counts_outcomes() {
        let ledger = UsageLedger::with_pricing(PricingTable::empty());
        ledger.record_run("m", RunStatus::Completed);
        ledger.record_run("m", RunStatus::Blocked);
        ledger.record_run("m", RunStatus::Skipped);
        ledger.record_run("m", RunStatus::Failed);
        ledger.record_run("m", RunStatus::Completed);

        let usage = &ledger.snapshot().models["m"];
        assert_eq!(usage.completed, 2);
        assert_eq!(usage.blocked, 1);
        assert_eq!(usage.failed, 1);
        assert_eq!(usage.skipped, 1);
        assert_eq!(usage.runs(), 5);
    }

    #[test]
    fn concurrent_recording() {
        let pricing = PricingTable::empty();
        pricing.set("m", ModelPricing::new(1.0, 1.0));
        let ledger = Arc::new(UsageLedger::with_pricing(pricing));

        std::thread::scope(|scope| {
            for _ in 0..4 {
                let ledger = Arc::clone(&ledger);
                scope.spawn(move || {
                    for _ in 0..100 {
                        ledger.record_completion("m", 10, 1);
                    }
                });
            }
        });

        let snapshot = ledger.snapshot();
        assert_eq!(snapshot.models["m"].calls, 400);
        assert_eq!(snapshot.total_input_tokens(), 4000);
    }
}
