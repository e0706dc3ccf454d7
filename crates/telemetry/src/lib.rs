//! Usage and cost tracking for Reprompt.
//!
//! Keeps per-model token totals and run outcomes for a process, estimates
//! spend from a built-in pricing table, and persists snapshots so usage can
//! be reported across sweeps.

pub mod ledger;
pub mod model;
pub mod pricing;

pub use ledger::UsageLedger;
pub use model::{ModelUsage, RunStatus, UsageSnapshot};
pub use pricing::{ModelPricing, PricingTable};

/// Errors from the telemetry subsystem.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}
