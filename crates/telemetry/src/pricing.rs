//! Built-in pricing table for the models the harness is run against.
//!
//! Prices are in USD per 1 million tokens. Each model has an input and
//! output price. Custom pricing can be added at runtime.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Per-million-token pricing for a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Price per 1M input tokens in USD.
    pub input_per_m: f64,
    /// Price per 1M output tokens in USD.
    pub output_per_m: f64,
}

impl ModelPricing {
    pub fn new(input_per_m: f64, output_per_m: f64) -> Self {
        Self {
            input_per_m,
            output_per_m,
        }
    }

    /// Compute cost for the given token counts.
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 * self.input_per_m + output_tokens as f64 * self.output_per_m)
            / 1_000_000.0
    }
}

/// Thread-safe pricing table with built-in defaults and custom overrides.
pub struct PricingTable {
    prices: RwLock<HashMap<String, ModelPricing>>,
}

impl PricingTable {
    /// Create a pricing table with built-in model prices.
    pub fn with_defaults() -> Self {
        let mut prices = HashMap::new();

        // ── OpenAI ─────────────────────────────────────────────────
        prices.insert("openai/gpt-4".into(), ModelPricing::new(30.0, 60.0));
        prices.insert("openai/gpt-4-32k".into(), ModelPricing::new(60.0, 120.0));
        prices.insert(
            "openai/gpt-4-1106-preview".into(),
            ModelPricing::new(10.0, 30.0),
        );
        prices.insert("openai/gpt-4-turbo".into(), ModelPricing::new(10.0, 30.0));
        prices.insert("openai/gpt-4o".into(), ModelPricing::new(2.5, 10.0));
        prices.insert("openai/gpt-4o-mini".into(), ModelPricing::new(0.15, 0.6));
        prices.insert("openai/gpt-3.5-turbo".into(), ModelPricing::new(0.5, 1.5));

        // ── Anthropic ──────────────────────────────────────────────
        prices.insert("anthropic/claude-2".into(), ModelPricing::new(8.0, 24.0));
        prices.insert(
            "anthropic/claude-instant-1".into(),
            ModelPricing::new(0.8, 2.4),
        );
        prices.insert(
            "anthropic/claude-3-opus".into(),
            ModelPricing::new(15.0, 75.0),
        );
        prices.insert(
            "anthropic/claude-3-sonnet".into(),
            ModelPricing::new(3.0, 15.0),
        );
        prices.insert(
            "anthropic/claude-3-haiku".into(),
            ModelPricing::new(0.25, 1.25),
        );
        prices.insert(
            "anthropic/claude-3-5-sonnet".into(),
            ModelPricing::new(3.0, 15.0),
        );

        Self {
            prices: RwLock::new(prices),
        }
    }

    /// Create an empty pricing table.
    pub fn empty() -> Self {
        Self {
            prices: RwLock::new(HashMap::new()),
        }
    }

    /// Add or update pricing for a model.
    pub fn set(&self, model: impl Into<String>, pricing: ModelPricing) {
        self.prices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(model.into(), pricing);
    }

    /// Pricing for `model`, if known.
    ///
    /// Tries an exact match, then the bare name under each provider prefix,
    /// then the longest known name that the model starts with
    /// (`claude-2.1` matches `claude-2`).
    pub fn lookup(&self, model: &str) -> Option<ModelPricing> {
        let prices = self.prices.read().unwrap_or_else(PoisonError::into_inner);

        if let Some(p) = prices.get(model) {
            return Some(p.clone());
        }
        for prefix in ["openai", "anthropic"] {
            if let Some(p) = prices.get(&format!("{prefix}/{model}")) {
                return Some(p.clone());
            }
        }

        let model_lower = model.to_lowercase();
        let bare_model = model_lower.rsplit('/').next().unwrap_or(&model_lower);
        prices
            .iter()
            .map(|(key, pricing)| (key.rsplit('/').next().unwrap_or(key), pricing))
            .filter(|(bare_key, _)| bare_model.starts_with(&bare_key.to_lowercase()))
            .max_by_key(|(bare_key, _)| bare_key.len())
            .map(|(_, pricing)| pricing.clone())
    }

    /// Compute cost for a model, returning 0.0 if the model is not in the table.
    pub fn compute_cost(&self, model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
        self.lookup(model)
            .map(|p| p.cost(input_tokens, output_tokens))
            .unwrap_or(0.0)
    }

    /// Number of models in the pricing table.
    pub fn len(&self) -> usize {
        self.prices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}
