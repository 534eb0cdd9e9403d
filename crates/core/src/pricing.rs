//! Static pricing table for cost estimates.
//!
//! Single source of truth for:
//! - `ModelPricing` (per-model rates, USD per million tokens)
//! - `PricingTable::cost()` with exact → prefix → family fallback
//! - Model family / display-name helpers

use std::collections::BTreeMap;

use crate::types::TokenUsage;

/// Per-model pricing in USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
    pub cache_write_per_million: f64,
    pub cache_read_per_million: f64,
}

impl ModelPricing {
    pub const fn new(input: f64, output: f64, cache_write: f64, cache_read: f64) -> Self {
        Self {
            input_per_million: input,
            output_per_million: output,
            cache_write_per_million: cache_write,
            cache_read_per_million: cache_read,
        }
    }

    pub fn cost(&self, usage: &TokenUsage) -> f64 {
        const PER: f64 = 1_000_000.0;
        usage.input_tokens as f64 / PER * self.input_per_million
            + usage.output_tokens as f64 / PER * self.output_per_million
            + usage.cache_write_tokens as f64 / PER * self.cache_write_per_million
            + usage.cache_read_tokens as f64 / PER * self.cache_read_per_million
    }
}

const OPUS: ModelPricing = ModelPricing::new(15.0, 75.0, 18.75, 1.50);
const SONNET: ModelPricing = ModelPricing::new(3.0, 15.0, 3.75, 0.30);
const HAIKU: ModelPricing = ModelPricing::new(0.80, 4.0, 1.00, 0.08);

/// Model used when an id matches nothing in the table.
pub const DEFAULT_FALLBACK_MODEL: &str = "claude-sonnet-4-5-20250929";

/// Lookup table from model id to pricing.
#[derive(Debug, Clone)]
pub struct PricingTable {
    models: BTreeMap<String, ModelPricing>,
    fallback: Option<String>,
}

impl Default for PricingTable {
    fn default() -> Self {
        let models = [
            ("claude-opus-4-6", OPUS),
            ("claude-opus-4-5-20251101", OPUS),
            ("claude-sonnet-4-6", SONNET),
            ("claude-sonnet-4-5-20250929", SONNET),
            ("claude-haiku-4-5-20251001", HAIKU),
        ];
        Self::new(models, Some(DEFAULT_FALLBACK_MODEL))
    }
}

impl PricingTable {
    pub fn new<I, K>(models: I, fallback: Option<&str>) -> Self
    where
        I: IntoIterator<Item = (K, ModelPricing)>,
        K: Into<String>,
    {
        Self {
            models: models.into_iter().map(|(k, p)| (k.into(), p)).collect(),
            fallback: fallback.map(String::from),
        }
    }

    /// Look up pricing for a model id.
    ///
    /// Fallback chain:
    /// 1. Exact match
    /// 2. Longest key that is a prefix of `model_id` ("claude-opus-4-6" matches "claude-opus-4-6-20260201")
    /// 3. First key of the same family (`opus`, `sonnet`, `haiku`) as `model_id`
    /// 4. The table's fallback model
    pub fn lookup(&self, model_id: &str) -> Option<&ModelPricing> {
        if let Some(p) = self.models.get(model_id) {
            return Some(p);
        }
        if let Some((_, p)) = self
            .models
            .iter()
            .filter(|(key, _)| model_id.starts_with(key.as_str()))
            .max_by_key(|(key, _)| key.len())
        {
            return Some(p);
        }
        if let Some(family) = model_family(model_id) {
            if let Some((_, p)) = self
                .models
                .iter()
                .find(|(key, _)| model_family(key) == Some(family))
            {
                return Some(p);
            }
        }
        self.fallback.as_deref().and_then(|f| self.models.get(f))
    }

    /// Estimated cost in USD of `usage` billed at `model`'s rates.
    ///
    /// Returns 0 when nothing in the table (including the fallback) applies.
    pub fn cost(&self, model: &str, usage: &TokenUsage) -> f64 {
        self.lookup(model).map(|p| p.cost(usage)).unwrap_or(0.0)
    }
}

/// Model family inferred by substring.
pub fn model_family(model_id: &str) -> Option<&'static str> {
    ["opus", "sonnet", "haiku"]
        .into_iter()
        .find(|family| model_id.contains(family))
}

/// Short human-readable name ("Opus", "Sonnet", "Haiku"), or the id itself.
pub fn model_display_name(model_id: &str) -> String {
    match model_family(model_id) {
        Some("opus") => "Opus".to_string(),
        Some("sonnet") => "Sonnet".to_string(),
        Some("haiku") => "Haiku".to_string(),
        _ => model_id.to_string(),
    }
}
