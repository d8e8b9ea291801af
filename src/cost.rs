//! Token pricing and cost computation.
//!
//! Prices are USD per million tokens. Unknown model identifiers fall back to
//! the Sonnet tier.

use serde::{Deserialize, Serialize};

/// Fractional digits kept on every cost figure.
pub const COST_PRECISION: i32 = 6;

/// Input/output price for one model family, USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

/// Pricing used when the model identifier is not recognised.
pub const DEFAULT_PRICING: ModelPricing = ModelPricing {
    input_per_million: 3.0,
    output_per_million: 15.0,
};

// Longest prefix first: "claude-opus-4-5" must win over "claude-opus-4".
const PRICE_TABLE: &[(&str, ModelPricing)] = &[
    (
        "claude-opus-4-5",
        ModelPricing {
            input_per_million: 5.0,
            output_per_million: 25.0,
        },
    ),
    (
        "claude-opus-4",
        ModelPricing {
            input_per_million: 15.0,
            output_per_million: 75.0,
        },
    ),
    (
        "claude-sonnet-4",
        ModelPricing {
            input_per_million: 3.0,
            output_per_million: 15.0,
        },
    ),
    (
        "claude-haiku-4-5",
        ModelPricing {
            input_per_million: 1.0,
            output_per_million: 5.0,
        },
    ),
    (
        "claude-3-5-haiku",
        ModelPricing {
            input_per_million: 0.8,
            output_per_million: 4.0,
        },
    ),
];

/// Look up pricing for a model identifier.
pub fn pricing_for(model: &str) -> ModelPricing {
    PRICE_TABLE
        .iter()
        .find(|(prefix, _)| model.starts_with(prefix))
        .map(|(_, pricing)| *pricing)
        .unwrap_or(DEFAULT_PRICING)
}

/// Monetary cost of one generation call.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
}

/// Compute the cost of a call. Each figure is rounded to [`COST_PRECISION`]
/// digits; the total is the rounded sum of the unrounded components.
pub fn compute_cost(model: &str, input_tokens: u64, output_tokens: u64) -> CostBreakdown {
    let pricing = pricing_for(model);
    let input = input_tokens as f64 / 1_000_000.0 * pricing.input_per_million;
    let output = output_tokens as f64 / 1_000_000.0 * pricing.output_per_million;
    CostBreakdown {
        input_cost: round_cost(input),
        output_cost: round_cost(output),
        total_cost: round_cost(input + output),
    }
}

/// Round a monetary figure to [`COST_PRECISION`] fractional digits.
pub fn round_cost(value: f64) -> f64 {
    let scale = 10f64.powi(COST_PRECISION);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 2e-6;

    #[test]
    fn test_known_model_pricing() {
        let cost = compute_cost("claude-sonnet-4-5-20250929", 1_000_000, 1_000_000);
        assert_eq!(cost.input_cost, 3.0);
        assert_eq!(cost.output_cost, 15.0);
        assert_eq!(cost.total_cost, 18.0);
    }

    #[test]
    fn test_opus_4_5_is_not_priced_as_older_opus() {
        assert_eq!(pricing_for("claude-opus-4-5-20251101").input_per_million, 5.0);
        assert_eq!(pricing_for("claude-opus-4-1-20250805").input_per_million, 15.0);
    }

    #[test]
    fn test_unknown_model_uses_default_tier() {
        assert_eq!(pricing_for("some-local-model"), DEFAULT_PRICING);
    }

    #[test]
    fn test_zero_tokens_cost_nothing() {
        assert_eq!(compute_cost("claude-opus-4-5", 0, 0), CostBreakdown::default());
    }

    #[test]
    fn test_rounded_to_six_digits() {
        // 7 input tokens at $3/M = 0.000021
        let cost = compute_cost("claude-sonnet-4-5", 7, 1);
        assert_eq!(cost.input_cost, 0.000021);
        assert_eq!(cost.output_cost, 0.000015);
        assert_eq!(round_cost(0.123_456_789), 0.123457);
    }

    #[test]
    fn test_doubling_tokens_doubles_cost() {
        for (input, output) in [(1_234u64, 567u64), (10_000, 2_500), (999_999, 1), (0, 42)] {
            let single = compute_cost("claude-sonnet-4-5", input, output);
            let double = compute_cost("claude-sonnet-4-5", input * 2, output * 2);
            assert!((double.input_cost - 2.0 * single.input_cost).abs() <= EPS);
            assert!((double.output_cost - 2.0 * single.output_cost).abs() <= EPS);
        }
    }

    #[test]
    fn test_total_is_sum_of_components() {
        for (input, output) in [(1u64, 1u64), (15_321, 4_002), (2_000_000, 300_000)] {
            let cost = compute_cost("claude-haiku-4-5", input, output);
            assert!((cost.total_cost - (cost.input_cost + cost.output_cost)).abs() <= EPS);
        }
    }
}
