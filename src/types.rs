use crate::cost::{self, CostBreakdown};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Ordered string-keyed metadata attached to outcomes and runs.
pub type Metadata = Map<String, Value>;

/// Token usage and cost of one successful generation call.
///
/// Built once from the service's token counts; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// 1-indexed attempt on which the call succeeded.
    pub attempts: u32,
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
}

impl UsageRecord {
    pub fn new(model: impl Into<String>, input_tokens: u64, output_tokens: u64, attempts: u32) -> Self {
        let model = model.into();
        let CostBreakdown {
            input_cost,
            output_cost,
            total_cost,
        } = cost::compute_cost(&model, input_tokens, output_tokens);
        Self {
            model,
            input_tokens,
            output_tokens,
            attempts,
            input_cost,
            output_cost,
            total_cost,
        }
    }

    /// Flatten into outcome metadata keys.
    pub fn to_metadata(&self) -> Metadata {
        let mut meta = Metadata::new();
        meta.insert("input_tokens".into(), self.input_tokens.into());
        meta.insert("output_tokens".into(), self.output_tokens.into());
        meta.insert("attempts".into(), self.attempts.into());
        meta.insert("model".into(), self.model.clone().into());
        meta.insert("input_cost".into(), self.input_cost.into());
        meta.insert("output_cost".into(), self.output_cost.into());
        meta.insert("total_cost".into(), self.total_cost.into());
        meta
    }
}

/// Uniform record returned by every processing unit invocation.
///
/// `error` is `Some` exactly when `success` is false; `data` is always
/// `Some` on success. Use the constructors to keep that true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingOutcome {
    pub success: bool,
    pub data: Option<String>,
    pub metadata: Metadata,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ProcessingOutcome {
    pub fn success(data: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            success: true,
            data: Some(data.into()),
            metadata,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(error: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            success: false,
            data: None,
            metadata,
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }

    /// A failure that still carries the generated text for inspection.
    pub fn failure_with_data(
        data: impl Into<String>,
        error: impl Into<String>,
        metadata: Metadata,
    ) -> Self {
        Self {
            data: Some(data.into()),
            ..Self::failure(error, metadata)
        }
    }

    /// `total_cost` reported in metadata, if the unit made a billable call.
    pub fn cost(&self) -> Option<f64> {
        self.metadata.get("total_cost").and_then(Value::as_f64)
    }
}

/// Result of one [`Pipeline::execute`](crate::pipeline::Pipeline::execute) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRunResult {
    /// True iff `errors` is empty.
    pub success: bool,
    /// Unit display name -> final data payload (`None` for failed units).
    pub outputs: BTreeMap<String, Option<String>>,
    /// Pipeline name, unit list, timestamps, per-unit metadata, counts, cost.
    pub metadata: Metadata,
    /// One entry per failing unit, in execution order.
    pub errors: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl PipelineRunResult {
    pub fn new(outputs: BTreeMap<String, Option<String>>, metadata: Metadata, errors: Vec<String>) -> Self {
        Self {
            success: errors.is_empty(),
            outputs,
            metadata,
            errors,
            timestamp: Utc::now(),
        }
    }

    /// Output of a unit by display name, if it produced one.
    pub fn output(&self, unit: &str) -> Option<&str> {
        self.outputs.get(unit).and_then(|o| o.as_deref())
    }

    /// Aggregated cost of the run.
    pub fn total_cost(&self) -> f64 {
        self.metadata
            .get("total_cost")
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_outcome_invariant() {
        let out = ProcessingOutcome::success("text", Metadata::new());
        assert!(out.success);
        assert_eq!(out.data.as_deref(), Some("text"));
        assert!(out.error.is_none());
    }

    #[test]
    fn test_failure_outcome_invariant() {
        let out = ProcessingOutcome::failure("bad input", Metadata::new());
        assert!(!out.success);
        assert!(out.data.is_none());
        assert_eq!(out.error.as_deref(), Some("bad input"));

        let out = ProcessingOutcome::failure_with_data("<xml/>", "invalid", Metadata::new());
        assert!(!out.success);
        assert_eq!(out.data.as_deref(), Some("<xml/>"));
        assert!(out.error.is_some());
    }

    #[test]
    fn test_usage_record_metadata() {
        let usage = UsageRecord::new("claude-sonnet-4-5", 1_000, 500, 2);
        assert_eq!(usage.input_cost, 0.003);
        assert_eq!(usage.output_cost, 0.0075);
        let meta = usage.to_metadata();
        assert_eq!(meta["attempts"], 2);
        assert_eq!(meta["input_tokens"], 1_000);
        assert_eq!(meta["model"], "claude-sonnet-4-5");

        let outcome = ProcessingOutcome::success("ok", meta);
        assert_eq!(outcome.cost(), Some(0.0105));
    }

    #[test]
    fn test_run_result_success_tracks_errors() {
        let ok = PipelineRunResult::new(BTreeMap::new(), Metadata::new(), Vec::new());
        assert!(ok.success);
        let failed = PipelineRunResult::new(BTreeMap::new(), Metadata::new(), vec!["x failed".into()]);
        assert!(!failed.success);
    }
}
