//! The three consultant units and the helpers they share.
//!
//! | Unit | Input | Output |
//! |------|-------|--------|
//! | [`TranscriptAnalyzer`] | raw transcript | analysis markdown |
//! | [`BpmnGenerator`] | analysis markdown | BPMN 2.0 XML |
//! | [`RecommendationEngine`] | analysis markdown | recommendations markdown |

pub mod bpmn_generator;
pub mod recommendation_engine;
pub mod transcript_analyzer;

pub use bpmn_generator::BpmnGenerator;
pub use recommendation_engine::RecommendationEngine;
pub use transcript_analyzer::TranscriptAnalyzer;

use crate::error::{PipelineError, Result};
use crate::types::{Metadata, ProcessingOutcome};
use tracing::warn;

/// Reject missing and whitespace-only input.
pub(crate) fn require_text<'a>(input: Option<&'a str>, what: &str) -> Result<&'a str> {
    let text = input.ok_or_else(|| {
        PipelineError::Validation(format!("Input must be text, got nothing (no {})", what))
    })?;
    if text.trim().is_empty() {
        return Err(PipelineError::Validation(format!("{} cannot be empty", what)));
    }
    Ok(text)
}

/// Section markers from `required` that do not occur in `text`.
pub(crate) fn missing_sections<'s>(text: &str, required: &[&'s str]) -> Vec<&'s str> {
    required
        .iter()
        .copied()
        .filter(|section| !text.contains(section))
        .collect()
}

pub(crate) fn component_metadata(name: &str) -> Metadata {
    let mut meta = Metadata::new();
    meta.insert("component".into(), name.into());
    meta
}

/// Convert a documented failure into an outcome.
pub(crate) fn failure_outcome(name: &str, err: &PipelineError) -> ProcessingOutcome {
    let error = match err {
        PipelineError::Validation(reason) => format!("Validation error: {}", reason),
        other => format!("Processing error: {}", other),
    };
    warn!(unit = %name, %error, "unit failed");
    ProcessingOutcome::failure(error, component_metadata(name))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_text() {
        assert!(require_text(None, "Transcript text").is_err());
        assert!(require_text(Some(" \n\t"), "Transcript text").is_err());
        assert_eq!(require_text(Some("x"), "Transcript text").unwrap(), "x");
    }

    #[test]
    fn test_missing_sections_keeps_order() {
        let missing = missing_sections("## A\n", &["## A", "## B", "## C"]);
        assert_eq!(missing, vec!["## B", "## C"]);
    }

    #[test]
    fn test_failure_outcome_prefixes() {
        let v = failure_outcome("Unit", &PipelineError::Validation("too short".into()));
        assert_eq!(v.error.as_deref(), Some("Validation error: too short"));
        assert_eq!(v.metadata["component"], "Unit");

        let p = failure_outcome("Unit", &PipelineError::Other("boom".into()));
        assert_eq!(p.error.as_deref(), Some("Processing error: boom"));
    }
}
