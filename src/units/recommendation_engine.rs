//! Analysis markdown → optimization recommendations.

use super::{component_metadata, failure_outcome, missing_sections, require_text};
use crate::backend::SystemBlock;
use crate::client::{CallSettings, LlmClient};
use crate::config::UnitConfig;
use crate::error::{PipelineError, Result};
use crate::skills::SkillStore;
use crate::types::ProcessingOutcome;
use crate::unit::{BoxFut, ProcessingUnit};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

pub const NAME: &str = "Process Optimization";
pub const SKILL: &str = "process-optimization";

pub const REQUIRED_SECTIONS: &[&str] = &["## Process Steps", "## Pain Points"];

/// Sections a complete recommendation document contains. Missing ones
/// produce a warning, not a failure.
pub const EXPECTED_OUTPUT_SECTIONS: &[&str] =
    &["Executive Summary", "Quick Wins", "Implementation Roadmap"];

/// Produces quick wins, automation candidates, ROI estimates and a roadmap.
///
/// Runs on the recommendation model, which is usually a larger model than the
/// one used for analysis.
#[derive(Debug)]
pub struct RecommendationEngine {
    client: LlmClient,
    skills: Arc<SkillStore>,
    call: CallSettings,
}

impl RecommendationEngine {
    pub fn new(client: LlmClient, skills: Arc<SkillStore>) -> Self {
        Self {
            client,
            skills,
            call: CallSettings::default(),
        }
    }

    pub fn with_call_settings(mut self, call: CallSettings) -> Self {
        self.call = call;
        self
    }

    fn user_message(analysis: &str, business_context: Option<&str>) -> String {
        let mut message = String::from(
            "Please analyze this process and generate comprehensive optimization recommendations.\n\n",
        );
        message.push_str(&format!("Process Analysis Document:\n{}\n\n", analysis));
        if let Some(context) = business_context.filter(|c| !c.trim().is_empty()) {
            message.push_str(&format!("Additional Context:\n{}\n\n", context));
        }
        message.push_str(
            "Please provide specific technology recommendations, detailed ROI calculations, \
             and a phased implementation roadmap.",
        );
        message
    }

    async fn run(&self, input: Option<&str>, config: &UnitConfig) -> Result<ProcessingOutcome> {
        self.validate(input)?;
        let analysis = require_text(input, "Analysis text")?;

        let mut system = vec![SystemBlock::new(self.skills.load_prompt(SKILL)?)];
        for filename in &config.reference_docs {
            system.push(SystemBlock::cached(self.skills.load_reference(SKILL, filename)?));
        }

        let user_message = Self::user_message(analysis, config.business_context.as_deref());
        let (recommendations, usage) = self.client.call(user_message, system, &self.call).await?;

        let missing = missing_sections(&recommendations, EXPECTED_OUTPUT_SECTIONS);
        let warning = if missing.is_empty() {
            Value::Null
        } else {
            let text = format!("Recommendations missing sections: {}", missing.join(", "));
            warn!(unit = NAME, warning = %text, "incomplete recommendations");
            Value::String(text)
        };

        let mut metadata = usage.to_metadata();
        metadata.extend(component_metadata(NAME));
        metadata.insert("model_used".into(), self.client.model().into());
        metadata.insert("warning".into(), warning);
        Ok(ProcessingOutcome::success(recommendations, metadata))
    }
}

impl ProcessingUnit for RecommendationEngine {
    fn name(&self) -> &str {
        NAME
    }

    fn validate(&self, input: Option<&str>) -> Result<()> {
        let text = require_text(input, "Analysis text")?;
        let missing = missing_sections(text, REQUIRED_SECTIONS);
        match missing.as_slice() {
            [] => Ok(()),
            [section] => Err(PipelineError::Validation(format!(
                "Analysis missing required section: {}",
                section
            ))),
            sections => Err(PipelineError::Validation(format!(
                "Analysis missing {} required sections: {}",
                sections.len(),
                sections.join(", ")
            ))),
        }
    }

    fn process<'a>(
        &'a self,
        input: Option<String>,
        config: &'a UnitConfig,
    ) -> BoxFut<'a, Result<ProcessingOutcome>> {
        Box::pin(async move {
            Ok(self
                .run(input.as_deref(), config)
                .await
                .unwrap_or_else(|e| failure_outcome(NAME, &e)))
        })
    }
}
