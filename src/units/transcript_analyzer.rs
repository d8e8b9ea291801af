//! Transcript → structured process analysis.

use super::{component_metadata, failure_outcome, require_text};
use crate::backend::SystemBlock;
use crate::client::{CallSettings, LlmClient};
use crate::config::UnitConfig;
use crate::error::{PipelineError, Result};
use crate::skills::SkillStore;
use crate::types::ProcessingOutcome;
use crate::unit::{BoxFut, ProcessingUnit};
use std::sync::Arc;
use tracing::debug;

pub const NAME: &str = "Transcript Analysis";
pub const SKILL: &str = "transcript-analysis";

/// Transcripts shorter than this are rejected.
pub const MIN_TRANSCRIPT_CHARS: usize = 100;

/// Extracts steps, actors, decisions and pain points from a transcript.
#[derive(Debug)]
pub struct TranscriptAnalyzer {
    client: LlmClient,
    skills: Arc<SkillStore>,
    call: CallSettings,
}

impl TranscriptAnalyzer {
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

    async fn run(&self, input: Option<&str>, config: &UnitConfig) -> Result<ProcessingOutcome> {
        self.validate(input)?;
        let transcript = require_text(input, "Transcript text")?;

        let mut system = vec![SystemBlock::new(self.skills.load_prompt(SKILL)?)];
        for filename in &config.reference_docs {
            let doc = self.skills.load_reference(SKILL, filename)?;
            debug!(unit = NAME, reference = %filename, "attaching domain knowledge");
            system.push(SystemBlock::cached(format!("# Domain Knowledge Example\n\n{}", doc)));
        }

        let user_message = format!(
            "Please analyze the following process transcript:\n\n{}",
            transcript
        );
        let (analysis, usage) = self.client.call(user_message, system, &self.call).await?;

        let mut metadata = usage.to_metadata();
        metadata.extend(component_metadata(NAME));
        metadata.insert(
            "transcript_length".into(),
            transcript.chars().count().into(),
        );
        Ok(ProcessingOutcome::success(analysis, metadata))
    }
}

impl ProcessingUnit for TranscriptAnalyzer {
    fn name(&self) -> &str {
        NAME
    }

    fn validate(&self, input: Option<&str>) -> Result<()> {
        let text = require_text(input, "Transcript text")?;
        if text.chars().count() < MIN_TRANSCRIPT_CHARS {
            return Err(PipelineError::Validation(format!(
                "Transcript text seems too short (< {} chars)",
                MIN_TRANSCRIPT_CHARS
            )));
        }
        Ok(())
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
