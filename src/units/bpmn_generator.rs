//! Analysis markdown → BPMN 2.0 XML.

use super::{component_metadata, failure_outcome, missing_sections, require_text};
use crate::backend::SystemBlock;
use crate::bpmn::validate_bpmn;
use crate::client::{CallSettings, LlmClient};
use crate::config::UnitConfig;
use crate::error::{PipelineError, Result};
use crate::extract::strip_code_fence;
use crate::skills::SkillStore;
use crate::types::ProcessingOutcome;
use crate::unit::{BoxFut, ProcessingUnit};
use std::sync::Arc;
use tracing::{debug, warn};

pub const NAME: &str = "BPMN Generation";
pub const SKILL: &str = "bpmn-generation";

/// APQC Level 4 activity catalogue, attached when `include_reference_doc` is set.
pub const APQC_REFERENCE: &str = "apqc-activities.md";

pub const REQUIRED_SECTIONS: &[&str] = &["## Process Steps", "## Actors and Roles", "## Decision Points"];

/// Turns a process analysis into a swim-lane BPMN diagram.
#[derive(Debug)]
pub struct BpmnGenerator {
    client: LlmClient,
    skills: Arc<SkillStore>,
    call: CallSettings,
}

impl BpmnGenerator {
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

    fn system_blocks(&self, config: &UnitConfig) -> Result<Vec<SystemBlock>> {
        let mut system = vec![SystemBlock::new(self.skills.load_prompt(SKILL)?)];
        if config.include_reference_doc {
            let apqc = self.skills.load_reference(SKILL, APQC_REFERENCE)?;
            system.push(SystemBlock::cached(format!(
                "# APQC Level 4 Activities Reference\n\n{}",
                apqc
            )));
        }
        for filename in &config.reference_docs {
            system.push(SystemBlock::cached(self.skills.load_reference(SKILL, filename)?));
        }
        Ok(system)
    }

    async fn run(&self, input: Option<&str>, config: &UnitConfig) -> Result<ProcessingOutcome> {
        self.validate(input)?;
        let analysis = require_text(input, "Analysis text")?;

        let system = self.system_blocks(config)?;
        let user_message = format!(
            "Generate BPMN 2.0 XML for the following process analysis:\n\n{}",
            analysis
        );
        let (raw, usage) = self.client.call(user_message, system, &self.call).await?;
        let xml = strip_code_fence(&raw, "xml").trim().to_string();

        let mut metadata = usage.to_metadata();
        metadata.extend(component_metadata(NAME));

        match validate_bpmn(&xml) {
            Ok(summary) => {
                debug!(unit = NAME, tasks = summary.tasks, flows = summary.flows, "diagram validated");
                metadata.insert("xml_length".into(), xml.chars().count().into());
                metadata.insert("validation".into(), summary.message().into());
                metadata.insert("task_count".into(), summary.tasks.into());
                metadata.insert("gateway_count".into(), summary.gateways.into());
                metadata.insert("lane_count".into(), summary.lanes.into());
                metadata.insert("flow_count".into(), summary.flows.into());
                Ok(ProcessingOutcome::success(xml, metadata))
            }
            Err(reason) => {
                warn!(unit = NAME, %reason, "generated diagram failed validation");
                metadata.insert("validation_error".into(), reason.clone().into());
                Ok(ProcessingOutcome::failure_with_data(
                    xml,
                    format!("BPMN validation failed: {}", reason),
                    metadata,
                ))
            }
        }
    }
}

impl ProcessingUnit for BpmnGenerator {
    fn name(&self) -> &str {
        NAME
    }

    fn validate(&self, input: Option<&str>) -> Result<()> {
        let text = require_text(input, "Analysis text")?;
        if let Some(section) = missing_sections(text, REQUIRED_SECTIONS).first() {
            return Err(PipelineError::Validation(format!(
                "Analysis missing required section: {}",
                section
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
