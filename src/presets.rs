//! Ready-made pipelines and the one-call transformation helper.

use crate::backend::Backend;
use crate::client::LlmClient;
use crate::config::{Settings, UnitConfig};
use crate::error::Result;
use crate::events::EventHandler;
use crate::pipeline::Pipeline;
use crate::skills::SkillStore;
use crate::types::PipelineRunResult;
use crate::units::{transcript_analyzer, BpmnGenerator, RecommendationEngine, TranscriptAnalyzer};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

pub const FULL_PIPELINE_NAME: &str = "Full Transformation Consultant Pipeline";
pub const ANALYSIS_PIPELINE_NAME: &str = "Transcript Analysis Pipeline";
pub const BPMN_PIPELINE_NAME: &str = "BPMN Generation Pipeline";

/// Index of the recommendation unit in [`full_pipeline`].
const RECOMMENDATION_INDEX: usize = 2;

struct Parts {
    settings: Settings,
    backend: Arc<dyn Backend>,
    skills: Arc<SkillStore>,
    events: Option<Arc<dyn EventHandler>>,
}

impl Parts {
    fn new(settings: &Settings, backend: Arc<dyn Backend>, events: Option<Arc<dyn EventHandler>>) -> Self {
        Self {
            settings: settings.clone(),
            skills: Arc::new(SkillStore::new(&settings.skills_dir)),
            backend,
            events,
        }
    }

    fn client(&self, model: &str) -> LlmClient {
        let client = LlmClient::new(self.backend.clone(), model).with_backoff(self.settings.backoff());
        match &self.events {
            Some(handler) => client.with_event_handler(handler.clone()),
            None => client,
        }
    }

    fn analyzer(&self) -> TranscriptAnalyzer {
        TranscriptAnalyzer::new(self.client(&self.settings.model), self.skills.clone())
            .with_call_settings(self.settings.call_settings())
    }

    fn generator(&self) -> BpmnGenerator {
        BpmnGenerator::new(self.client(&self.settings.model), self.skills.clone())
            .with_call_settings(self.settings.call_settings())
    }

    fn engine(&self) -> RecommendationEngine {
        RecommendationEngine::new(self.client(&self.settings.recommendation_model), self.skills.clone())
            .with_call_settings(self.settings.call_settings())
    }

    fn pipeline(&self, name: &str) -> Pipeline {
        let pipeline = Pipeline::new(name);
        match &self.events {
            Some(handler) => pipeline.with_event_handler(handler.clone()),
            None => pipeline,
        }
    }

    fn full(&self) -> Pipeline {
        self.pipeline(FULL_PIPELINE_NAME)
            .add_unit(Box::new(self.analyzer()), UnitConfig::default())
            .add_unit(
                Box::new(self.generator()),
                UnitConfig::default().include_reference_doc(true),
            )
            // Recommendations are built from the analysis, not the diagram.
            .add_unit(
                Box::new(self.engine()),
                UnitConfig::default().input_from(transcript_analyzer::NAME),
            )
    }
}

/// Transcript → analysis → BPMN → recommendations.
pub fn full_pipeline(settings: &Settings, backend: Arc<dyn Backend>) -> Pipeline {
    Parts::new(settings, backend, None).full()
}

/// Transcript → analysis.
pub fn analysis_pipeline(settings: &Settings, backend: Arc<dyn Backend>) -> Pipeline {
    let parts = Parts::new(settings, backend, None);
    parts
        .pipeline(ANALYSIS_PIPELINE_NAME)
        .add_unit(Box::new(parts.analyzer()), UnitConfig::default())
}

/// Analysis → BPMN.
pub fn bpmn_pipeline(settings: &Settings, backend: Arc<dyn Backend>) -> Pipeline {
    let parts = Parts::new(settings, backend, None);
    parts.pipeline(BPMN_PIPELINE_NAME).add_unit(
        Box::new(parts.generator()),
        UnitConfig::default().include_reference_doc(true),
    )
}

/// Options for [`run_full_transformation`].
#[derive(Clone)]
pub struct RunOptions {
    /// Passed to the recommendation unit as additional context.
    pub business_context: Option<String>,
    /// Default: `true`.
    pub stop_on_error: bool,
    pub event_handler: Option<Arc<dyn EventHandler>>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            business_context: None,
            stop_on_error: true,
            event_handler: None,
        }
    }
}

impl std::fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunOptions")
            .field("business_context", &self.business_context)
            .field("stop_on_error", &self.stop_on_error)
            .field("has_event_handler", &self.event_handler.is_some())
            .finish()
    }
}

/// Read a transcript, run the full pipeline on it and, if every unit
/// succeeded, save the outputs into `output_dir`.
///
/// Errors only for an unreadable transcript or a failed save; unit
/// failures are reported through the returned result.
pub async fn run_full_transformation(
    transcript_path: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    settings: &Settings,
    backend: Arc<dyn Backend>,
    options: RunOptions,
) -> Result<PipelineRunResult> {
    let transcript_path = transcript_path.as_ref();
    let output_dir = output_dir.as_ref();
    let transcript = fs::read_to_string(transcript_path)?;

    let mut pipeline = Parts::new(settings, backend, options.event_handler.clone()).full();
    if let Some(context) = options.business_context {
        if let Some(config) = pipeline.config_mut(RECOMMENDATION_INDEX) {
            config.business_context = Some(context);
        }
    }

    info!(
        input = %transcript_path.display(),
        output = %output_dir.display(),
        "starting full transformation"
    );
    let result = pipeline.execute(transcript, options.stop_on_error).await;

    if result.success {
        result.save_outputs(output_dir)?;
        info!(output = %output_dir.display(), "outputs saved");
    } else {
        error!(errors = ?result.errors, "transformation failed");
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, MockReply};
    use crate::persist::METADATA_FILE;
    use crate::units::test_support::{ANALYSIS, BPMN};
    use std::path::PathBuf;

    fn seeded_settings(root: &Path) -> Settings {
        for (skill, prompt) in [
            ("transcript-analysis", "Analyze."),
            ("bpmn-generation", "Diagram."),
            ("process-optimization", "Recommend."),
        ] {
            fs::create_dir_all(root.join(skill).join("domain-knowledge")).unwrap();
            fs::write(root.join(skill).join("SKILL.md"), prompt).unwrap();
        }
        fs::write(
            root.join("bpmn-generation/domain-knowledge/apqc-activities.md"),
            "4.1 Procure materials",
        )
        .unwrap();

        let mut settings = Settings::new("test-key");
        settings.skills_dir = PathBuf::from(root);
        settings.max_attempts = 1;
        settings.base_delay_secs = 0.0;
        settings
    }

    fn happy_backend() -> Arc<MockBackend> {
        Arc::new(MockBackend::new(vec![
            MockReply::text(ANALYSIS),
            MockReply::text(BPMN),
            MockReply::text("## Executive Summary\n## Quick Wins\n## Implementation Roadmap\n"),
        ]))
    }

    #[test]
    fn test_preset_shapes() {
        let settings = Settings::new("k");
        let backend: Arc<dyn Backend> = Arc::new(MockBackend::fixed("x"));

        let full = full_pipeline(&settings, backend.clone());
        assert_eq!(full.name(), FULL_PIPELINE_NAME);
        assert_eq!(
            full.unit_names(),
            vec!["Transcript Analysis", "BPMN Generation", "Process Optimization"]
        );

        assert_eq!(analysis_pipeline(&settings, backend.clone()).unit_names(), vec!["Transcript Analysis"]);
        assert_eq!(bpmn_pipeline(&settings, backend).unit_names(), vec!["BPMN Generation"]);
    }

    #[test]
    fn test_full_pipeline_redirects_recommendations() {
        let settings = Settings::new("k");
        let mut full = full_pipeline(&settings, Arc::new(MockBackend::fixed("x")));
        assert_eq!(
            full.config_mut(RECOMMENDATION_INDEX).unwrap().input_from.as_deref(),
            Some("Transcript Analysis")
        );
        assert!(full.config_mut(1).unwrap().include_reference_doc);
    }

    #[tokio::test]
    async fn test_run_full_transformation_saves_on_success() {
        let skills = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let transcript = work.path().join("transcript.txt");
        fs::write(&transcript, "Interviewer: walk me through invoices. ".repeat(5)).unwrap();
        let out = work.path().join("out");

        let settings = seeded_settings(skills.path());
        let mock = happy_backend();
        let options = RunOptions {
            business_context: Some("Retail, 200 staff".into()),
            ..RunOptions::default()
        };
        let result = run_full_transformation(&transcript, &out, &settings, mock.clone(), options)
            .await
            .unwrap();

        assert!(result.success, "{:?}", result.errors);
        assert!(out.join("bpmn-generation.bpmn").exists());
        assert!(out.join("transcript-analysis-analysis.md").exists());
        assert!(out.join("process-optimization-recommendations.md").exists());
        assert!(out.join(METADATA_FILE).exists());

        let requests = mock.requests();
        assert_eq!(requests[0].model, settings.model);
        assert_eq!(requests[2].model, settings.recommendation_model);
        assert!(requests[2].user_message.contains("Retail, 200 staff"));
    }

    #[tokio::test]
    async fn test_run_full_transformation_skips_save_on_failure() {
        let skills = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let transcript = work.path().join("transcript.txt");
        fs::write(&transcript, "too short").unwrap();
        let out = work.path().join("out");

        let settings = seeded_settings(skills.path());
        let mock = happy_backend();
        let result = run_full_transformation(&transcript, &out, &settings, mock.clone(), RunOptions::default())
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("Transcript Analysis failed: Validation error"));
        assert!(!out.exists());
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_unreadable_transcript_is_error() {
        let settings = Settings::new("k");
        let err = run_full_transformation(
            "/definitely/not/here.txt",
            "/tmp/unused",
            &settings,
            Arc::new(MockBackend::fixed("x")),
            RunOptions::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, crate::error::PipelineError::Io(_)));
    }
}
