//! Example: running the three consultant units against MockBackend.
//!
//! Run with: `cargo run --example mock_pipeline`

use consultant_pipeline::{
    BackoffConfig, BpmnGenerator, LlmClient, MockBackend, MockReply, Pipeline, RecommendationEngine,
    ServiceError, SkillStore, TranscriptAnalyzer, UnitConfig,
};
use std::sync::Arc;

const ANALYSIS: &str = "# Invoice Approval\n\n## Process Steps\n1. Receive invoice\n2. Approve\n\n\
## Actors and Roles\n- AP Clerk\n- Finance Manager\n\n## Decision Points\n- Over $5,000?\n\n\
## Pain Points\n- Invoices re-keyed by hand\n";

const DIAGRAM: &str = r#"```xml
<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL" id="d">
  <bpmn:process id="p">
    <bpmn:startEvent id="s"/>
    <bpmn:userTask id="t" name="Approve invoice"/>
    <bpmn:endEvent id="e"/>
    <bpmn:sequenceFlow id="f1" sourceRef="s" targetRef="t"/>
    <bpmn:sequenceFlow id="f2" sourceRef="t" targetRef="e"/>
  </bpmn:process>
</bpmn:definitions>
```"#;

const RECOMMENDATIONS: &str = "## Executive Summary\nAutomate capture.\n\n## Quick Wins\n- OCR intake\n\n\
## Implementation Roadmap\n- Q1 pilot\n";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Replies are served in order; the first call hits a rate limit and is retried.
    let mock = Arc::new(MockBackend::new(vec![
        MockReply::Fail(ServiceError::RateLimited {
            message: "slow down".into(),
            retry_after: None,
        }),
        MockReply::text(ANALYSIS),
        MockReply::text(DIAGRAM),
        MockReply::text(RECOMMENDATIONS),
    ]));

    // Instruction templates held in memory instead of on disk
    let skills = Arc::new(SkillStore::new("skills"));
    skills.insert_prompt("transcript-analysis", "You are a process analyst.");
    skills.insert_prompt("bpmn-generation", "You draw BPMN 2.0 diagrams.");
    skills.insert_prompt("process-optimization", "You are an operations consultant.");

    let client = |model: &str| LlmClient::new(mock.clone(), model).with_backoff(BackoffConfig::immediate(3));

    let pipeline = Pipeline::new("Mock Transformation")
        .add_unit(
            Box::new(TranscriptAnalyzer::new(client("claude-sonnet-4-5"), skills.clone())),
            UnitConfig::default(),
        )
        .add_unit(
            Box::new(BpmnGenerator::new(client("claude-sonnet-4-5"), skills.clone())),
            UnitConfig::default().include_reference_doc(false),
        )
        .add_unit(
            Box::new(RecommendationEngine::new(client("claude-opus-4-5"), skills)),
            UnitConfig::default()
                .input_from("Transcript Analysis")
                .business_context("Mid-size distributor, 40 invoices a day"),
        );

    let transcript = "Interviewer: How do invoices get approved today? \
        Clerk: They arrive by email, I type them into the ERP, then the manager signs anything over five thousand.";
    let result = pipeline.execute(transcript, true).await;

    println!("Success: {}", result.success);
    for (unit, output) in &result.outputs {
        let size = output.as_ref().map(|o| o.len()).unwrap_or(0);
        println!("  {:<22} {} bytes", unit, size);
    }
    println!("Analysis attempts: {}", result.metadata["Transcript Analysis"]["attempts"]);
    println!("Diagram: {}", result.metadata["BPMN Generation"]["validation"]);
    println!("Total cost: ${:.6}", result.total_cost());
    println!("Service calls: {}", mock.calls());

    Ok(())
}
