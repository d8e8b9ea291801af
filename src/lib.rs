//! # Consultant Pipeline
//!
//! Turns a recorded process interview into three consulting deliverables:
//! a structured process analysis, a BPMN 2.0 diagram and a set of
//! optimization recommendations, each produced by one LLM-backed
//! processing unit.
//!
//! ## Core Concepts
//!
//! - **[`ProcessingUnit`]**: object-safe trait for one named step. Validates
//!   its text input, calls the model and reports a [`ProcessingOutcome`].
//! - **[`Pipeline`]**: runs units in order, hands each unit's output to the
//!   next (or to a later unit named by `input_from`), collects errors and
//!   adds up cost.
//! - **[`LlmClient`]**: one logical generation call with exponential
//!   backoff over a [`Backend`].
//! - **[`SkillStore`]**: instruction templates and reference documents on
//!   disk, cached after the first read.
//!
//! ## Quick Start
//!
//! ```no_run
//! use consultant_pipeline::{presets, Settings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::from_env()?;
//!     let pipeline = presets::full_pipeline(&settings, settings.backend()?);
//!
//!     let transcript = std::fs::read_to_string("interview.txt")?;
//!     let result = pipeline.execute(transcript, true).await;
//!     if result.success {
//!         result.save_outputs("outputs/generated")?;
//!     }
//!     println!("cost: ${:.4}", result.total_cost());
//!     Ok(())
//! }
//! ```
//!
//! ## Testing without the network
//!
//! ```
//! use consultant_pipeline::{LlmClient, MockBackend};
//! use std::sync::Arc;
//!
//! let client = LlmClient::new(Arc::new(MockBackend::fixed("## Process Steps")), "claude-sonnet-4-5");
//! assert_eq!(client.model(), "claude-sonnet-4-5");
//! ```

pub mod backend;
pub mod bpmn;
pub mod client;
pub mod config;
pub mod cost;
pub mod error;
pub mod events;
pub mod extract;
pub mod persist;
pub mod pipeline;
pub mod presets;
pub mod skills;
pub mod types;
pub mod unit;
pub mod units;

pub use backend::{AnthropicBackend, Backend, BackoffConfig, JitterStrategy, MockBackend, MockReply};
pub use bpmn::{validate_bpmn, BpmnSummary};
pub use client::{CallSettings, LlmClient};
pub use config::{Settings, UnitConfig};
pub use cost::{compute_cost, CostBreakdown, ModelPricing};
pub use error::{PipelineError, Result, ServiceError};
pub use events::{Event, EventHandler, FnEventHandler};
pub use pipeline::Pipeline;
pub use presets::{run_full_transformation, RunOptions};
pub use skills::SkillStore;
pub use types::{Metadata, PipelineRunResult, ProcessingOutcome, UsageRecord};
pub use unit::{BoxFut, ProcessingUnit};
pub use units::{BpmnGenerator, RecommendationEngine, TranscriptAnalyzer};
