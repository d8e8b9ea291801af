//! Sequential execution of processing units.
//!
//! [`Pipeline`] runs its units in registration order. Each unit receives the
//! previous unit's `data`, or the recorded output of an earlier unit when its
//! [`UnitConfig::input_from`] names one. Unit failures never abort
//! [`Pipeline::execute`]: they are collected into
//! [`PipelineRunResult::errors`] and the run either stops or carries on with
//! no input, depending on `stop_on_error`.

use crate::config::UnitConfig;
use crate::cost::round_cost;
use crate::error::PipelineError;
use crate::events::{emit, Event, EventHandler};
use crate::types::{Metadata, PipelineRunResult};
use crate::unit::ProcessingUnit;
use chrono::Utc;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Top-level keys [`Pipeline::execute`] writes into the run metadata.
///
/// Unit metadata is stored under the unit's name in the same map, so a unit
/// may not use one of these names.
pub const RESERVED_METADATA_KEYS: &[&str] = &[
    "pipeline_name",
    "components",
    "start_time",
    "end_time",
    "total_components",
    "completed_components",
    "total_cost",
];

/// An ordered list of processing units with their configuration.
///
/// # Example
///
/// ```ignore
/// let pipeline = Pipeline::new("Full Transformation")
///     .add_unit(Box::new(analyzer), UnitConfig::default())
///     .add_unit(Box::new(generator), UnitConfig::default())
///     .add_unit(Box::new(engine), UnitConfig::default().input_from("Transcript Analysis"));
///
/// let result = pipeline.execute(transcript, true).await;
/// ```
pub struct Pipeline {
    name: String,
    units: Vec<(Box<dyn ProcessingUnit>, UnitConfig)>,
    event_handler: Option<Arc<dyn EventHandler>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("units", &self.unit_names())
            .field("has_event_handler", &self.event_handler.is_some())
            .finish()
    }
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            units: Vec::new(),
            event_handler: None,
        }
    }

    /// Register a unit (builder style).
    ///
    /// The unit's name keys its output and its metadata entry. A name listed
    /// in [`RESERVED_METADATA_KEYS`] is rejected when the pipeline runs, as
    /// an invalid configuration for that unit.
    pub fn add_unit(mut self, unit: Box<dyn ProcessingUnit>, config: UnitConfig) -> Self {
        self.units.push((unit, config));
        self
    }

    /// Register a unit (mutation style).
    pub fn add(&mut self, unit: Box<dyn ProcessingUnit>, config: UnitConfig) {
        self.units.push((unit, config));
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Unit names in registration order.
    pub fn unit_names(&self) -> Vec<String> {
        self.units.iter().map(|(u, _)| u.name().to_string()).collect()
    }

    /// Configuration of the unit at `index`, for adjustments after assembly.
    pub fn config_mut(&mut self, index: usize) -> Option<&mut UnitConfig> {
        self.units.get_mut(index).map(|(_, config)| config)
    }

    /// Run every unit once, in order.
    ///
    /// Never fails for documented failure modes; inspect
    /// [`PipelineRunResult::success`] and [`PipelineRunResult::errors`].
    /// Each call starts from a clean slate.
    pub async fn execute(&self, initial_input: impl Into<String>, stop_on_error: bool) -> PipelineRunResult {
        let total = self.units.len();
        let mut outputs: BTreeMap<String, Option<String>> = BTreeMap::new();
        let mut prior_outputs: HashMap<String, Option<String>> = HashMap::new();
        let mut errors = Vec::new();
        let mut total_cost = 0.0;

        let mut metadata = Metadata::new();
        metadata.insert("pipeline_name".into(), self.name.clone().into());
        metadata.insert("components".into(), self.unit_names().into());
        metadata.insert("start_time".into(), Utc::now().to_rfc3339().into());

        info!(pipeline = %self.name, units = total, stop_on_error, "pipeline started");

        let mut current_input: Option<String> = Some(initial_input.into());

        for (index, (unit, config)) in self.units.iter().enumerate() {
            let name = unit.name().to_string();
            info!(unit = %name, step = index + 1, of = total, "executing unit");
            emit(
                &self.event_handler,
                Event::UnitStart { name: name.clone(), index, total },
            );

            let input = if RESERVED_METADATA_KEYS.contains(&name.as_str()) {
                Err(PipelineError::InvalidConfig(format!(
                    "unit name '{}' is reserved for run metadata",
                    name
                )))
            } else if let Some(source) = &config.input_from {
                match prior_outputs.get(source) {
                    Some(output) => {
                        debug!(unit = %name, source = %source, "using redirected input");
                        Ok(output.clone())
                    }
                    None => Err(PipelineError::InvalidConfig(format!(
                        "Component '{}' output not found",
                        source
                    ))),
                }
            } else {
                Ok(current_input.take())
            };

            let outcome = match input {
                Ok(input) => unit.process(input, config).await,
                Err(err) => Err(err),
            };
            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(err) => {
                    let message = format!("{} raised exception: {}", name, err);
                    warn!(unit = %name, error = %message, "unit raised");
                    errors.push(message);
                    emit(&self.event_handler, Event::UnitEnd { name, ok: false });
                    if stop_on_error {
                        error!(pipeline = %self.name, "stopping pipeline due to error");
                        break;
                    }
                    current_input = None;
                    continue;
                }
            };

            outputs.insert(name.clone(), outcome.data.clone());
            prior_outputs.insert(name.clone(), outcome.data.clone());

            if let Some(cost) = outcome.cost() {
                total_cost += cost;
                debug!(unit = %name, cost, running_total = total_cost, "cost accumulated");
            }
            metadata.insert(name.clone(), Value::Object(outcome.metadata.clone()));

            emit(
                &self.event_handler,
                Event::UnitEnd { name: name.clone(), ok: outcome.success },
            );

            if outcome.success {
                info!(unit = %name, "unit completed");
                current_input = outcome.data;
            } else {
                let message = format!(
                    "{} failed: {}",
                    name,
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
                warn!(unit = %name, error = %message, "unit failed");
                errors.push(message);
                if stop_on_error {
                    error!(pipeline = %self.name, "stopping pipeline due to error");
                    break;
                }
            }
        }

        metadata.insert("end_time".into(), Utc::now().to_rfc3339().into());
        metadata.insert("total_components".into(), total.into());
        metadata.insert("completed_components".into(), outputs.len().into());
        metadata.insert("total_cost".into(), round_cost(total_cost).into());

        info!(
            pipeline = %self.name,
            completed = outputs.len(),
            errors = errors.len(),
            total_cost = round_cost(total_cost),
            "pipeline finished"
        );

        PipelineRunResult::new(outputs, metadata, errors)
    }
}
