//! The processing-unit contract.
//!
//! A unit is one named pipeline step: it validates its text input, calls the
//! generation service, checks the shape of what came back and reports a
//! [`ProcessingOutcome`]. The trait is object-safe so units can be stored as
//! `Box<dyn ProcessingUnit>` inside a [`Pipeline`](crate::pipeline::Pipeline).

use crate::config::UnitConfig;
use crate::error::Result;
use crate::types::ProcessingOutcome;
use std::future::Future;
use std::pin::Pin;

/// A boxed, pinned, Send future -- the return type of [`ProcessingUnit::process`].
pub type BoxFut<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Object-safe trait for pipeline units.
pub trait ProcessingUnit: Send + Sync {
    /// Stable display name, used as the output key and filename hint.
    fn name(&self) -> &str;

    /// Structural input checks only. Performs no network I/O.
    ///
    /// `None` means the predecessor produced nothing.
    fn validate(&self, input: Option<&str>) -> Result<()>;

    /// Validate, generate and check the output.
    ///
    /// Documented failures (bad input, missing templates, service errors,
    /// malformed output) come back as an outcome with `success == false`.
    /// An `Err` is reserved for faults the unit could not classify; the
    /// pipeline records those as well.
    fn process<'a>(
        &'a self,
        input: Option<String>,
        config: &'a UnitConfig,
    ) -> BoxFut<'a, Result<ProcessingOutcome>>;
}
