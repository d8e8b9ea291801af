//! Event hooks for pipeline progress.
//!
//! Provides an optional, non-intrusive way to observe a run. The pipeline
//! emits events when units start and finish, and the call wrapper emits one
//! before each retry. Implement [`EventHandler`] to drive progress output.

use std::sync::Arc;

/// Events emitted during a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A unit is about to run.
    UnitStart {
        /// Display name of the unit.
        name: String,
        /// 0-based position in the pipeline.
        index: usize,
        /// Number of registered units.
        total: usize,
    },
    /// A unit has finished (successfully or not).
    UnitEnd {
        name: String,
        ok: bool,
    },
    /// The call wrapper is backing off before another attempt.
    CallRetry {
        /// Model the request targets.
        model: String,
        /// The attempt that just failed (1-indexed).
        attempt: u32,
        /// Delay before the next attempt in milliseconds.
        delay_ms: u64,
        /// Description of the failure.
        reason: String,
    },
}

/// Handler for pipeline events.
///
/// # Example
///
/// ```
/// use consultant_pipeline::events::{Event, EventHandler};
///
/// struct PrintHandler;
///
/// impl EventHandler for PrintHandler {
///     fn on_event(&self, event: Event) {
///         match event {
///             Event::UnitStart { name, index, total } => {
///                 println!("[{}/{}] {}", index + 1, total, name)
///             }
///             Event::UnitEnd { name, ok } => println!("{} ok={}", name, ok),
///             Event::CallRetry { attempt, .. } => println!("retrying after attempt {}", attempt),
///         }
///     }
/// }
/// ```
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: Event);
}

/// Emit an event if a handler is present. No-op otherwise.
pub(crate) fn emit(handler: &Option<Arc<dyn EventHandler>>, event: Event) {
    if let Some(ref h) = handler {
        h.on_event(event);
    }
}

/// An [`EventHandler`] backed by a closure.
pub struct FnEventHandler<F: Fn(Event) + Send + Sync>(pub F);

impl<F: Fn(Event) + Send + Sync> EventHandler for FnEventHandler<F> {
    fn on_event(&self, event: Event) {
        (self.0)(event);
    }
}
