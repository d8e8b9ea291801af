//! Mock backend for testing without a live model.
//!
//! [`MockBackend`] returns pre-configured replies in order, allowing
//! deterministic tests of units, the retry wrapper and whole pipelines.
//!
//! # Example
//!
//! ```
//! use consultant_pipeline::backend::{MockBackend, MockReply};
//! use consultant_pipeline::ServiceError;
//!
//! let mock = MockBackend::fixed("Hello, world!");
//! let flaky = MockBackend::new(vec![
//!     MockReply::Fail(ServiceError::Connection("reset".into())),
//!     MockReply::text("recovered"),
//! ]);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{Backend, GenerationRequest, GenerationResponse};
use crate::error::ServiceError;

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    Ok(GenerationResponse),
    Fail(ServiceError),
}

impl MockReply {
    /// A successful reply with nominal token counts.
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Ok(GenerationResponse::new(text, 100, 50))
    }
}

/// A test backend that returns scripted replies in order.
///
/// Cycles back to the beginning when all replies have been consumed.
/// Every request is recorded for later inspection.
#[derive(Debug)]
pub struct MockBackend {
    replies: Vec<MockReply>,
    index: AtomicUsize,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockBackend {
    /// Create a mock backend with the given scripted replies.
    ///
    /// An empty script behaves like a single empty-text reply.
    pub fn new(replies: Vec<MockReply>) -> Self {
        let replies = if replies.is_empty() {
            vec![MockReply::text("")]
        } else {
            replies
        };
        Self {
            replies,
            index: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that always returns the same text.
    pub fn fixed(text: impl Into<String>) -> Self {
        Self::new(vec![MockReply::text(text)])
    }

    /// Create a mock that always fails with the same error.
    pub fn failing(error: ServiceError) -> Self {
        Self::new(vec![MockReply::Fail(error)])
    }

    /// Number of `complete` calls made so far.
    pub fn calls(&self) -> usize {
        self.index.load(Ordering::Relaxed)
    }

    /// Copies of every request received, in order.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn next_reply(&self) -> MockReply {
        let idx = self.index.fetch_add(1, Ordering::Relaxed) % self.replies.len();
        self.replies[idx].clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn complete(&self, request: &GenerationRequest) -> Result<GenerationResponse, ServiceError> {
        if let Ok(mut seen) = self.requests.lock() {
            seen.push(request.clone());
        }
        match self.next_reply() {
            MockReply::Ok(response) => Ok(response),
            MockReply::Fail(err) => Err(err),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
