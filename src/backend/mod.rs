//! Backend trait and normalized request/response types.
//!
//! The [`Backend`] trait abstracts over the text-generation service,
//! translating between [`GenerationRequest`]/[`GenerationResponse`] and the
//! provider's HTTP API. Every failure is reported as a classified
//! [`ServiceError`] so retry policy never has to inspect messages.
//!
//! ## Architecture
//!
//! ```text
//! LlmClient::call ──► GenerationRequest ──► Backend::complete() ──► GenerationResponse
//!        │                                        │
//!   BackoffConfig                     ┌───────────┴───────────┐
//!   (retry loop)               AnthropicBackend            MockBackend
//!                              /v1/messages                scripted replies
//! ```

pub mod anthropic;
pub mod backoff;
pub mod mock;

pub use anthropic::AnthropicBackend;
pub use backoff::{BackoffConfig, JitterStrategy};
pub use mock::{MockBackend, MockReply};

use crate::error::ServiceError;
use async_trait::async_trait;

/// One system-instruction text block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemBlock {
    pub text: String,
    /// Ask the provider to cache this block across calls.
    pub cacheable: bool,
}

impl SystemBlock {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cacheable: false,
        }
    }

    pub fn cached(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cacheable: true,
        }
    }
}

/// A normalized generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Model identifier (e.g. `"claude-sonnet-4-5-20250929"`).
    pub model: String,
    /// System instructions, in order.
    pub system: Vec<SystemBlock>,
    /// The single user message.
    pub user_message: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

/// A normalized generation response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResponse {
    /// The generated text content.
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl GenerationResponse {
    pub fn new(text: impl Into<String>, input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            text: text.into(),
            input_tokens,
            output_tokens,
        }
    }
}

/// Abstraction over the text-generation service.
///
/// Implementors own their transport (HTTP client, credentials) and must
/// classify every failure into a [`ServiceError`] variant.
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as `Arc<dyn Backend>`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Execute one generation request. No retry happens here.
    async fn complete(&self, request: &GenerationRequest) -> Result<GenerationResponse, ServiceError>;

    /// Human-readable name for logging and diagnostics.
    fn name(&self) -> &'static str;
}
