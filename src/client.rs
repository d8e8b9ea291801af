//! Resilient generation calls.
//!
//! [`LlmClient`] turns one logical "generate from instructions + message"
//! request into a retried operation: transient failures back off
//! exponentially per [`BackoffConfig`], fatal ones surface immediately, and
//! every success carries a [`UsageRecord`] with token counts and cost.

use crate::{
    backend::{Backend, BackoffConfig, GenerationRequest, SystemBlock},
    error::{PipelineError, Result, ServiceError},
    events::{emit, Event, EventHandler},
    types::UsageRecord,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-call generation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSettings {
    /// Maximum tokens to generate.
    pub max_tokens: u32,

    /// Temperature (0.0 = deterministic).
    pub temperature: f64,
}

impl Default for CallSettings {
    fn default() -> Self {
        Self {
            max_tokens: 16_000,
            temperature: 0.0,
        }
    }
}

impl CallSettings {
    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = tokens;
        self
    }

    pub fn with_temperature(mut self, temp: f64) -> Self {
        self.temperature = temp;
        self
    }
}

/// Generation client bound to one model, with retry and cost accounting.
///
/// Each processing unit owns one. The backend may be shared between clients
/// through the `Arc`.
#[derive(Clone)]
pub struct LlmClient {
    backend: Arc<dyn Backend>,
    model: String,
    backoff: BackoffConfig,
    event_handler: Option<Arc<dyn EventHandler>>,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("backend", &self.backend.name())
            .field("model", &self.model)
            .field("backoff", &self.backoff)
            .field("has_event_handler", &self.event_handler.is_some())
            .finish()
    }
}

impl LlmClient {
    pub fn new(backend: Arc<dyn Backend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            backoff: BackoffConfig::standard(),
            event_handler: None,
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn backoff(&self) -> &BackoffConfig {
        &self.backoff
    }

    /// Issue one logical generation request.
    ///
    /// Rate-limit, connection and server errors are retried until
    /// `max_attempts` is reached; client (4xx) and unclassified errors fail
    /// on the spot. The returned [`UsageRecord`] reports the 1-indexed
    /// attempt that succeeded.
    pub async fn call(
        &self,
        user_message: impl Into<String>,
        system: Vec<SystemBlock>,
        settings: &CallSettings,
    ) -> Result<(String, UsageRecord)> {
        let request = GenerationRequest {
            model: self.model.clone(),
            system,
            user_message: user_message.into(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        };

        let max_attempts = self.backoff.max_attempts.max(1);
        let mut last_error: Option<ServiceError> = None;

        for attempt in 0..max_attempts {
            match self.backend.complete(&request).await {
                Ok(response) => {
                    let usage = UsageRecord::new(
                        &self.model,
                        response.input_tokens,
                        response.output_tokens,
                        attempt + 1,
                    );
                    debug!(
                        model = %self.model,
                        attempts = usage.attempts,
                        input_tokens = usage.input_tokens,
                        output_tokens = usage.output_tokens,
                        total_cost = usage.total_cost,
                        "generation call succeeded"
                    );
                    return Ok((response.text, usage));
                }
                Err(err) if err.is_retryable() => {
                    if attempt + 1 < max_attempts {
                        let delay = self.retry_delay(&err, attempt);
                        warn!(
                            model = %self.model,
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "transient generation failure, backing off"
                        );
                        emit(
                            &self.event_handler,
                            Event::CallRetry {
                                model: self.model.clone(),
                                attempt: attempt + 1,
                                delay_ms: delay.as_millis() as u64,
                                reason: err.to_string(),
                            },
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(err);
                }
                Err(err) => {
                    warn!(model = %self.model, error = %err, "fatal generation failure");
                    return Err(PipelineError::CallFailed {
                        attempts: attempt + 1,
                        message: err.to_string(),
                    });
                }
            }
        }

        Err(PipelineError::CallFailed {
            attempts: max_attempts,
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempt was made".to_string()),
        })
    }

    fn retry_delay(&self, err: &ServiceError, attempt: u32) -> Duration {
        match err {
            ServiceError::RateLimited {
                retry_after: Some(hint),
                ..
            } if self.backoff.respect_retry_after => (*hint).min(self.backoff.max_delay),
            _ => self.backoff.delay_for_attempt(attempt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, MockReply};
    use crate::events::FnEventHandler;
    use std::sync::Mutex;

    fn rate_limited() -> MockReply {
        MockReply::Fail(ServiceError::RateLimited {
            message: "too many requests".into(),
            retry_after: None,
        })
    }

    fn client(mock: Arc<MockBackend>, attempts: u32) -> LlmClient {
        LlmClient::new(mock, "claude-sonnet-4-5-20250929").with_backoff(BackoffConfig::immediate(attempts))
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let mock = Arc::new(MockBackend::fixed("done"));
        let (text, usage) = client(mock.clone(), 3)
            .call("hi", vec![SystemBlock::new("sys")], &CallSettings::default())
            .await
            .unwrap();
        assert_eq!(text, "done");
        assert_eq!(usage.attempts, 1);
        assert_eq!(usage.input_tokens, 100);
        assert_eq!(usage.output_tokens, 50);
        assert_eq!(usage.model, "claude-sonnet-4-5-20250929");
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        for k in 0..3u32 {
            let mut script: Vec<MockReply> = (0..k)
                .map(|i| {
                    if i % 2 == 0 {
                        rate_limited()
                    } else {
                        MockReply::Fail(ServiceError::Connection("reset".into()))
                    }
                })
                .collect();
            script.push(MockReply::text("ok"));
            let mock = Arc::new(MockBackend::new(script));

            let (_, usage) = client(mock.clone(), 3)
                .call("hi", vec![], &CallSettings::default())
                .await
                .unwrap();
            assert_eq!(usage.attempts, k + 1);
            assert_eq!(mock.calls(), (k + 1) as usize);
        }
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let mock = Arc::new(MockBackend::new(vec![
            MockReply::Fail(ServiceError::Server {
                status: 503,
                body: "unavailable".into(),
            }),
            MockReply::text("ok"),
        ]));
        let (_, usage) = client(mock, 3)
            .call("hi", vec![], &CallSettings::default())
            .await
            .unwrap();
        assert_eq!(usage.attempts, 2);
    }

    #[tokio::test]
    async fn test_exhausts_exactly_max_attempts() {
        let mock = Arc::new(MockBackend::new(vec![rate_limited()]));
        let err = client(mock.clone(), 3)
            .call("hi", vec![], &CallSettings::default())
            .await
            .unwrap_err();
        assert_eq!(mock.calls(), 3);
        match err {
            PipelineError::CallFailed { attempts, message } => {
                assert_eq!(attempts, 3);
                assert!(message.contains("rate limited"));
            }
            other => panic!("Expected CallFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_client_error_is_fatal() {
        let mock = Arc::new(MockBackend::new(vec![
            MockReply::Fail(ServiceError::Client {
                status: 400,
                body: "invalid model".into(),
            }),
            MockReply::text("never reached"),
        ]));
        let err = client(mock.clone(), 3)
            .call("hi", vec![], &CallSettings::default())
            .await
            .unwrap_err();
        assert_eq!(mock.calls(), 1);
        match err {
            PipelineError::CallFailed { attempts, message } => {
                assert_eq!(attempts, 1);
                assert!(message.contains("invalid model"));
            }
            other => panic!("Expected CallFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_error_is_fatal() {
        let mock = Arc::new(MockBackend::failing(ServiceError::Unknown("boom".into())));
        let err = client(mock.clone(), 5)
            .call("hi", vec![], &CallSettings::default())
            .await
            .unwrap_err();
        assert_eq!(mock.calls(), 1);
        assert!(matches!(err, PipelineError::CallFailed { attempts: 1, .. }));
    }

    #[tokio::test]
    async fn test_request_carries_settings_and_system() {
        let mock = Arc::new(MockBackend::fixed("ok"));
        let settings = CallSettings::default().with_max_tokens(512).with_temperature(0.3);
        client(mock.clone(), 1)
            .call(
                "message",
                vec![SystemBlock::new("a"), SystemBlock::cached("b")],
                &settings,
            )
            .await
            .unwrap();

        let req = &mock.requests()[0];
        assert_eq!(req.user_message, "message");
        assert_eq!(req.max_tokens, 512);
        assert_eq!(req.temperature, 0.3);
        assert_eq!(req.system.len(), 2);
        assert!(req.system[1].cacheable);
    }

    #[tokio::test]
    async fn test_retry_events_emitted_between_attempts() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let mock = Arc::new(MockBackend::new(vec![rate_limited()]));
        let client = client(mock, 3).with_event_handler(Arc::new(FnEventHandler(move |e: Event| {
            sink.lock().unwrap().push(e);
        })));

        let _ = client.call("hi", vec![], &CallSettings::default()).await;

        let events = events.lock().unwrap();
        // No backoff after the final attempt.
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Event::CallRetry { attempt: 1, .. }));
        assert!(matches!(events[1], Event::CallRetry { attempt: 2, .. }));
    }

    #[test]
    fn test_retry_after_hint_respected_when_enabled() {
        let mut backoff = BackoffConfig::standard();
        backoff.respect_retry_after = true;
        let client = LlmClient::new(Arc::new(MockBackend::fixed("x")), "m").with_backoff(backoff);
        let err = ServiceError::RateLimited {
            message: "slow".into(),
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(client.retry_delay(&err, 0), Duration::from_secs(7));

        let server = ServiceError::Server {
            status: 500,
            body: String::new(),
        };
        assert_eq!(client.retry_delay(&server, 2), Duration::from_secs(4));
    }
}
