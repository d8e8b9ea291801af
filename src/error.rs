use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors produced by the pipeline and its units.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Input rejected by a unit's structural checks, before any network call.
    #[error("{0}")]
    Validation(String),

    /// The resilient call wrapper gave up: either a fatal service error or
    /// every allowed attempt failed.
    #[error("generation call failed after {attempts} attempt(s): {message}")]
    CallFailed { attempts: u32, message: String },

    /// Invalid configuration (missing credentials, bad `input_from`, ...).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An instruction template or reference document was not found.
    #[error("template not found at {}", path.display())]
    TemplateNotFound { path: PathBuf },

    /// Filesystem failure while reading templates or writing outputs.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Low-level HTTP transport failure that was not classified by a backend.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        PipelineError::Other(err.to_string())
    }
}

/// Failure kinds reported by the generation service transport.
///
/// Backends decide the kind; the call wrapper only consults
/// [`ServiceError::is_retryable`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// HTTP 429. `retry_after` is taken from the `Retry-After` header.
    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    /// Connection refused, DNS failure, request timeout.
    #[error("connection failed: {0}")]
    Connection(String),

    /// 4xx other than 429. Never retried.
    #[error("HTTP {status}: {body}")]
    Client { status: u16, body: String },

    /// 5xx or provider overload.
    #[error("service error {status}: {body}")]
    Server { status: u16, body: String },

    /// Anything the transport could not classify. Never retried.
    #[error("unexpected service failure: {0}")]
    Unknown(String),
}

impl ServiceError {
    /// Whether the call wrapper should back off and try again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ServiceError::RateLimited { .. } | ServiceError::Connection(_) | ServiceError::Server { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        let rate = ServiceError::RateLimited {
            message: "slow down".into(),
            retry_after: None,
        };
        assert!(rate.is_retryable());
        assert!(ServiceError::Connection("refused".into()).is_retryable());
        assert!(ServiceError::Server {
            status: 503,
            body: "unavailable".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_fatal_kinds() {
        assert!(!ServiceError::Client {
            status: 400,
            body: "bad request".into()
        }
        .is_retryable());
        assert!(!ServiceError::Unknown("boom".into()).is_retryable());
    }

    #[test]
    fn test_call_failed_message() {
        let err = PipelineError::CallFailed {
            attempts: 3,
            message: "service error 500: oops".into(),
        };
        assert_eq!(
            err.to_string(),
            "generation call failed after 3 attempt(s): service error 500: oops"
        );
    }
}
