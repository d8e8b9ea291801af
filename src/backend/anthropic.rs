//! Backend for the Anthropic Messages API.
//!
//! Endpoint: `/v1/messages`. System instructions are sent as an array of text
//! blocks; cacheable blocks carry `cache_control: {"type": "ephemeral"}`.

use super::{Backend, GenerationRequest, GenerationResponse};
use crate::error::{PipelineError, Result, ServiceError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

/// Default API host.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// `anthropic-version` header value.
pub const API_VERSION: &str = "2023-06-01";

/// Backend for the Anthropic Messages API.
///
/// Owns its HTTP client. Construct one per unit, or share an `Arc` of it.
///
/// # Example
///
/// ```
/// use consultant_pipeline::backend::AnthropicBackend;
/// use std::time::Duration;
///
/// let backend = AnthropicBackend::new("sk-ant-...", Duration::from_secs(300))
///     .unwrap()
///     .with_base_url("http://localhost:8080");
/// ```
#[derive(Clone)]
pub struct AnthropicBackend {
    client: Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for AnthropicBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let key = match self.api_key.get(..6) {
            Some(prefix) if self.api_key.len() > 6 => format!("{}***", prefix),
            _ => "***".to_string(),
        };
        f.debug_struct("AnthropicBackend")
            .field("api_key", &key)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl AnthropicBackend {
    /// Create a backend with its own HTTP client using the given request timeout.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(PipelineError::Request)?;
        Ok(Self::with_client(client, api_key))
    }

    /// Create a backend around an existing client.
    pub fn with_client(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the API host (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the request body for `/v1/messages`.
    fn build_body(request: &GenerationRequest) -> Value {
        let system: Vec<Value> = request
            .system
            .iter()
            .map(|block| {
                let mut entry = json!({"type": "text", "text": block.text});
                if block.cacheable {
                    entry["cache_control"] = json!({"type": "ephemeral"});
                }
                entry
            })
            .collect();

        json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "system": system,
            "messages": [{"role": "user", "content": request.user_message}],
        })
    }

    /// Build the reqwest request with authentication headers.
    fn build_http_request(&self, url: &str, body: &Value) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(body)
    }

    /// Parse a `Retry-After` header value as seconds.
    fn parse_retry_after(value: &str) -> Option<Duration> {
        value.trim().parse::<u64>().ok().map(Duration::from_secs)
    }

    /// Extract the generated text and token usage from a response body.
    fn parse_response(json_resp: &Value) -> std::result::Result<GenerationResponse, ServiceError> {
        let text = json_resp
            .get("content")
            .and_then(Value::as_array)
            .and_then(|blocks| {
                blocks
                    .iter()
                    .find(|b| b.get("type").and_then(Value::as_str) == Some("text"))
            })
            .and_then(|b| b.get("text"))
            .and_then(Value::as_str)
            .ok_or_else(|| ServiceError::Unknown("response contained no text content".into()))?;

        let usage = json_resp.get("usage");
        let tokens = |key: &str| {
            usage
                .and_then(|u| u.get(key))
                .and_then(Value::as_u64)
                .unwrap_or(0)
        };

        Ok(GenerationResponse::new(
            text,
            tokens("input_tokens"),
            tokens("output_tokens"),
        ))
    }
}

/// Classify a non-success HTTP status.
pub(crate) fn classify_status(
    status: StatusCode,
    body: String,
    retry_after: Option<Duration>,
) -> ServiceError {
    let code = status.as_u16();
    match code {
        429 => ServiceError::RateLimited {
            message: body,
            retry_after,
        },
        400..=499 => ServiceError::Client { status: code, body },
        // 529 is the provider's "overloaded" status.
        500..=599 => ServiceError::Server { status: code, body },
        _ => ServiceError::Unknown(format!("HTTP {}: {}", code, body)),
    }
}

/// Classify a transport error raised before a response arrived.
pub(crate) fn classify_transport(err: &reqwest::Error) -> ServiceError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        ServiceError::Connection(err.to_string())
    } else {
        ServiceError::Unknown(err.to_string())
    }
}

/// Classify a failure while reading a response body.
///
/// The status line has already arrived, so a failed read means the
/// connection stalled past the request timeout or dropped mid-body.
pub(crate) fn classify_body(err: &reqwest::Error) -> ServiceError {
    ServiceError::Connection(format!("response body interrupted: {}", err))
}

#[async_trait]
impl Backend for AnthropicBackend {
    async fn complete(&self, request: &GenerationRequest) -> std::result::Result<GenerationResponse, ServiceError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = Self::build_body(request);

        let resp = self
            .build_http_request(&url, &body)
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(Self::parse_retry_after);
            let text = resp.text().await.map_err(|e| classify_body(&e))?;
            return Err(classify_status(status, text, retry_after));
        }

        let bytes = resp.bytes().await.map_err(|e| classify_body(&e))?;
        let json_resp: Value = serde_json::from_slice(&bytes)
            .map_err(|e| ServiceError::Unknown(format!("undecodable response body: {}", e)))?;

        Self::parse_response(&json_resp)
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}
