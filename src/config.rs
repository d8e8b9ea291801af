//! Run settings and per-unit configuration.

use crate::backend::{AnthropicBackend, Backend, BackoffConfig};
use crate::client::CallSettings;
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Model used for transcript analysis and BPMN generation.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";

/// Model used for optimization recommendations.
pub const DEFAULT_RECOMMENDATION_MODEL: &str = "claude-opus-4-5-20251101";

/// Process-wide settings: credentials, models, skill location, call policy.
#[derive(Clone, Serialize, Deserialize)]
pub struct Settings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub recommendation_model: String,
    pub skills_dir: PathBuf,
    /// HTTP request timeout in seconds.
    pub request_timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f64,
    /// Attempts per generation call, counting the first.
    pub max_attempts: u32,
    pub base_delay_secs: f64,
    pub max_delay_secs: f64,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("recommendation_model", &self.recommendation_model)
            .field("skills_dir", &self.skills_dir)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

impl Settings {
    /// Settings with defaults for everything but the API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: crate::backend::anthropic::DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            recommendation_model: DEFAULT_RECOMMENDATION_MODEL.to_string(),
            skills_dir: PathBuf::from("skills"),
            request_timeout_secs: 300,
            max_tokens: 16_000,
            temperature: 0.0,
            max_attempts: 3,
            base_delay_secs: 1.0,
            max_delay_secs: 60.0,
        }
    }

    /// Read settings from the process environment.
    ///
    /// `ANTHROPIC_API_KEY` is required. `CONSULTANT_MODEL`,
    /// `CONSULTANT_RECOMMENDATION_MODEL`, `CONSULTANT_SKILLS_DIR` and
    /// `ANTHROPIC_BASE_URL` override the defaults when set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup("ANTHROPIC_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                PipelineError::InvalidConfig("ANTHROPIC_API_KEY not found in environment".to_string())
            })?;

        let mut settings = Self::new(api_key);
        if let Some(model) = lookup("CONSULTANT_MODEL") {
            settings.model = model;
        }
        if let Some(model) = lookup("CONSULTANT_RECOMMENDATION_MODEL") {
            settings.recommendation_model = model;
        }
        if let Some(dir) = lookup("CONSULTANT_SKILLS_DIR") {
            settings.skills_dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup("ANTHROPIC_BASE_URL") {
            settings.base_url = url;
        }
        Ok(settings)
    }

    /// Retry policy for generation calls.
    pub fn backoff(&self) -> BackoffConfig {
        BackoffConfig::standard()
            .with_max_attempts(self.max_attempts)
            .with_initial_delay(Duration::from_secs_f64(self.base_delay_secs.max(0.0)))
            .with_max_delay(Duration::from_secs_f64(self.max_delay_secs.max(0.0)))
    }

    pub fn call_settings(&self) -> CallSettings {
        CallSettings::default()
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
    }

    /// Build the HTTP backend described by these settings.
    pub fn backend(&self) -> Result<Arc<dyn Backend>> {
        let backend = AnthropicBackend::new(&self.api_key, Duration::from_secs(self.request_timeout_secs))?
            .with_base_url(&self.base_url);
        Ok(Arc::new(backend))
    }
}

/// Options recognised by processing units when registered in a pipeline.
///
/// Unknown keys are rejected when deserialising.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UnitConfig {
    /// Append the unit's reference document (e.g. APQC activities) to its
    /// instructions. Default: `true`.
    pub include_reference_doc: bool,

    /// Free-form business context (industry, budget, priorities).
    pub business_context: Option<String>,

    /// Take input from the named earlier unit instead of the predecessor.
    pub input_from: Option<String>,

    /// Extra reference documents appended as cacheable instructions.
    pub reference_docs: Vec<String>,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            include_reference_doc: true,
            business_context: None,
            input_from: None,
            reference_docs: Vec::new(),
        }
    }
}

impl UnitConfig {
    pub fn input_from(mut self, unit: impl Into<String>) -> Self {
        self.input_from = Some(unit.into());
        self
    }

    pub fn business_context(mut self, context: impl Into<String>) -> Self {
        self.business_context = Some(context.into());
        self
    }

    pub fn include_reference_doc(mut self, enabled: bool) -> Self {
        self.include_reference_doc = enabled;
        self
    }

    pub fn reference_doc(mut self, filename: impl Into<String>) -> Self {
        self.reference_docs.push(filename.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let err = Settings::from_lookup(lookup(&[])).unwrap_err();
        match err {
            PipelineError::InvalidConfig(msg) => assert!(msg.contains("ANTHROPIC_API_KEY")),
            other => panic!("Expected InvalidConfig, got {:?}", other),
        }
        assert!(Settings::from_lookup(lookup(&[("ANTHROPIC_API_KEY", "  ")])).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            ("ANTHROPIC_API_KEY", "sk-ant-x"),
            ("CONSULTANT_MODEL", "claude-haiku-4-5"),
            ("CONSULTANT_SKILLS_DIR", "/opt/skills"),
        ]))
        .unwrap();
        assert_eq!(settings.api_key, "sk-ant-x");
        assert_eq!(settings.model, "claude-haiku-4-5");
        assert_eq!(settings.recommendation_model, DEFAULT_RECOMMENDATION_MODEL);
        assert_eq!(settings.skills_dir, PathBuf::from("/opt/skills"));
    }

    #[test]
    fn test_backoff_from_settings() {
        let mut settings = Settings::new("k");
        settings.max_attempts = 5;
        settings.base_delay_secs = 0.5;
        let backoff = settings.backoff();
        assert_eq!(backoff.max_attempts, 5);
        assert_eq!(backoff.initial_delay, Duration::from_millis(500));
        assert_eq!(backoff.max_delay, Duration::from_secs(60));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let settings = Settings::new("sk-ant-secret");
        assert!(!format!("{:?}", settings).contains("secret"));
    }

    #[test]
    fn test_unit_config_defaults() {
        let config = UnitConfig::default();
        assert!(config.include_reference_doc);
        assert!(config.input_from.is_none());
        assert!(config.reference_docs.is_empty());
    }

    #[test]
    fn test_unit_config_from_json() {
        let config: UnitConfig =
            serde_json::from_str(r#"{"input_from": "Transcript Analysis"}"#).unwrap();
        assert_eq!(config.input_from.as_deref(), Some("Transcript Analysis"));
        assert!(config.include_reference_doc);
    }

    #[test]
    fn test_unit_config_rejects_unknown_keys() {
        let result: std::result::Result<UnitConfig, _> =
            serde_json::from_str(r#"{"include_apqc": false}"#);
        assert!(result.is_err());
    }
}
