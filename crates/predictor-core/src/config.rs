//! Configuration for prediction requests

use crate::error::{PredictorError, Result};
use predictor_llm::LLMProvider;
use predictor_llm::providers::{GeminiConfig, GeminiProvider, OpenAIConfig, OpenAIProvider};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Which generative-AI service answers sentiment requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Google Gemini (default)
    #[default]
    Gemini,
    /// OpenAI or an OpenAI-compatible server
    OpenAI,
}

impl ProviderKind {
    /// Model used when none is configured
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.5-flash",
            Self::OpenAI => "gpt-4o-mini",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = PredictorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAI),
            other => Err(PredictorError::Config(format!(
                "unknown provider '{other}' (expected 'gemini' or 'openai')"
            ))),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gemini => f.write_str("gemini"),
            Self::OpenAI => f.write_str("openai"),
        }
    }
}

/// Configuration for prediction requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictorConfig {
    /// Service used for sentiment analysis
    pub provider: ProviderKind,

    /// Model identifier passed to the provider
    pub model: String,

    /// Override for the provider's base URL
    pub api_base: Option<String>,

    /// Output token cap; unset by default so thinking models are not cut
    /// off before they answer
    pub max_tokens: Option<usize>,

    /// Sampling temperature; provider default when `None`
    pub temperature: Option<f32>,

    /// Timeout for the outbound request
    pub request_timeout: Duration,

    /// Minimum pause after each progress stage
    pub stage_delay: Duration,

    /// Extra random pause added on top of `stage_delay`
    pub stage_jitter: Duration,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Gemini,
            model: ProviderKind::Gemini.default_model().to_string(),
            api_base: None,
            max_tokens: None,
            temperature: None,
            request_timeout: Duration::from_secs(60),
            stage_delay: Duration::from_millis(800),
            stage_jitter: Duration::from_millis(400),
        }
    }
}

impl PredictorConfig {
    /// Create a new configuration builder
    pub fn builder() -> PredictorConfigBuilder {
        PredictorConfigBuilder::default()
    }

    /// Defaults overlaid with `PREDICTOR_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::builder().with_env()?.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(PredictorError::Config("model must not be empty".to_string()));
        }

        if self.max_tokens == Some(0) {
            return Err(PredictorError::Config(
                "max_tokens must be greater than 0".to_string(),
            ));
        }

        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(PredictorError::Config(format!(
                    "temperature must be within 0.0..=2.0, got {t}"
                )));
            }
        }

        if self.request_timeout.is_zero() {
            return Err(PredictorError::Config(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Pause to take after one progress stage: `stage_delay` plus a uniform
    /// draw from `[0, stage_jitter)`
    pub fn stage_pause<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let jitter_ms = self.stage_jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.stage_delay;
        }
        self.stage_delay + Duration::from_millis(rng.gen_range(0..jitter_ms))
    }

    /// Build the configured provider.
    ///
    /// Credentials come from the environment and are not checked here; a
    /// missing key fails the first request instead.
    pub fn build_provider(&self) -> Result<Arc<dyn LLMProvider>> {
        let timeout = self.request_timeout.as_secs().max(1);
        let provider: Arc<dyn LLMProvider> = match self.provider {
            ProviderKind::Gemini => {
                let mut config = GeminiConfig::from_env().with_timeout(timeout);
                if let Some(base) = &self.api_base {
                    config = config.with_api_base(base.clone());
                }
                Arc::new(GeminiProvider::with_config(config)?)
            }
            ProviderKind::OpenAI => {
                let mut config = OpenAIConfig::from_env().with_timeout(timeout);
                if let Some(base) = &self.api_base {
                    config = config.with_api_base(base.clone());
                }
                Arc::new(OpenAIProvider::with_config(config)?)
            }
        };
        Ok(provider)
    }
}

/// Builder for PredictorConfig
#[derive(Debug, Default)]
pub struct PredictorConfigBuilder {
    provider: Option<ProviderKind>,
    model: Option<String>,
    api_base: Option<String>,
    max_tokens: Option<usize>,
    temperature: Option<f32>,
    request_timeout: Option<Duration>,
    stage_delay: Option<Duration>,
    stage_jitter: Option<Duration>,
}

impl PredictorConfigBuilder {
    /// Set the provider
    pub fn provider(mut self, provider: ProviderKind) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the model; defaults to the provider's default model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Override the provider's base URL
    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    /// Set maximum output tokens
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set sampling temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set the stage pause and jitter
    pub fn stage_delay(mut self, delay: Duration, jitter: Duration) -> Self {
        self.stage_delay = Some(delay);
        self.stage_jitter = Some(jitter);
        self
    }

    /// Skip the staged progress pauses entirely
    pub fn no_stage_delay(self) -> Self {
        self.stage_delay(Duration::ZERO, Duration::ZERO)
    }

    /// Load `PREDICTOR_PROVIDER`, `PREDICTOR_MODEL` and `PREDICTOR_API_BASE`
    /// from the environment; values already set on the builder win
    pub fn with_env(mut self) -> Result<Self> {
        if self.provider.is_none() {
            if let Ok(value) = std::env::var("PREDICTOR_PROVIDER") {
                self.provider = Some(value.parse()?);
            }
        }
        if self.model.is_none() {
            self.model = std::env::var("PREDICTOR_MODEL").ok();
        }
        if self.api_base.is_none() {
            self.api_base = std::env::var("PREDICTOR_API_BASE").ok();
        }
        Ok(self)
    }

    /// Build the configuration
    pub fn build(self) -> Result<PredictorConfig> {
        let defaults = PredictorConfig::default();
        let provider = self.provider.unwrap_or(defaults.provider);

        let config = PredictorConfig {
            provider,
            model: self
                .model
                .unwrap_or_else(|| provider.default_model().to_string()),
            api_base: self.api_base,
            max_tokens: self.max_tokens.or(defaults.max_tokens),
            temperature: self.temperature.or(defaults.temperature),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            stage_delay: self.stage_delay.unwrap_or(defaults.stage_delay),
            stage_jitter: self.stage_jitter.unwrap_or(defaults.stage_jitter),
        };

        config.validate()?;
        Ok(config)
    }
}
