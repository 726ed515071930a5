//! Google Gemini provider implementation
//!
//! This module implements the LLMProvider trait for the Gemini
//! `generateContent` REST endpoint.
//! See: https://ai.google.dev/api/generate-content
//!
//! Structured output is requested through `generationConfig.responseSchema`,
//! which accepts an OpenAPI-style subset of JSON Schema: upper-case type
//! names and no `additionalProperties`. [`to_gemini_schema`] performs that
//! conversion so callers can describe schemas in plain JSON Schema.
//!
//! # Example
//!
//! ```no_run
//! use predictor_llm::{CompletionRequest, LLMProvider, Message};
//! use predictor_llm::providers::GeminiProvider;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! // Reads GEMINI_API_KEY (or API_KEY); a missing key fails on first call
//! let provider = GeminiProvider::from_env()?;
//!
//! let request = CompletionRequest::builder("gemini-2.5-flash")
//!     .add_message(Message::user("Hello!"))
//!     .build();
//!
//! let response = provider.complete(request).await?;
//! println!("{}", response.text());
//! # Ok(())
//! # }
//! ```

use crate::{
    CompletionRequest, CompletionResponse, LLMError, LLMProvider, Message, ResponseFormat, Result,
    Role, StopReason, TokenUsage,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration for the Gemini provider
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key; checked when a request is made, not at construction
    pub api_key: Option<String>,

    /// Base URL (default: "https://generativelanguage.googleapis.com/v1beta")
    pub api_base: String,

    /// Request timeout in seconds (default: 60)
    pub timeout_secs: u64,
}

impl GeminiConfig {
    /// Create a new config with the given API key and default settings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Create config from the environment
    ///
    /// Reads the key from `GEMINI_API_KEY`, falling back to `API_KEY`.
    /// Reads an optional base URL from `GEMINI_API_BASE`. A missing key is
    /// not an error here.
    pub fn from_env() -> Self {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty());

        let api_base = std::env::var("GEMINI_API_BASE")
            .unwrap_or_else(|_| DEFAULT_GEMINI_API_BASE.to_string());

        Self {
            api_key,
            api_base,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set custom API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set request timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Gemini provider
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    /// Create a new Gemini provider with custom configuration
    pub fn with_config(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Create a new Gemini provider with API key and default settings
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(GeminiConfig::new(api_key))
    }

    /// Create a provider from environment variables
    pub fn from_env() -> Result<Self> {
        Self::with_config(GeminiConfig::from_env())
    }

    /// Get the current configuration
    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn api_key(&self) -> Result<&str> {
        self.config.api_key.as_deref().ok_or_else(|| {
            LLMError::ConfigurationError(
                "GEMINI_API_KEY (or API_KEY) environment variable not set".to_string(),
            )
        })
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    #[instrument(skip(self, request), fields(model = %request.model, api_base = %self.config.api_base))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let api_key = self.api_key()?;
        let model = request.model.clone();
        let structured = request.is_structured();

        debug!("Sending request to Gemini API");

        let gemini_request = build_gemini_request(request);

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.config.api_base, model
            ))
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&gemini_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(LLMError::from_status(status.as_u16(), error_text, &model));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            LLMError::UnexpectedResponse(format!("Failed to parse response: {e}"))
        })?;

        parse_gemini_response(gemini_response)?.ensure_usable(structured)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

// ============================================================================
// Gemini-specific request types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    thought: bool,
}

impl GeminiPart {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            thought: false,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

// ============================================================================
// Gemini-specific response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

// ============================================================================
// Conversion functions
// ============================================================================

fn build_gemini_request(request: CompletionRequest) -> GeminiRequest {
    let contents = request.messages.into_iter().map(convert_message).collect();

    let (response_mime_type, response_schema) = match request.response_format {
        Some(ResponseFormat::JsonSchema { schema, .. }) => (
            Some("application/json".to_string()),
            Some(to_gemini_schema(&schema)),
        ),
        None => (None, None),
    };

    GeminiRequest {
        contents,
        generation_config: GenerationConfig {
            max_output_tokens: request.max_tokens,
            temperature: request.temperature,
            response_mime_type,
            response_schema,
        },
    }
}

fn convert_message(msg: Message) -> GeminiContent {
    let role = match msg.role {
        Role::User => "user",
        Role::Assistant => "model",
    };
    GeminiContent {
        role: Some(role.to_string()),
        parts: vec![GeminiPart::text(msg.content)],
    }
}

/// Convert a JSON Schema object to the dialect Gemini's `responseSchema`
/// accepts: `type` values upper-cased, `additionalProperties` and `$schema`
/// dropped, applied through `properties` and `items`.
pub fn to_gemini_schema(schema: &Value) -> Value {
    let Value::Object(map) = schema else {
        return schema.clone();
    };

    let mut out = Map::with_capacity(map.len());
    for (key, value) in map {
        match key.as_str() {
            "additionalProperties" | "$schema" => {}
            "type" => {
                let converted = value
                    .as_str()
                    .map_or_else(|| value.clone(), |t| Value::String(t.to_ascii_uppercase()));
                out.insert(key.clone(), converted);
            }
            "properties" => {
                let converted = match value {
                    Value::Object(props) => Value::Object(
                        props
                            .iter()
                            .map(|(name, prop)| (name.clone(), to_gemini_schema(prop)))
                            .collect(),
                    ),
                    other => other.clone(),
                };
                out.insert(key.clone(), converted);
            }
            "items" => {
                out.insert(key.clone(), to_gemini_schema(value));
            }
            _ => {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(out)
}

fn parse_gemini_response(response: GeminiResponse) -> Result<CompletionResponse> {
    let usage = response.usage_metadata.unwrap_or_default();

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(match response.prompt_feedback.and_then(|f| f.block_reason) {
            Some(reason) => LLMError::Blocked(reason),
            None => LLMError::UnexpectedResponse("No candidates in response".to_string()),
        });
    };

    let finish_reason = candidate.finish_reason.unwrap_or_default();
    let stop_reason = map_finish_reason(&finish_reason);

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|part| !part.thought)
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() && stop_reason == StopReason::ContentFilter {
        return Err(LLMError::Blocked(finish_reason));
    }

    debug!(
        "Received response - finish_reason: {}, tokens: {}/{}",
        finish_reason, usage.prompt_token_count, usage.candidates_token_count
    );

    Ok(CompletionResponse {
        message: Message::assistant(text),
        stop_reason,
        usage: TokenUsage {
            input_tokens: usage.prompt_token_count,
            output_tokens: usage.candidates_token_count,
        },
    })
}

fn map_finish_reason(reason: &str) -> StopReason {
    match reason {
        "STOP" | "" => StopReason::EndTurn,
        "MAX_TOKENS" => StopReason::MaxTokens,
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" => {
            StopReason::ContentFilter
        }
        _ => {
            debug!("Unknown finish reason: {}", reason);
            StopReason::EndTurn
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_schema() -> Value {
        json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "label": {"type": "string", "enum": ["a", "b"]},
                "tags": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["label"]
        })
    }

    #[test]
    fn test_provider_creation() {
        let provider = GeminiProvider::new("test-key").unwrap();
        assert_eq!(provider.name(), "gemini");
        assert_eq!(provider.config().api_key.as_deref(), Some("test-key"));
        assert_eq!(provider.config().api_base, DEFAULT_GEMINI_API_BASE);
    }

    #[test]
    fn test_missing_key_is_reported_at_call_time() {
        let provider = GeminiProvider::with_config(GeminiConfig::default()).unwrap();
        assert!(matches!(
            provider.api_key(),
            Err(LLMError::ConfigurationError(_))
        ));
    }

    #[tokio::test]
    async fn test_complete_without_key_fails_before_network() {
        let provider = GeminiProvider::with_config(
            GeminiConfig::default().with_api_base("http://127.0.0.1:9"),
        )
        .unwrap();
        let request = CompletionRequest::builder("gemini-2.5-flash")
            .add_message(Message::user("hi"))
            .build();

        let result = provider.complete(request).await;
        assert!(matches!(result, Err(LLMError::ConfigurationError(_))));
    }

    #[test]
    fn test_schema_conversion() {
        let converted = to_gemini_schema(&sample_schema());

        assert_eq!(converted["type"], "OBJECT");
        assert!(converted.get("additionalProperties").is_none());
        assert_eq!(converted["properties"]["label"]["type"], "STRING");
        assert_eq!(converted["properties"]["label"]["enum"], json!(["a", "b"]));
        assert_eq!(converted["properties"]["tags"]["items"]["type"], "STRING");
        assert_eq!(converted["required"], json!(["label"]));
    }

    #[test]
    fn test_schema_conversion_keeps_property_named_type() {
        let schema = json!({
            "type": "object",
            "properties": {"type": {"type": "string"}}
        });
        let converted = to_gemini_schema(&schema);
        assert_eq!(converted["properties"]["type"]["type"], "STRING");
    }

    #[test]
    fn test_request_with_schema() {
        let request = CompletionRequest::builder("gemini-2.5-flash")
            .add_message(Message::user("Hello"))
            .add_message(Message::assistant("Hi"))
            .max_tokens(256)
            .response_format(ResponseFormat::json_schema("reply", sample_schema()))
            .build();

        let body = serde_json::to_value(build_gemini_request(request)).unwrap();

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Hello");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 256);
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
        assert!(body["generationConfig"].get("temperature").is_none());
    }

    #[test]
    fn test_request_without_schema() {
        let request = CompletionRequest::builder("gemini-2.5-flash")
            .add_message(Message::user("Hello"))
            .build();
        let body = serde_json::to_value(build_gemini_request(request)).unwrap();

        assert!(body["generationConfig"].get("maxOutputTokens").is_none());
        assert!(body["generationConfig"].get("responseMimeType").is_none());
        assert!(body["generationConfig"].get("responseSchema").is_none());
    }

    #[test]
    fn test_parse_response() {
        let raw = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "thinking...", "thought": true},
                        {"text": "{\"label\":"},
                        {"text": "\"a\"}"}
                    ]
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 5}
        });
        let response: GeminiResponse = serde_json::from_value(raw).unwrap();
        let completion = parse_gemini_response(response).unwrap();

        assert_eq!(completion.text(), r#"{"label":"a"}"#);
        assert_eq!(completion.stop_reason, StopReason::EndTurn);
        assert_eq!(completion.usage.total(), 17);
    }

    #[test]
    fn test_parse_blocked_prompt() {
        let raw = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let response: GeminiResponse = serde_json::from_value(raw).unwrap();
        assert!(matches!(
            parse_gemini_response(response),
            Err(LLMError::Blocked(reason)) if reason == "SAFETY"
        ));
    }

    #[test]
    fn test_parse_empty_candidates() {
        let response: GeminiResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(
            parse_gemini_response(response),
            Err(LLMError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_parse_safety_stop_without_text() {
        let raw = json!({"candidates": [{"finishReason": "SAFETY"}]});
        let response: GeminiResponse = serde_json::from_value(raw).unwrap();
        assert!(matches!(
            parse_gemini_response(response),
            Err(LLMError::Blocked(_))
        ));
    }

    #[test]
    fn test_structured_request_without_token_cap() {
        let request = CompletionRequest::builder("gemini-2.5-flash")
            .add_message(Message::user("Hello"))
            .response_format(ResponseFormat::json_schema("reply", sample_schema()))
            .build();
        let body = serde_json::to_value(build_gemini_request(request)).unwrap();

        assert!(body["generationConfig"].get("maxOutputTokens").is_none());
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn test_max_tokens_without_text_is_truncation() {
        let raw = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "reasoning", "thought": true}]},
                "finishReason": "MAX_TOKENS"
            }],
            "usageMetadata": {"promptTokenCount": 40, "candidatesTokenCount": 0}
        });
        let response: GeminiResponse = serde_json::from_value(raw).unwrap();
        let completion = parse_gemini_response(response).unwrap();
        assert_eq!(completion.stop_reason, StopReason::MaxTokens);

        let err = completion.ensure_usable(false).unwrap_err();
        assert!(matches!(err, LLMError::Truncated(_)));
    }

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(map_finish_reason("STOP"), StopReason::EndTurn);
        assert_eq!(map_finish_reason("MAX_TOKENS"), StopReason::MaxTokens);
        assert_eq!(map_finish_reason("SAFETY"), StopReason::ContentFilter);
        assert_eq!(map_finish_reason("SOMETHING_NEW"), StopReason::EndTurn);
    }
}
