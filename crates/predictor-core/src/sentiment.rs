//! AI sentiment analysis client

use std::sync::Arc;

use predictor_llm::{CompletionRequest, LLMError, LLMProvider, Message, ResponseFormat};
use thiserror::Error;
use tracing::{debug, error, instrument};

use crate::config::PredictorConfig;
use crate::error::{DecodeError, SentimentError};
use crate::models::SentimentAnalysisResult;
use crate::prompts::{SENTIMENT_SCHEMA_NAME, sentiment_prompt, sentiment_schema};

/// Everything that can go wrong inside one fetch; never leaves this module
#[derive(Debug, Error)]
enum FetchFailure {
    #[error("prompt rendering failed: {0}")]
    Prompt(#[from] minijinja::Error),

    #[error(transparent)]
    Provider(#[from] LLMError),

    #[error("invalid response: {0}")]
    Decode(#[from] DecodeError),
}

/// Asks a generative-AI provider for a ticker's market sentiment.
///
/// Each call makes exactly one request. There is no retry and no cache;
/// the same ticker may get a different answer next time.
#[derive(Clone)]
pub struct SentimentClient {
    provider: Arc<dyn LLMProvider>,
    model: String,
    max_tokens: Option<usize>,
    temperature: Option<f32>,
}

impl SentimentClient {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn from_config(provider: Arc<dyn LLMProvider>, config: &PredictorConfig) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Fetch the sentiment for `ticker`.
    ///
    /// Any failure, whether transport, authentication, a service error, or
    /// output that does not decode, is logged with its cause and returned
    /// as a [`SentimentError`] naming the ticker.
    #[instrument(skip(self), fields(model = %self.model))]
    pub async fn fetch_sentiment(
        &self,
        ticker: &str,
    ) -> Result<SentimentAnalysisResult, SentimentError> {
        match self.try_fetch(ticker).await {
            Ok(result) => {
                debug!(sentiment = ?result.sentiment, "sentiment analysis complete");
                Ok(result)
            }
            Err(cause) => {
                error!(ticker, error = %cause, "Error fetching sentiment analysis");
                Err(SentimentError::new(ticker))
            }
        }
    }

    async fn try_fetch(&self, ticker: &str) -> Result<SentimentAnalysisResult, FetchFailure> {
        let request = self.build_request(ticker)?;
        let response = self.provider.complete(request).await?;
        Ok(SentimentAnalysisResult::decode(response.text())?)
    }

    fn build_request(&self, ticker: &str) -> Result<CompletionRequest, minijinja::Error> {
        let mut builder = CompletionRequest::builder(&self.model)
            .add_message(Message::user(sentiment_prompt(ticker)?))
            .response_format(ResponseFormat::json_schema(
                SENTIMENT_SCHEMA_NAME,
                sentiment_schema(),
            ));
        if let Some(max_tokens) = self.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }
        if let Some(temperature) = self.temperature {
            builder = builder.temperature(temperature);
        }
        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sentiment;
    use crate::test_support::{MockProvider, completion};

    fn client(provider: MockProvider) -> SentimentClient {
        SentimentClient::new(Arc::new(provider), "gemini-2.5-flash")
    }

    fn assert_normalized(err: &SentimentError, ticker: &str) {
        assert_eq!(err.ticker, ticker);
        assert_eq!(
            err.to_string(),
            format!(
                "Failed to get sentiment analysis for {ticker}. The ticker might be invalid or there was a network issue."
            )
        );
    }

    #[tokio::test]
    async fn test_bullish_response_passes_through() {
        let mut provider = MockProvider::new();
        provider.expect_complete().times(1).returning(|_| {
            Ok(completion(
                r#"{"sentiment":"Bullish","explanation":"Strong demand for data-center chips."}"#,
            ))
        });

        let result = client(provider).fetch_sentiment("NVDA").await.unwrap();
        assert_eq!(result.sentiment, Some(Sentiment::Bullish));
        assert_eq!(result.explanation, "Strong demand for data-center chips.");
    }

    #[tokio::test]
    async fn test_neutral_scenario() {
        let mut provider = MockProvider::new();
        provider.expect_complete().times(1).returning(|_| {
            Ok(completion(
                r#"{"sentiment":"Neutral","explanation":"Mixed signals."}"#,
            ))
        });

        let result = client(provider).fetch_sentiment("MSFT").await.unwrap();
        assert_eq!(
            result,
            SentimentAnalysisResult::new(Sentiment::Neutral, "Mixed signals.")
        );
    }

    #[tokio::test]
    async fn test_request_shape() {
        let mut provider = MockProvider::new();
        provider
            .expect_complete()
            .withf(|request| {
                request.model == "gemini-2.5-flash"
                    && request.max_tokens.is_none()
                    && request.messages.len() == 1
                    && request.messages[0].text().contains("stock ticker: AAPL.")
                    && matches!(
                        &request.response_format,
                        Some(ResponseFormat::JsonSchema { name, schema })
                            if name == SENTIMENT_SCHEMA_NAME
                                && schema["required"][0] == "sentiment"
                    )
            })
            .times(1)
            .returning(|_| Ok(completion(r#"{"sentiment":"Bearish","explanation":"x"}"#)));

        client(provider).fetch_sentiment("AAPL").await.unwrap();
    }

    #[tokio::test]
    async fn test_config_is_applied() {
        let mut provider = MockProvider::new();
        provider
            .expect_complete()
            .withf(|request| {
                request.model == "gpt-4o-mini"
                    && request.max_tokens == Some(300)
                    && request.temperature == Some(0.1)
            })
            .times(1)
            .returning(|_| Ok(completion(r#"{"sentiment":"Bearish","explanation":"x"}"#)));

        let config = PredictorConfig::builder()
            .provider(crate::config::ProviderKind::OpenAI)
            .max_tokens(300)
            .temperature(0.1)
            .build()
            .unwrap();
        let client = SentimentClient::from_config(Arc::new(provider), &config);
        assert_eq!(client.model(), "gpt-4o-mini");
        client.fetch_sentiment("AMD").await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_explanation_is_normalized() {
        let mut provider = MockProvider::new();
        provider
            .expect_complete()
            .returning(|_| Ok(completion(r#"{"sentiment":"Bullish"}"#)));

        let err = client(provider).fetch_sentiment("AAPL").await.unwrap_err();
        assert_normalized(&err, "AAPL");
    }

    #[tokio::test]
    async fn test_missing_sentiment_is_normalized() {
        let mut provider = MockProvider::new();
        provider
            .expect_complete()
            .returning(|_| Ok(completion(r#"{"explanation":"No label given."}"#)));

        let err = client(provider).fetch_sentiment("GOOGL").await.unwrap_err();
        assert_normalized(&err, "GOOGL");
    }

    #[tokio::test]
    async fn test_non_json_is_normalized() {
        let mut provider = MockProvider::new();
        provider
            .expect_complete()
            .returning(|_| Ok(completion("The stock looks bullish to me.")));

        let err = client(provider).fetch_sentiment("TSLA").await.unwrap_err();
        assert_normalized(&err, "TSLA");
    }

    #[tokio::test]
    async fn test_positional_array_is_normalized() {
        let mut provider = MockProvider::new();
        provider
            .expect_complete()
            .returning(|_| Ok(completion(r#"["Bullish","Strong quarter."]"#)));

        let err = client(provider).fetch_sentiment("AAPL").await.unwrap_err();
        assert_normalized(&err, "AAPL");
    }

    #[tokio::test]
    async fn test_truncated_output_is_normalized() {
        let mut provider = MockProvider::new();
        provider.expect_complete().returning(|_| {
            Err(LLMError::Truncated(
                "generation stopped after 1024 output tokens".to_string(),
            ))
        });

        let err = client(provider).fetch_sentiment("NFLX").await.unwrap_err();
        assert_normalized(&err, "NFLX");
        assert!(!err.to_string().contains("token"));
    }

    #[tokio::test]
    async fn test_network_failure_hides_cause() {
        let mut provider = MockProvider::new();
        provider.expect_complete().times(1).returning(|_| {
            Err(LLMError::RequestFailed(
                "connection reset by peer (os error 104)".to_string(),
            ))
        });

        let err = client(provider).fetch_sentiment("AMZN").await.unwrap_err();
        assert_normalized(&err, "AMZN");
        assert!(!err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_missing_credentials_is_normalized() {
        let mut provider = MockProvider::new();
        provider.expect_complete().returning(|_| {
            Err(LLMError::ConfigurationError(
                "GEMINI_API_KEY (or API_KEY) environment variable not set".to_string(),
            ))
        });

        let err = client(provider).fetch_sentiment("META").await.unwrap_err();
        assert_normalized(&err, "META");
    }
}
