//! Prediction orchestration
//!
//! A [`Predictor`] validates the ticker, walks through the staged progress
//! messages, then runs series generation and the sentiment fetch together.
//! The prediction is only returned when both halves succeed.

use std::sync::Arc;
use std::time::Duration;

use predictor_llm::LLMProvider;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::PredictorConfig;
use crate::error::{PredictorError, Result};
use crate::models::Prediction;
use crate::sentiment::SentimentClient;
use crate::series::SeriesGenerator;

/// One progress stage announcement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    /// 1-based stage number
    pub step: usize,
    pub total: usize,
    pub message: String,
}

/// Receives progress events while a prediction runs
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: &ProgressEvent);
}

impl<F> ProgressReporter for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn report(&self, event: &ProgressEvent) {
        self(event);
    }
}

/// Messages shown while a prediction is being prepared
pub fn stage_messages(ticker: &str) -> [String; 6] {
    [
        format!("Fetching historical data for {ticker}..."),
        "Preprocessing & cleaning data...".to_string(),
        "Building LSTM neural network model...".to_string(),
        "Training model on historical data...".to_string(),
        "Generating future price predictions...".to_string(),
        "Analyzing market sentiment with AI...".to_string(),
    ]
}

/// Trim and upper-case a ticker; empty input is rejected
pub fn normalize_ticker(input: &str) -> Result<String> {
    let ticker = input.trim();
    if ticker.is_empty() {
        return Err(PredictorError::EmptyTicker);
    }
    Ok(ticker.to_uppercase())
}

/// Runs complete prediction requests
pub struct Predictor {
    generator: SeriesGenerator,
    sentiment: SentimentClient,
    config: PredictorConfig,
}

impl Predictor {
    /// Create a predictor using `config` for the model and stage pauses
    pub fn new(provider: Arc<dyn LLMProvider>, config: PredictorConfig) -> Self {
        Self {
            generator: SeriesGenerator::new(),
            sentiment: SentimentClient::from_config(provider, &config),
            config,
        }
    }

    /// Build the provider named by `config` and wrap it
    pub fn from_config(config: PredictorConfig) -> Result<Self> {
        let provider = config.build_provider()?;
        info!(provider = %config.provider, model = %config.model, "predictor ready");
        Ok(Self::new(provider, config))
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    pub fn sentiment_client(&self) -> &SentimentClient {
        &self.sentiment
    }

    /// Run one prediction for `ticker`.
    ///
    /// Fails fast with [`PredictorError::EmptyTicker`] before any work when
    /// the ticker is blank. Otherwise reports each stage to `progress`,
    /// then generates the series and fetches the sentiment concurrently.
    pub async fn predict(
        &self,
        ticker: &str,
        progress: Option<&dyn ProgressReporter>,
    ) -> Result<Prediction> {
        let ticker = normalize_ticker(ticker)?;
        info!(ticker = %ticker, "starting prediction");

        let stages = stage_messages(&ticker);
        let total = stages.len();
        for (index, message) in stages.into_iter().enumerate() {
            if let Some(reporter) = progress {
                reporter.report(&ProgressEvent {
                    step: index + 1,
                    total,
                    message,
                });
            }
            let pause = self.config.stage_pause(&mut rand::thread_rng());
            if pause > Duration::ZERO {
                tokio::time::sleep(pause).await;
            }
        }

        let generator = self.generator;
        let (series, sentiment) = tokio::join!(
            async { generator.generate(&ticker) },
            self.sentiment.fetch_sentiment(&ticker),
        );

        let sentiment = sentiment.inspect_err(|_| {
            warn!(ticker = %ticker, "prediction failed; discarding generated series");
        })?;

        info!(ticker = %ticker, points = series.len(), "prediction ready");
        Ok(Prediction::new(ticker, series, sentiment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sentiment;
    use crate::test_support::{MockProvider, completion};
    use predictor_llm::LLMError;
    use std::sync::Mutex;

    fn fast_config() -> PredictorConfig {
        PredictorConfig::builder().no_stage_delay().build().unwrap()
    }

    fn predictor_with(provider: MockProvider) -> Predictor {
        Predictor::new(Arc::new(provider), fast_config())
    }

    #[test]
    fn test_normalize_ticker() {
        assert_eq!(normalize_ticker(" aapl ").unwrap(), "AAPL");
        assert!(matches!(normalize_ticker(""), Err(PredictorError::EmptyTicker)));
        assert!(matches!(normalize_ticker("   "), Err(PredictorError::EmptyTicker)));
    }

    #[test]
    fn test_stage_messages() {
        let stages = stage_messages("AAPL");
        assert_eq!(stages[0], "Fetching historical data for AAPL...");
        assert_eq!(stages[5], "Analyzing market sentiment with AI...");
    }

    #[tokio::test]
    async fn test_empty_ticker_does_no_work() {
        let mut provider = MockProvider::new();
        provider.expect_complete().never();

        let events = Mutex::new(Vec::new());
        let reporter = |e: &ProgressEvent| events.lock().unwrap().push(e.clone());

        let result = predictor_with(provider).predict("  ", Some(&reporter)).await;
        assert!(matches!(result, Err(PredictorError::EmptyTicker)));
        assert!(events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_successful_prediction() {
        let mut provider = MockProvider::new();
        provider.expect_complete().times(1).returning(|_| {
            Ok(completion(
                r#"{"sentiment":"Neutral","explanation":"Mixed signals."}"#,
            ))
        });

        let events = Mutex::new(Vec::new());
        let reporter = |e: &ProgressEvent| events.lock().unwrap().push(e.clone());

        let prediction = predictor_with(provider)
            .predict("msft", Some(&reporter))
            .await
            .unwrap();

        assert_eq!(prediction.ticker, "MSFT");
        assert_eq!(prediction.series.len(), 260);
        assert_eq!(prediction.sentiment.sentiment, Some(Sentiment::Neutral));
        assert_eq!(prediction.sentiment.explanation, "Mixed signals.");

        let events = events.into_inner().unwrap();
        assert_eq!(events.len(), 6);
        assert_eq!(events[0].step, 1);
        assert_eq!(events[0].message, "Fetching historical data for MSFT...");
        assert!(events.iter().all(|e| e.total == 6));
    }

    #[tokio::test]
    async fn test_sentiment_failure_fails_prediction() {
        let mut provider = MockProvider::new();
        provider
            .expect_complete()
            .times(1)
            .returning(|_| Err(LLMError::AuthenticationFailed));

        let err = predictor_with(provider)
            .predict("AAPL", None)
            .await
            .unwrap_err();

        match err {
            PredictorError::Sentiment(inner) => assert_eq!(inner.ticker, "AAPL"),
            other => panic!("expected sentiment error, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stage_pauses_are_applied() {
        let mut provider = MockProvider::new();
        provider
            .expect_complete()
            .returning(|_| Ok(completion(r#"{"sentiment":"Bullish","explanation":"x"}"#)));

        let config = PredictorConfig::builder()
            .stage_delay(Duration::from_millis(800), Duration::ZERO)
            .build()
            .unwrap();
        let predictor = Predictor::new(Arc::new(provider), config);

        let started = tokio::time::Instant::now();
        predictor.predict("AAPL", None).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(6 * 800));
    }
}
