//! Error types for prediction operations

use thiserror::Error;

/// Result type alias for prediction operations
pub type Result<T> = std::result::Result<T, PredictorError>;

/// Why a model response could not be turned into a sentiment result
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The text is not JSON, or not the expected object shape
    #[error("response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A required field is absent, null, or empty
    #[error("response is missing required field '{0}'")]
    MissingField(&'static str),

    /// The sentiment label is not one of the known labels
    #[error("unknown sentiment label '{0}'")]
    UnknownSentiment(String),
}

/// A sentiment fetch failed.
///
/// Every failure in the call chain collapses into this one error; the cause
/// is logged where it happens and kept out of the message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "Failed to get sentiment analysis for {ticker}. The ticker might be invalid or there was a network issue."
)]
pub struct SentimentError {
    /// Ticker the request was made for
    pub ticker: String,
}

impl SentimentError {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
        }
    }
}

/// Errors surfaced by the prediction pipeline
#[derive(Debug, Error)]
pub enum PredictorError {
    /// No ticker was given
    #[error("Please enter a stock ticker.")]
    EmptyTicker,

    /// The sentiment half of a prediction failed
    #[error(transparent)]
    Sentiment(#[from] SentimentError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider construction failed
    #[error("LLM provider error: {0}")]
    Provider(#[from] predictor_llm::LLMError),
}
