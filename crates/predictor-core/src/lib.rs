//! Stock prediction core
//!
//! This crate produces the data behind a stock "prediction" view:
//!
//! - A synthetic price series ([`SeriesGenerator`]): a random walk of
//!   historical points followed by forecast points. It is not market data
//!   and the ticker does not influence it.
//! - A sentiment label and explanation ([`SentimentClient`]) from a
//!   generative-AI provider, requested against a fixed JSON schema and
//!   re-validated on receipt.
//!
//! [`Predictor`] runs both for one ticker with staged progress reporting,
//! and [`PredictionSession`] holds the caller's current-request state.
//!
//! # Example
//!
//! ```rust,no_run
//! use predictor_core::{Predictor, PredictorConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let predictor = Predictor::from_config(PredictorConfig::from_env()?)?;
//! let prediction = predictor.predict("AAPL", None).await?;
//! println!("{:?}: {}", prediction.sentiment.sentiment, prediction.sentiment.explanation);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod predictor;
pub mod prompts;
pub mod sentiment;
pub mod series;
pub mod session;

#[cfg(test)]
mod test_support;

// Re-export main types for convenience
pub use config::{PredictorConfig, ProviderKind};
pub use error::{DecodeError, PredictorError, Result, SentimentError};
pub use models::{
    ChartDataPoint, PointKind, Prediction, Sentiment, SentimentAnalysisResult, SeriesSummary,
};
pub use predictor::{Predictor, ProgressEvent, ProgressReporter, normalize_ticker};
pub use sentiment::SentimentClient;
pub use series::SeriesGenerator;
pub use session::{PredictionSession, RequestId, SessionState};
