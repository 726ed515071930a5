//! Value types produced by a prediction request

pub mod chart;
pub mod prediction;
pub mod sentiment;

pub use chart::{ChartDataPoint, PointKind, SeriesSummary};
pub use prediction::Prediction;
pub use sentiment::{Sentiment, SentimentAnalysisResult};
