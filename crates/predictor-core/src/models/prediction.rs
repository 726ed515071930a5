//! Composite prediction result

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::chart::{ChartDataPoint, SeriesSummary};
use super::sentiment::SentimentAnalysisResult;

/// Everything one prediction request produced.
///
/// Only built when both the series and the sentiment are available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub ticker: String,
    pub series: Vec<ChartDataPoint>,
    pub sentiment: SentimentAnalysisResult,
    pub generated_at: DateTime<Utc>,
}

impl Prediction {
    pub fn new(
        ticker: impl Into<String>,
        series: Vec<ChartDataPoint>,
        sentiment: SentimentAnalysisResult,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            series,
            sentiment,
            generated_at: Utc::now(),
        }
    }

    pub fn summary(&self) -> Option<SeriesSummary> {
        SeriesSummary::from_points(&self.series)
    }
}
