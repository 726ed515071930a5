//! Sentiment analysis result types and the validated decode step

use crate::error::DecodeError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Coarse market-mood classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

impl Sentiment {
    /// Every label, in the order the schema lists them
    pub const ALL: [Self; 3] = [Self::Bullish, Self::Bearish, Self::Neutral];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bullish => "Bullish",
            Self::Bearish => "Bearish",
            Self::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = DecodeError;

    /// Labels are matched exactly, as the output schema declares them
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| DecodeError::UnknownSentiment(s.to_string()))
    }
}

/// Sentiment label plus the model's explanation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentAnalysisResult {
    /// Always `Some` for results produced by [`SentimentAnalysisResult::decode`]
    pub sentiment: Option<Sentiment>,
    pub explanation: String,
}

/// Untrusted shape of the model output, before validation
#[derive(Deserialize)]
struct RawSentiment {
    #[serde(default)]
    sentiment: Option<String>,
    #[serde(default)]
    explanation: Option<String>,
}

impl SentimentAnalysisResult {
    pub fn new(sentiment: Sentiment, explanation: impl Into<String>) -> Self {
        Self {
            sentiment: Some(sentiment),
            explanation: explanation.into(),
        }
    }

    /// Decode and validate model output text.
    ///
    /// Both fields must be present and non-blank and the label must be a
    /// known one, even though the request declared a schema enforcing this.
    /// The explanation is returned exactly as received. Anything other than
    /// a JSON object is rejected as [`DecodeError::InvalidJson`].
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        // Structs also deserialize from sequences by position; require an object first.
        let object: Map<String, Value> = serde_json::from_str(text.trim())?;
        let raw: RawSentiment = serde_json::from_value(Value::Object(object))?;

        let label = raw
            .sentiment
            .filter(|s| !s.trim().is_empty())
            .ok_or(DecodeError::MissingField("sentiment"))?;
        let explanation = raw
            .explanation
            .filter(|s| !s.trim().is_empty())
            .ok_or(DecodeError::MissingField("explanation"))?;

        Ok(Self {
            sentiment: Some(label.trim().parse()?),
            explanation,
        })
    }
}
