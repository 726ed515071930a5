//! Prompt templates and output schema for sentiment analysis

use minijinja::{Environment, context};
use serde_json::{Value, json};

/// Name the output schema is registered under with providers that need one
pub const SENTIMENT_SCHEMA_NAME: &str = "sentiment_analysis";

const SENTIMENT_PROMPT: &str = r#"Perform a detailed market sentiment analysis for the stock ticker: {{ ticker }}.
Consider recent news, market trends, and technical indicators.
Based on your analysis, classify the sentiment as "Bullish", "Bearish", or "Neutral".
Provide a single paragraph explaining your reasoning.
Do not include any introductory phrases like "Here is the JSON"."#;

/// Render the user prompt for `ticker`
pub fn sentiment_prompt(ticker: &str) -> Result<String, minijinja::Error> {
    Environment::new().render_str(SENTIMENT_PROMPT, context! { ticker })
}

/// JSON Schema the model output must match.
///
/// Both fields are required; `sentiment` is limited to the three labels.
pub fn sentiment_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "sentiment": {
                "type": "string",
                "description": "The overall market sentiment for the stock. Must be one of: 'Bullish', 'Bearish', or 'Neutral'.",
                "enum": ["Bullish", "Bearish", "Neutral"]
            },
            "explanation": {
                "type": "string",
                "description": "A concise, one-paragraph explanation for the sentiment analysis, summarizing key factors."
            }
        },
        "required": ["sentiment", "explanation"],
        "additionalProperties": false
    })
}
