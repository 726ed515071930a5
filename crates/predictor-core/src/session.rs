//! Caller-owned state for the current prediction request
//!
//! A session has a single "current request" slot. Starting a request
//! clears whatever the previous one produced, and results arriving for a
//! request that has since been superseded are dropped.

use serde::Serialize;
use tracing::debug;

use crate::error::PredictorError;
use crate::models::Prediction;

/// Identifies one request within a session
pub type RequestId = u64;

/// Ticker the session starts with
pub const DEFAULT_TICKER: &str = "AAPL";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionState {
    /// Nothing requested yet
    Idle,
    /// A request is running
    Loading { message: String },
    /// The last request produced a prediction
    Ready { prediction: Prediction },
    /// The last request failed; the message is safe to show the user
    Failed { message: String },
}

#[derive(Debug, Clone)]
pub struct PredictionSession {
    ticker: String,
    current: RequestId,
    state: SessionState,
}

impl Default for PredictionSession {
    fn default() -> Self {
        Self::new(DEFAULT_TICKER)
    }
}

impl PredictionSession {
    pub fn new(initial_ticker: impl Into<String>) -> Self {
        Self {
            ticker: initial_ticker.into(),
            current: 0,
            state: SessionState::Idle,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, SessionState::Loading { .. })
    }

    pub fn prediction(&self) -> Option<&Prediction> {
        match &self.state {
            SessionState::Ready { prediction } => Some(prediction),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            SessionState::Failed { message } => Some(message),
            _ => None,
        }
    }

    /// Start a new request, superseding any in flight
    pub fn begin(&mut self, ticker: impl Into<String>) -> RequestId {
        self.current += 1;
        self.ticker = ticker.into();
        self.state = SessionState::Loading {
            message: String::new(),
        };
        self.current
    }

    /// Whether `id` is still the request the session is waiting on
    pub fn is_current(&self, id: RequestId) -> bool {
        id == self.current && self.is_loading()
    }

    /// Update the loading message; ignored for stale requests
    pub fn progress(&mut self, id: RequestId, message: impl Into<String>) -> bool {
        if !self.is_current(id) {
            return false;
        }
        self.state = SessionState::Loading {
            message: message.into(),
        };
        true
    }

    /// Record the outcome of request `id`.
    ///
    /// Returns `false` and leaves the session untouched when `id` has been
    /// superseded.
    pub fn finish(
        &mut self,
        id: RequestId,
        outcome: Result<Prediction, PredictorError>,
    ) -> bool {
        if !self.is_current(id) {
            debug!(id, current = self.current, "discarding stale prediction result");
            return false;
        }
        self.state = match outcome {
            Ok(prediction) => SessionState::Ready { prediction },
            Err(err) => SessionState::Failed {
                message: err.to_string(),
            },
        };
        true
    }
}
