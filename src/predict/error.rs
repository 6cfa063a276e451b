use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::predict::types::Direction;

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("No element set matches '{query}'")]
    ElementSetNotFound { query: String },
    #[error("Invalid element set in {source_name}: {message}")]
    MalformedElementSet {
        source_name: String,
        message: String,
    },
    #[error("No {direction} crossing within {} s of {from}", .horizon.num_seconds())]
    NoCrossingFound {
        direction: Direction,
        from: DateTime<Utc>,
        horizon: Duration,
    },
    #[error("Propagation error for {satellite} at {at}: {message}")]
    Propagation {
        satellite: String,
        at: DateTime<Utc>,
        message: String,
    },
    #[error("Invalid observer: {0}")]
    InvalidObserver(String),
    #[error("Invalid search window: start {start} is not before end {end}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("Invalid search options: {0}")]
    InvalidOptions(String),
    #[error("Search cancelled at {at}")]
    Cancelled { at: DateTime<Utc> },
    #[error("TLE file read error: {0}")]
    Io(#[from] std::io::Error),
}

impl PredictError {
    pub(crate) fn malformed(source_name: &str, message: impl Into<String>) -> Self {
        PredictError::MalformedElementSet {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }
}
