//! Error types and Result alias for swingbot

use std::time::Duration;
use thiserror::Error;

/// Main error type for swingbot
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid trade parameters: {0}")]
    InvalidTradeParameters(String),

    /// The exchange reported a state that ends the trade (e.g. a canceled order)
    #[error("Exchange error: {0}")]
    ExchangeError(String),

    #[error("Trade execution failed: {reason}")]
    ExecutionFailed {
        reason: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Gave up waiting for order {order_id} after {waited:?}")]
    WaitTimedOut { order_id: String, waited: Duration },

    #[error("Stopped waiting for order {order_id}: cancelled by caller")]
    WaitCancelled { order_id: String },

    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl Error {
    /// Wrap a leg failure into an [`Error::ExecutionFailed`]
    pub fn execution_failed(reason: impl Into<String>, source: Error) -> Self {
        Error::ExecutionFailed {
            reason: reason.into(),
            source: Box::new(source),
        }
    }

    /// Innermost error, looking through any `ExecutionFailed` wrappers
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::ExecutionFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::NetworkError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidData(err.to_string())
    }
}
