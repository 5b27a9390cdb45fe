//! Error types for the liquidation map pipeline.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the liquidation map pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (invalid section values, unknown profile name).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data error (input contract or data-quality violation).
    #[error("Data error: {0}")]
    Data(String),

    /// Insufficient data for computation.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Leverage distribution could not be built.
    #[error("Leverage error: {0}")]
    Leverage(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    /// Create an insufficient data error.
    pub fn insufficient_data(msg: impl Into<String>) -> Self {
        Error::InsufficientData(msg.into())
    }

    /// Create a leverage error.
    pub fn leverage(msg: impl Into<String>) -> Self {
        Error::Leverage(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = Error::data("oi_usd_hist is NaN at 1000");
        assert_eq!(err.to_string(), "Data error: oi_usd_hist is NaN at 1000");

        let err = Error::insufficient_data("empty series");
        assert_eq!(err.to_string(), "Insufficient data: empty series");
    }

    #[test]
    fn test_json_from() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::Json(_)));
    }
}
