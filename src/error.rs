//! # Error Types
//!
//! Custom error types for the thrust stand logger using `thiserror`.

use thiserror::Error;

/// Main error type for the thrust stand logger
#[derive(Debug, Error)]
pub enum ThrustStandError {
    /// Serial port errors (open failures, port configuration)
    #[error("Serial error: {0}")]
    Serial(String),

    /// Transport was closed by shutdown
    #[error("Transport closed")]
    TransportClosed,

    /// Operator entered something that is not a PWM value
    #[error("Invalid PWM value: {0:?}")]
    InvalidPwm(String),

    /// Timestamp field of an armed frame did not parse
    #[error("Invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    /// A numeric field of an armed frame did not parse as its column type
    #[error("Invalid {field} field: {value:?}")]
    InvalidField { field: &'static str, value: String },

    /// Log file holds no plottable rows
    #[error("No data to plot in {0}")]
    EmptyLog(String),

    /// Rendering errors from the plotting backend
    #[error("Plot error: {0}")]
    Plot(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// CSV log errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the thrust stand logger
pub type Result<T> = std::result::Result<T, ThrustStandError>;
