//! Error types for the bridge logger

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Calibration error: {0}")]
    Calibration(#[from] CalibrationError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid log file: {0}")]
    InvalidLog(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Channel lifecycle errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChannelError {
    #[error("bind error on {address}: {reason}")]
    Bind { address: String, reason: String },

    #[error("sink error: {0}")]
    Sink(String),

    #[error("worker did not stop within {0} ms")]
    CancellationTimeout(u64),

    #[error("channel not found: {0}")]
    NotFound(u32),

    #[error("channel {0} is already running")]
    AlreadyRunning(u32),
}

/// Malformed inbound records. Always recovered by skipping the record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("datagram is not valid UTF-8")]
    InvalidUtf8,

    #[error("expected 2 fields, found {0}")]
    FieldCount(usize),

    #[error("invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    #[error("invalid value: {0:?}")]
    InvalidValue(String),
}

/// Calibration fit rejections. Prior coefficients are always retained.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("at least 2 calibration points required, got {0}")]
    InsufficientPoints(usize),

    #[error("all calibration points share the same bit value")]
    DegenerateCalibration,

    #[error("calibration point {0} is not finite")]
    NonFinitePoint(usize),
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
