//! Error type shared by every robot operation

use crate::dps::DataPoint;
use thiserror::Error;

/// Result type for robot operations
pub type Result<T> = std::result::Result<T, RoboVacError>;

/// Errors that can occur when talking to a cleaning robot
#[derive(Error, Debug)]
pub enum RoboVacError {
    /// Invalid construction parameters (e.g. missing device id)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Device could not be located on the network
    #[error("Discovery failed: {0}")]
    Discovery(String),

    /// Transport rejected a connect or disconnect
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Transport rejected a get or set
    #[error("Transport error: {0}")]
    Transport(String),

    /// Connection was closed unexpectedly
    #[error("Connection closed")]
    ConnectionClosed,

    /// Request timed out waiting for response
    #[error("Request timeout")]
    Timeout,

    /// The fetched status has no value for this data point
    #[error("No value for data point {0}")]
    MissingDataPoint(DataPoint),

    /// The fetched value has the wrong kind for this data point
    #[error("Unexpected value for data point {dp}: {value}")]
    UnexpectedValue {
        dp: DataPoint,
        value: serde_json::Value,
    },

    /// WebSocket connection error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid or unexpected response from the transport
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
