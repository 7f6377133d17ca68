//! Error types specific to tag transport

use thiserror::Error;

/// Transport error type
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum TransportError {
    /// Connection error
    #[error("Failed to connect to tag")]
    Connection,

    /// Transmission error
    #[error("Failed to transmit frame")]
    Transmission,

    /// Reader device error
    #[error("Reader device error")]
    Device,

    /// Driver error (with code)
    #[error("Driver error code: {0}")]
    Driver(i32),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Cancelled operation
    #[error("Operation cancelled")]
    Cancelled,

    /// Other error with message
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Create a new driver error
    pub const fn driver(code: i32) -> Self {
        Self::Driver(code)
    }

    /// Create a general other error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other(message.into())
    }

    /// Whether a retry at the caller's discretion could plausibly succeed
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Transmission)
    }
}
