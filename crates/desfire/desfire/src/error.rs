//! Error types for DESFire operations
//!
//! Three failure families are kept apart so callers can branch without
//! string matching: card-reported statuses and wire-level failures come
//! through the core error unchanged, parameter problems are caught
//! before any frame is exchanged, and secure-messaging verification
//! failures carry their own variant because they invalidate the
//! session.

use nexum_desfire_core::Status;

/// Result type alias using the DESFire error
pub type Result<T> = core::result::Result<T, Error>;

/// Error type for DESFire operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport, protocol or card status error from the exchange layer
    #[error(transparent)]
    Core(#[from] nexum_desfire_core::Error),

    /// A MAC, CMAC, CRC or padding check failed on received data
    #[error("Integrity check failed: {0}")]
    Integrity(&'static str),

    /// No tag connection is active
    #[error("Not connected to a tag")]
    NotConnected,

    /// The operation needs an authenticated session and none is active
    #[error("No authenticated session")]
    NotAuthenticated,

    /// The card failed the mutual authentication challenge
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(&'static str),

    /// A parameter was rejected before any exchange with the card
    #[error("Invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// A response had the wrong length for the expected structure
    #[error("Invalid response length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected number of bytes
        expected: usize,
        /// Actual number of bytes
        actual: usize,
    },

    /// A response could not be interpreted
    #[error("Invalid response: {0}")]
    InvalidResponse(&'static str),
}

impl Error {
    /// The card status carried by this error, if any
    pub const fn status(&self) -> Option<Status> {
        match self {
            Self::Core(core) => core.status(),
            _ => None,
        }
    }

    /// Whether this error leaves the card-side session state unknowable
    ///
    /// Transport and protocol failures as well as integrity mismatches
    /// mean host and card can no longer agree on the cryptographic
    /// stream, so the host session must be dropped.
    pub const fn invalidates_session(&self) -> bool {
        match self {
            Self::Core(core) => core.invalidates_session(),
            Self::Integrity(_) | Self::AuthenticationFailed(_) => true,
            _ => false,
        }
    }
}

impl From<nexum_desfire_core::TransportError> for Error {
    fn from(error: nexum_desfire_core::TransportError) -> Self {
        Self::Core(error.into())
    }
}
