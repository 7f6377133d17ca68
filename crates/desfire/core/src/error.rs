//! Core error type for native DESFire exchanges
//!
//! All wire-level error variants are consolidated here so higher layers
//! can bubble a single type up through the call stack.

use crate::status::Status;
use crate::transport::TransportError;

/// Result type alias using the core error
pub type Result<T> = core::result::Result<T, Error>;

/// Core error type for the frame and exchange layer
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    /// Transport failed before a terminal status was reached
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The card answered with an error status
    #[error("Card error: {0}")]
    Picc(Status),

    /// The card answered in a way the protocol does not allow
    #[error("Protocol violation: {0}")]
    Protocol(&'static str),

    /// A response frame could not be parsed
    #[error("Parse error: {0}")]
    Parse(&'static str),

    /// An additional-frame chain exceeded the permitted number of frames
    #[error("Frame chain exceeded {0} frames without a terminal status")]
    ChainTooLong(usize),
}

impl Error {
    /// Create an error from a terminal card status
    ///
    /// `OperationOk` and `AdditionalFrame` are not errors; passing them
    /// here indicates a bug in the exchange loop, so they are mapped to a
    /// protocol violation instead of a card error.
    pub const fn picc(status: Status) -> Self {
        if status.is_error() {
            Self::Picc(status)
        } else {
            Self::Protocol("non-error status reported as card error")
        }
    }

    /// The card status carried by this error, if any
    pub const fn status(&self) -> Option<Status> {
        match self {
            Self::Picc(status) => Some(*status),
            _ => None,
        }
    }

    /// Whether this error invalidates any authenticated session
    ///
    /// Transport failures and protocol violations leave the card's session
    /// state unknowable, so the host side must drop its session keys.
    pub const fn invalidates_session(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Protocol(_) | Self::ChainTooLong(_)
        )
    }
}
