//! Core transport, framing and status types for MIFARE DESFire communication
//!
//! This crate provides the building blocks shared by every DESFire stack:
//!
//! - [`TagTransport`]: the contactless link a card conversation runs over
//! - [`Status`]: the full native status byte vocabulary
//! - [`frame`]: wire frame assembly and response splitting
//! - [`exchange`]: the `0xAF` chaining loops that turn frames into
//!   complete logical exchanges
//! - [`Error`]: the error taxonomy for everything that can go wrong
//!   between issuing a command and interpreting its response
//!
//! Higher layers (secure messaging, file access) live in companion
//! crates; nothing here depends on any cipher.

#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod error;
pub mod exchange;
pub mod frame;
pub mod status;
pub mod transport;

pub use bytes::{Bytes, BytesMut};
pub use error::{Error, Result};
pub use exchange::{transceive, transmit_frame};
pub use status::Status;
pub use transport::{TagTransport, TransportError};

#[cfg(test)]
pub use transport::MockTransport;

/// Commonly used types and functions
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::exchange::{transceive, transmit_frame};
    pub use crate::frame;
    pub use crate::status::Status;
    pub use crate::transport::{TagTransport, TransportError};
    pub use bytes::{Bytes, BytesMut};
}
