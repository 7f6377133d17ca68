//! Transport traits for native DESFire frame exchange
//!
//! This module provides the abstraction between the protocol stack and
//! whatever reader plumbing actually carries frames to a tag.

pub mod error;

use std::fmt;

use bytes::Bytes;
pub use error::TransportError;
use tracing::{debug, trace};

/// Trait for tag transports
///
/// A transport carries one native frame to the card and returns the raw
/// response frame. It has no knowledge of command structure, secure
/// messaging or the additional-frame protocol; one call is one exchange
/// on the half-duplex link.
pub trait TagTransport: Send + Sync + fmt::Debug {
    /// Send a raw frame to the tag and return the raw response frame
    fn exchange(&mut self, frame: &[u8]) -> Result<Bytes, TransportError> {
        trace!(frame = %hex::encode(frame), "transmitting frame");
        let result = self.do_exchange(frame);
        match &result {
            Ok(response) => {
                trace!(response = %hex::encode(response), "received frame");
            }
            Err(e) => {
                debug!(error = ?e, "transport error during exchange");
            }
        }
        result
    }

    /// Internal implementation of exchange
    /// This is the method that concrete implementations should override
    fn do_exchange(&mut self, frame: &[u8]) -> Result<Bytes, TransportError>;

    /// Check if the transport is connected to a physical tag
    fn is_connected(&self) -> bool;

    /// Reset the transport connection
    fn reset(&mut self) -> Result<(), TransportError>;
}

impl<T: TagTransport + ?Sized> TagTransport for &mut T {
    fn do_exchange(&mut self, frame: &[u8]) -> Result<Bytes, TransportError> {
        (**self).do_exchange(frame)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        (**self).reset()
    }
}

#[cfg(test)]
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub struct MockTransport {
    /// Mock responses to return
    pub responses: Vec<Bytes>,
    /// Frames that were sent
    pub frames: Vec<Bytes>,
    /// Whether the transport is connected
    pub connected: bool,
}

#[cfg(test)]
impl MockTransport {
    /// Create a new mock transport with the given responses
    pub fn new(responses: Vec<Bytes>) -> Self {
        Self {
            responses,
            frames: Vec::new(),
            connected: true,
        }
    }

    /// Create a new mock transport that returns the given response once
    pub fn with_response(response: Bytes) -> Self {
        Self::new(vec![response])
    }
}

#[cfg(test)]
impl TagTransport for MockTransport {
    fn do_exchange(&mut self, frame: &[u8]) -> Result<Bytes, TransportError> {
        if !self.connected {
            return Err(TransportError::Connection);
        }

        self.frames.push(Bytes::copy_from_slice(frame));

        if self.responses.is_empty() {
            return Err(TransportError::Transmission);
        }

        Ok(self.responses.remove(0))
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        self.connected = true;
        self.frames.clear();
        Ok(())
    }
}
