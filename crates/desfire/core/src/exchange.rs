//! Exchange loops for chained native commands
//!
//! DESFire signals continuation with status `0xAF` in both directions:
//! long commands are sent as a first frame followed by `0xAF`-prefixed
//! continuation frames, and long responses are pulled by sending a bare
//! `0xAF` until a terminal status arrives. One logical operation always
//! runs its chain to completion before the next may start; the `&mut`
//! transport receiver makes interleaving impossible.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::frame::{self, ADDITIONAL_FRAME, MAX_CONTINUATION_DATA, MAX_FRAME_LEN};
use crate::status::Status;
use crate::transport::TagTransport;

/// Upper bound on frames in one chain before the exchange is abandoned
///
/// A well-behaved card terminates every chain; this bound turns a
/// misbehaving card or a desynchronized link into a typed error instead
/// of an unbounded loop.
pub const MAX_CHAIN_FRAMES: usize = 1024;

/// Transmit a single wire frame and split the response
///
/// No status interpretation happens here; authentication needs to see
/// `0xAF` as a normal step, so judgment is left to the caller.
pub fn transmit_frame<T: TagTransport>(transport: &mut T, wire: &[u8]) -> Result<(Status, Bytes)> {
    if wire.len() > MAX_FRAME_LEN {
        return Err(Error::Protocol("frame exceeds wire capacity"));
    }
    let response = transport.exchange(wire)?;
    frame::parse(response)
}

/// Run one full logical exchange, chaining in both directions
///
/// `logical` is the complete command (command byte, header, wire-form
/// data) before segmentation. Returns the concatenated response payload
/// on `OperationOk`; any error status is returned as [`Error::Picc`]
/// with the exact code preserved.
pub fn transceive<T: TagTransport>(transport: &mut T, logical: &[u8]) -> Result<Bytes> {
    let mut frames_used = 0usize;

    // Send phase: first frame, then 0xAF-prefixed continuations.
    let first_len = logical.len().min(MAX_FRAME_LEN);
    let (first, mut remaining) = logical.split_at(first_len);
    let (mut status, mut chunk) = transmit_frame(transport, first)?;
    frames_used += 1;

    while !remaining.is_empty() {
        if !status.is_additional_frame() {
            return match status {
                Status::OperationOk => Err(Error::Protocol("command chain terminated early")),
                error => Err(Error::picc(error)),
            };
        }
        let take = remaining.len().min(MAX_CONTINUATION_DATA);
        let (next, rest) = remaining.split_at(take);
        remaining = rest;

        let mut wire = BytesMut::with_capacity(1 + next.len());
        wire.put_u8(ADDITIONAL_FRAME);
        wire.put_slice(next);
        trace!(sent = next.len(), left = remaining.len(), "command continuation");

        (status, chunk) = transmit_frame(transport, &wire)?;
        frames_used += 1;
        if frames_used > MAX_CHAIN_FRAMES {
            return Err(Error::ChainTooLong(MAX_CHAIN_FRAMES));
        }
    }

    // Receive phase: accumulate payload in arrival order until a
    // terminal status.
    let mut payload = BytesMut::from(chunk.as_ref());
    while status.is_additional_frame() {
        (status, chunk) = transmit_frame(transport, &[ADDITIONAL_FRAME])?;
        frames_used += 1;
        if frames_used > MAX_CHAIN_FRAMES {
            return Err(Error::ChainTooLong(MAX_CHAIN_FRAMES));
        }
        payload.put_slice(&chunk);
        trace!(received = chunk.len(), total = payload.len(), "response continuation");
    }

    match status {
        Status::OperationOk => {
            debug!(frames = frames_used, payload = payload.len(), "exchange complete");
            Ok(payload.freeze())
        }
        error => Err(Error::picc(error)),
    }
}
