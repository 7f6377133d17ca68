//! Native DESFire frame layout
//!
//! A native frame is at most [`MAX_FRAME_LEN`] bytes in either direction.
//! Outbound frames start with a command byte, inbound frames with a
//! status byte. Logical commands longer than one frame are segmented by
//! the exchange loop using the additional-frame continuation byte.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::status::Status;

/// Maximum number of bytes carried by one native frame, either direction
pub const MAX_FRAME_LEN: usize = 60;

/// Command byte requesting (or carrying) the next frame of a chain
pub const ADDITIONAL_FRAME: u8 = 0xAF;

/// Data capacity of a continuation frame (one byte goes to `0xAF`)
pub const MAX_CONTINUATION_DATA: usize = MAX_FRAME_LEN - 1;

/// Assemble a logical command frame from a command byte and its parameters
///
/// The result may exceed [`MAX_FRAME_LEN`]; segmentation into wire frames
/// is the exchange loop's job.
pub fn build(command: u8, params: &[u8]) -> BytesMut {
    let mut frame = BytesMut::with_capacity(1 + params.len());
    frame.put_u8(command);
    frame.put_slice(params);
    frame
}

/// Split a raw response frame into its status byte and payload
pub fn parse(response: Bytes) -> Result<(Status, Bytes)> {
    if response.is_empty() {
        return Err(Error::Parse("empty response frame"));
    }
    let status = Status::from_byte(response[0]);
    Ok((status, response.slice(1..)))
}
