//! Application identifiers

use std::fmt;

use crate::error::Error;

/// A 3-byte DESFire application identifier
///
/// Stored in wire order (little-endian). The all-zero AID addresses the
/// card-level master application that is selected after activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Aid([u8; 3]);

impl Aid {
    /// The card master application, selected by default
    pub const MASTER: Self = Self([0x00; 3]);

    /// Build an AID from the low 24 bits of `value`, discarding the rest
    pub const fn new_truncate(value: u32) -> Self {
        Self([
            (value & 0xFF) as u8,
            ((value >> 8) & 0xFF) as u8,
            ((value >> 16) & 0xFF) as u8,
        ])
    }

    /// Build an AID from its wire bytes (little-endian)
    pub const fn from_bytes(bytes: [u8; 3]) -> Self {
        Self(bytes)
    }

    /// The wire representation (little-endian)
    pub const fn to_bytes(self) -> [u8; 3] {
        self.0
    }

    /// The identifier as an integer
    pub const fn to_u32(self) -> u32 {
        (self.0[0] as u32) | ((self.0[1] as u32) << 8) | ((self.0[2] as u32) << 16)
    }

    /// Whether this is the card master application
    pub const fn is_master(self) -> bool {
        self.0[0] == 0 && self.0[1] == 0 && self.0[2] == 0
    }
}

impl TryFrom<u32> for Aid {
    type Error = Error;

    /// Checked conversion, rejecting values wider than the 3-byte field
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if value > 0x00FF_FFFF {
            return Err(Error::InvalidParameter(
                "application identifier exceeds 24 bits",
            ));
        }
        Ok(Self::new_truncate(value))
    }
}

impl From<Aid> for u32 {
    fn from(aid: Aid) -> Self {
        aid.to_u32()
    }
}

impl fmt::Display for Aid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06x}", self.to_u32())
    }
}
