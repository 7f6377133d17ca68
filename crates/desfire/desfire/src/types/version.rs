//! Card version information

use std::fmt;

use crate::error::{Error, Result};

/// Hardware or software description block of `GetVersion`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentVersion {
    /// IC manufacturer (NXP is `0x04`)
    pub vendor_id: u8,
    /// Product type
    pub product_type: u8,
    /// Product subtype
    pub product_subtype: u8,
    /// Major version number
    pub major_version: u8,
    /// Minor version number
    pub minor_version: u8,
    /// Storage size code; the size in bytes is roughly `2^(code/2)`
    pub storage_size: u8,
    /// Communication protocol code
    pub protocol: u8,
}

impl ComponentVersion {
    fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            vendor_id: bytes[0],
            product_type: bytes[1],
            product_subtype: bytes[2],
            major_version: bytes[3],
            minor_version: bytes[4],
            storage_size: bytes[5],
            protocol: bytes[6],
        }
    }
}

impl fmt::Display for ComponentVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major_version, self.minor_version)
    }
}

/// The full 28-byte `GetVersion` answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionInfo {
    /// Hardware description
    pub hardware: ComponentVersion,
    /// Software description
    pub software: ComponentVersion,
    /// Unique IC serial number
    pub uid: [u8; 7],
    /// Production batch number
    pub batch_number: [u8; 5],
    /// Calendar week of production (BCD)
    pub production_week: u8,
    /// Year of production (BCD)
    pub production_year: u8,
}

impl VersionInfo {
    /// Length of the concatenated response payload
    pub const WIRE_LEN: usize = 28;

    /// Parse the concatenated three-frame `GetVersion` payload
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::WIRE_LEN {
            return Err(Error::InvalidLength {
                expected: Self::WIRE_LEN,
                actual: bytes.len(),
            });
        }
        let mut uid = [0u8; 7];
        uid.copy_from_slice(&bytes[14..21]);
        let mut batch_number = [0u8; 5];
        batch_number.copy_from_slice(&bytes[21..26]);
        Ok(Self {
            hardware: ComponentVersion::from_bytes(&bytes[0..7]),
            software: ComponentVersion::from_bytes(&bytes[7..14]),
            uid,
            batch_number,
            production_week: bytes[26],
            production_year: bytes[27],
        })
    }
}
