//! File access rights

/// One access right nibble
///
/// A right either names the key slot whose holder may perform the
/// operation, grants it to everyone, or denies it outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessRight {
    /// The holder of this application key slot (0 to 13)
    Key(u8),
    /// No authentication required
    Free,
    /// Nobody, not even the application master key holder
    Deny,
}

impl AccessRight {
    /// Decode from the low nibble of `value`
    pub const fn from_nibble(value: u8) -> Self {
        match value & 0x0F {
            0x0E => Self::Free,
            0x0F => Self::Deny,
            key => Self::Key(key),
        }
    }

    /// The wire nibble for this right
    pub const fn to_nibble(self) -> u8 {
        match self {
            Self::Key(key) => key & 0x0F,
            Self::Free => 0x0E,
            Self::Deny => 0x0F,
        }
    }

    /// Whether the holder of `key_no` satisfies this right
    pub const fn grants_key(self, key_no: u8) -> bool {
        matches!(self, Self::Key(k) if k == key_no)
    }

    /// Whether this right requires no authentication
    pub const fn is_free(self) -> bool {
        matches!(self, Self::Free)
    }
}

/// The four access rights governing one file
///
/// Packed on the wire as a 16-bit little-endian word with the read
/// right in the top nibble and the change right in the bottom nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRights {
    /// Who may read
    pub read: AccessRight,
    /// Who may write
    pub write: AccessRight,
    /// Who may both read and write
    pub read_write: AccessRight,
    /// Who may change these access rights and the communication mode
    pub change: AccessRight,
}

impl AccessRights {
    /// Bundle four rights
    pub const fn new(
        read: AccessRight,
        write: AccessRight,
        read_write: AccessRight,
        change: AccessRight,
    ) -> Self {
        Self {
            read,
            write,
            read_write,
            change,
        }
    }

    /// Decode from the packed 16-bit word
    pub const fn from_word(word: u16) -> Self {
        Self {
            read: AccessRight::from_nibble((word >> 12) as u8),
            write: AccessRight::from_nibble((word >> 8) as u8),
            read_write: AccessRight::from_nibble((word >> 4) as u8),
            change: AccessRight::from_nibble(word as u8),
        }
    }

    /// Pack into the 16-bit word
    pub const fn to_word(self) -> u16 {
        ((self.read.to_nibble() as u16) << 12)
            | ((self.write.to_nibble() as u16) << 8)
            | ((self.read_write.to_nibble() as u16) << 4)
            | (self.change.to_nibble() as u16)
    }

    /// Decode from the two wire bytes (little-endian)
    pub const fn from_bytes(bytes: [u8; 2]) -> Self {
        Self::from_word(u16::from_le_bytes(bytes))
    }

    /// The two wire bytes (little-endian)
    pub const fn to_bytes(self) -> [u8; 2] {
        self.to_word().to_le_bytes()
    }
}
