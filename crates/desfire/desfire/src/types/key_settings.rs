//! Master and application key settings

/// Who may change application keys
///
/// Encoded in the high nibble of the key settings byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKeyRight {
    /// Only after authentication with the application master key
    MasterKey,
    /// Only after authentication with this specific key slot (1 to 13)
    Key(u8),
    /// Only after authentication with the key being changed
    SameKey,
    /// Keys are frozen and can never be changed again
    Frozen,
}

impl ChangeKeyRight {
    const fn from_nibble(nibble: u8) -> Self {
        match nibble & 0x0F {
            0x00 => Self::MasterKey,
            0x0E => Self::SameKey,
            0x0F => Self::Frozen,
            key => Self::Key(key),
        }
    }

    const fn to_nibble(self) -> u8 {
        match self {
            Self::MasterKey => 0x00,
            Self::Key(key) => key & 0x0F,
            Self::SameKey => 0x0E,
            Self::Frozen => 0x0F,
        }
    }
}

/// The key settings byte of the card or of an application
///
/// The low nibble is four independent permission flags; the high nibble
/// selects which key may change keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySettings {
    /// The (application or card) master key itself may be changed
    pub allow_master_key_change: bool,
    /// Directory access (listings, key settings) without authentication
    pub free_listing: bool,
    /// Create and delete files without authentication
    pub free_create_delete: bool,
    /// This settings byte itself may still be changed
    pub configuration_changeable: bool,
    /// Who may change application keys
    pub change_key: ChangeKeyRight,
}

impl KeySettings {
    /// Decode the wire byte
    pub const fn from_byte(byte: u8) -> Self {
        Self {
            allow_master_key_change: byte & 0x01 != 0,
            free_listing: byte & 0x02 != 0,
            free_create_delete: byte & 0x04 != 0,
            configuration_changeable: byte & 0x08 != 0,
            change_key: ChangeKeyRight::from_nibble(byte >> 4),
        }
    }

    /// Encode the wire byte
    pub const fn to_byte(self) -> u8 {
        let mut byte = self.change_key.to_nibble() << 4;
        if self.allow_master_key_change {
            byte |= 0x01;
        }
        if self.free_listing {
            byte |= 0x02;
        }
        if self.free_create_delete {
            byte |= 0x04;
        }
        if self.configuration_changeable {
            byte |= 0x08;
        }
        byte
    }
}

impl Default for KeySettings {
    /// The factory configuration: everything allowed, master key changes keys
    fn default() -> Self {
        Self::from_byte(0x0F)
    }
}
