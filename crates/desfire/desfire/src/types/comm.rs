//! Communication modes for data transfer

/// Protection applied to file data in transit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommMode {
    /// Data travels unprotected
    Plain,
    /// Data travels with an appended MAC
    Maced,
    /// Data travels enciphered with an embedded CRC
    Enciphered,
}

impl CommMode {
    /// Decode the communication settings byte of a file
    ///
    /// Bit 0 selects MACing and bit 1 selects encipherment; `0x02` is a
    /// reserved plain encoding some cards report.
    pub const fn from_byte(byte: u8) -> Self {
        match byte & 0x03 {
            0x01 => Self::Maced,
            0x03 => Self::Enciphered,
            _ => Self::Plain,
        }
    }

    /// The communication settings byte
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::Plain => 0x00,
            Self::Maced => 0x01,
            Self::Enciphered => 0x03,
        }
    }
}

/// How the data plane chooses a communication mode per operation
///
/// `Auto` consults the target file's stored settings and the current
/// authentication state; `Explicit` forces one mode unconditionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModeSelect {
    /// Derive the mode from file settings and session state
    #[default]
    Auto,
    /// Always use the given mode
    Explicit(CommMode),
}
