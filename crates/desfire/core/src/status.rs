//! PICC status byte definitions for native DESFire responses

use std::fmt;

use tracing::Level;

/// Status byte returned as the first byte of every native DESFire response
///
/// `0x00` signals success and `0xAF` signals that another frame follows;
/// every other value is a card-side error condition. The raw byte is
/// always recoverable so callers can branch on conditions this table does
/// not name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Successful operation
    OperationOk,
    /// Unspecified cryptographic error reported by the card
    CryptoError,
    /// No changes done to backup files, transaction was empty
    NoChanges,
    /// Insufficient NV memory to complete the command
    OutOfEeprom,
    /// Command code not supported in the current state
    IllegalCommandCode,
    /// CRC or MAC does not match the data
    IntegrityError,
    /// Invalid key number specified
    NoSuchKey,
    /// Length of command string invalid
    LengthError,
    /// Current configuration or status does not allow the command
    PermissionError,
    /// Value of the parameter(s) invalid
    ParameterError,
    /// Requested AID not present on the card
    ApplicationNotFound,
    /// Unrecoverable error within an application
    ApplicationIntegrityError,
    /// Current authentication status does not allow the command
    AuthenticationError,
    /// Additional data frame is expected to be sent
    AdditionalFrame,
    /// Attempt to read or write beyond the limits of the file
    BoundaryError,
    /// Unrecoverable error within the PICC
    PiccIntegrityError,
    /// Previous command was not fully completed
    CommandAborted,
    /// PICC was disabled by an unrecoverable error
    PiccDisabled,
    /// Number of applications limited to 28, or record limit reached
    CountError,
    /// Creation of a file or application that already exists
    DuplicateError,
    /// Could not complete an NV-memory write operation
    EepromError,
    /// Specified file number does not exist
    FileNotFound,
    /// Unrecoverable error within a file
    FileIntegrityError,
    /// Status byte outside the documented table
    Unknown(u8),
}

impl Status {
    /// Decode a raw status byte
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => Self::OperationOk,
            0x01 => Self::CryptoError,
            0x0C => Self::NoChanges,
            0x0E => Self::OutOfEeprom,
            0x1C => Self::IllegalCommandCode,
            0x1E => Self::IntegrityError,
            0x40 => Self::NoSuchKey,
            0x7E => Self::LengthError,
            0x9D => Self::PermissionError,
            0x9E => Self::ParameterError,
            0xA0 => Self::ApplicationNotFound,
            0xA1 => Self::ApplicationIntegrityError,
            0xAE => Self::AuthenticationError,
            0xAF => Self::AdditionalFrame,
            0xBE => Self::BoundaryError,
            0xC1 => Self::PiccIntegrityError,
            0xCA => Self::CommandAborted,
            0xCD => Self::PiccDisabled,
            0xCE => Self::CountError,
            0xDE => Self::DuplicateError,
            0xEE => Self::EepromError,
            0xF0 => Self::FileNotFound,
            0xF1 => Self::FileIntegrityError,
            other => Self::Unknown(other),
        }
    }

    /// The raw wire value of this status
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::OperationOk => 0x00,
            Self::CryptoError => 0x01,
            Self::NoChanges => 0x0C,
            Self::OutOfEeprom => 0x0E,
            Self::IllegalCommandCode => 0x1C,
            Self::IntegrityError => 0x1E,
            Self::NoSuchKey => 0x40,
            Self::LengthError => 0x7E,
            Self::PermissionError => 0x9D,
            Self::ParameterError => 0x9E,
            Self::ApplicationNotFound => 0xA0,
            Self::ApplicationIntegrityError => 0xA1,
            Self::AuthenticationError => 0xAE,
            Self::AdditionalFrame => 0xAF,
            Self::BoundaryError => 0xBE,
            Self::PiccIntegrityError => 0xC1,
            Self::CommandAborted => 0xCA,
            Self::PiccDisabled => 0xCD,
            Self::CountError => 0xCE,
            Self::DuplicateError => 0xDE,
            Self::EepromError => 0xEE,
            Self::FileNotFound => 0xF0,
            Self::FileIntegrityError => 0xF1,
            Self::Unknown(other) => other,
        }
    }

    /// Check if this status signals success
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::OperationOk)
    }

    /// Check if this status asks for the next frame of a chained exchange
    pub const fn is_additional_frame(self) -> bool {
        matches!(self, Self::AdditionalFrame)
    }

    /// Check if this status is terminal for an exchange (success or error)
    pub const fn is_terminal(self) -> bool {
        !self.is_additional_frame()
    }

    /// Check if this status is a card-side error
    pub const fn is_error(self) -> bool {
        !self.is_ok() && !self.is_additional_frame()
    }

    /// Get a description of this status
    pub const fn description(self) -> &'static str {
        match self {
            Self::OperationOk => "Successful operation",
            Self::CryptoError => "Cryptographic error",
            Self::NoChanges => "No changes done to backup files",
            Self::OutOfEeprom => "Insufficient NV memory",
            Self::IllegalCommandCode => "Command code not supported",
            Self::IntegrityError => "CRC or MAC does not match data",
            Self::NoSuchKey => "Invalid key number specified",
            Self::LengthError => "Length of command string invalid",
            Self::PermissionError => "Current status does not allow the command",
            Self::ParameterError => "Value of the parameter(s) invalid",
            Self::ApplicationNotFound => "Requested AID not present on PICC",
            Self::ApplicationIntegrityError => "Unrecoverable error within application",
            Self::AuthenticationError => "Current authentication status does not allow the command",
            Self::AdditionalFrame => "Additional data frame expected",
            Self::BoundaryError => "Attempt to read/write beyond file limits",
            Self::PiccIntegrityError => "Unrecoverable error within PICC",
            Self::CommandAborted => "Previous command was not fully completed",
            Self::PiccDisabled => "PICC was disabled by an unrecoverable error",
            Self::CountError => "Application or record count limit reached",
            Self::DuplicateError => "File or application already exists",
            Self::EepromError => "Could not complete NV write operation",
            Self::FileNotFound => "Specified file number does not exist",
            Self::FileIntegrityError => "Unrecoverable error within file",
            Self::Unknown(_) => "Unknown status byte",
        }
    }

    /// Get the appropriate tracing level for this status
    pub const fn tracing_level(self) -> Level {
        match self {
            Self::OperationOk | Self::AdditionalFrame => Level::DEBUG,
            Self::NoChanges => Level::INFO,
            _ => Level::WARN,
        }
    }
}

impl From<u8> for Status {
    fn from(byte: u8) -> Self {
        Self::from_byte(byte)
    }
}

impl From<Status> for u8 {
    fn from(status: Status) -> Self {
        status.to_byte()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#04X})", self.description(), self.to_byte())
    }
}
