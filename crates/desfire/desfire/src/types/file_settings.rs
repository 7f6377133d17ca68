//! File settings as reported by `GetFileSettings`

use crate::error::{Error, Result};
use crate::types::{AccessRights, CommMode, get_i32_le, get_u24_le};

/// The five DESFire file types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Plain data file written directly
    StandardData,
    /// Data file with transaction-protected writes
    BackupData,
    /// Signed 32-bit value with transaction-protected updates
    Value,
    /// Fixed-size records appended until the file is full
    LinearRecord,
    /// Fixed-size records overwriting the oldest once full
    CyclicRecord,
}

impl FileKind {
    /// Decode the wire file type byte
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::StandardData),
            0x01 => Some(Self::BackupData),
            0x02 => Some(Self::Value),
            0x03 => Some(Self::LinearRecord),
            0x04 => Some(Self::CyclicRecord),
            _ => None,
        }
    }

    /// The wire file type byte
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::StandardData => 0x00,
            Self::BackupData => 0x01,
            Self::Value => 0x02,
            Self::LinearRecord => 0x03,
            Self::CyclicRecord => 0x04,
        }
    }
}

/// Settings of one file, shaped by its type
///
/// Every variant carries the communication mode and access rights; the
/// remaining fields only exist for the types they describe, so reading
/// a record count out of a value file is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSettings {
    /// Settings of a standard data file
    StandardData {
        /// Protection applied to file data in transit
        comm: CommMode,
        /// The four access rights
        rights: AccessRights,
        /// File capacity in bytes
        size: u32,
    },
    /// Settings of a backup data file
    BackupData {
        /// Protection applied to file data in transit
        comm: CommMode,
        /// The four access rights
        rights: AccessRights,
        /// File capacity in bytes
        size: u32,
    },
    /// Settings of a value file
    Value {
        /// Protection applied to file data in transit
        comm: CommMode,
        /// The four access rights
        rights: AccessRights,
        /// Smallest value the file may hold
        lower_limit: i32,
        /// Largest value the file may hold
        upper_limit: i32,
        /// Amount refundable through `LimitedCredit`
        limited_credit_value: i32,
        /// Whether `LimitedCredit` is enabled at all
        limited_credit_enabled: bool,
    },
    /// Settings of a linear record file
    LinearRecord {
        /// Protection applied to file data in transit
        comm: CommMode,
        /// The four access rights
        rights: AccessRights,
        /// Size of one record in bytes
        record_size: u32,
        /// Maximum number of records the file can hold
        max_records: u32,
        /// Number of committed records currently stored
        records: u32,
    },
    /// Settings of a cyclic record file
    CyclicRecord {
        /// Protection applied to file data in transit
        comm: CommMode,
        /// The four access rights
        rights: AccessRights,
        /// Size of one record in bytes
        record_size: u32,
        /// Maximum number of records the file can hold
        max_records: u32,
        /// Number of committed records currently stored
        records: u32,
    },
}

impl FileSettings {
    /// Parse a `GetFileSettings` response payload
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 4 {
            return Err(Error::InvalidLength {
                expected: 7,
                actual: bytes.len(),
            });
        }
        let kind = FileKind::from_byte(bytes[0])
            .ok_or(Error::InvalidResponse("unknown file type byte"))?;
        let comm = CommMode::from_byte(bytes[1]);
        let rights = AccessRights::from_bytes([bytes[2], bytes[3]]);
        let body = &bytes[4..];

        match kind {
            FileKind::StandardData | FileKind::BackupData => {
                if body.len() != 3 {
                    return Err(Error::InvalidLength {
                        expected: 7,
                        actual: bytes.len(),
                    });
                }
                let size = get_u24_le(body);
                Ok(match kind {
                    FileKind::StandardData => Self::StandardData { comm, rights, size },
                    _ => Self::BackupData { comm, rights, size },
                })
            }
            FileKind::Value => {
                if body.len() != 13 {
                    return Err(Error::InvalidLength {
                        expected: 17,
                        actual: bytes.len(),
                    });
                }
                Ok(Self::Value {
                    comm,
                    rights,
                    lower_limit: get_i32_le(&body[0..4]),
                    upper_limit: get_i32_le(&body[4..8]),
                    limited_credit_value: get_i32_le(&body[8..12]),
                    limited_credit_enabled: body[12] & 0x01 != 0,
                })
            }
            FileKind::LinearRecord | FileKind::CyclicRecord => {
                if body.len() != 9 {
                    return Err(Error::InvalidLength {
                        expected: 13,
                        actual: bytes.len(),
                    });
                }
                let record_size = get_u24_le(&body[0..3]);
                let max_records = get_u24_le(&body[3..6]);
                let records = get_u24_le(&body[6..9]);
                Ok(match kind {
                    FileKind::LinearRecord => Self::LinearRecord {
                        comm,
                        rights,
                        record_size,
                        max_records,
                        records,
                    },
                    _ => Self::CyclicRecord {
                        comm,
                        rights,
                        record_size,
                        max_records,
                        records,
                    },
                })
            }
        }
    }

    /// The file type this settings record describes
    pub const fn kind(&self) -> FileKind {
        match self {
            Self::StandardData { .. } => FileKind::StandardData,
            Self::BackupData { .. } => FileKind::BackupData,
            Self::Value { .. } => FileKind::Value,
            Self::LinearRecord { .. } => FileKind::LinearRecord,
            Self::CyclicRecord { .. } => FileKind::CyclicRecord,
        }
    }

    /// The communication mode file data travels in
    pub const fn comm_mode(&self) -> CommMode {
        match self {
            Self::StandardData { comm, .. }
            | Self::BackupData { comm, .. }
            | Self::Value { comm, .. }
            | Self::LinearRecord { comm, .. }
            | Self::CyclicRecord { comm, .. } => *comm,
        }
    }

    /// The access rights governing the file
    pub const fn access_rights(&self) -> AccessRights {
        match self {
            Self::StandardData { rights, .. }
            | Self::BackupData { rights, .. }
            | Self::Value { rights, .. }
            | Self::LinearRecord { rights, .. }
            | Self::CyclicRecord { rights, .. } => *rights,
        }
    }

    /// Whether writes to this file are provisional until a commit
    pub const fn is_transactional(&self) -> bool {
        !matches!(self, Self::StandardData { .. })
    }
}
