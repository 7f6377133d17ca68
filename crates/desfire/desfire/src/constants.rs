//! Native command bytes and protocol constants

// Security related commands
pub(crate) const AUTHENTICATE_LEGACY: u8 = 0x0A;
pub(crate) const AUTHENTICATE_ISO: u8 = 0x1A;
pub(crate) const AUTHENTICATE_AES: u8 = 0xAA;
pub(crate) const CHANGE_KEY_SETTINGS: u8 = 0x54;
pub(crate) const SET_CONFIGURATION: u8 = 0x5C;
pub(crate) const CHANGE_KEY: u8 = 0xC4;
pub(crate) const GET_KEY_VERSION: u8 = 0x64;

// PICC level commands
pub(crate) const CREATE_APPLICATION: u8 = 0xCA;
pub(crate) const DELETE_APPLICATION: u8 = 0xDA;
pub(crate) const GET_APPLICATION_IDS: u8 = 0x6A;
pub(crate) const FREE_MEMORY: u8 = 0x6E;
pub(crate) const GET_KEY_SETTINGS: u8 = 0x45;
pub(crate) const SELECT_APPLICATION: u8 = 0x5A;
pub(crate) const FORMAT_PICC: u8 = 0xFC;
pub(crate) const GET_VERSION: u8 = 0x60;
pub(crate) const GET_CARD_UID: u8 = 0x51;

// Application level commands
pub(crate) const GET_FILE_IDS: u8 = 0x6F;
pub(crate) const GET_FILE_SETTINGS: u8 = 0xF5;
pub(crate) const CHANGE_FILE_SETTINGS: u8 = 0x5F;
pub(crate) const CREATE_STD_DATA_FILE: u8 = 0xCD;
pub(crate) const CREATE_BACKUP_DATA_FILE: u8 = 0xCB;
pub(crate) const CREATE_VALUE_FILE: u8 = 0xCC;
pub(crate) const CREATE_LINEAR_RECORD_FILE: u8 = 0xC1;
pub(crate) const CREATE_CYCLIC_RECORD_FILE: u8 = 0xC0;
pub(crate) const DELETE_FILE: u8 = 0xDF;

// Data manipulation commands
pub(crate) const READ_DATA: u8 = 0xBD;
pub(crate) const WRITE_DATA: u8 = 0x3D;
pub(crate) const GET_VALUE: u8 = 0x6C;
pub(crate) const CREDIT: u8 = 0x0C;
pub(crate) const DEBIT: u8 = 0xDC;
pub(crate) const LIMITED_CREDIT: u8 = 0x1C;
pub(crate) const WRITE_RECORD: u8 = 0x3B;
pub(crate) const READ_RECORDS: u8 = 0xBB;
pub(crate) const CLEAR_RECORD_FILE: u8 = 0xEB;
pub(crate) const COMMIT_TRANSACTION: u8 = 0xC7;
pub(crate) const ABORT_TRANSACTION: u8 = 0xA7;

/// Largest value a 3-byte wire field can carry (offsets, lengths, sizes)
pub(crate) const MAX_24BIT: u32 = 0x00FF_FFFF;

/// Highest addressable key slot within an application
pub(crate) const MAX_KEY_NO: u8 = 0x0D;

/// `CreateApplication` settings flag selecting 3K3DES application keys
pub(crate) const APP_CRYPTO_3K3DES: u8 = 0x40;

/// `CreateApplication` settings flag selecting AES application keys
pub(crate) const APP_CRYPTO_AES: u8 = 0x80;
