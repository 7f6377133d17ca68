//! Typed views of DESFire wire structures

mod access;
mod comm;
mod file_settings;
mod key_settings;
mod version;

pub use access::{AccessRight, AccessRights};
pub use comm::{CommMode, ModeSelect};
pub use file_settings::{FileKind, FileSettings};
pub use key_settings::{ChangeKeyRight, KeySettings};
pub use version::{ComponentVersion, VersionInfo};

/// Read a 3-byte little-endian wire field
pub(crate) fn get_u24_le(bytes: &[u8]) -> u32 {
    (bytes[0] as u32) | ((bytes[1] as u32) << 8) | ((bytes[2] as u32) << 16)
}

/// Read a 4-byte little-endian signed wire field
pub(crate) fn get_i32_le(bytes: &[u8]) -> i32 {
    let mut quad = [0u8; 4];
    quad.copy_from_slice(&bytes[..4]);
    i32::from_le_bytes(quad)
}

/// Encode a value into a 3-byte little-endian wire field
pub(crate) const fn u24_le_bytes(value: u32) -> [u8; 3] {
    let bytes = value.to_le_bytes();
    [bytes[0], bytes[1], bytes[2]]
}
