//! DESFire key material
//!
//! A card key is raw cipher key material plus a one-byte version. For
//! the DES-family types the version is not stored separately: it lives
//! in the parity bits of the key material, which the ciphers ignore.
//! AES keys carry the version as a distinct byte.

use std::fmt;

use zeroize::Zeroize;

use crate::constants::{
    APP_CRYPTO_3K3DES, APP_CRYPTO_AES, AUTHENTICATE_AES, AUTHENTICATE_ISO, AUTHENTICATE_LEGACY,
};

/// The cipher family a key belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// Single DES, 8-byte key
    Des,
    /// Two-key triple DES, 16-byte key
    TwoK3Des,
    /// Three-key triple DES, 24-byte key
    ThreeK3Des,
    /// AES-128, 16-byte key
    Aes128,
}

impl KeyKind {
    /// Cipher block size in bytes
    pub const fn block_size(self) -> usize {
        match self {
            Self::Des | Self::TwoK3Des | Self::ThreeK3Des => 8,
            Self::Aes128 => 16,
        }
    }

    /// Length of the card challenge exchanged during authentication
    pub(crate) const fn challenge_len(self) -> usize {
        match self {
            Self::Des | Self::TwoK3Des => 8,
            Self::ThreeK3Des | Self::Aes128 => 16,
        }
    }

    /// The authenticate command that negotiates this key family
    pub(crate) const fn auth_command(self) -> u8 {
        match self {
            Self::Des | Self::TwoK3Des => AUTHENTICATE_LEGACY,
            Self::ThreeK3Des => AUTHENTICATE_ISO,
            Self::Aes128 => AUTHENTICATE_AES,
        }
    }

    /// `CreateApplication` key-settings flag selecting this family
    pub const fn application_flag(self) -> u8 {
        match self {
            Self::Des | Self::TwoK3Des => 0x00,
            Self::ThreeK3Des => APP_CRYPTO_3K3DES,
            Self::Aes128 => APP_CRYPTO_AES,
        }
    }
}

/// A DESFire key of any supported cipher family
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub enum Key {
    /// Single DES key
    Des([u8; 8]),
    /// Two-key triple DES key
    TwoK3Des([u8; 16]),
    /// Three-key triple DES key
    ThreeK3Des([u8; 24]),
    /// AES-128 key with its explicit version byte
    Aes128([u8; 16], u8),
}

impl Key {
    /// Create a single DES key
    pub const fn des(material: [u8; 8]) -> Self {
        Self::Des(material)
    }

    /// Create a two-key triple DES key
    pub const fn two_k3des(material: [u8; 16]) -> Self {
        Self::TwoK3Des(material)
    }

    /// Create a three-key triple DES key
    pub const fn three_k3des(material: [u8; 24]) -> Self {
        Self::ThreeK3Des(material)
    }

    /// Create an AES-128 key with the given version
    pub const fn aes128(material: [u8; 16], version: u8) -> Self {
        Self::Aes128(material, version)
    }

    /// The cipher family of this key
    pub const fn kind(&self) -> KeyKind {
        match self {
            Self::Des(_) => KeyKind::Des,
            Self::TwoK3Des(_) => KeyKind::TwoK3Des,
            Self::ThreeK3Des(_) => KeyKind::ThreeK3Des,
            Self::Aes128(..) => KeyKind::Aes128,
        }
    }

    /// Read the key version
    ///
    /// For DES-family keys the version is assembled from the parity bit
    /// of each of the first eight key bytes, most significant first.
    pub fn version(&self) -> u8 {
        match self {
            Self::Des(material) => parity_version(material),
            Self::TwoK3Des(material) => parity_version(material),
            Self::ThreeK3Des(material) => parity_version(material),
            Self::Aes128(_, version) => *version,
        }
    }

    /// Store a key version
    ///
    /// For triple DES keys the second half receives the complemented
    /// version bits so that setting a version can never collapse the
    /// halves into a plain DES key.
    pub fn set_version(&mut self, version: u8) {
        match self {
            Self::Des(material) => write_parity_version(&mut material[..], version, false),
            Self::TwoK3Des(material) => write_parity_version(&mut material[..], version, true),
            Self::ThreeK3Des(material) => write_parity_version(&mut material[..16], version, true),
            Self::Aes128(_, stored) => *stored = version,
        }
    }

    /// Key material as fed to the cipher
    pub(crate) fn material(&self) -> &[u8] {
        match self {
            Self::Des(material) => material,
            Self::TwoK3Des(material) => material,
            Self::ThreeK3Des(material) => material,
            Self::Aes128(material, _) => material,
        }
    }

    /// Key material in the form `ChangeKey` and `SetConfiguration` carry
    ///
    /// Single DES keys travel as 16 bytes with both halves equal; the
    /// other families travel at their natural length.
    pub(crate) fn wire_material(&self) -> Vec<u8> {
        match self {
            Self::Des(material) => {
                let mut wire = Vec::with_capacity(16);
                wire.extend_from_slice(material);
                wire.extend_from_slice(material);
                wire
            }
            other => other.material().to_vec(),
        }
    }
}

impl fmt::Debug for Key {
    /// Key material is never printed
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("kind", &self.kind())
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}

fn parity_version(material: &[u8]) -> u8 {
    let mut version = 0;
    for (n, byte) in material.iter().take(8).enumerate() {
        version |= (byte & 0x01) << (7 - n);
    }
    version
}

fn write_parity_version(material: &mut [u8], version: u8, complement_second_half: bool) {
    for n in 0..8 {
        let bit = (version >> (7 - n)) & 0x01;
        material[n] = (material[n] & 0xFE) | bit;
        if complement_second_half {
            material[n + 8] = (material[n + 8] & 0xFE) | (bit ^ 0x01);
        }
    }
}
