//! Session cryptography primitives
//!
//! DESFire chains cipher blocks with an asymmetry inherited from the
//! first-generation cards: data sent to the card in the legacy scheme
//! is run through the block cipher's *decrypt* direction (so the card
//! only ever encrypts), while the ISO scheme uses ordinary CBC in both
//! directions. [`chain_blocks`] expresses both by separating the
//! chaining direction from the cipher direction.
//!
//! The checksums are the two DESFire generations' native ones: the
//! ISO 14443-A CRC over data only (legacy) and a CRC-32 without final
//! complement over command and data (ISO).

use aes::Aes128;
use cipher::generic_array::GenericArray;
use cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use des::{Des, TdesEde2, TdesEde3};

use crate::key::{Key, KeyKind};

/// Bytes of a CMAC actually carried on the wire
pub const CMAC_TRUNCATED_LEN: usize = 8;

/// Bytes of a legacy MAC carried on the wire
pub const LEGACY_MAC_LEN: usize = 4;

/// Widest block handled by any session cipher
pub const MAX_BLOCK_LEN: usize = 16;

/// A live block cipher keyed with session or card key material
#[derive(Clone)]
pub enum SessionCipher {
    /// Single DES
    Des(Des),
    /// Two-key triple DES
    TwoK3Des(TdesEde2),
    /// Three-key triple DES
    ThreeK3Des(TdesEde3),
    /// AES-128
    Aes(Aes128),
}

impl SessionCipher {
    /// Key a cipher from DESFire key material
    pub fn from_key(key: &Key) -> Self {
        match key {
            Key::Des(material) => Self::Des(Des::new(GenericArray::from_slice(material))),
            Key::TwoK3Des(material) => {
                Self::TwoK3Des(TdesEde2::new(GenericArray::from_slice(material)))
            }
            Key::ThreeK3Des(material) => {
                Self::ThreeK3Des(TdesEde3::new(GenericArray::from_slice(material)))
            }
            Key::Aes128(material, _) => Self::Aes(Aes128::new(GenericArray::from_slice(material))),
        }
    }

    /// Cipher block size in bytes
    pub const fn block_size(&self) -> usize {
        match self {
            Self::Des(_) | Self::TwoK3Des(_) | Self::ThreeK3Des(_) => 8,
            Self::Aes(_) => 16,
        }
    }

    fn apply(&self, operation: Operation, block: &mut [u8]) {
        match (self, operation) {
            (Self::Des(cipher), Operation::Encrypt) => {
                cipher.encrypt_block(GenericArray::from_mut_slice(block));
            }
            (Self::Des(cipher), Operation::Decrypt) => {
                cipher.decrypt_block(GenericArray::from_mut_slice(block));
            }
            (Self::TwoK3Des(cipher), Operation::Encrypt) => {
                cipher.encrypt_block(GenericArray::from_mut_slice(block));
            }
            (Self::TwoK3Des(cipher), Operation::Decrypt) => {
                cipher.decrypt_block(GenericArray::from_mut_slice(block));
            }
            (Self::ThreeK3Des(cipher), Operation::Encrypt) => {
                cipher.encrypt_block(GenericArray::from_mut_slice(block));
            }
            (Self::ThreeK3Des(cipher), Operation::Decrypt) => {
                cipher.decrypt_block(GenericArray::from_mut_slice(block));
            }
            (Self::Aes(cipher), Operation::Encrypt) => {
                cipher.encrypt_block(GenericArray::from_mut_slice(block));
            }
            (Self::Aes(cipher), Operation::Decrypt) => {
                cipher.decrypt_block(GenericArray::from_mut_slice(block));
            }
        }
    }
}

impl std::fmt::Debug for SessionCipher {
    /// Key schedules are never printed
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Des(_) => "Des",
            Self::TwoK3Des(_) => "TwoK3Des",
            Self::ThreeK3Des(_) => "ThreeK3Des",
            Self::Aes(_) => "Aes",
        };
        f.debug_tuple("SessionCipher").field(&name).finish()
    }
}

/// Chaining direction of a block sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Host to card: XOR with the vector before the cipher
    Send,
    /// Card to host: XOR with the vector after the cipher
    Receive,
}

/// Which direction of the block cipher to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// The cipher's encrypt direction
    Encrypt,
    /// The cipher's decrypt direction
    Decrypt,
}

/// Chain `data` through the cipher block by block, updating `iv`
///
/// `data` must be a whole number of blocks; `iv` must be at least one
/// block long and is left holding the vector for the next chained call.
pub fn chain_blocks(
    cipher: &SessionCipher,
    iv: &mut [u8],
    data: &mut [u8],
    direction: Direction,
    operation: Operation,
) {
    let bs = cipher.block_size();
    debug_assert_eq!(data.len() % bs, 0);

    for block in data.chunks_exact_mut(bs) {
        match direction {
            Direction::Send => {
                for (byte, vector) in block.iter_mut().zip(iv.iter()) {
                    *byte ^= vector;
                }
                cipher.apply(operation, block);
                iv[..bs].copy_from_slice(block);
            }
            Direction::Receive => {
                let mut incoming = [0u8; MAX_BLOCK_LEN];
                incoming[..bs].copy_from_slice(block);
                cipher.apply(operation, block);
                for (byte, vector) in block.iter_mut().zip(iv.iter()) {
                    *byte ^= vector;
                }
                iv[..bs].copy_from_slice(&incoming[..bs]);
            }
        }
    }
}

/// Derive the two CMAC subkeys for a session cipher
///
/// Only the first [`SessionCipher::block_size`] bytes of each subkey are
/// significant.
pub fn cmac_subkeys(cipher: &SessionCipher) -> ([u8; MAX_BLOCK_LEN], [u8; MAX_BLOCK_LEN]) {
    let bs = cipher.block_size();
    let rb = if bs == 8 { 0x1B } else { 0x87 };

    let mut sk1 = [0u8; MAX_BLOCK_LEN];
    cipher.apply(Operation::Encrypt, &mut sk1[..bs]);
    if shift_left(&mut sk1[..bs]) {
        sk1[bs - 1] ^= rb;
    }

    let mut sk2 = sk1;
    if shift_left(&mut sk2[..bs]) {
        sk2[bs - 1] ^= rb;
    }
    (sk1, sk2)
}

/// Compute a CMAC over `data`, chaining through and updating `iv`
///
/// The running vector is how consecutive commands and responses stay
/// cryptographically linked: the MAC of one exchange is the vector of
/// the next. Returns the full final block; the wire carries its first
/// [`CMAC_TRUNCATED_LEN`] bytes.
pub fn cmac(
    cipher: &SessionCipher,
    subkeys: &([u8; MAX_BLOCK_LEN], [u8; MAX_BLOCK_LEN]),
    iv: &mut [u8],
    data: &[u8],
) -> [u8; MAX_BLOCK_LEN] {
    let bs = cipher.block_size();
    let mut buffer = Vec::with_capacity(padded_len(data.len(), bs));
    buffer.extend_from_slice(data);

    let subkey = if data.is_empty() || data.len() % bs != 0 {
        buffer.push(0x80);
        buffer.resize(padded_len(buffer.len(), bs), 0x00);
        &subkeys.1
    } else {
        &subkeys.0
    };
    let tail = buffer.len() - bs;
    for (byte, key) in buffer[tail..].iter_mut().zip(subkey.iter()) {
        *byte ^= key;
    }

    chain_blocks(cipher, iv, &mut buffer, Direction::Send, Operation::Encrypt);

    let mut mac = [0u8; MAX_BLOCK_LEN];
    mac[..bs].copy_from_slice(&buffer[buffer.len() - bs..]);
    mac
}

/// ISO 14443-A CRC as used by legacy secure messaging, little-endian
pub fn crc16(data: &[u8]) -> [u8; 2] {
    let mut crc: u16 = 0x6363;
    for &byte in data {
        crc ^= byte as u16;
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ 0x8408
            } else {
                crc >> 1
            };
        }
    }
    crc.to_le_bytes()
}

/// The ISO scheme's CRC-32, little-endian
///
/// The standard polynomial and initial value, but without the final
/// complement ordinary CRC-32 applies.
pub fn crc32(data: &[u8]) -> [u8; 4] {
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ 0xEDB8_8320
            } else {
                crc >> 1
            };
        }
    }
    crc.to_le_bytes()
}

/// Length of `len` bytes of data once zero-padded to whole blocks
///
/// Zero bytes of data still occupy one full block.
pub const fn padded_len(len: usize, block_size: usize) -> usize {
    if len == 0 || len % block_size != 0 {
        (len / block_size + 1) * block_size
    } else {
        len
    }
}

/// Derive the session key from the authentication randoms
///
/// Each key family picks its own spread of `RndA` and `RndB` halves so
/// that every part of the derived key depends on both sides' entropy.
pub fn session_key(kind: KeyKind, rnd_a: &[u8], rnd_b: &[u8]) -> Key {
    match kind {
        KeyKind::Des => {
            let mut material = [0u8; 8];
            material[0..4].copy_from_slice(&rnd_a[0..4]);
            material[4..8].copy_from_slice(&rnd_b[0..4]);
            Key::des(material)
        }
        KeyKind::TwoK3Des => {
            let mut material = [0u8; 16];
            material[0..4].copy_from_slice(&rnd_a[0..4]);
            material[4..8].copy_from_slice(&rnd_b[0..4]);
            material[8..12].copy_from_slice(&rnd_a[4..8]);
            material[12..16].copy_from_slice(&rnd_b[4..8]);
            Key::two_k3des(material)
        }
        KeyKind::ThreeK3Des => {
            let mut material = [0u8; 24];
            material[0..4].copy_from_slice(&rnd_a[0..4]);
            material[4..8].copy_from_slice(&rnd_b[0..4]);
            material[8..12].copy_from_slice(&rnd_a[6..10]);
            material[12..16].copy_from_slice(&rnd_b[6..10]);
            material[16..20].copy_from_slice(&rnd_a[12..16]);
            material[20..24].copy_from_slice(&rnd_b[12..16]);
            Key::three_k3des(material)
        }
        KeyKind::Aes128 => {
            let mut material = [0u8; 16];
            material[0..4].copy_from_slice(&rnd_a[0..4]);
            material[4..8].copy_from_slice(&rnd_b[0..4]);
            material[8..12].copy_from_slice(&rnd_a[12..16]);
            material[12..16].copy_from_slice(&rnd_b[12..16]);
            Key::aes128(material, 0)
        }
    }
}

fn shift_left(buf: &mut [u8]) -> bool {
    let carry = buf[0] & 0x80 != 0;
    for i in 0..buf.len() - 1 {
        buf[i] = (buf[i] << 1) | (buf[i + 1] >> 7);
    }
    let last = buf.len() - 1;
    buf[last] <<= 1;
    carry
}
