//! Authenticated session state and secure messaging
//!
//! A [`SecureSession`] is created by a successful three-pass mutual
//! authentication and owns everything the two secure-messaging
//! generations need: the session cipher, the chained init vector and,
//! for the ISO generation, the CMAC subkeys.
//!
//! The generations differ in every detail that matters here. Legacy
//! sessions MAC with a truncated CBC-MAC over the data section only,
//! checksum with CRC-16 and reset their vector on every call. ISO
//! sessions CMAC over the entire command (and over every response plus
//! its status), checksum with CRC-32 over command and data, and keep
//! one running vector that links all exchanges of the session.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use nexum_desfire_core::Status;
use tracing::warn;
use zeroize::Zeroize;

use crate::crypto::{
    self, CMAC_TRUNCATED_LEN, Direction, LEGACY_MAC_LEN, MAX_BLOCK_LEN, Operation, SessionCipher,
};
use crate::error::{Error, Result};
use crate::key::KeyKind;
use crate::types::CommMode;

/// Secure-messaging generation negotiated by the authenticate variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Generation {
    /// Truncated CBC-MAC, CRC-16, fresh zero vector per call
    Legacy,
    /// CMAC, CRC-32, persistent chained vector
    Iso,
}

impl Generation {
    /// The generation an authentication with this key family negotiates
    pub(crate) const fn for_kind(kind: KeyKind) -> Self {
        match kind {
            KeyKind::Des | KeyKind::TwoK3Des => Self::Legacy,
            KeyKind::ThreeK3Des | KeyKind::Aes128 => Self::Iso,
        }
    }
}

/// Live secure session established by mutual authentication
pub(crate) struct SecureSession {
    key_no: u8,
    kind: KeyKind,
    generation: Generation,
    cipher: SessionCipher,
    iv: [u8; MAX_BLOCK_LEN],
    subkeys: ([u8; MAX_BLOCK_LEN], [u8; MAX_BLOCK_LEN]),
}

impl SecureSession {
    /// Derive the session from the authentication randoms
    pub(crate) fn new(key_no: u8, kind: KeyKind, rnd_a: &[u8], rnd_b: &[u8]) -> Self {
        let session_key = crypto::session_key(kind, rnd_a, rnd_b);
        let cipher = SessionCipher::from_key(&session_key);
        let generation = Generation::for_kind(kind);
        let subkeys = match generation {
            Generation::Legacy => ([0u8; MAX_BLOCK_LEN], [0u8; MAX_BLOCK_LEN]),
            Generation::Iso => crypto::cmac_subkeys(&cipher),
        };
        Self {
            key_no,
            kind,
            generation,
            cipher,
            iv: [0u8; MAX_BLOCK_LEN],
            subkeys,
        }
    }

    /// The key slot this session authenticated against
    pub(crate) const fn key_no(&self) -> u8 {
        self.key_no
    }

    /// The key family of the session
    pub(crate) const fn kind(&self) -> KeyKind {
        self.kind
    }

    const fn block_size(&self) -> usize {
        self.cipher.block_size()
    }

    /// Apply command-direction protection to a complete logical command
    ///
    /// `header_len` counts the command byte plus the parameter bytes
    /// that stay in clear; protection covers only what follows. Plain
    /// commands under an ISO session still advance the vector, without
    /// growing the command.
    pub(crate) fn wrap_command(&mut self, command: &mut BytesMut, header_len: usize, mode: CommMode) {
        match (mode, self.generation) {
            (CommMode::Plain, Generation::Legacy) => {}
            (CommMode::Plain, Generation::Iso) => {
                self.update_cmac(&command[..]);
            }
            (CommMode::Maced, Generation::Legacy) => {
                let mac = self.legacy_mac(&command[header_len..]);
                command.put_slice(&mac);
            }
            (CommMode::Maced, Generation::Iso) => {
                let mac = self.update_cmac(&command[..]);
                command.put_slice(&mac[..CMAC_TRUNCATED_LEN]);
            }
            (CommMode::Enciphered, _) => self.encipher_command(command, header_len, true),
        }
    }

    /// Encipher the data section of a command in place
    ///
    /// With `append_crc` the generation's checksum is added first: the
    /// legacy CRC-16 covers the data section, the ISO CRC-32 covers the
    /// whole command. `ChangeKey` computes its checksums itself and
    /// passes `false`.
    pub(crate) fn encipher_command(
        &mut self,
        command: &mut BytesMut,
        header_len: usize,
        append_crc: bool,
    ) {
        if append_crc {
            match self.generation {
                Generation::Legacy => {
                    let crc = crypto::crc16(&command[header_len..]);
                    command.put_slice(&crc);
                }
                Generation::Iso => {
                    let crc = crypto::crc32(command);
                    command.put_slice(&crc);
                }
            }
        }

        let bs = self.block_size();
        let padded = crypto::padded_len(command.len() - header_len, bs);
        command.resize(header_len + padded, 0x00);

        match self.generation {
            Generation::Legacy => {
                let mut iv = [0u8; MAX_BLOCK_LEN];
                crypto::chain_blocks(
                    &self.cipher,
                    &mut iv[..bs],
                    &mut command[header_len..],
                    Direction::Send,
                    Operation::Decrypt,
                );
            }
            Generation::Iso => {
                crypto::chain_blocks(
                    &self.cipher,
                    &mut self.iv[..bs],
                    &mut command[header_len..],
                    Direction::Send,
                    Operation::Encrypt,
                );
            }
        }
    }

    /// Verify and strip response-direction protection
    ///
    /// `payload` is the reassembled response body of a successful
    /// exchange, without the status byte.
    pub(crate) fn unwrap_response(&mut self, payload: Bytes, mode: CommMode) -> Result<Bytes> {
        match (mode, self.generation) {
            (CommMode::Plain, Generation::Legacy) => Ok(payload),
            (CommMode::Plain | CommMode::Maced, Generation::Iso) => self.verify_cmac(payload),
            (CommMode::Maced, Generation::Legacy) => self.verify_legacy_mac(payload),
            (CommMode::Enciphered, _) => self.decipher_response(payload),
        }
    }

    /// Keep the vector in step with the card after an error status
    ///
    /// Error responses carry no protection, but the card still feeds
    /// the status byte into its CMAC stream; mirror it or every later
    /// verification would fail.
    pub(crate) fn note_error_status(&mut self, status: Status) {
        if self.generation == Generation::Iso {
            let _ = self.update_cmac(&[status.to_byte()]);
        }
    }

    fn update_cmac(&mut self, data: &[u8]) -> [u8; MAX_BLOCK_LEN] {
        let bs = self.cipher.block_size();
        crypto::cmac(&self.cipher, &self.subkeys, &mut self.iv[..bs], data)
    }

    fn legacy_mac(&self, data: &[u8]) -> [u8; LEGACY_MAC_LEN] {
        let bs = self.block_size();
        let mut buffer = data.to_vec();
        buffer.resize(crypto::padded_len(data.len(), bs), 0x00);

        let mut iv = [0u8; MAX_BLOCK_LEN];
        crypto::chain_blocks(
            &self.cipher,
            &mut iv[..bs],
            &mut buffer,
            Direction::Send,
            Operation::Encrypt,
        );

        let mut mac = [0u8; LEGACY_MAC_LEN];
        mac.copy_from_slice(&buffer[buffer.len() - bs..][..LEGACY_MAC_LEN]);
        mac
    }

    fn verify_cmac(&mut self, payload: Bytes) -> Result<Bytes> {
        if payload.len() < CMAC_TRUNCATED_LEN {
            return Err(Error::Integrity("response carries no CMAC"));
        }
        let data = payload.slice(..payload.len() - CMAC_TRUNCATED_LEN);
        let received = &payload[payload.len() - CMAC_TRUNCATED_LEN..];

        let mut input = Vec::with_capacity(data.len() + 1);
        input.extend_from_slice(&data);
        input.push(Status::OperationOk.to_byte());
        let expected = self.update_cmac(&input);

        if received != &expected[..CMAC_TRUNCATED_LEN] {
            warn!("response CMAC mismatch");
            return Err(Error::Integrity("response CMAC mismatch"));
        }
        Ok(data)
    }

    fn verify_legacy_mac(&mut self, payload: Bytes) -> Result<Bytes> {
        if payload.len() < LEGACY_MAC_LEN {
            return Err(Error::Integrity("response carries no MAC"));
        }
        let data = payload.slice(..payload.len() - LEGACY_MAC_LEN);
        let received = &payload[payload.len() - LEGACY_MAC_LEN..];
        let expected = self.legacy_mac(&data);

        if received != expected {
            warn!("response MAC mismatch");
            return Err(Error::Integrity("response MAC mismatch"));
        }
        Ok(data)
    }

    /// Decipher a response and locate its checksum
    ///
    /// The plaintext layout is data, checksum, zero padding, with the
    /// data length unknown in advance. The search starts at the
    /// shortest length possible for the received block count: a valid
    /// checksum stays valid when zeros are appended, so scanning from
    /// the other end could swallow data bytes into the padding.
    fn decipher_response(&mut self, payload: Bytes) -> Result<Bytes> {
        let bs = self.block_size();
        if payload.is_empty() || payload.len() % bs != 0 {
            return Err(Error::Integrity("ciphertext is not whole blocks"));
        }

        let mut buffer = payload.to_vec();
        match self.generation {
            Generation::Legacy => {
                let mut iv = [0u8; MAX_BLOCK_LEN];
                crypto::chain_blocks(
                    &self.cipher,
                    &mut iv[..bs],
                    &mut buffer,
                    Direction::Receive,
                    Operation::Decrypt,
                );
            }
            Generation::Iso => {
                crypto::chain_blocks(
                    &self.cipher,
                    &mut self.iv[..bs],
                    &mut buffer,
                    Direction::Receive,
                    Operation::Decrypt,
                );
            }
        }

        let crc_len = match self.generation {
            Generation::Legacy => 2,
            Generation::Iso => 4,
        };
        let total = buffer.len();
        let mut data_len = total.saturating_sub(bs + crc_len - 1);
        let mut found = None;
        while data_len + crc_len <= total {
            let computed: Vec<u8> = match self.generation {
                Generation::Legacy => crypto::crc16(&buffer[..data_len]).to_vec(),
                Generation::Iso => {
                    let mut input = Vec::with_capacity(data_len + 1);
                    input.extend_from_slice(&buffer[..data_len]);
                    input.push(Status::OperationOk.to_byte());
                    crypto::crc32(&input).to_vec()
                }
            };
            if computed == buffer[data_len..data_len + crc_len]
                && buffer[data_len + crc_len..].iter().all(|&b| b == 0x00)
            {
                found = Some(data_len);
                break;
            }
            data_len += 1;
        }

        match found {
            Some(len) => Ok(Bytes::copy_from_slice(&buffer[..len])),
            None => {
                warn!("no valid checksum in deciphered response");
                Err(Error::Integrity("deciphered response checksum"))
            }
        }
    }
}

impl Drop for SecureSession {
    fn drop(&mut self) {
        self.iv.zeroize();
        self.subkeys.0.zeroize();
        self.subkeys.1.zeroize();
    }
}

impl fmt::Debug for SecureSession {
    /// Vector and subkeys are never printed
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureSession")
            .field("key_no", &self.key_no)
            .field("kind", &self.kind)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
