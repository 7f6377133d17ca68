//! The DESFire tag interface
//!
//! [`Desfire`] owns a transport and tracks everything stateful about
//! the dialogue with one card: whether the connection is live, the
//! selected application, the secure session when one is established,
//! and the file settings cache consulted by automatic mode resolution.
//! Card- and application-level administration lives here; file access
//! is implemented in the files module on the same type.

use bytes::{BufMut, Bytes, BytesMut};
use nexum_desfire_core::frame::{self, ADDITIONAL_FRAME};
use nexum_desfire_core::{TagTransport, transceive, transmit_frame};
use rand::RngCore;
use tracing::{debug, warn};
use zeroize::Zeroize;

use crate::aid::Aid;
use crate::constants::*;
use crate::crypto::{self, Direction, MAX_BLOCK_LEN, Operation, SessionCipher};
use crate::error::{Error, Result};
use crate::key::{Key, KeyKind};
use crate::session::{Generation, SecureSession};
use crate::types::{CommMode, FileSettings, KeySettings, ModeSelect, VersionInfo, get_u24_le};

/// File slots per application, and so the size of the settings cache
const FILE_SLOTS: usize = 32;

/// How the data section of an outgoing command is protected
///
/// Separate from [`CommMode`] because `ChangeKey` enciphers a payload
/// whose checksums are already part of the cryptogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CommandWrap {
    Plain,
    Maced,
    Enciphered,
    EncipheredNoCrc,
}

impl CommandWrap {
    pub(crate) const fn for_mode(mode: CommMode) -> Self {
        match mode {
            CommMode::Plain => Self::Plain,
            CommMode::Maced => Self::Maced,
            CommMode::Enciphered => Self::Enciphered,
        }
    }
}

/// A MIFARE DESFire tag reached through a [`TagTransport`]
#[derive(Debug)]
pub struct Desfire<T: TagTransport> {
    transport: T,
    active: bool,
    selected: Aid,
    session: Option<SecureSession>,
    read_mode: ModeSelect,
    write_mode: ModeSelect,
    settings_cache: [Option<FileSettings>; FILE_SLOTS],
}

impl<T: TagTransport> Desfire<T> {
    /// Wrap a transport; no frames are exchanged until [`connect`]
    ///
    /// [`connect`]: Self::connect
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            active: false,
            selected: Aid::MASTER,
            session: None,
            read_mode: ModeSelect::Auto,
            write_mode: ModeSelect::Auto,
            settings_cache: [None; FILE_SLOTS],
        }
    }

    /// Activate the tag and verify it speaks DESFire
    ///
    /// Resets the transport, clears all protocol state and probes with
    /// `GetVersion` so that a tag answering with something other than
    /// native framing fails here instead of on first use.
    pub fn connect(&mut self) -> Result<()> {
        self.transport.reset()?;
        self.active = true;
        self.session = None;
        self.selected = Aid::MASTER;
        self.clear_settings_cache();

        match self.version() {
            Ok(info) => {
                debug!(uid = %hex::encode(info.uid), "connected");
                Ok(())
            }
            Err(err) => {
                self.active = false;
                match err {
                    core @ Error::Core(_) => Err(core),
                    _ => Err(nexum_desfire_core::Error::Protocol(
                        "tag does not speak DESFire native framing",
                    )
                    .into()),
                }
            }
        }
    }

    /// Forget the connection
    ///
    /// Drops any secure session. The transport itself is left alone so
    /// it can be reused for another tag.
    pub fn disconnect(&mut self) {
        self.session = None;
        self.active = false;
    }

    /// Whether [`connect`] has succeeded and [`disconnect`] has not run
    ///
    /// [`connect`]: Self::connect
    /// [`disconnect`]: Self::disconnect
    pub const fn is_connected(&self) -> bool {
        self.active
    }

    /// The currently selected application
    pub const fn selected_application(&self) -> Aid {
        self.selected
    }

    /// Borrow the underlying transport
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Borrow the underlying transport mutably
    ///
    /// Frames sent behind the protocol's back will desynchronize any
    /// active secure session.
    pub const fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the tag, returning the transport
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// The key slot of the active session, if one is established
    pub fn authenticated_key_no(&self) -> Option<u8> {
        self.session.as_ref().map(SecureSession::key_no)
    }

    /// Choose how read-direction payloads are protected
    pub fn set_read_mode(&mut self, mode: ModeSelect) {
        self.read_mode = mode;
    }

    /// Choose how write-direction payloads are protected
    pub fn set_write_mode(&mut self, mode: ModeSelect) {
        self.write_mode = mode;
    }

    pub(crate) const fn read_mode(&self) -> ModeSelect {
        self.read_mode
    }

    pub(crate) const fn write_mode(&self) -> ModeSelect {
        self.write_mode
    }

    /// Mutually authenticate against `key_no` with `key`
    ///
    /// The authenticate variant follows the key family; on success a
    /// secure session is established and every further exchange is
    /// protected according to the negotiated generation. Any previous
    /// session is discarded first.
    pub fn authenticate(&mut self, key_no: u8, key: &Key) -> Result<()> {
        self.ensure_active()?;
        if key_no > MAX_KEY_NO {
            return Err(Error::InvalidParameter("key number out of range"));
        }
        self.session = None;

        let kind = key.kind();
        let challenge_len = kind.challenge_len();
        let bs = kind.block_size();
        let generation = Generation::for_kind(kind);
        let cipher = SessionCipher::from_key(key);
        let mut iv = [0u8; MAX_BLOCK_LEN];
        debug!(key_no, ?kind, "authenticating");

        // First pass: the card answers 0xAF with its enciphered RndB.
        let command = frame::build(kind.auth_command(), &[key_no]);
        let (status, payload) = transmit_frame(&mut self.transport, &command)?;
        if !status.is_additional_frame() {
            return Err(if status.is_ok() {
                Error::AuthenticationFailed("card skipped its challenge")
            } else {
                nexum_desfire_core::Error::picc(status).into()
            });
        }
        if payload.len() != challenge_len {
            return Err(Error::AuthenticationFailed("card challenge length"));
        }

        let mut rnd_b = [0u8; MAX_BLOCK_LEN];
        rnd_b[..challenge_len].copy_from_slice(&payload);
        crypto::chain_blocks(
            &cipher,
            &mut iv[..bs],
            &mut rnd_b[..challenge_len],
            Direction::Receive,
            Operation::Decrypt,
        );

        // Second pass: send RndA and the rotated RndB under the key.
        let mut rnd_a = [0u8; MAX_BLOCK_LEN];
        rand::rng().fill_bytes(&mut rnd_a[..challenge_len]);

        let mut token = BytesMut::with_capacity(1 + 2 * challenge_len);
        token.put_u8(ADDITIONAL_FRAME);
        token.put_slice(&rnd_a[..challenge_len]);
        token.put_slice(&rnd_b[..challenge_len]);
        token[1 + challenge_len..].rotate_left(1);

        match generation {
            Generation::Legacy => {
                let mut step_iv = [0u8; MAX_BLOCK_LEN];
                crypto::chain_blocks(
                    &cipher,
                    &mut step_iv[..bs],
                    &mut token[1..],
                    Direction::Send,
                    Operation::Decrypt,
                );
            }
            Generation::Iso => {
                crypto::chain_blocks(
                    &cipher,
                    &mut iv[..bs],
                    &mut token[1..],
                    Direction::Send,
                    Operation::Encrypt,
                );
            }
        }

        let (status, payload) = transmit_frame(&mut self.transport, &token)?;
        if !status.is_ok() {
            return Err(if status.is_additional_frame() {
                Error::AuthenticationFailed("unexpected continuation")
            } else {
                nexum_desfire_core::Error::picc(status).into()
            });
        }
        if payload.len() != challenge_len {
            return Err(Error::AuthenticationFailed("card confirmation length"));
        }

        // Third pass: the card proves key knowledge by returning our
        // RndA rotated one byte left.
        let mut confirmation = [0u8; MAX_BLOCK_LEN];
        confirmation[..challenge_len].copy_from_slice(&payload);
        match generation {
            Generation::Legacy => {
                let mut step_iv = [0u8; MAX_BLOCK_LEN];
                crypto::chain_blocks(
                    &cipher,
                    &mut step_iv[..bs],
                    &mut confirmation[..challenge_len],
                    Direction::Receive,
                    Operation::Decrypt,
                );
            }
            Generation::Iso => {
                crypto::chain_blocks(
                    &cipher,
                    &mut iv[..bs],
                    &mut confirmation[..challenge_len],
                    Direction::Receive,
                    Operation::Decrypt,
                );
            }
        }

        let mut expected = [0u8; MAX_BLOCK_LEN];
        expected[..challenge_len].copy_from_slice(&rnd_a[..challenge_len]);
        expected[..challenge_len].rotate_left(1);
        if confirmation[..challenge_len] != expected[..challenge_len] {
            warn!(key_no, "card failed the mutual challenge");
            return Err(Error::AuthenticationFailed("card challenge mismatch"));
        }

        self.session = Some(SecureSession::new(
            key_no,
            kind,
            &rnd_a[..challenge_len],
            &rnd_b[..challenge_len],
        ));
        rnd_a.zeroize();
        rnd_b.zeroize();
        debug!(key_no, ?kind, "authenticated");
        Ok(())
    }

    /// Select an application by identifier
    ///
    /// The card forgets its authentication state on selection, even
    /// when re-selecting the current application; the host session is
    /// discarded before the exchange so a failure cannot leave a stale
    /// one behind.
    pub fn select_application(&mut self, aid: Aid) -> Result<()> {
        self.ensure_active()?;
        self.session = None;
        self.clear_settings_cache();

        self.run_plain(frame::build(SELECT_APPLICATION, &aid.to_bytes()))?;
        self.selected = aid;
        debug!(%aid, "application selected");
        Ok(())
    }

    /// Create an application on the card
    ///
    /// `key_count` is 1 to 14 keys of the given family; the family is
    /// fixed at creation and encoded in the high bits of the second
    /// settings byte.
    pub fn create_application(
        &mut self,
        aid: Aid,
        settings: KeySettings,
        key_count: u8,
        kind: KeyKind,
    ) -> Result<()> {
        if key_count == 0 || key_count > 14 {
            return Err(Error::InvalidParameter("application key count out of range"));
        }
        let mut params = [0u8; 5];
        params[..3].copy_from_slice(&aid.to_bytes());
        params[3] = settings.to_byte();
        params[4] = key_count | kind.application_flag();
        self.run_plain(frame::build(CREATE_APPLICATION, &params))?;
        Ok(())
    }

    /// Delete an application and everything in it
    ///
    /// Deleting the selected application implicitly lands back on the
    /// master application, unauthenticated.
    pub fn delete_application(&mut self, aid: Aid) -> Result<()> {
        self.run_plain(frame::build(DELETE_APPLICATION, &aid.to_bytes()))?;
        if self.selected == aid {
            self.session = None;
            self.selected = Aid::MASTER;
            self.clear_settings_cache();
        }
        Ok(())
    }

    /// List the identifiers of all applications on the card
    pub fn application_ids(&mut self) -> Result<Vec<Aid>> {
        let payload = self.run_plain(frame::build(GET_APPLICATION_IDS, &[]))?;
        if payload.len() % 3 != 0 {
            return Err(Error::InvalidResponse("application list length"));
        }
        Ok(payload
            .chunks_exact(3)
            .map(|aid| Aid::from_bytes([aid[0], aid[1], aid[2]]))
            .collect())
    }

    /// Erase all applications and files
    ///
    /// Leaves the card on the master application, unauthenticated.
    pub fn format_picc(&mut self) -> Result<()> {
        self.run_plain(frame::build(FORMAT_PICC, &[]))?;
        self.session = None;
        self.selected = Aid::MASTER;
        self.clear_settings_cache();
        debug!("card formatted");
        Ok(())
    }

    /// Read hardware, software and production information
    pub fn version(&mut self) -> Result<VersionInfo> {
        let payload = self.run_plain(frame::build(GET_VERSION, &[]))?;
        VersionInfo::from_bytes(&payload)
    }

    /// Remaining free EEPROM in bytes
    pub fn free_memory(&mut self) -> Result<u32> {
        let payload = self.run_plain(frame::build(FREE_MEMORY, &[]))?;
        if payload.len() != 3 {
            return Err(Error::InvalidLength {
                expected: 3,
                actual: payload.len(),
            });
        }
        Ok(get_u24_le(&payload))
    }

    /// Read the real 7-byte UID, bypassing random-UID mode
    ///
    /// The card only releases it enciphered, so a session is required.
    pub fn card_uid(&mut self) -> Result<[u8; 7]> {
        self.ensure_active()?;
        if self.session.is_none() {
            return Err(Error::NotAuthenticated);
        }
        let payload = self.run(
            frame::build(GET_CARD_UID, &[]),
            1,
            CommandWrap::Plain,
            CommMode::Enciphered,
        )?;
        if payload.len() != 7 {
            return Err(Error::InvalidLength {
                expected: 7,
                actual: payload.len(),
            });
        }
        let mut uid = [0u8; 7];
        uid.copy_from_slice(&payload);
        Ok(uid)
    }

    /// Key settings of the selected application and its key count
    ///
    /// The second byte is returned raw: its low nibble is the key
    /// count, the high bits carry the application's crypto flags.
    pub fn key_settings(&mut self) -> Result<(KeySettings, u8)> {
        let payload = self.run_plain(frame::build(GET_KEY_SETTINGS, &[]))?;
        if payload.len() != 2 {
            return Err(Error::InvalidLength {
                expected: 2,
                actual: payload.len(),
            });
        }
        Ok((KeySettings::from_byte(payload[0]), payload[1]))
    }

    /// Change the key settings of the selected application
    pub fn change_key_settings(&mut self, settings: KeySettings) -> Result<()> {
        let command = frame::build(CHANGE_KEY_SETTINGS, &[settings.to_byte()]);
        self.run(command, 1, CommandWrap::Enciphered, CommMode::Plain)?;
        Ok(())
    }

    /// Version byte of a key without revealing the key
    pub fn key_version(&mut self, key_no: u8) -> Result<u8> {
        if key_no > MAX_KEY_NO {
            return Err(Error::InvalidParameter("key number out of range"));
        }
        let payload = self.run_plain(frame::build(GET_KEY_VERSION, &[key_no]))?;
        if payload.len() != 1 {
            return Err(Error::InvalidLength {
                expected: 1,
                actual: payload.len(),
            });
        }
        Ok(payload[0])
    }

    /// Replace a key of the selected application (or the card master key)
    ///
    /// Changing a key other than the one this session authenticated
    /// with requires `old_key`: the cryptogram then carries the new
    /// material XORed with the old plus a checksum over the plain new
    /// key. Changing the session's own key succeeds but ends the
    /// session, since the card deauthenticates.
    pub fn change_key(&mut self, key_no: u8, new_key: &Key, old_key: Option<&Key>) -> Result<()> {
        self.ensure_active()?;
        if key_no > MAX_KEY_NO {
            return Err(Error::InvalidParameter("key number out of range"));
        }
        let Some(session) = self.session.as_ref() else {
            return Err(Error::NotAuthenticated);
        };
        let same_key = session.key_no() & 0x0F == key_no & 0x0F;
        let generation = Generation::for_kind(session.kind());

        // The card master key may move to another family; applications
        // fix their family at creation, so the flag is only meaningful
        // on the master application.
        let mut target = key_no & 0x0F;
        if self.selected.is_master() {
            target |= new_key.kind().application_flag();
        }

        let new_material = new_key.wire_material();
        let mut command = frame::build(CHANGE_KEY, &[target]);
        command.put_slice(&new_material);

        if !same_key {
            let old = old_key.ok_or(Error::InvalidParameter(
                "changing another key requires its current material",
            ))?;
            let old_material = old.wire_material();
            for (n, byte) in command[2..].iter_mut().enumerate() {
                *byte ^= old_material[n % old_material.len()];
            }
        }
        if new_key.kind() == KeyKind::Aes128 {
            command.put_u8(new_key.version());
        }

        // One checksum binds the cryptogram; a second over the plain
        // new key proves it to the card when the XOR mask is in play.
        match generation {
            Generation::Legacy => {
                let crc = crypto::crc16(&command[2..]);
                command.put_slice(&crc);
                if !same_key {
                    command.put_slice(&crypto::crc16(&new_material));
                }
            }
            Generation::Iso => {
                let crc = crypto::crc32(&command);
                command.put_slice(&crc);
                if !same_key {
                    command.put_slice(&crypto::crc32(&new_material));
                }
            }
        }

        self.run(command, 2, CommandWrap::EncipheredNoCrc, CommMode::Plain)?;

        if same_key {
            // The card deauthenticated; the session key no longer
            // matches anything it holds.
            self.session = None;
            debug!(key_no, "session ended by changing its own key");
        }
        Ok(())
    }

    /// Set the card-level configuration flags
    ///
    /// `disable_format` permanently disables `FormatPicc`;
    /// `enable_random_uid` makes the anticollision UID random until
    /// [`card_uid`] is used under a session. Both are irreversible.
    ///
    /// [`card_uid`]: Self::card_uid
    pub fn set_configuration(&mut self, disable_format: bool, enable_random_uid: bool) -> Result<()> {
        let flags = u8::from(disable_format) | (u8::from(enable_random_uid) << 1);
        let command = frame::build(SET_CONFIGURATION, &[0x00, flags]);
        self.run(command, 2, CommandWrap::Enciphered, CommMode::Plain)?;
        Ok(())
    }

    /// Install the default key for newly created applications and keys
    pub fn set_default_key(&mut self, key: &Key) -> Result<()> {
        let mut params = Vec::with_capacity(26);
        params.push(0x01);
        params.extend_from_slice(&key.wire_material());
        params.resize(25, 0x00);
        params.push(key.version());
        let command = frame::build(SET_CONFIGURATION, &params);
        self.run(command, 2, CommandWrap::Enciphered, CommMode::Plain)?;
        Ok(())
    }

    /// Replace the ATS the card sends on ISO 14443-4 activation
    ///
    /// `ats` is the raw ATS including its leading length byte.
    pub fn set_ats(&mut self, ats: &[u8]) -> Result<()> {
        let mut params = Vec::with_capacity(1 + ats.len());
        params.push(0x02);
        params.extend_from_slice(ats);
        let command = frame::build(SET_CONFIGURATION, &params);
        self.run(command, 2, CommandWrap::Enciphered, CommMode::Plain)?;
        Ok(())
    }

    /// Run one protected logical exchange
    ///
    /// Wraps the command for the active session, transceives, and
    /// verifies the response per `response_mode`. Session bookkeeping
    /// for failures happens here in one place: wire and integrity
    /// failures drop the session, while card error statuses keep it
    /// alive with the CMAC stream advanced.
    pub(crate) fn run(
        &mut self,
        mut command: BytesMut,
        header_len: usize,
        wrap: CommandWrap,
        response_mode: CommMode,
    ) -> Result<Bytes> {
        self.ensure_active()?;
        match (self.session.as_mut(), wrap) {
            (Some(session), CommandWrap::Plain) => {
                session.wrap_command(&mut command, header_len, CommMode::Plain);
            }
            (Some(session), CommandWrap::Maced) => {
                session.wrap_command(&mut command, header_len, CommMode::Maced);
            }
            (Some(session), CommandWrap::Enciphered) => {
                session.wrap_command(&mut command, header_len, CommMode::Enciphered);
            }
            (Some(session), CommandWrap::EncipheredNoCrc) => {
                session.encipher_command(&mut command, header_len, false);
            }
            (None, CommandWrap::Plain) => {}
            (None, _) => return Err(Error::NotAuthenticated),
        }

        let payload = match transceive(&mut self.transport, &command) {
            Ok(payload) => payload,
            Err(core) => {
                let err = Error::from(core);
                if err.invalidates_session() {
                    if self.session.take().is_some() {
                        debug!("session dropped after wire failure");
                    }
                } else if let Some(status) = err.status() {
                    if let Some(session) = self.session.as_mut() {
                        session.note_error_status(status);
                    }
                }
                return Err(err);
            }
        };

        let Some(session) = self.session.as_mut() else {
            return Ok(payload);
        };
        match session.unwrap_response(payload, response_mode) {
            Ok(data) => Ok(data),
            Err(err) => {
                if err.invalidates_session() {
                    self.session = None;
                    debug!("session dropped after integrity failure");
                }
                Err(err)
            }
        }
    }

    /// Run an exchange with no command protection and a plain response
    ///
    /// Under an ISO session this still advances and verifies the CMAC
    /// stream on both directions.
    pub(crate) fn run_plain(&mut self, command: BytesMut) -> Result<Bytes> {
        self.run(command, 0, CommandWrap::Plain, CommMode::Plain)
    }

    pub(crate) fn ensure_active(&self) -> Result<()> {
        if self.active {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }

    pub(crate) fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub(crate) fn cached_settings(&self, file_no: u8) -> Option<FileSettings> {
        self.settings_cache
            .get(usize::from(file_no))
            .copied()
            .flatten()
    }

    pub(crate) fn remember_settings(&mut self, file_no: u8, settings: FileSettings) {
        if let Some(slot) = self.settings_cache.get_mut(usize::from(file_no)) {
            *slot = Some(settings);
        }
    }

    pub(crate) fn forget_settings(&mut self, file_no: u8) {
        if let Some(slot) = self.settings_cache.get_mut(usize::from(file_no)) {
            *slot = None;
        }
    }

    pub(crate) fn clear_settings_cache(&mut self) {
        self.settings_cache = [None; FILE_SLOTS];
    }
}
