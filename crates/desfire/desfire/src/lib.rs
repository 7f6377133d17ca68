//! MIFARE DESFire authentication, secure messaging and file access
//!
//! The entry point is [`Desfire`], which drives one card over any
//! [`TagTransport`] and keeps the whole protocol state in one place:
//!
//! - connection management and the card-level command set (select,
//!   create and delete applications, format, version, free memory)
//! - three-pass mutual authentication with DES, 2K3DES, 3K3DES and
//!   AES-128 keys, negotiating the card's legacy or ISO secure
//!   messaging generation
//! - key administration: `ChangeKey` cryptograms, key settings and
//!   versions, card configuration
//! - the file system: data, backup, value and record files, with
//!   per-file communication modes (plain, MACed, enciphered) resolved
//!   automatically from the file's access rights or forced explicitly
//!
//! Frame chaining, status decoding and the transport abstraction live
//! in `nexum-desfire-core`; this crate adds the cryptographic layers
//! on top. The [`crypto`] module is public so card-side peers (tests,
//! emulators) can mirror the session primitives exactly.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

mod aid;
mod constants;
pub mod crypto;
mod error;
mod files;
mod key;
mod session;
mod tag;
mod types;

pub use aid::Aid;
pub use error::{Error, Result};
pub use key::{Key, KeyKind};
pub use tag::Desfire;
pub use types::{
    AccessRight, AccessRights, ChangeKeyRight, CommMode, ComponentVersion, FileKind, FileSettings,
    KeySettings, ModeSelect, VersionInfo,
};

pub use nexum_desfire_core::{Bytes, Status, TagTransport, TransportError};
