//! File management and data access
//!
//! The data-plane half of [`Desfire`]: file creation and deletion,
//! data and record transfer, value manipulation and the transaction
//! boundary. Communication modes are resolved per operation: an
//! explicit override always wins, otherwise the file's stored settings
//! and the current authentication state decide, with the settings
//! fetched once and cached until something invalidates them.

use std::ops::RangeInclusive;

use bytes::{BufMut, Bytes, BytesMut};
use nexum_desfire_core::{TagTransport, frame};
use tracing::debug;

use crate::constants::*;
use crate::error::{Error, Result};
use crate::tag::{CommandWrap, Desfire};
use crate::types::{
    AccessRights, CommMode, FileSettings, ModeSelect, get_i32_le, u24_le_bytes,
};

/// Which right family governs an operation
#[derive(Debug, Clone, Copy)]
enum Access {
    Read,
    Write,
}

impl<T: TagTransport> Desfire<T> {
    /// List the file numbers present in the selected application
    pub fn file_ids(&mut self) -> Result<Vec<u8>> {
        let payload = self.run_plain(frame::build(GET_FILE_IDS, &[]))?;
        Ok(payload.to_vec())
    }

    /// Query the settings of one file
    ///
    /// Always asks the card; the answer refreshes the cache consulted
    /// by automatic mode resolution.
    pub fn file_settings(&mut self, file_no: u8) -> Result<FileSettings> {
        let payload = self.run_plain(frame::build(GET_FILE_SETTINGS, &[file_no]))?;
        let settings = FileSettings::from_bytes(&payload)?;
        self.remember_settings(file_no, settings);
        Ok(settings)
    }

    /// Change a file's communication mode and access rights
    ///
    /// The command travels in clear only while the current change right
    /// is free; otherwise the card insists on an enciphered exchange.
    pub fn change_file_settings(
        &mut self,
        file_no: u8,
        comm: CommMode,
        rights: AccessRights,
    ) -> Result<()> {
        let current = self.file_settings(file_no)?;

        let mut params = [0u8; 4];
        params[0] = file_no;
        params[1] = comm.to_byte();
        params[2..4].copy_from_slice(&rights.to_bytes());
        let command = frame::build(CHANGE_FILE_SETTINGS, &params);

        if current.access_rights().change.is_free() {
            self.run_plain(command)?;
        } else {
            self.run(command, 2, CommandWrap::Enciphered, CommMode::Plain)?;
        }
        self.forget_settings(file_no);
        Ok(())
    }

    /// Create a standard data file of `size` bytes
    pub fn create_std_data_file(
        &mut self,
        file_no: u8,
        comm: CommMode,
        rights: AccessRights,
        size: u32,
    ) -> Result<()> {
        self.create_data_file(CREATE_STD_DATA_FILE, file_no, comm, rights, size)
    }

    /// Create a backup data file of `size` bytes
    ///
    /// Writes to it stay invisible until [`commit_transaction`].
    ///
    /// [`commit_transaction`]: Self::commit_transaction
    pub fn create_backup_data_file(
        &mut self,
        file_no: u8,
        comm: CommMode,
        rights: AccessRights,
        size: u32,
    ) -> Result<()> {
        self.create_data_file(CREATE_BACKUP_DATA_FILE, file_no, comm, rights, size)
    }

    fn create_data_file(
        &mut self,
        command: u8,
        file_no: u8,
        comm: CommMode,
        rights: AccessRights,
        size: u32,
    ) -> Result<()> {
        ensure_u24(size, "file size exceeds 24 bits")?;
        let mut params = [0u8; 7];
        params[0] = file_no;
        params[1] = comm.to_byte();
        params[2..4].copy_from_slice(&rights.to_bytes());
        params[4..7].copy_from_slice(&u24_le_bytes(size));
        self.run_plain(frame::build(command, &params))?;
        self.forget_settings(file_no);
        Ok(())
    }

    /// Create a value file
    ///
    /// The stored value always stays within `limits`; `limited_credit`
    /// enables the once-per-transaction refund of previously debited
    /// amounts.
    pub fn create_value_file(
        &mut self,
        file_no: u8,
        comm: CommMode,
        rights: AccessRights,
        limits: RangeInclusive<i32>,
        initial_value: i32,
        limited_credit: bool,
    ) -> Result<()> {
        let mut params = BytesMut::with_capacity(17);
        params.put_u8(file_no);
        params.put_u8(comm.to_byte());
        params.put_slice(&rights.to_bytes());
        params.put_i32_le(*limits.start());
        params.put_i32_le(*limits.end());
        params.put_i32_le(initial_value);
        params.put_u8(u8::from(limited_credit));
        self.run_plain(frame::build(CREATE_VALUE_FILE, &params))?;
        self.forget_settings(file_no);
        Ok(())
    }

    /// Create a linear record file
    pub fn create_linear_record_file(
        &mut self,
        file_no: u8,
        comm: CommMode,
        rights: AccessRights,
        record_size: u32,
        max_records: u32,
    ) -> Result<()> {
        self.create_record_file(
            CREATE_LINEAR_RECORD_FILE,
            file_no,
            comm,
            rights,
            record_size,
            max_records,
        )
    }

    /// Create a cyclic record file
    ///
    /// Once full, the oldest record is overwritten; one slot is always
    /// kept spare for the in-flight record, so `max_records` must be at
    /// least two.
    pub fn create_cyclic_record_file(
        &mut self,
        file_no: u8,
        comm: CommMode,
        rights: AccessRights,
        record_size: u32,
        max_records: u32,
    ) -> Result<()> {
        self.create_record_file(
            CREATE_CYCLIC_RECORD_FILE,
            file_no,
            comm,
            rights,
            record_size,
            max_records,
        )
    }

    fn create_record_file(
        &mut self,
        command: u8,
        file_no: u8,
        comm: CommMode,
        rights: AccessRights,
        record_size: u32,
        max_records: u32,
    ) -> Result<()> {
        ensure_u24(record_size, "record size exceeds 24 bits")?;
        ensure_u24(max_records, "record count exceeds 24 bits")?;
        let mut params = [0u8; 10];
        params[0] = file_no;
        params[1] = comm.to_byte();
        params[2..4].copy_from_slice(&rights.to_bytes());
        params[4..7].copy_from_slice(&u24_le_bytes(record_size));
        params[7..10].copy_from_slice(&u24_le_bytes(max_records));
        self.run_plain(frame::build(command, &params))?;
        self.forget_settings(file_no);
        Ok(())
    }

    /// Delete a file from the selected application
    ///
    /// The space is only reclaimed by a later [`format_picc`].
    ///
    /// [`format_picc`]: Self::format_picc
    pub fn delete_file(&mut self, file_no: u8) -> Result<()> {
        self.run_plain(frame::build(DELETE_FILE, &[file_no]))?;
        self.forget_settings(file_no);
        Ok(())
    }

    /// Read `length` bytes from a data file starting at `offset`
    ///
    /// A zero `length` is a no-op returning no bytes and exchanging no
    /// frames. The result holds exactly what the card returned, which
    /// is short of `length` only at end of file.
    pub fn read_data(&mut self, file_no: u8, offset: u32, length: u32) -> Result<Bytes> {
        self.read_file(READ_DATA, file_no, offset, length)
    }

    /// Read `count` records from a record file, oldest first
    ///
    /// `offset` and `count` are in records, not bytes; a zero `count`
    /// is a no-op. Reading an empty record file is a boundary error on
    /// the card side.
    pub fn read_records(&mut self, file_no: u8, offset: u32, count: u32) -> Result<Bytes> {
        self.read_file(READ_RECORDS, file_no, offset, count)
    }

    fn read_file(&mut self, command: u8, file_no: u8, offset: u32, length: u32) -> Result<Bytes> {
        self.ensure_active()?;
        ensure_u24(offset, "offset exceeds 24 bits")?;
        ensure_u24(length, "length exceeds 24 bits")?;
        if length == 0 {
            return Ok(Bytes::new());
        }
        let mode = self.resolve_mode(file_no, Access::Read, self.read_mode())?;

        let mut params = [0u8; 7];
        params[0] = file_no;
        params[1..4].copy_from_slice(&u24_le_bytes(offset));
        params[4..7].copy_from_slice(&u24_le_bytes(length));
        self.run(
            frame::build(command, &params),
            8,
            CommandWrap::Plain,
            mode,
        )
    }

    /// Write `data` into a data file at `offset`
    ///
    /// Returns the number of bytes accepted. Zero-length writes are a
    /// no-op. On a backup data file the write is provisional until
    /// [`commit_transaction`].
    ///
    /// [`commit_transaction`]: Self::commit_transaction
    pub fn write_data(&mut self, file_no: u8, offset: u32, data: &[u8]) -> Result<usize> {
        self.write_file(WRITE_DATA, file_no, offset, data)
    }

    /// Append one record, writing `data` at `offset` within the record
    ///
    /// The record is provisional until [`commit_transaction`]; only one
    /// record may be in flight per file and transaction.
    ///
    /// [`commit_transaction`]: Self::commit_transaction
    pub fn write_record(&mut self, file_no: u8, offset: u32, data: &[u8]) -> Result<usize> {
        self.write_file(WRITE_RECORD, file_no, offset, data)
    }

    fn write_file(&mut self, command: u8, file_no: u8, offset: u32, data: &[u8]) -> Result<usize> {
        self.ensure_active()?;
        ensure_u24(offset, "offset exceeds 24 bits")?;
        let length =
            u32::try_from(data.len()).map_err(|_| Error::InvalidParameter("data length exceeds 24 bits"))?;
        ensure_u24(length, "data length exceeds 24 bits")?;
        if data.is_empty() {
            return Ok(0);
        }
        let mode = self.resolve_mode(file_no, Access::Write, self.write_mode())?;

        let mut logical = BytesMut::with_capacity(8 + data.len());
        logical.put_u8(command);
        logical.put_u8(file_no);
        logical.put_slice(&u24_le_bytes(offset));
        logical.put_slice(&u24_le_bytes(length));
        logical.put_slice(data);
        self.run(logical, 8, CommandWrap::for_mode(mode), CommMode::Plain)?;
        self.forget_settings(file_no);
        debug!(file_no, written = data.len(), "write accepted");
        Ok(data.len())
    }

    /// Current value of a value file
    ///
    /// Reflects the last committed state; provisional credits and
    /// debits of the open transaction are invisible here.
    pub fn value(&mut self, file_no: u8) -> Result<i32> {
        self.ensure_active()?;
        let mode = self.resolve_mode(file_no, Access::Read, self.read_mode())?;
        let payload = self.run(
            frame::build(GET_VALUE, &[file_no]),
            2,
            CommandWrap::Plain,
            mode,
        )?;
        if payload.len() != 4 {
            return Err(Error::InvalidLength {
                expected: 4,
                actual: payload.len(),
            });
        }
        Ok(get_i32_le(&payload))
    }

    /// Increase a value file by `amount`, provisionally
    pub fn credit(&mut self, file_no: u8, amount: i32) -> Result<()> {
        self.adjust_value(CREDIT, file_no, amount)
    }

    /// Decrease a value file by `amount`, provisionally
    pub fn debit(&mut self, file_no: u8, amount: i32) -> Result<()> {
        self.adjust_value(DEBIT, file_no, amount)
    }

    /// Refund up to the amount debited since the last commit
    ///
    /// Only permitted on files created with limited credit enabled.
    pub fn limited_credit(&mut self, file_no: u8, amount: i32) -> Result<()> {
        self.adjust_value(LIMITED_CREDIT, file_no, amount)
    }

    fn adjust_value(&mut self, command: u8, file_no: u8, amount: i32) -> Result<()> {
        self.ensure_active()?;
        let mode = self.resolve_mode(file_no, Access::Write, self.write_mode())?;
        let mut params = [0u8; 5];
        params[0] = file_no;
        params[1..5].copy_from_slice(&amount.to_le_bytes());
        self.run(
            frame::build(command, &params),
            2,
            CommandWrap::for_mode(mode),
            CommMode::Plain,
        )?;
        self.forget_settings(file_no);
        Ok(())
    }

    /// Discard all records of a record file, provisionally
    pub fn clear_record_file(&mut self, file_no: u8) -> Result<()> {
        self.run_plain(frame::build(CLEAR_RECORD_FILE, &[file_no]))?;
        self.forget_settings(file_no);
        Ok(())
    }

    /// Make all provisional changes of this session durable
    ///
    /// Commit with nothing pending succeeds as a no-op.
    pub fn commit_transaction(&mut self) -> Result<()> {
        self.run_plain(frame::build(COMMIT_TRANSACTION, &[]))?;
        self.clear_settings_cache();
        Ok(())
    }

    /// Discard all provisional changes of this session
    pub fn abort_transaction(&mut self) -> Result<()> {
        self.run_plain(frame::build(ABORT_TRANSACTION, &[]))?;
        self.clear_settings_cache();
        Ok(())
    }

    /// Decide the communication mode for one file operation
    ///
    /// An explicit override wins. Otherwise: the file's mode when the
    /// session key is named by a governing right, plain when a right is
    /// free for everyone, and the file's mode again as a last resort so
    /// the card, not the host, pronounces the permission verdict.
    fn resolve_mode(&mut self, file_no: u8, access: Access, select: ModeSelect) -> Result<CommMode> {
        if let ModeSelect::Explicit(mode) = select {
            return Ok(mode);
        }
        let settings = match self.cached_settings(file_no) {
            Some(settings) => settings,
            None => self.file_settings(file_no)?,
        };
        let rights = settings.access_rights();
        let (primary, shared) = match access {
            Access::Read => (rights.read, rights.read_write),
            Access::Write => (rights.write, rights.read_write),
        };
        Ok(match self.authenticated_key_no() {
            Some(key_no) if primary.grants_key(key_no) || shared.grants_key(key_no) => {
                settings.comm_mode()
            }
            Some(_) if primary.is_free() || shared.is_free() => CommMode::Plain,
            Some(_) => settings.comm_mode(),
            None => CommMode::Plain,
        })
    }
}

fn ensure_u24(value: u32, message: &'static str) -> Result<()> {
    if value > MAX_24BIT {
        return Err(Error::InvalidParameter(message));
    }
    Ok(())
}
