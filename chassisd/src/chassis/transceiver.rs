use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::sysfs;
use crate::tracing::prelude::*;

/// A pluggable transceiver port.
///
/// Implementations wrap whatever the platform exposes (sysfs attributes, an
/// i2c client, a test double). Every method is synchronous and reports
/// failure as `false` / `None`; the presence watcher decides what to do
/// with it.
pub trait Transceiver: Send {
    /// Module physically seated.
    fn presence(&self) -> bool;

    /// Read `len` bytes at `offset`, priming the EEPROM buffer on the way.
    fn read_eeprom(&mut self, offset: usize, len: usize) -> Option<Vec<u8>>;

    /// Drop buffered EEPROM contents after the module has been removed.
    fn clear_eeprom_buffer(&mut self);

    /// Forget any cached state so the next access goes to hardware.
    fn reinit(&mut self);
}

/// Attribute files for one port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransceiverPaths {
    pub present: PathBuf,
    pub eeprom: PathBuf,
}

/// Lower page plus upper page 00h, enough for identification.
const EEPROM_BUFFER_LEN: usize = 256;

/// Transceiver backed by a presence attribute and a binary EEPROM file.
#[derive(Debug)]
pub struct SysfsTransceiver {
    index: usize,
    paths: TransceiverPaths,
    buffer: Option<Vec<u8>>,
}

impl SysfsTransceiver {
    pub fn new(index: usize, paths: TransceiverPaths) -> Self {
        Self {
            index,
            paths,
            buffer: None,
        }
    }

    fn read_at(&self, offset: usize, len: usize) -> std::io::Result<Vec<u8>> {
        let mut file = File::open(&self.paths.eeprom)?;
        file.seek(SeekFrom::Start(offset as u64))?;
        let mut data = Vec::with_capacity(len);
        file.take(len as u64).read_to_end(&mut data)?;
        Ok(data)
    }
}

impl Transceiver for SysfsTransceiver {
    fn presence(&self) -> bool {
        sysfs::read_flag(&self.paths.present).unwrap_or(false)
    }

    fn read_eeprom(&mut self, offset: usize, len: usize) -> Option<Vec<u8>> {
        if self.buffer.is_none() {
            match self.read_at(0, EEPROM_BUFFER_LEN) {
                Ok(data) => self.buffer = Some(data),
                Err(e) => {
                    debug!(port = self.index, error = %e, "EEPROM buffer read failed");
                    return None;
                }
            }
        }

        let end = offset.checked_add(len)?;
        match &self.buffer {
            Some(buffer) if end <= buffer.len() => Some(buffer[offset..end].to_vec()),
            _ => self.read_at(offset, len).ok().filter(|data| data.len() == len),
        }
    }

    fn clear_eeprom_buffer(&mut self) {
        self.buffer = None;
    }

    fn reinit(&mut self) {
        self.buffer = None;
    }
}
