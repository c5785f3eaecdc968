//! Byte-exact access to the attached process
//!
//! The OS may copy fewer bytes than requested. A short transfer is treated
//! as a total failure here; callers never see a partial buffer.

use crate::core::codec;
use crate::core::types::{Address, DataType, MemoryError, MemoryResult, ProcessId, Value};
use crate::process::Capability;
use std::fmt;
use tracing::trace;

/// Default byte count for bounded string reads
pub const DEFAULT_STRING_LENGTH: usize = 256;

/// Default ceiling for caller-sized reads (10 MiB)
pub const DEFAULT_MAX_READ_SIZE: usize = 10 * 1024 * 1024;

/// Read/write port over one capability
#[derive(Clone)]
pub struct MemoryPort {
    process: Capability,
    string_length: usize,
}

impl MemoryPort {
    pub fn new(process: Capability) -> Self {
        MemoryPort {
            process,
            string_length: DEFAULT_STRING_LENGTH,
        }
    }

    /// Sets the length used when a `String` value is read without one
    pub fn with_string_length(mut self, length: usize) -> Self {
        self.string_length = length.max(1);
        self
    }

    pub fn pid(&self) -> ProcessId {
        self.process.pid()
    }

    pub fn capability(&self) -> &Capability {
        &self.process
    }

    pub fn string_length(&self) -> usize {
        self.string_length
    }

    /// Reads exactly `size` bytes or reports why not
    pub fn try_read(&self, address: Address, size: usize) -> MemoryResult<Vec<u8>> {
        let mut buffer = vec![0u8; size];
        let count = self.process.read_memory(address.as_usize(), &mut buffer)?;
        if count != size {
            return Err(MemoryError::read_failed(
                address,
                format!("short read: {} of {} bytes", count, size),
            ));
        }
        Ok(buffer)
    }

    /// Reads exactly `size` bytes; any failure yields `None`
    pub fn read(&self, address: Address, size: usize) -> Option<Vec<u8>> {
        match self.try_read(address, size) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                trace!(%address, size, error = %e, "read failed");
                None
            }
        }
    }

    /// Writes all of `data` or reports why not
    pub fn try_write(&self, address: Address, data: &[u8]) -> MemoryResult<()> {
        let count = self.process.write_memory(address.as_usize(), data)?;
        if count != data.len() {
            return Err(MemoryError::write_failed(
                address,
                format!("short write: {} of {} bytes", count, data.len()),
            ));
        }
        Ok(())
    }

    /// Writes all of `data`; true only on an exact-count write
    pub fn write(&self, address: Address, data: &[u8]) -> bool {
        match self.try_write(address, data) {
            Ok(()) => true,
            Err(e) => {
                trace!(%address, size = data.len(), error = %e, "write failed");
                false
            }
        }
    }

    /// Reads and decodes a value.
    ///
    /// `String` reads use the configured string length.
    pub fn read_value(&self, address: Address, data_type: DataType) -> MemoryResult<Value> {
        let width = data_type.size().unwrap_or(self.string_length);
        let bytes = self.try_read(address, width)?;
        codec::decode(&bytes, data_type)
    }

    /// Encodes and writes a value, returning the bytes written
    pub fn write_value(
        &self,
        address: Address,
        value: &Value,
        data_type: DataType,
    ) -> MemoryResult<Vec<u8>> {
        let bytes = codec::encode(value, data_type)?;
        self.try_write(address, &bytes)?;
        Ok(bytes)
    }

    /// Reads `length` bytes as text, dropping invalid UTF-8 and trailing NULs
    pub fn read_string(&self, address: Address, length: usize) -> MemoryResult<String> {
        let bytes = self.try_read(address, length)?;
        Ok(lossless_utf8(&bytes).trim_end_matches('\0').to_string())
    }
}

impl fmt::Debug for MemoryPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryPort")
            .field("pid", &self.pid())
            .field("string_length", &self.string_length)
            .finish()
    }
}

/// Keeps the valid UTF-8 runs of `bytes` and skips everything else
fn lossless_utf8(mut bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    loop {
        match std::str::from_utf8(bytes) {
            Ok(valid) => {
                out.push_str(valid);
                return out;
            }
            Err(e) => {
                let (valid, rest) = bytes.split_at(e.valid_up_to());
                // valid_up_to guarantees this prefix is UTF-8
                out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                let skip = e.error_len().unwrap_or(rest.len());
                bytes = &rest[skip..];
            }
        }
    }
}
