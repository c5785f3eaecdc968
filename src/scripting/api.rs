//! Operations exposed to scripts

use crate::core::codec;
use crate::core::types::{Address, DataType, MemoryError, MemoryResult, SharedResult, Value};
use crate::memory::port::{DEFAULT_MAX_READ_SIZE, DEFAULT_STRING_LENGTH};
use crate::memory::{FilterKind, MemoryPort, MemoryRegion, MemoryScanner};
use std::sync::Arc;
use tracing::debug;

/// Text printed by `help()`
pub const HELP_TEXT: &str = "\
memscan script API

Memory read/write:
  readBytes(address, size) -> bytes
  writeBytes(address, hex) -> bool
  readInt(address) -> int
  readInt64(address) -> int
  readFloat(address) -> float
  readDouble(address) -> float
  readString(address, length=256) -> string
  read(address, type) -> value
  writeInt(address, value) -> bool
  writeInt64(address, value) -> bool
  writeFloat(address, value) -> bool
  writeDouble(address, value) -> bool
  write(address, value, type) -> bool

Scanner:
  scan(value, type) -> results
  getResults() -> results
  filter(kind, type, value?) -> results
  filterChanged(type) -> results
  filterUnchanged(type) -> results
  count(results) -> int

Types:
  Int8 Int16 Int32 Int64
  UInt8 UInt16 UInt32 UInt64
  Float Double String";

/// Per-session table of script operations.
///
/// Built without a port when nothing is attached; memory and scanner
/// operations then fail with `NotAttached`. Script-sized reads above
/// `max_read_size` fail with `ReadTooLarge` before anything is allocated.
#[derive(Debug)]
pub struct ScriptApi {
    port: Option<MemoryPort>,
    scanner: Option<Arc<MemoryScanner>>,
    regions: Vec<MemoryRegion>,
    output: Vec<String>,
    string_length: usize,
    max_read_size: usize,
}

impl Default for ScriptApi {
    fn default() -> Self {
        ScriptApi::detached(DEFAULT_STRING_LENGTH)
    }
}

impl ScriptApi {
    pub fn detached(string_length: usize) -> Self {
        ScriptApi {
            port: None,
            scanner: None,
            regions: Vec::new(),
            output: Vec::new(),
            string_length: string_length.max(1),
            max_read_size: DEFAULT_MAX_READ_SIZE,
        }
    }

    pub fn attached(
        port: MemoryPort,
        scanner: Arc<MemoryScanner>,
        regions: Vec<MemoryRegion>,
        string_length: usize,
    ) -> Self {
        ScriptApi {
            port: Some(port),
            scanner: Some(scanner),
            regions,
            output: Vec::new(),
            string_length: string_length.max(1),
            max_read_size: DEFAULT_MAX_READ_SIZE,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.port.is_some()
    }

    pub fn set_regions(&mut self, regions: Vec<MemoryRegion>) {
        self.regions = regions;
    }

    pub fn string_length(&self) -> usize {
        self.string_length
    }

    pub fn with_max_read_size(mut self, limit: usize) -> Self {
        self.max_read_size = limit.max(1);
        self
    }

    pub fn max_read_size(&self) -> usize {
        self.max_read_size
    }

    fn check_size(&self, size: usize) -> MemoryResult<()> {
        if size > self.max_read_size {
            return Err(MemoryError::ReadTooLarge {
                requested: size,
                limit: self.max_read_size,
            });
        }
        Ok(())
    }

    fn port(&self) -> MemoryResult<&MemoryPort> {
        self.port.as_ref().ok_or(MemoryError::NotAttached)
    }

    fn scanner(&self) -> MemoryResult<&MemoryScanner> {
        self.scanner.as_deref().ok_or(MemoryError::NotAttached)
    }

    /// `None` when the read fails
    pub fn read_bytes(&self, address: Address, size: usize) -> MemoryResult<Option<Vec<u8>>> {
        let port = self.port()?;
        self.check_size(size)?;
        Ok(port.read(address, size))
    }

    pub fn write_bytes(&self, address: Address, data: &[u8]) -> MemoryResult<bool> {
        Ok(self.port()?.write(address, data))
    }

    /// Reads and decodes; `None` when the read fails.
    ///
    /// `String` reads use the session's string length.
    pub fn read_typed(&self, address: Address, data_type: DataType) -> MemoryResult<Option<Value>> {
        let width = data_type.size().unwrap_or(self.string_length);
        match self.read_bytes(address, width)? {
            Some(bytes) => Ok(Some(codec::decode(&bytes, data_type)?)),
            None => Ok(None),
        }
    }

    /// Encodes and writes. A value that does not fit the type is an error,
    /// a failed write is `false`.
    pub fn write_typed(&self, address: Address, value: &Value, data_type: DataType) -> MemoryResult<bool> {
        let bytes = codec::encode(value, data_type)?;
        self.write_bytes(address, &bytes)
    }

    /// Reads `length` bytes as text, dropping invalid UTF-8 and trailing NULs
    pub fn read_string(&self, address: Address, length: usize) -> MemoryResult<Option<String>> {
        let port = self.port()?;
        self.check_size(length)?;
        Ok(port.read_string(address, length).ok())
    }

    pub fn scan(&self, value: &Value, data_type: DataType) -> MemoryResult<Vec<SharedResult>> {
        let scanner = self.scanner()?;
        debug!(value = %value, data_type = %data_type, "script scan");
        scanner.scan_exact(&self.regions, value, data_type, None)
    }

    pub fn results(&self) -> MemoryResult<Vec<SharedResult>> {
        Ok(self.scanner()?.results())
    }

    pub fn filter(&self, kind: FilterKind, data_type: DataType) -> MemoryResult<Vec<SharedResult>> {
        self.scanner()?.filter(kind, data_type)
    }

    pub fn print(&mut self, line: impl Into<String>) {
        self.output.push(line.into());
    }

    pub fn help(&mut self) {
        self.print(HELP_TEXT);
    }

    pub fn clear_output(&mut self) {
        self.output.clear();
    }

    /// Drains the output buffer, one line per `print`
    pub fn take_output(&mut self) -> String {
        let text = self.output.join("\n");
        self.output.clear();
        text
    }
}
