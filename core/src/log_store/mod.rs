//! Durable recording logs (`.jrl`)
//!
//! A recording is identified by a logical name, resolved by the store to a
//! storage location. Logs are written append-only and read forward-only.
//!
//! # File Structure
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │ Header (8 bytes)                               │
//! │ ├─ magic: "JRPL"                               │
//! │ ├─ version: u8                                 │
//! │ ├─ axis_count: u8                              │
//! │ ├─ button_count: u8                            │
//! │ └─ reserved: u8                                │
//! ├────────────────────────────────────────────────┤
//! │ Records (fixed width, one per tick, no count)  │
//! └────────────────────────────────────────────────┘
//! ```
//!
//! Opening a log for writing always truncates it; recordings never append
//! across sessions.

mod fs;
mod header;
mod memory;
mod reader;
mod writer;

pub use fs::{FsLogStore, pending_syncs, wait_for_syncs};
pub use header::{HEADER_SIZE, LOG_MAGIC, LOG_VERSION, LogHeader};
pub use memory::MemoryLogStore;
pub use reader::LogReader;
pub use writer::LogWriter;

use std::io::{Read, Write};

use crate::error::LogError;
use crate::snapshot::{ChannelShape, InputSnapshot};

/// Storage backend for recordings.
///
/// Backends only provide raw byte streams; framing, header validation and
/// record encoding are shared by the provided methods.
pub trait LogStore: Send + Sync {
    /// Create or truncate the named log and return a sink for its bytes
    fn create_raw(&self, name: &str) -> Result<Box<dyn Write + Send>, LogError>;

    /// Open the named log for reading from its first byte
    fn open_raw(&self, name: &str) -> Result<Box<dyn Read + Send>, LogError>;

    /// Names of all stored logs, sorted
    fn list(&self) -> Result<Vec<String>, LogError>;

    /// Open a log for writing, truncating any previous content
    fn open_for_write(&self, name: &str, shape: ChannelShape) -> Result<LogWriter, LogError> {
        let sink = self.create_raw(name)?;
        LogWriter::new(name, sink, shape)
    }

    /// Open a log for reading, checking it was recorded with `shape`
    fn open_for_read(&self, name: &str, shape: ChannelShape) -> Result<LogReader, LogError> {
        let source = self.open_raw(name)?;
        LogReader::open(name, source, shape)
    }

    /// Read only the header of a log
    fn read_header(&self, name: &str) -> Result<LogHeader, LogError> {
        let mut source = self.open_raw(name)?;
        LogHeader::read_from(&mut source).map_err(|e| LogError::BadHeader {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    fn exists(&self, name: &str) -> bool {
        self.open_raw(name).is_ok()
    }
}

/// Load every record of a log
pub fn read_all<S: LogStore + ?Sized>(
    store: &S,
    name: &str,
    shape: ChannelShape,
) -> Result<Vec<InputSnapshot>, LogError> {
    store.open_for_read(name, shape)?.collect()
}

/// Check that a logical name maps to a single file under the base directory
pub(crate) fn validate_name(name: &str) -> Result<(), LogError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
        && name != "..";
    if valid {
        Ok(())
    } else {
        Err(LogError::InvalidName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("recording_1_drive").is_ok());
        assert!(validate_name("auto-left 2").is_ok());

        assert!(validate_name("").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name(".hidden").is_err());
        assert!(validate_name("../escape").is_err());
        assert!(validate_name("nested/name").is_err());
        assert!(validate_name("windows\\name").is_err());
    }

    #[test]
    fn test_read_header_without_shape() {
        let store = MemoryLogStore::new();
        store
            .open_for_write("shape_check", ChannelShape::new(4, 9))
            .unwrap()
            .finish()
            .unwrap();

        let header = store.read_header("shape_check").unwrap();
        assert_eq!(header.shape, ChannelShape::new(4, 9));
        assert!(store.exists("shape_check"));
        assert!(!store.exists("nope"));
    }

    #[test]
    fn test_invalid_name_is_path_unavailable() {
        let store = MemoryLogStore::new();
        let err = store
            .open_for_write("../x", ChannelShape::new(1, 1))
            .err()
            .unwrap();
        assert!(matches!(err, LogError::InvalidName(_)));
        assert!(err.is_path_unavailable());
    }
}
