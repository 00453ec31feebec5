//! In-memory log store for headless hosts and tests

use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hashbrown::HashMap;

use crate::error::LogError;

use super::{LogStore, validate_name};

type LogMap = HashMap<String, Vec<u8>>;

/// Log store keeping every recording in a shared map.
///
/// Clones share the same storage. Readers see the bytes present when the log
/// was opened, so a log being rewritten never changes an open playback.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogStore {
    logs: Arc<Mutex<LogMap>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LogMap> {
        lock_logs(&self.logs)
    }

    /// Raw bytes of a log, header included
    pub fn raw(&self, name: &str) -> Option<Vec<u8>> {
        self.lock().get(name).cloned()
    }

    /// Replace a log's raw bytes
    pub fn insert_raw(&self, name: impl Into<String>, bytes: Vec<u8>) {
        self.lock().insert(name.into(), bytes);
    }

    pub fn remove(&self, name: &str) -> bool {
        self.lock().remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }
}

impl LogStore for MemoryLogStore {
    fn create_raw(&self, name: &str) -> Result<Box<dyn Write + Send>, LogError> {
        validate_name(name)?;
        self.lock().insert(name.to_string(), Vec::new());
        Ok(Box::new(MemorySink {
            logs: Arc::clone(&self.logs),
            name: name.to_string(),
        }))
    }

    fn open_raw(&self, name: &str) -> Result<Box<dyn Read + Send>, LogError> {
        validate_name(name)?;
        let bytes = self
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| LogError::PathUnavailable {
                name: name.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such recording"),
            })?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn list(&self) -> Result<Vec<String>, LogError> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

fn lock_logs(logs: &Mutex<LogMap>) -> MutexGuard<'_, LogMap> {
    logs.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Writer appending straight into the shared map
struct MemorySink {
    logs: Arc<Mutex<LogMap>>,
    name: String,
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock_logs(&self.logs)
            .entry(self.name.clone())
            .or_default()
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_store::read_all;
    use crate::snapshot::{ChannelShape, InputSnapshot};

    #[test]
    fn test_memory_roundtrip() {
        let store = MemoryLogStore::new();
        let shape = ChannelShape::new(2, 1);

        let mut writer = store.open_for_write("session_1", shape).unwrap();
        writer
            .append(&InputSnapshot::new([0.1, 0.2], [true]))
            .unwrap();
        writer.finish().unwrap();

        assert!(store.contains("session_1"));
        let snapshots = read_all(&store, "session_1", shape).unwrap();
        assert_eq!(snapshots, vec![InputSnapshot::new([0.1, 0.2], [true])]);
    }

    #[test]
    fn test_clones_share_storage() {
        let store = MemoryLogStore::new();
        let other = store.clone();
        store
            .open_for_write("shared", ChannelShape::new(1, 1))
            .unwrap()
            .finish()
            .unwrap();
        assert_eq!(other.list().unwrap(), vec!["shared"]);
    }

    #[test]
    fn test_open_reader_sees_snapshot_of_bytes() {
        let store = MemoryLogStore::new();
        let shape = ChannelShape::new(1, 0);

        let mut writer = store.open_for_write("live", shape).unwrap();
        writer.append(&InputSnapshot::new([0.5], [])).unwrap();

        let mut reader = store.open_for_read("live", shape).unwrap();
        writer.append(&InputSnapshot::new([0.75], [])).unwrap();

        assert!(reader.read_next().unwrap().is_some());
        assert_eq!(reader.read_next().unwrap(), None);
    }

    #[test]
    fn test_missing_log() {
        let store = MemoryLogStore::new();
        let err = store
            .open_for_read("missing_session", ChannelShape::new(2, 1))
            .err()
            .unwrap();
        assert!(err.is_path_unavailable());
    }

    #[test]
    fn test_remove() {
        let store = MemoryLogStore::new();
        store.insert_raw("x", vec![1, 2, 3]);
        assert_eq!(store.raw("x"), Some(vec![1, 2, 3]));
        assert!(store.remove("x"));
        assert!(!store.remove("x"));
    }
}
