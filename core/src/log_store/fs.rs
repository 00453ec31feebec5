//! File-system log store
//!
//! Closing a recording only flushes it to the OS. When `sync_on_close` is set,
//! the `sync_all` that makes it durable runs on a background thread, so a
//! recording that ends inside a tick never waits on the storage device.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::StorageConfig;
use crate::error::LogError;

use super::{LogStore, validate_name};

/// Write buffer size; large enough that appends rarely hit the disk
const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// Log store resolving names to `<base_dir>/<name>.<extension>`
#[derive(Debug, Clone)]
pub struct FsLogStore {
    base_dir: PathBuf,
    extension: String,
    sync_on_close: bool,
}

impl FsLogStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            extension: "jrl".to_string(),
            sync_on_close: true,
        }
    }

    /// Store described by the `[storage]` config section
    pub fn from_config(storage: &StorageConfig) -> Self {
        Self::new(storage.resolved_base_dir())
            .with_extension(storage.extension.clone())
            .with_sync_on_close(storage.sync_on_close)
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Whether closing a recording also syncs it to durable media
    pub fn with_sync_on_close(mut self, sync: bool) -> Self {
        self.sync_on_close = sync;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Create the base directory if it doesn't exist.
    ///
    /// The store itself never creates directories: a missing base directory
    /// makes every open fail with `PathUnavailable`.
    pub fn ensure_base_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.base_dir)
    }

    /// Resolve a logical name to its file path
    pub fn path_for(&self, name: &str) -> Result<PathBuf, LogError> {
        validate_name(name)?;
        Ok(self.base_dir.join(format!("{}.{}", name, self.extension)))
    }
}

impl LogStore for FsLogStore {
    fn create_raw(&self, name: &str) -> Result<Box<dyn Write + Send>, LogError> {
        let path = self.path_for(name)?;
        let file = File::create(&path).map_err(|source| LogError::PathUnavailable {
            name: name.to_string(),
            source,
        })?;
        tracing::debug!("Opened {} for writing", path.display());

        Ok(Box::new(FileSink {
            inner: BufWriter::with_capacity(WRITE_BUFFER_SIZE, file),
            path,
            sync_on_close: self.sync_on_close,
        }))
    }

    fn open_raw(&self, name: &str) -> Result<Box<dyn Read + Send>, LogError> {
        let path = self.path_for(name)?;
        let file = File::open(&path).map_err(|source| LogError::PathUnavailable {
            name: name.to_string(),
            source,
        })?;
        tracing::debug!("Opened {} for reading", path.display());

        Ok(Box::new(BufReader::new(file)))
    }

    fn list(&self) -> Result<Vec<String>, LogError> {
        let entries = match fs::read_dir(&self.base_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(LogError::PathUnavailable {
                    name: self.base_dir.display().to_string(),
                    source,
                });
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.extension()
                    .is_some_and(|ext| ext == self.extension.as_str())
            })
            .filter_map(|path| {
                path.file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(str::to_string)
            })
            .collect();
        names.sort();
        Ok(names)
    }
}

/// Buffered file, handed to the sync thread when dropped
struct FileSink {
    inner: BufWriter<File>,
    path: PathBuf,
    sync_on_close: bool,
}

impl Write for FileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        if let Err(e) = self.inner.flush() {
            tracing::warn!("Failed to flush {}: {}", self.path.display(), e);
            return;
        }
        if !self.sync_on_close {
            return;
        }
        match self.inner.get_ref().try_clone() {
            Ok(file) => schedule_sync(SyncJob {
                file,
                path: std::mem::take(&mut self.path),
            }),
            Err(e) => tracing::warn!(
                "Failed to hand {} to the sync thread: {}",
                self.path.display(),
                e
            ),
        }
    }
}

struct SyncJob {
    file: File,
    path: PathBuf,
}

impl SyncJob {
    fn run(self) {
        match self.file.sync_all() {
            Ok(()) => tracing::debug!("Synced {}", self.path.display()),
            Err(e) => tracing::warn!("Failed to sync {}: {}", self.path.display(), e),
        }
        PENDING_SYNCS.fetch_sub(1, Ordering::AcqRel);
    }
}

static SYNC_THREAD: OnceLock<Option<mpsc::Sender<SyncJob>>> = OnceLock::new();
static PENDING_SYNCS: AtomicUsize = AtomicUsize::new(0);

fn sync_thread() -> Option<&'static mpsc::Sender<SyncJob>> {
    SYNC_THREAD
        .get_or_init(|| {
            let (tx, rx) = mpsc::channel::<SyncJob>();
            let spawned = thread::Builder::new()
                .name("joyreplay-sync".to_string())
                .spawn(move || {
                    for job in rx {
                        job.run();
                    }
                });
            match spawned {
                Ok(_) => Some(tx),
                Err(e) => {
                    tracing::warn!("Failed to start sync thread: {}; syncing inline", e);
                    None
                }
            }
        })
        .as_ref()
}

fn schedule_sync(job: SyncJob) {
    PENDING_SYNCS.fetch_add(1, Ordering::AcqRel);
    let job = match sync_thread() {
        Some(tx) => match tx.send(job) {
            Ok(()) => return,
            Err(mpsc::SendError(job)) => job,
        },
        None => job,
    };
    job.run();
}

/// Number of closed recordings not yet synced to durable media
pub fn pending_syncs() -> usize {
    PENDING_SYNCS.load(Ordering::Acquire)
}

/// Block until every closed recording is synced, or `timeout` passes.
///
/// Returns `true` if nothing is left pending. Call before exiting the process.
pub fn wait_for_syncs(timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while pending_syncs() > 0 {
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(1));
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_store::read_all;
    use crate::snapshot::{ChannelShape, InputSnapshot};

    #[test]
    fn test_write_then_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsLogStore::new(dir.path());
        let shape = ChannelShape::new(2, 1);

        let mut writer = store.open_for_write("session_1", shape).unwrap();
        writer
            .append(&InputSnapshot::new([0.1, 0.2], [false]))
            .unwrap();
        writer
            .append(&InputSnapshot::new([0.3, 0.4], [true]))
            .unwrap();
        assert_eq!(writer.finish().unwrap(), 2);

        assert!(dir.path().join("session_1.jrl").is_file());
        let snapshots = read_all(&store, "session_1", shape).unwrap();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[1], InputSnapshot::new([0.3, 0.4], [true]));
    }

    #[test]
    fn test_close_hands_sync_to_background() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsLogStore::new(dir.path()).with_sync_on_close(true);
        let shape = ChannelShape::new(1, 1);

        let mut writer = store.open_for_write("durable", shape).unwrap();
        writer.append(&InputSnapshot::new([0.5], [true])).unwrap();
        assert_eq!(writer.finish().unwrap(), 1);

        // Readable as soon as it is closed, synced shortly after
        assert_eq!(read_all(&store, "durable", shape).unwrap().len(), 1);
        assert!(wait_for_syncs(Duration::from_secs(10)));
    }

    #[test]
    fn test_open_for_write_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsLogStore::new(dir.path());
        let shape = ChannelShape::new(1, 0);

        let mut writer = store.open_for_write("again", shape).unwrap();
        for _ in 0..10 {
            writer.append(&InputSnapshot::new([0.5], [])).unwrap();
        }
        writer.finish().unwrap();

        let mut writer = store.open_for_write("again", shape).unwrap();
        writer.append(&InputSnapshot::new([-0.5], [])).unwrap();
        writer.finish().unwrap();

        let snapshots = read_all(&store, "again", shape).unwrap();
        assert_eq!(snapshots, vec![InputSnapshot::new([-0.5], [])]);
    }

    #[test]
    fn test_missing_directory_is_path_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsLogStore::new(dir.path().join("does_not_exist"));

        let err = store
            .open_for_write("session", ChannelShape::new(1, 1))
            .err()
            .unwrap();
        assert!(err.is_path_unavailable());

        store.ensure_base_dir().unwrap();
        assert!(store.open_for_write("session", ChannelShape::new(1, 1)).is_ok());
    }

    #[test]
    fn test_missing_log_is_path_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsLogStore::new(dir.path());
        let err = store
            .open_for_read("missing_session", ChannelShape::new(2, 1))
            .err()
            .unwrap();
        assert!(err.is_path_unavailable());
    }

    #[test]
    fn test_list_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsLogStore::new(dir.path());
        let shape = ChannelShape::new(1, 1);

        store.open_for_write("b_util", shape).unwrap().finish().unwrap();
        store.open_for_write("a_drive", shape).unwrap().finish().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();

        assert_eq!(store.list().unwrap(), vec!["a_drive", "b_util"]);
    }

    #[test]
    fn test_list_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsLogStore::new(dir.path().join("nothing"));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_custom_extension() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsLogStore::new(dir.path())
            .with_extension("rec")
            .with_sync_on_close(false);
        assert_eq!(
            store.path_for("drive").unwrap(),
            dir.path().join("drive.rec")
        );
    }

    #[test]
    fn test_from_storage_config() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageConfig {
            base_dir: Some(dir.path().to_path_buf()),
            extension: "log".to_string(),
            sync_on_close: false,
        };
        let store = FsLogStore::from_config(&storage);
        assert_eq!(store.base_dir(), dir.path());
        assert_eq!(
            store.path_for("run_util").unwrap(),
            dir.path().join("run_util.log")
        );
    }
}
