//! Shared document store abstraction
//!
//! Cluster-visible key-value documents with a per-key version index and
//! named advisory locks. The file-backed implementation keeps one JSON
//! envelope per key; the in-memory mock is used by tests.

use crate::error::{ControlError, Result};
use crate::utils::fs_atomic;
use crate::utils::locker::FileLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// A stored document and its version index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvPair {
    pub key: String,
    pub value: String,
    /// Opaque, increases on every write of this key
    pub index: u64,
}

/// Marker for a held store lock; dropping it releases the lock
pub trait LockHandle: Send {}

/// Held lock returned by [`DocumentStore::lock`]
pub type StoreLock = Box<dyn LockHandle>;

/// Abstraction over the shared document store, enabling mocking in tests
pub trait DocumentStore: Send + Sync {
    /// Read a document, `None` if the key has never been written
    fn get(&self, key: &str) -> Result<Option<KvPair>>;

    /// Replace a document, returning it with its new index
    fn put(&self, key: &str, value: &str) -> Result<KvPair>;

    /// Acquire the named lock, waiting at most `timeout`
    fn lock(&self, key: &str, timeout: Duration) -> Result<StoreLock>;
}

impl LockHandle for FileLock {}

/// Upper bound on the internal per-key write lock
const PUT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    index: u64,
    value: String,
}

/// Document store backed by a directory on a shared filesystem
#[derive(Debug, Clone)]
pub struct FileDocumentStore {
    root: PathBuf,
}

impl FileDocumentStore {
    /// Create a store rooted at `root` (created lazily)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_name(key: &str) -> String {
        key.trim_start_matches('/').replace('/', "__")
    }

    fn document_path(&self, key: &str) -> PathBuf {
        self.root.join("kv").join(format!("{}.json", Self::file_name(key)))
    }

    /// Highest index handed out for `key`; outlives a damaged envelope
    fn index_path(&self, key: &str) -> PathBuf {
        self.root.join("kv").join(format!("{}.index", Self::file_name(key)))
    }

    fn read_index_mark(&self, key: &str) -> Result<u64> {
        let path = self.index_path(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(contents.trim().parse().unwrap_or_else(|_| {
                warn!("Ignoring unreadable index mark {:?}", path);
                0
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(ControlError::Unavailable(format!(
                "failed to read {:?}: {}",
                path, e
            ))),
        }
    }

    fn lock_dir(&self) -> PathBuf {
        self.root.join("locks")
    }

    fn read_envelope(&self, key: &str) -> Result<Option<Envelope>> {
        let path = self.document_path(key);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ControlError::Unavailable(format!(
                    "failed to read {:?}: {}",
                    path, e
                )))
            }
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| ControlError::corrupt(key, e))
    }
}

impl DocumentStore for FileDocumentStore {
    fn get(&self, key: &str) -> Result<Option<KvPair>> {
        Ok(self.read_envelope(key)?.map(|envelope| KvPair {
            key: key.to_string(),
            value: envelope.value,
            index: envelope.index,
        }))
    }

    fn put(&self, key: &str, value: &str) -> Result<KvPair> {
        let _guard = FileLock::acquire(&self.lock_dir(), &format!("{}.put", key), PUT_LOCK_TIMEOUT)?;

        let stored = match self.read_envelope(key) {
            Ok(envelope) => envelope.map(|e| e.index).unwrap_or(0),
            Err(ControlError::Corrupt { .. }) => {
                warn!("Overwriting undecodable document '{}'", key);
                0
            }
            Err(e) => return Err(e),
        };
        let previous = stored.max(self.read_index_mark(key)?);

        let envelope = Envelope {
            index: previous + 1,
            value: value.to_string(),
        };
        let bytes = serde_json::to_vec(&envelope)
            .map_err(|e| ControlError::Store(format!("failed to encode '{}': {}", key, e)))?;

        // The mark goes first so it never trails the envelope
        let mark = self.index_path(key);
        fs_atomic::write_atomic(&mark, envelope.index.to_string().as_bytes(), false)
            .map_err(|e| ControlError::Store(format!("failed to write {:?}: {}", mark, e)))?;

        let path = self.document_path(key);
        fs_atomic::write_atomic(&path, &bytes, false)
            .map_err(|e| ControlError::Store(format!("failed to write {:?}: {}", path, e)))?;

        debug!("Stored document '{}' at index {}", key, envelope.index);

        Ok(KvPair {
            key: key.to_string(),
            value: envelope.value,
            index: envelope.index,
        })
    }

    fn lock(&self, key: &str, timeout: Duration) -> Result<StoreLock> {
        let lock = FileLock::acquire(&self.lock_dir(), key, timeout)?;
        Ok(Box::new(lock))
    }
}

/// In-memory document store for testing
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use parking_lot::{Condvar, Mutex};
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;
    use std::time::Instant;

    #[derive(Default)]
    struct LockTable {
        held: Mutex<HashSet<String>>,
        released: Condvar,
    }

    struct MemoryLock {
        key: String,
        table: Arc<LockTable>,
    }

    impl LockHandle for MemoryLock {}

    impl Drop for MemoryLock {
        fn drop(&mut self) {
            self.table.held.lock().remove(&self.key);
            self.table.released.notify_all();
        }
    }

    /// Mock document store that keeps everything in memory
    #[derive(Clone, Default)]
    pub struct MemoryDocumentStore {
        docs: Arc<Mutex<HashMap<String, KvPair>>>,
        locks: Arc<LockTable>,
        /// Whether get should fail with `Unavailable`
        pub should_fail_get: Arc<Mutex<bool>>,
        /// Whether put should fail with `Store`
        pub should_fail_put: Arc<Mutex<bool>>,
        /// Number of successful puts
        pub put_count: Arc<Mutex<usize>>,
    }

    impl MemoryDocumentStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Configure get to fail
        pub fn with_failing_get(self) -> Self {
            *self.should_fail_get.lock() = true;
            self
        }

        /// Configure put to fail
        pub fn with_failing_put(self) -> Self {
            *self.should_fail_put.lock() = true;
            self
        }

        /// Toggle put failures on an existing store
        pub fn set_failing_put(&self, fail: bool) {
            *self.should_fail_put.lock() = fail;
        }

        /// Store a raw value, bypassing failure injection
        pub fn insert_raw(&self, key: &str, value: &str) {
            let mut docs = self.docs.lock();
            let index = docs.get(key).map(|kv| kv.index).unwrap_or(0) + 1;
            docs.insert(
                key.to_string(),
                KvPair {
                    key: key.to_string(),
                    value: value.to_string(),
                    index,
                },
            );
        }

        /// Read a raw value, bypassing failure injection
        pub fn raw(&self, key: &str) -> Option<String> {
            self.docs.lock().get(key).map(|kv| kv.value.clone())
        }

        pub fn puts(&self) -> usize {
            *self.put_count.lock()
        }

        /// Whether the named lock is currently held
        pub fn is_locked(&self, key: &str) -> bool {
            self.locks.held.lock().contains(key)
        }
    }

    impl DocumentStore for MemoryDocumentStore {
        fn get(&self, key: &str) -> Result<Option<KvPair>> {
            if *self.should_fail_get.lock() {
                return Err(ControlError::Unavailable("mock get failure".to_string()));
            }
            Ok(self.docs.lock().get(key).cloned())
        }

        fn put(&self, key: &str, value: &str) -> Result<KvPair> {
            if *self.should_fail_put.lock() {
                return Err(ControlError::Store("mock put failure".to_string()));
            }
            self.insert_raw(key, value);
            *self.put_count.lock() += 1;
            Ok(self.docs.lock()[key].clone())
        }

        fn lock(&self, key: &str, timeout: Duration) -> Result<StoreLock> {
            let deadline = Instant::now() + timeout;
            let mut held = self.locks.held.lock();
            while held.contains(key) {
                if self.locks.released.wait_until(&mut held, deadline).timed_out()
                    && held.contains(key)
                {
                    return Err(ControlError::LockTimeout {
                        key: key.to_string(),
                        waited: timeout,
                    });
                }
            }
            held.insert(key.to_string());
            Ok(Box::new(MemoryLock {
                key: key.to_string(),
                table: Arc::clone(&self.locks),
            }))
        }
    }
}
