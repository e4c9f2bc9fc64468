//! Storage backend contract
//!
//! The key store persists a single byte blob. Anything that can report
//! whether the blob exists, hand back its bytes, and overwrite it can back a
//! [`KeyStore`](crate::store::KeyStore).

use std::sync::Arc;

use parking_lot::Mutex;

use super::error::{StorageError, StorageResult};

/// Byte-level persistence medium for the key store
pub trait StorageBackend: Send {
    /// Whether a persisted blob is present
    fn exists(&self) -> bool;

    /// Full contents of the blob
    ///
    /// Returns an empty buffer (and logs why) when the blob is missing,
    /// empty or unreadable. Never fails.
    fn load(&self) -> Vec<u8>;

    /// Overwrite the blob with `data`
    fn save(&mut self, data: &[u8]) -> StorageResult<()>;

    /// Human-readable location, used in log messages
    fn location(&self) -> String;
}

#[derive(Debug, Default)]
struct MemoryBlob {
    data: Option<Vec<u8>>,
    fail_writes: bool,
    writes: usize,
}

/// In-memory backend
///
/// Clones share the same blob, so a handle kept outside the store can
/// inspect what was persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    blob: Arc<Mutex<MemoryBlob>>,
}

impl MemoryBackend {
    /// Empty backend with no blob
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-populated with `data`
    pub fn with_contents(data: impl Into<Vec<u8>>) -> Self {
        let backend = Self::new();
        backend.blob.lock().data = Some(data.into());
        backend
    }

    /// Make subsequent saves fail (or succeed again)
    pub fn set_fail_writes(&self, fail: bool) {
        self.blob.lock().fail_writes = fail;
    }

    /// Current contents, if anything was ever stored
    pub fn contents(&self) -> Option<Vec<u8>> {
        self.blob.lock().data.clone()
    }

    /// Current contents as text (lossy), empty if nothing stored
    pub fn contents_string(&self) -> String {
        self.contents()
            .map(|d| String::from_utf8_lossy(&d).into_owned())
            .unwrap_or_default()
    }

    /// Number of successful saves
    pub fn write_count(&self) -> usize {
        self.blob.lock().writes
    }
}

impl StorageBackend for MemoryBackend {
    fn exists(&self) -> bool {
        self.blob.lock().data.is_some()
    }

    fn load(&self) -> Vec<u8> {
        self.blob.lock().data.clone().unwrap_or_default()
    }

    fn save(&mut self, data: &[u8]) -> StorageResult<()> {
        let mut blob = self.blob.lock();
        if blob.fail_writes {
            return Err(StorageError::BackendUnavailable {
                location: "memory".to_string(),
                details: "writes are disabled".to_string(),
            });
        }
        blob.data = Some(data.to_vec());
        blob.writes += 1;
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend_starts_empty() {
        let backend = MemoryBackend::new();
        assert!(!backend.exists());
        assert!(backend.load().is_empty());
        assert_eq!(backend.write_count(), 0);
    }

    #[test]
    fn test_memory_backend_clones_share_blob() {
        let handle = MemoryBackend::new();
        let mut backend = handle.clone();

        backend.save(b"K1|0|0|\n").unwrap();
        assert!(handle.exists());
        assert_eq!(handle.contents_string(), "K1|0|0|\n");
        assert_eq!(handle.write_count(), 1);
    }

    #[test]
    fn test_memory_backend_write_failure() {
        let mut backend = MemoryBackend::with_contents("old");
        backend.set_fail_writes(true);

        assert!(backend.save(b"new").is_err());
        assert_eq!(backend.load(), b"old");

        backend.set_fail_writes(false);
        backend.save(b"new").unwrap();
        assert_eq!(backend.load(), b"new");
    }
}
