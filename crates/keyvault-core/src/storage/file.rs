//! Flat-file persistence
//!
//! Keys live in a single UTF-8 text file (`keys.csv` in the data directory
//! by default). Writes are atomic: the data goes to a temp file, is synced,
//! and is then renamed over the target, so the file is never left
//! half-written.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::backend::StorageBackend;
use super::error::{StorageError, StorageResult};
use crate::config::Config;

/// Backend storing the key blob in one file
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backend for the data file named by the configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.data_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for FileBackend {
    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn load(&self) -> Vec<u8> {
        match fs::read(&self.path) {
            Ok(bytes) => {
                if bytes.is_empty() {
                    warn!("Key file is empty: {:?}", self.path);
                }
                bytes
            }
            Err(e) => {
                let err = StorageError::from_read(e, self.path.clone());
                warn!("Unable to read key file: {}", err);
                Vec::new()
            }
        }
    }

    fn save(&mut self, data: &[u8]) -> StorageResult<()> {
        atomic_write(&self.path, data)?;

        // Verify the file is there after the rename
        if !self.path.is_file() {
            return Err(StorageError::VerifyFailed {
                path: self.path.clone(),
            });
        }

        debug!("Wrote {} bytes to {:?}", data.len(), self.path);
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    // Same directory as the target, so the rename stays on one filesystem
    let temp_path = path.with_extension("tmp");

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    file.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    file.sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|source| StorageError::AtomicWriteFailed {
        from: temp_path.clone(),
        to: path.to_path_buf(),
        source,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let mut backend = FileBackend::new(temp_dir.path().join("keys.csv"));

        assert!(!backend.exists());
        assert!(backend.load().is_empty());

        backend.save(b"K1|0|0|\nK2|3|1|bob\n").unwrap();
        assert!(backend.exists());
        assert_eq!(backend.load(), b"K1|0|0|\nK2|3|1|bob\n");
    }

    #[test]
    fn test_save_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let mut backend = FileBackend::new(temp_dir.path().join("keys.csv"));

        backend.save(b"first\n").unwrap();
        backend.save(b"second\n").unwrap();
        assert_eq!(backend.load(), b"second\n");

        // No temp file left behind
        assert!(!temp_dir.path().join("keys.tmp").exists());
    }

    #[test]
    fn test_load_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("keys.csv");
        fs::write(&path, b"").unwrap();

        let backend = FileBackend::new(&path);
        assert!(backend.exists());
        assert!(backend.load().is_empty());
    }

    #[test]
    fn test_directory_is_not_a_blob() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path());

        assert!(!backend.exists());
        assert!(backend.load().is_empty());
    }

    #[test]
    fn test_save_into_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("taken");
        fs::create_dir(&target).unwrap();

        let mut backend = FileBackend::new(&target);
        assert!(backend.save(b"data").is_err());
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let nested_path = temp_dir.path().join("a").join("b").join("keys.csv");

        atomic_write(&nested_path, b"test data").unwrap();

        let content = fs::read_to_string(&nested_path).unwrap();
        assert_eq!(content, "test data");
    }

    #[test]
    fn test_from_config_uses_data_path() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::with_data_dir(temp_dir.path());
        let backend = FileBackend::from_config(&config);
        assert_eq!(backend.path(), config.data_path());
    }
}
