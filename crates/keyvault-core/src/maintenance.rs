//! Backup, restore and repair of the key file
//!
//! These work on the raw file and never go through a [`KeyStore`]; run them
//! while nothing else has the file open. Restore and repair snapshot the
//! current file next to it before touching it.
//!
//! [`KeyStore`]: crate::store::KeyStore

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::collection::LINE_ENDING;
use crate::models::{DELIMITER, LEGACY_DELIMITER};
use crate::storage::file::atomic_write;
use crate::storage::{StorageError, StorageResult};

/// Outcome of a restore
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    /// Bytes written to the key file
    pub bytes: u64,
    /// Snapshot of the file that was replaced, if there was one
    pub auto_backup: Option<PathBuf>,
}

/// Outcome of a repair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairReport {
    /// Lines kept
    pub valid: usize,
    /// Lines dropped
    pub removed: usize,
    /// Snapshot taken before the rewrite
    pub backup_path: PathBuf,
}

/// Copy the key file to `destination`
///
/// Returns the number of bytes copied.
pub fn backup(data_path: &Path, destination: &Path) -> StorageResult<u64> {
    let bytes = read_existing(data_path)?;
    atomic_write(destination, &bytes)?;
    info!("Backed up {:?} to {:?}", data_path, destination);
    Ok(bytes.len() as u64)
}

/// Replace the key file with the contents of `source`
///
/// The current key file, if any, is first copied to
/// `keys_auto_backup_<unix-seconds>.csv` in the same directory.
pub fn restore(data_path: &Path, source: &Path) -> StorageResult<RestoreReport> {
    let bytes = read_existing(source)?;

    let auto_backup = if data_path.is_file() {
        let snapshot = snapshot_path(data_path, "keys_auto_backup");
        fs::copy(data_path, &snapshot).map_err(|e| StorageError::from_io(e, snapshot.clone()))?;
        info!("Created automatic backup of current key file: {:?}", snapshot);
        Some(snapshot)
    } else {
        None
    };

    atomic_write(data_path, &bytes)?;
    info!("Restored {:?} from {:?}", data_path, source);

    Ok(RestoreReport {
        bytes: bytes.len() as u64,
        auto_backup,
    })
}

/// Drop lines that carry no field delimiter
///
/// Returns `None` when there is no key file. Blank lines are dropped without
/// being counted.
pub fn repair(data_path: &Path) -> StorageResult<Option<RepairReport>> {
    if !data_path.is_file() {
        return Ok(None);
    }

    let backup_path = snapshot_path(data_path, "keys_before_repair");
    fs::copy(data_path, &backup_path).map_err(|e| StorageError::from_io(e, backup_path.clone()))?;
    info!("Created backup before repair: {:?}", backup_path);

    let bytes = read_existing(data_path)?;
    let text = String::from_utf8_lossy(&bytes);

    let mut kept = String::new();
    let mut valid = 0;
    let mut removed = 0;

    for (index, line) in text.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        if line.contains(DELIMITER) || line.contains(LEGACY_DELIMITER) {
            kept.push_str(line);
            kept.push_str(LINE_ENDING);
            valid += 1;
        } else {
            warn!(line = index + 1, "Line has no delimiter and will be removed");
            removed += 1;
        }
    }

    atomic_write(data_path, kept.as_bytes())?;
    info!("Repair complete: {} valid, {} removed", valid, removed);

    Ok(Some(RepairReport {
        valid,
        removed,
        backup_path,
    }))
}

fn read_existing(path: &Path) -> StorageResult<Vec<u8>> {
    if !path.is_file() {
        return Err(StorageError::NotFound {
            path: path.to_path_buf(),
        });
    }
    fs::read(path).map_err(|e| StorageError::from_read(e, path.to_path_buf()))
}

/// `<dir>/<prefix>_<unix-seconds>.csv`, beside the key file
fn snapshot_path(data_path: &Path, prefix: &str) -> PathBuf {
    let timestamp = chrono::Utc::now().timestamp();
    let name = format!("{}_{}.csv", prefix, timestamp);
    match data_path.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}
