//! Key import from plain text files
//!
//! One key per line; surrounding whitespace is trimmed and blank lines are
//! dropped.

use std::fs;
use std::path::Path;

use crate::storage::{StorageError, StorageResult};

/// Read key values from a text file
pub fn read_key_values(path: &Path) -> StorageResult<Vec<String>> {
    let content =
        fs::read_to_string(path).map_err(|e| StorageError::from_read(e, path.to_path_buf()))?;
    Ok(parse_key_values(&content))
}

/// Split text into trimmed, non-empty key values
pub fn parse_key_values(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
