//! Storage layer
//!
//! Handles persistence of the key collection.
//!
//! ## Architecture
//!
//! - **`StorageBackend`**: the contract the store relies on (exists / load / save)
//! - **`FileBackend`**: the production backend, one text file written atomically
//! - **`MemoryBackend`**: shared in-memory blob for tests and embedding

pub mod backend;
pub mod error;
pub mod file;

pub use backend::{MemoryBackend, StorageBackend};
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
