//! Keyvault Core Library
//!
//! This crate provides the core functionality for Keyvault, a small license
//! key manager: a flat-file key store, backup and repair tooling, and a REST
//! API for bots and other services.
//!
//! # Architecture
//!
//! - **KeyCollection**: ordered, value-deduplicated keys in memory
//! - **StorageBackend**: where the serialized collection lives (a file, or
//!   memory in tests)
//! - **KeyStore**: the collection plus its backend behind one lock; every
//!   mutation is persisted before it returns
//!
//! # Quick Start
//!
//! ```text
//! let store = KeyStore::open(&Config::load()?);
//!
//! store.add_record(KeyRecord::new("ABCD-1234", Tier::Week));
//! store.mark_by_value("ABCD-1234", "alice");
//!
//! let stats = store.stats();
//! ```
//!
//! # Modules
//!
//! - `store`: Locked, persisted key store (main entry point)
//! - `models`: Key records, tiers and the line format
//! - `collection`: In-memory key collection
//! - `storage`: Storage backends and errors
//! - `import`: Reading keys from text files
//! - `maintenance`: Backup, restore and repair of the key file
//! - `api`: REST API server
//! - `config`: Application configuration

pub mod api;
pub mod collection;
pub mod config;
pub mod import;
pub mod maintenance;
pub mod models;
pub mod storage;
pub mod store;

pub use api::{ApiConfig, ApiServer};
pub use collection::{AddOutcome, KeyCollection, LoadSummary};
pub use config::Config;
pub use models::{KeyRecord, Tier};
pub use storage::{FileBackend, MemoryBackend, StorageBackend, StorageError, StorageResult};
pub use store::{ImportSummary, KeyStats, KeyStore, TierStats};
