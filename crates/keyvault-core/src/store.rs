//! Key store
//!
//! The `KeyStore` owns the in-memory [`KeyCollection`] and the
//! [`StorageBackend`] it is persisted to:
//! - loads once, when the store is opened
//! - writes the whole collection back after every mutation
//!
//! ## Locking
//!
//! Collection and backend sit behind one mutex owned by the store. Every
//! public method holds it for its whole body, so each call is atomic with
//! respect to every other caller, whether that is an API request or the
//! console. Share the store between threads with `Arc<KeyStore>`.
//!
//! ## Persistence
//!
//! Most mutations persist on a best-effort basis: a failed write is logged
//! and the in-memory change stands. The `try_*` methods undo the change when
//! the write fails and hand the storage error back, so memory and disk agree
//! with what the caller reports.
//!
//! ## Usage
//!
//! ```ignore
//! let store = KeyStore::open(&config);
//! store.add_record(KeyRecord::new("ABC-123", Tier::Month));
//! store.mark_by_value("ABC-123", "alice");
//! let stats = store.stats();
//! ```

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::collection::{AddOutcome, KeyCollection};
use crate::config::Config;
use crate::models::{has_reserved_chars, KeyRecord, Tier};
use crate::storage::{FileBackend, StorageBackend, StorageResult};

/// Used/available counts for one tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierStats {
    pub total: usize,
    pub used: usize,
    pub available: usize,
}

/// Counts per tier, keyed by display name in JSON
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierBreakdown {
    #[serde(rename = "Daily")]
    pub day: TierStats,
    #[serde(rename = "Weekly")]
    pub week: TierStats,
    #[serde(rename = "Monthly")]
    pub month: TierStats,
    #[serde(rename = "Lifetime")]
    pub lifetime: TierStats,
}

impl TierBreakdown {
    pub fn get(&self, tier: Tier) -> &TierStats {
        match tier {
            Tier::Day => &self.day,
            Tier::Week => &self.week,
            Tier::Month => &self.month,
            Tier::Lifetime => &self.lifetime,
        }
    }

    fn get_mut(&mut self, tier: Tier) -> &mut TierStats {
        match tier {
            Tier::Day => &mut self.day,
            Tier::Week => &mut self.week,
            Tier::Month => &mut self.month,
            Tier::Lifetime => &mut self.lifetime,
        }
    }
}

/// Aggregate key counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyStats {
    pub total_keys: usize,
    pub used_keys: usize,
    pub available_keys: usize,
    pub keys_by_type: TierBreakdown,
}

impl KeyStats {
    /// Tally a set of keys
    pub fn from_keys<'a>(keys: impl IntoIterator<Item = &'a KeyRecord>) -> Self {
        let mut stats = Self::default();
        for key in keys {
            let tier = stats.keys_by_type.get_mut(key.tier);
            tier.total += 1;
            stats.total_keys += 1;
            if key.used {
                tier.used += 1;
                stats.used_keys += 1;
            }
        }

        stats.available_keys = stats.total_keys - stats.used_keys;
        for tier in Tier::ALL {
            let t = stats.keys_by_type.get_mut(tier);
            t.available = t.total - t.used;
        }
        stats
    }
}

/// Result of [`KeyStore::import_values`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Keys added to the collection
    pub inserted: usize,
    /// Values skipped because the line format cannot hold them
    pub rejected: usize,
}

/// State guarded by the store's lock
struct StoreState {
    collection: KeyCollection,
    backend: Box<dyn StorageBackend>,
}

impl StoreState {
    fn persist(&mut self) -> StorageResult<()> {
        let data = self.collection.serialize();
        self.backend.save(data.as_bytes())
    }

    /// Persist, putting `before` back if the write fails
    fn persist_or_restore(&mut self, before: KeyCollection) -> StorageResult<()> {
        if let Err(e) = self.persist() {
            warn!("Write failed, reverting to {} keys: {}", before.len(), e);
            self.collection = before;
            return Err(e);
        }
        Ok(())
    }

    /// Persist, logging instead of returning failures
    fn persist_logged(&mut self) {
        match self.persist() {
            Ok(()) => info!("Saved {} keys", self.collection.len()),
            Err(e) => error!("Failed to save keys to {}: {}", self.backend.location(), e),
        }
    }

    fn mark_value(&mut self, value: &str, user: &str) -> bool {
        match self.collection.position_of(value) {
            Some(position) => self.collection.mark_used(position, user),
            None => false,
        }
    }

    fn unmark_value(&mut self, value: &str) -> bool {
        match self.collection.position_of_used(value) {
            Some(position) => self.collection.mark_unused(position),
            None => false,
        }
    }

    fn value_at(&self, position: usize) -> Option<String> {
        self.collection.get(position).map(|k| k.value.clone())
    }
}

/// Persistent, lock-guarded key collection
pub struct KeyStore {
    state: Mutex<StoreState>,
}

impl KeyStore {
    /// Open the key file named by the configuration
    pub fn open(config: &Config) -> Self {
        Self::open_with_backend(Box::new(FileBackend::from_config(config)))
    }

    /// Open a store over any backend
    ///
    /// Never fails: an unreadable or missing blob yields an empty store.
    pub fn open_with_backend(backend: Box<dyn StorageBackend>) -> Self {
        let collection = if backend.exists() {
            let bytes = backend.load();
            let text = String::from_utf8_lossy(&bytes);
            let collection = KeyCollection::deserialize(&text);
            info!(
                "Loaded existing key storage with {} keys from {}",
                collection.len(),
                backend.location()
            );
            collection
        } else {
            info!(
                "No existing key storage found at {}. A new one will be created.",
                backend.location()
            );
            KeyCollection::new()
        };

        Self {
            state: Mutex::new(StoreState {
                collection,
                backend,
            }),
        }
    }

    // ==================== Mutations ====================

    /// Add a key, then persist
    ///
    /// Persists even when nothing was inserted.
    pub fn add_record(&self, record: KeyRecord) -> AddOutcome {
        let mut state = self.state.lock();
        let outcome = state.collection.add(record);
        state.persist_logged();
        outcome
    }

    /// Add a key and report persistence failures
    ///
    /// The key is not kept if it could not be written.
    pub fn try_add_record(&self, record: KeyRecord) -> StorageResult<AddOutcome> {
        let mut state = self.state.lock();
        let before = state.collection.clone();
        let outcome = state.collection.add(record);
        state.persist_or_restore(before)?;
        Ok(outcome)
    }

    /// Mark the first key with `value` as used by `user`
    ///
    /// Returns `false` if no key has that value.
    pub fn mark_by_value(&self, value: &str, user: &str) -> bool {
        let mut state = self.state.lock();
        let marked = state.mark_value(value, user);
        if marked {
            state.persist_logged();
        }
        marked
    }

    /// Mark the used key with `value` as unused
    ///
    /// Returns `false` if no *used* key has that value.
    pub fn unmark_by_value(&self, value: &str) -> bool {
        let mut state = self.state.lock();
        let released = state.unmark_value(value);
        if released {
            state.persist_logged();
        }
        released
    }

    /// Mark the key at `position` as used, whatever its current state
    pub fn mark_at(&self, position: usize, user: &str) -> bool {
        let mut state = self.state.lock();
        let marked = state.collection.mark_used(position, user);
        if marked {
            state.persist_logged();
        }
        marked
    }

    /// Mark the key at `position` as unused, whatever its current state
    pub fn unmark_at(&self, position: usize) -> bool {
        let mut state = self.state.lock();
        let released = state.collection.mark_unused(position);
        if released {
            state.persist_logged();
        }
        released
    }

    /// Resolve `position` to a key and mark it used by value
    ///
    /// `Ok(false)` when the position is out of range. A failed write leaves
    /// the key as it was.
    pub fn try_mark_at(&self, position: usize, user: &str) -> StorageResult<bool> {
        let mut state = self.state.lock();
        let Some(value) = state.value_at(position) else {
            return Ok(false);
        };
        let before = state.collection.clone();
        if !state.mark_value(&value, user) {
            return Ok(false);
        }
        state.persist_or_restore(before)?;
        Ok(true)
    }

    /// Resolve `position` to a key and mark it unused by value
    ///
    /// `Ok(false)` when the position is out of range or the key is not used.
    pub fn try_unmark_at(&self, position: usize) -> StorageResult<bool> {
        let mut state = self.state.lock();
        let Some(value) = state.value_at(position) else {
            return Ok(false);
        };
        let before = state.collection.clone();
        if !state.unmark_value(&value) {
            return Ok(false);
        }
        state.persist_or_restore(before)?;
        Ok(true)
    }

    /// Add bare key values of one tier
    ///
    /// Blank values are ignored and values holding `|` or a line break are
    /// rejected. Persists once if anything was new.
    pub fn import_values<I, S>(&self, values: I, tier: Tier) -> ImportSummary
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.state.lock();
        let mut summary = ImportSummary::default();

        for value in values.into_iter().map(Into::<String>::into) {
            if value.is_empty() {
                continue;
            }
            if has_reserved_chars(&value) {
                summary.rejected += 1;
                continue;
            }
            if state.collection.add(KeyRecord::new(value, tier)).is_inserted() {
                summary.inserted += 1;
            }
        }

        if summary.rejected > 0 {
            warn!(
                "Skipped {} keys containing '|' or line breaks",
                summary.rejected
            );
        }
        if summary.inserted > 0 {
            info!("Imported {} new {} keys", summary.inserted, tier);
            state.persist_logged();
        } else {
            warn!("No new keys imported");
        }
        summary
    }

    /// Persist the current collection
    pub fn save(&self) -> StorageResult<()> {
        self.state.lock().persist()
    }

    // ==================== Queries ====================

    pub fn len(&self) -> usize {
        self.state.lock().collection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().collection.is_empty()
    }

    /// Key at `position`
    pub fn get(&self, position: usize) -> Option<KeyRecord> {
        self.state.lock().collection.get(position).cloned()
    }

    /// Key with exactly this value, with its position
    pub fn find(&self, value: &str) -> Option<(usize, KeyRecord)> {
        let state = self.state.lock();
        let position = state.collection.position_of(value)?;
        state.collection.get(position).map(|k| (position, k.clone()))
    }

    /// Snapshot of all keys in order
    pub fn records(&self) -> Vec<KeyRecord> {
        self.state.lock().collection.as_slice().to_vec()
    }

    /// Keys of one tier with their positions
    pub fn records_by_tier(&self, tier: Tier) -> Vec<(usize, KeyRecord)> {
        self.state.lock().collection.by_tier(tier)
    }

    /// Keys whose assigned user contains `needle`
    pub fn search_by_user(&self, needle: &str) -> Vec<KeyRecord> {
        self.state.lock().collection.search_by_user(needle)
    }

    pub fn stats(&self) -> KeyStats {
        KeyStats::from_keys(self.state.lock().collection.iter())
    }

    /// Where the keys are persisted
    pub fn location(&self) -> String {
        self.state.lock().backend.location()
    }
}
