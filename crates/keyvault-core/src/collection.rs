//! In-memory key collection
//!
//! An ordered, value-deduplicated list of [`KeyRecord`]s. Order is insertion
//! order and survives a serialize/deserialize round-trip. Positions are plain
//! indices into the current order, so they only stay valid while nothing is
//! inserted in front of them (inserts always append).

use tracing::{debug, warn};

use crate::models::{KeyRecord, Tier};

/// Line terminator written by [`KeyCollection::serialize`]
#[cfg(windows)]
pub const LINE_ENDING: &str = "\r\n";
/// Line terminator written by [`KeyCollection::serialize`]
#[cfg(not(windows))]
pub const LINE_ENDING: &str = "\n";

/// Result of adding a record to a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Appended to the end
    Inserted,
    /// A record with the same value already exists; nothing changed
    Duplicate,
    /// The record has an empty value; nothing changed
    Rejected,
}

impl AddOutcome {
    pub fn is_inserted(self) -> bool {
        self == AddOutcome::Inserted
    }
}

/// Counts gathered while deserializing a collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Lines that produced a stored record
    pub loaded: usize,
    /// Lines whose value repeated an earlier line
    pub duplicates: usize,
    /// Lines that produced no usable value
    pub invalid: usize,
}

/// Ordered set of keys, unique by value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyCollection {
    keys: Vec<KeyRecord>,
}

impl KeyCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record unless its value is empty or already present
    ///
    /// The first record with a given value wins; later ones never overwrite it.
    pub fn add(&mut self, record: KeyRecord) -> AddOutcome {
        if record.value.is_empty() {
            return AddOutcome::Rejected;
        }
        if self.position_of(&record.value).is_some() {
            return AddOutcome::Duplicate;
        }
        self.keys.push(record);
        AddOutcome::Inserted
    }

    /// Mark the key at `position` as used by `user`
    ///
    /// Overwrites any previous assignment. Returns `false` when out of range.
    pub fn mark_used(&mut self, position: usize, user: &str) -> bool {
        match self.keys.get_mut(position) {
            Some(key) => {
                key.assign(user);
                true
            }
            None => false,
        }
    }

    /// Mark the key at `position` as unused, clearing its user
    ///
    /// Returns `false` when out of range.
    pub fn mark_unused(&mut self, position: usize) -> bool {
        match self.keys.get_mut(position) {
            Some(key) => {
                key.release();
                true
            }
            None => false,
        }
    }

    /// Key at `position`, if any
    pub fn get(&self, position: usize) -> Option<&KeyRecord> {
        self.keys.get(position)
    }

    /// Position of the key with exactly this value
    pub fn position_of(&self, value: &str) -> Option<usize> {
        self.keys.iter().position(|k| k.value == value)
    }

    /// Position of the key with this value, only if it is used
    pub fn position_of_used(&self, value: &str) -> Option<usize> {
        self.keys.iter().position(|k| k.value == value && k.used)
    }

    /// Keys whose assigned user contains `needle` (case-sensitive)
    pub fn search_by_user(&self, needle: &str) -> Vec<KeyRecord> {
        self.keys
            .iter()
            .filter(|k| k.assigned_user.contains(needle))
            .cloned()
            .collect()
    }

    /// Keys of one tier, paired with their position in the collection
    pub fn by_tier(&self, tier: Tier) -> Vec<(usize, KeyRecord)> {
        self.keys
            .iter()
            .enumerate()
            .filter(|(_, k)| k.tier == tier)
            .map(|(i, k)| (i, k.clone()))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyRecord> {
        self.keys.iter()
    }

    pub fn as_slice(&self) -> &[KeyRecord] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Serialize every key, one line each, in collection order
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for key in &self.keys {
            out.push_str(&key.to_line());
            out.push_str(LINE_ENDING);
        }
        out
    }

    /// Rebuild a collection from stored text
    ///
    /// Blank lines are skipped. Lines that yield no value are logged and
    /// skipped; they never abort the load.
    pub fn deserialize(text: &str) -> Self {
        Self::deserialize_with_summary(text).0
    }

    /// Like [`deserialize`](Self::deserialize), also returning line counts
    pub fn deserialize_with_summary(text: &str) -> (Self, LoadSummary) {
        let mut collection = Self::new();
        let mut summary = LoadSummary::default();

        for (index, line) in text.lines().enumerate() {
            let line_number = index + 1;
            if line.is_empty() {
                continue;
            }

            match collection.add(KeyRecord::parse(line)) {
                AddOutcome::Inserted => summary.loaded += 1,
                AddOutcome::Duplicate => {
                    summary.duplicates += 1;
                    debug!(line = line_number, "Skipping duplicate key");
                }
                AddOutcome::Rejected => {
                    summary.invalid += 1;
                    warn!(line = line_number, "Empty key value, line skipped");
                }
            }
        }

        if summary.invalid > 0 || summary.duplicates > 0 {
            warn!(
                "Loaded {} valid keys. {} invalid and {} duplicate lines were skipped.",
                summary.loaded, summary.invalid, summary.duplicates
            );
        }

        (collection, summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> KeyCollection {
        let mut c = KeyCollection::new();
        c.add(KeyRecord::new("AAA", Tier::Day));
        c.add(KeyRecord::new("BBB", Tier::Week));
        c.add(KeyRecord::new("CCC", Tier::Lifetime));
        c
    }

    #[test]
    fn test_add_preserves_order() {
        let c = sample();
        let values: Vec<_> = c.iter().map(|k| k.value.as_str()).collect();
        assert_eq!(values, ["AAA", "BBB", "CCC"]);
    }

    #[test]
    fn test_add_duplicate_is_noop() {
        let mut c = sample();
        let before = c.clone();

        let outcome = c.add(KeyRecord::new("BBB", Tier::Month));
        assert_eq!(outcome, AddOutcome::Duplicate);
        assert_eq!(c, before);
        assert_eq!(c.get(1).unwrap().tier, Tier::Week);
    }

    #[test]
    fn test_add_empty_value_rejected() {
        let mut c = KeyCollection::new();
        assert_eq!(c.add(KeyRecord::default()), AddOutcome::Rejected);
        assert!(c.is_empty());
    }

    #[test]
    fn test_values_are_case_sensitive() {
        let mut c = KeyCollection::new();
        assert!(c.add(KeyRecord::new("abc", Tier::Day)).is_inserted());
        assert!(c.add(KeyRecord::new("ABC", Tier::Day)).is_inserted());
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn test_mark_used_and_unused() {
        let mut c = sample();

        assert!(c.mark_used(1, "alice"));
        assert!(c.get(1).unwrap().used);
        assert_eq!(c.get(1).unwrap().assigned_user, "alice");

        // Reassigning overwrites without checking prior state
        assert!(c.mark_used(1, "bob"));
        assert_eq!(c.get(1).unwrap().assigned_user, "bob");

        assert!(c.mark_unused(1));
        assert!(!c.get(1).unwrap().used);
        assert!(c.get(1).unwrap().assigned_user.is_empty());
    }

    #[test]
    fn test_mark_out_of_range() {
        let mut c = sample();
        let before = c.clone();
        assert!(!c.mark_used(3, "alice"));
        assert!(!c.mark_unused(99));
        assert_eq!(c, before);
        assert!(c.get(3).is_none());
    }

    #[test]
    fn test_search_by_user_substring() {
        let mut c = sample();
        c.mark_used(0, "alice#0001");
        c.mark_used(2, "malice");
        c.mark_used(1, "Alice");

        let found: Vec<_> = c
            .search_by_user("alice")
            .into_iter()
            .map(|k| k.value)
            .collect();
        assert_eq!(found, ["AAA", "CCC"]);
    }

    #[test]
    fn test_position_of_used() {
        let mut c = sample();
        assert_eq!(c.position_of("BBB"), Some(1));
        assert_eq!(c.position_of_used("BBB"), None);
        c.mark_used(1, "x");
        assert_eq!(c.position_of_used("BBB"), Some(1));
    }

    #[test]
    fn test_by_tier_keeps_positions() {
        let mut c = sample();
        c.add(KeyRecord::new("DDD", Tier::Week));

        let week = c.by_tier(Tier::Week);
        let positions: Vec<_> = week.iter().map(|(i, _)| *i).collect();
        assert_eq!(positions, [1, 3]);
    }

    #[test]
    fn test_round_trip() {
        let mut c = sample();
        c.mark_used(0, "alice");
        c.mark_used(2, "name|with|pipes");

        let restored = KeyCollection::deserialize(&c.serialize());
        assert_eq!(restored, c);
    }

    #[test]
    fn test_serialize_format() {
        let mut c = KeyCollection::new();
        c.add(KeyRecord::new("K1", Tier::Month));
        assert_eq!(c.serialize(), format!("K1|2|0|{}", LINE_ENDING));
    }

    #[test]
    fn test_deserialize_mixed_formats() {
        let text = "NEW1|1|0|\nOLD1,2,1,alice\n\nJUSTAKEY\r\nNEW2|3|1|bob\n";
        let (c, summary) = KeyCollection::deserialize_with_summary(text);

        assert_eq!(summary.loaded, 4);
        assert_eq!(c.len(), 4);
        assert_eq!(c.get(1).unwrap().tier, Tier::Month);
        assert_eq!(c.get(1).unwrap().assigned_user, "alice");
        assert_eq!(c.get(2).unwrap().value, "JUSTAKEY");
        assert_eq!(c.get(3).unwrap().assigned_user, "bob");
    }

    #[test]
    fn test_deserialize_skips_bad_lines() {
        let text = "|1|0|\nGOOD|0|0|\nGOOD|3|1|late\n,2,1,x\n";
        let (c, summary) = KeyCollection::deserialize_with_summary(text);

        assert_eq!(c.len(), 1);
        assert_eq!(c.get(0).unwrap().tier, Tier::Day);
        assert_eq!(
            summary,
            LoadSummary {
                loaded: 1,
                duplicates: 1,
                invalid: 2
            }
        );
    }

    #[test]
    fn test_deserialize_empty() {
        assert!(KeyCollection::deserialize("").is_empty());
        assert!(KeyCollection::deserialize("\n\n").is_empty());
    }
}
