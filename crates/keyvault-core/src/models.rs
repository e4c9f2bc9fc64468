//! Data models for keyvault
//!
//! Defines the core data structures: `KeyRecord` and its `Tier`.
//!
//! ## Line format
//!
//! Each record is stored as one line:
//!
//! ```text
//! value|tier|used|assigned_user
//! ```
//!
//! `tier` is the ordinal `0..=3`, `used` is `1` or `0`, and `assigned_user`
//! is the remainder of the line, verbatim. Older files used `,` instead of
//! `|`; those lines are still accepted by [`KeyRecord::parse`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Delimiter written by [`KeyRecord::to_line`]
pub const DELIMITER: char = '|';

/// Delimiter used by the legacy on-disk format
pub const LEGACY_DELIMITER: char = ',';

/// Whether `value` holds a character the line format cannot store
///
/// The delimiter would split the value on reload and a line break would
/// split the record.
pub fn has_reserved_chars(value: &str) -> bool {
    value.contains([DELIMITER, '\r', '\n'])
}

/// Subscription duration class of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Tier {
    #[default]
    Day,
    Week,
    Month,
    Lifetime,
}

impl Tier {
    /// All tiers in ordinal order
    pub const ALL: [Tier; 4] = [Tier::Day, Tier::Week, Tier::Month, Tier::Lifetime];

    /// Look up a tier by its stored ordinal (0-3)
    pub fn from_ordinal(ordinal: i64) -> Option<Self> {
        match ordinal {
            0 => Some(Tier::Day),
            1 => Some(Tier::Week),
            2 => Some(Tier::Month),
            3 => Some(Tier::Lifetime),
            _ => None,
        }
    }

    /// Look up a tier by a 1-based menu choice (1-4)
    ///
    /// Anything outside the range falls back to `Day`.
    pub fn from_choice(choice: i64) -> Self {
        choice
            .checked_sub(1)
            .and_then(Self::from_ordinal)
            .unwrap_or_default()
    }

    /// Stored ordinal (0-3)
    pub fn ordinal(self) -> u8 {
        match self {
            Tier::Day => 0,
            Tier::Week => 1,
            Tier::Month => 2,
            Tier::Lifetime => 3,
        }
    }

    /// Display name used by the console and the API
    pub fn name(self) -> &'static str {
        match self {
            Tier::Day => "Daily",
            Tier::Week => "Weekly",
            Tier::Month => "Monthly",
            Tier::Lifetime => "Lifetime",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single license key
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyRecord {
    /// The key itself; unique within a collection
    pub value: String,
    /// Subscription tier
    pub tier: Tier,
    /// Whether the key has been redeemed
    pub used: bool,
    /// Who redeemed it (meaningful only when `used`)
    pub assigned_user: String,
}

impl KeyRecord {
    /// Create an unused key of the given tier
    pub fn new(value: impl Into<String>, tier: Tier) -> Self {
        Self {
            value: value.into(),
            tier,
            used: false,
            assigned_user: String::new(),
        }
    }

    /// Mark as used by `user`, replacing any previous assignment
    pub fn assign(&mut self, user: impl Into<String>) {
        self.used = true;
        self.assigned_user = user.into();
    }

    /// Mark as unused and clear the assigned user
    pub fn release(&mut self) {
        self.used = false;
        self.assigned_user.clear();
    }

    /// Human-readable status
    pub fn status(&self) -> &'static str {
        if self.used {
            "Used"
        } else {
            "Available"
        }
    }

    /// Serialize to the current line format (without line terminator)
    pub fn to_line(&self) -> String {
        format!(
            "{}{d}{}{d}{}{d}{}",
            self.value,
            self.tier.ordinal(),
            if self.used { "1" } else { "0" },
            self.assigned_user,
            d = DELIMITER
        )
    }

    /// Parse one stored line
    ///
    /// Never fails: the current `|` format is tried first, then the legacy
    /// `,` format, and a line containing neither delimiter becomes a bare
    /// key with default fields. An empty line yields a record with an empty
    /// value, which collections refuse to store.
    pub fn parse(line: &str) -> Self {
        if line.is_empty() {
            return Self::default();
        }

        parse_with_delimiter(line, DELIMITER)
            .or_else(|| parse_with_delimiter(line, LEGACY_DELIMITER))
            .unwrap_or_else(|| Self::new(line, Tier::default()))
    }
}

/// Split `line` into at most four positional fields
///
/// Returns `None` when the delimiter does not occur at all.
fn parse_with_delimiter(line: &str, delimiter: char) -> Option<KeyRecord> {
    if !line.contains(delimiter) {
        return None;
    }

    let mut fields = line.splitn(4, delimiter);
    let mut record = KeyRecord::new(fields.next()?, Tier::default());

    if let Some(tier) = fields.next() {
        if let Some(tier) = parse_tier(tier) {
            record.tier = tier;
        }

        if let Some(used) = fields.next() {
            record.used = used == "1";
            record.assigned_user = fields.next().unwrap_or_default().to_string();
        }
    }

    Some(record)
}

/// Accept only an all-digit field whose value is a valid ordinal
fn parse_tier(field: &str) -> Option<Tier> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse::<i64>().ok().and_then(Tier::from_ordinal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(value: &str, tier: Tier, used: bool, user: &str) -> KeyRecord {
        KeyRecord {
            value: value.to_string(),
            tier,
            used,
            assigned_user: user.to_string(),
        }
    }

    #[test]
    fn test_to_line() {
        let mut key = KeyRecord::new("ABC", Tier::Month);
        assert_eq!(key.to_line(), "ABC|2|0|");

        key.assign("alice");
        assert_eq!(key.to_line(), "ABC|2|1|alice");
    }

    #[test]
    fn test_parse_current_format() {
        assert_eq!(
            KeyRecord::parse("ABC123|3|1|bob"),
            record("ABC123", Tier::Lifetime, true, "bob")
        );
    }

    #[test]
    fn test_parse_legacy_format() {
        assert_eq!(
            KeyRecord::parse("ABC123,2,1,alice"),
            record("ABC123", Tier::Month, true, "alice")
        );
    }

    #[test]
    fn test_parse_bare_key() {
        assert_eq!(
            KeyRecord::parse("JUSTAKEY"),
            record("JUSTAKEY", Tier::Day, false, "")
        );
    }

    #[test]
    fn test_parse_empty_line() {
        assert_eq!(KeyRecord::parse(""), KeyRecord::default());
        assert!(KeyRecord::parse("").value.is_empty());
    }

    #[test]
    fn test_parse_username_keeps_delimiters() {
        let key = KeyRecord::parse("K1|1|1|name|with|pipes");
        assert_eq!(key.assigned_user, "name|with|pipes");
        assert_eq!(key.tier, Tier::Week);

        let legacy = KeyRecord::parse("K1,1,1,last, first");
        assert_eq!(legacy.assigned_user, "last, first");
    }

    #[test]
    fn test_parse_invalid_tier_defaults_to_day() {
        assert_eq!(KeyRecord::parse("K|7|0|").tier, Tier::Day);
        assert_eq!(KeyRecord::parse("K|x|0|").tier, Tier::Day);
        assert_eq!(KeyRecord::parse("K|-1|0|").tier, Tier::Day);
        assert_eq!(KeyRecord::parse("K||0|").tier, Tier::Day);
        assert_eq!(KeyRecord::parse("K|99999999999999999999|0|").tier, Tier::Day);
    }

    #[test]
    fn test_parse_partial_fields() {
        assert_eq!(KeyRecord::parse("K|"), record("K", Tier::Day, false, ""));
        assert_eq!(KeyRecord::parse("K|2"), record("K", Tier::Month, false, ""));
        assert_eq!(KeyRecord::parse("K|2|1"), record("K", Tier::Month, true, ""));
        // Anything but "1" means unused
        assert!(!KeyRecord::parse("K|2|yes|bob").used);
    }

    #[test]
    fn test_pipe_takes_precedence_over_comma() {
        let key = KeyRecord::parse("A,B|1|0|");
        assert_eq!(key.value, "A,B");
        assert_eq!(key.tier, Tier::Week);
    }

    #[test]
    fn test_parse_round_trip() {
        let original = record("XYZ-789", Tier::Lifetime, true, "carol#1234");
        assert_eq!(KeyRecord::parse(&original.to_line()), original);
    }

    #[test]
    fn test_reserved_chars() {
        assert!(has_reserved_chars("A|B"));
        assert!(has_reserved_chars("A\nB"));
        assert!(has_reserved_chars("A\r"));
        assert!(!has_reserved_chars("A,B"));
        assert!(!has_reserved_chars("ABC-123"));
    }

    #[test]
    fn test_tier_ordinals_and_names() {
        for (i, tier) in Tier::ALL.iter().enumerate() {
            assert_eq!(tier.ordinal() as usize, i);
            assert_eq!(Tier::from_ordinal(i as i64), Some(*tier));
        }
        assert_eq!(Tier::from_ordinal(4), None);
        assert_eq!(Tier::Day.name(), "Daily");
        assert_eq!(Tier::Lifetime.to_string(), "Lifetime");
    }

    #[test]
    fn test_tier_from_choice() {
        assert_eq!(Tier::from_choice(1), Tier::Day);
        assert_eq!(Tier::from_choice(4), Tier::Lifetime);
        assert_eq!(Tier::from_choice(0), Tier::Day);
        assert_eq!(Tier::from_choice(9), Tier::Day);
    }

    #[test]
    fn test_assign_and_release() {
        let mut key = KeyRecord::new("K", Tier::Day);
        key.assign("dave");
        assert!(key.used);
        assert_eq!(key.status(), "Used");

        key.release();
        assert!(!key.used);
        assert!(key.assigned_user.is_empty());
        assert_eq!(key.status(), "Available");
    }
}
