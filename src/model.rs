//! The persisted data model: guilds own tallies, tallies own a history of modification times.
//!
//! The on-disk shape matches the document the bot has always written:
//!
//! ```text
//! { "<guild>": { "<tally>": [count, ["HH:MM:SS YYYY-MM-DD" | "UNKNOWN", ...]] } }
//! ```

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::guild::GuildId;

/// Format of a concrete history timestamp.
pub const TIMESTAMP_FORMAT: &str = "%H:%M:%S %Y-%m-%d";

/// Literal stored for a modification whose time was never observed.
pub const UNKNOWN_ENTRY: &str = "UNKNOWN";

/// A single recorded (or inferred) modification of a tally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEntry {
    /// A modification that happened at a known local time, second precision.
    At(NaiveDateTime),
    /// A modification that was inferred from a count jump rather than observed.
    Unknown,
    /// Stored text that is neither a timestamp nor the unknown sentinel. Kept verbatim.
    Unparsed(String),
}

impl HistoryEntry {
    /// Parse the stored text form of an entry. Never fails.
    pub fn parse(raw: &str) -> Self {
        if raw == UNKNOWN_ENTRY {
            return Self::Unknown;
        }

        NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
            .map(Self::At)
            .unwrap_or_else(|_| Self::Unparsed(raw.to_string()))
    }

    /// The timestamp of this entry, if one was recorded.
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Self::At(at) => Some(*at),
            Self::Unknown | Self::Unparsed(_) => None,
        }
    }
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::At(at) => write!(f, "{}", at.format(TIMESTAMP_FORMAT)),
            Self::Unknown => f.write_str(UNKNOWN_ENTRY),
            Self::Unparsed(raw) => f.write_str(raw),
        }
    }
}

impl Serialize for HistoryEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HistoryEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// A named counter's value and the times it was modified.
///
/// `history.len() == count` holds for tallies built purely from unit increments, but bulk
/// updates are allowed to desynchronize the two.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(i64, Vec<HistoryEntry>)", into = "(i64, Vec<HistoryEntry>)")]
pub struct Tally {
    pub count: i64,
    pub history: Vec<HistoryEntry>,
}

impl Tally {
    pub fn new(count: i64, history: Vec<HistoryEntry>) -> Self {
        Self { count, history }
    }

    /// The most recent history entry.
    pub fn last_entry(&self) -> Option<&HistoryEntry> {
        self.history.last()
    }
}

impl From<(i64, Vec<HistoryEntry>)> for Tally {
    fn from((count, history): (i64, Vec<HistoryEntry>)) -> Self {
        Self { count, history }
    }
}

impl From<Tally> for (i64, Vec<HistoryEntry>) {
    fn from(tally: Tally) -> Self {
        (tally.count, tally.history)
    }
}

/// All tallies owned by one guild, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuildState {
    tallies: BTreeMap<String, Tally>,
}

impl GuildState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Tally> {
        self.tallies.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Tally> {
        self.tallies.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tallies.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, tally: Tally) -> Option<Tally> {
        self.tallies.insert(name.into(), tally)
    }

    pub fn remove(&mut self, name: &str) -> Option<Tally> {
        self.tallies.remove(name)
    }

    pub fn len(&self) -> usize {
        self.tallies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tallies.is_empty()
    }
}

/// The entire persisted state: every guild's tallies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Database {
    guilds: BTreeMap<GuildId, GuildState>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lend the state of `guild_id`, creating an empty one if the guild was never seen.
    pub fn get_or_create(&mut self, guild_id: &GuildId) -> &mut GuildState {
        self.guilds.entry(guild_id.clone()).or_default()
    }

    pub fn guild(&self, guild_id: &GuildId) -> Option<&GuildState> {
        self.guilds.get(guild_id)
    }

    /// Replace the state of `guild_id` wholesale.
    pub fn put(&mut self, guild_id: GuildId, state: GuildState) {
        self.guilds.insert(guild_id, state);
    }

    /// Insert an empty state for `guild_id` unless one exists. Returns whether it was created.
    pub fn register(&mut self, guild_id: &GuildId) -> bool {
        match self.guilds.entry(guild_id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(GuildState::new());
                true
            }
        }
    }

    pub fn guild_count(&self) -> usize {
        self.guilds.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_entry_parsing() {
        assert_eq!(HistoryEntry::parse("UNKNOWN"), HistoryEntry::Unknown);
        assert_eq!(
            HistoryEntry::parse("07:05:09 2024-03-09"),
            HistoryEntry::At(at(7, 5, 9))
        );
        assert_eq!(
            HistoryEntry::parse("yesterday"),
            HistoryEntry::Unparsed("yesterday".to_string())
        );
    }

    #[test]
    fn test_entry_display_uses_stored_format() {
        assert_eq!(HistoryEntry::At(at(23, 0, 1)).to_string(), "23:00:01 2024-03-09");
        assert_eq!(HistoryEntry::Unknown.to_string(), "UNKNOWN");
    }

    #[test]
    fn test_reads_existing_document() {
        let raw = r#"{"99": {"coffee": [3, ["UNKNOWN", "08:00:00 2024-03-09", "junk"]]}}"#;
        let db: Database = serde_json::from_str(raw).unwrap();

        let tally = db.guild(&GuildId::from("99")).unwrap().get("coffee").unwrap();
        assert_eq!(tally.count, 3);
        assert_eq!(
            tally.history,
            vec![
                HistoryEntry::Unknown,
                HistoryEntry::At(at(8, 0, 0)),
                HistoryEntry::Unparsed("junk".to_string()),
            ]
        );
    }

    #[test]
    fn test_writes_tally_as_pair() {
        let mut db = Database::new();
        db.get_or_create(&GuildId::from("1"))
            .insert("tea", Tally::new(1, vec![HistoryEntry::At(at(12, 30, 0))]));

        let json = serde_json::to_string(&db).unwrap();
        assert_eq!(json, r#"{"1":{"tea":[1,["12:30:00 2024-03-09"]]}}"#);
    }

    #[test]
    fn test_get_or_create_is_lazy_and_stable() {
        let mut db = Database::new();
        let guild = GuildId::from("7");
        assert!(db.guild(&guild).is_none());

        db.get_or_create(&guild).insert("x", Tally::default());
        assert_eq!(db.get_or_create(&guild).len(), 1);
        assert_eq!(db.guild_count(), 1);
    }

    #[test]
    fn test_register_keeps_existing_state() {
        let mut db = Database::new();
        let guild = GuildId::from("7");

        assert!(db.register(&guild));
        db.get_or_create(&guild).insert("x", Tally::default());
        assert!(!db.register(&guild));
        assert!(db.guild(&guild).unwrap().contains("x"));
    }
}
