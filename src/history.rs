use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

pub const MAX_HISTORY: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub text: String,
    pub definition: String,
    /// Unix milliseconds.
    pub timestamp: i64,
    #[serde(default)]
    pub favorite: bool,
}

impl HistoryEntry {
    pub fn new(text: impl Into<String>, definition: impl Into<String>, timestamp: i64) -> Self {
        Self {
            text: text.into(),
            definition: definition.into(),
            timestamp,
            favorite: false,
        }
    }

    /// Local time, `YYYY-MM-DD HH:MM`.
    pub fn formatted_time(&self) -> String {
        match Local.timestamp_millis_opt(self.timestamp).single() {
            Some(time) => time.format("%Y-%m-%d %H:%M").to_string(),
            None => "unknown".to_string(),
        }
    }
}

/// Successful lookups, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn record(&mut self, entry: HistoryEntry) {
        self.entries.insert(0, entry);
        self.entries.truncate(MAX_HISTORY);
    }

    /// Flips the favourite flag of the entry at `index`; returns the new value.
    pub fn toggle_favorite(&mut self, index: usize) -> Option<bool> {
        let entry = self.entries.get_mut(index)?;
        entry.favorite = !entry.favorite;
        Some(entry.favorite)
    }

    pub fn favorites(&self) -> impl Iterator<Item = (usize, &HistoryEntry)> {
        self.entries.iter().enumerate().filter(|(_, entry)| entry.favorite)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
