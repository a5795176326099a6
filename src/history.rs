use serde::Serialize;

use crate::storage::KeyValueStore;

pub const HISTORY_KEY: &str = "queryHistory";
pub const MAX_HISTORY: usize = 5;

/// Most-recent-first list of distinct past queries, capped at `MAX_HISTORY`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QueryHistory {
    entries: Vec<String>,
}

impl QueryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a history from stored entries, dropping later duplicates and
    /// anything past the cap.
    pub fn from_entries(entries: impl IntoIterator<Item = String>) -> Self {
        let mut normalized: Vec<String> = Vec::with_capacity(MAX_HISTORY);
        for entry in entries {
            if normalized.len() == MAX_HISTORY {
                break;
            }
            if !normalized.contains(&entry) {
                normalized.push(entry);
            }
        }
        Self {
            entries: normalized,
        }
    }

    pub fn load(store: &dyn KeyValueStore) -> Self {
        let Some(raw) = store.get(HISTORY_KEY) else {
            return Self::new();
        };

        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(entries) => Self::from_entries(entries),
            Err(err) => {
                tracing::warn!("stored {} is unreadable, starting empty: {}", HISTORY_KEY, err);
                Self::new()
            }
        }
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> anyhow::Result<()> {
        let encoded = serde_json::to_string(&self.entries)?;
        store.set(HISTORY_KEY, &encoded)
    }

    /// Moves `query` to the front, inserting it if new.
    pub fn record(&mut self, query: &str) {
        self.entries.retain(|entry| entry != query);
        self.entries.insert(0, query.to_string());
        self.entries.truncate(MAX_HISTORY);
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// 1-based lookup, matching how entries are listed to the user.
    pub fn get(&self, position: usize) -> Option<&str> {
        position
            .checked_sub(1)
            .and_then(|idx| self.entries.get(idx))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
