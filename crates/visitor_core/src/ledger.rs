use std::collections::BTreeMap;

/// The latest status recorded for one work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub message: String,
    pub is_final: bool,
    pub is_error: bool,
}

/// Per-item status tracking, keyed by work-item index.
///
/// Once an entry is final, further writes to that key are silently dropped.
/// This is what keeps a late spurious failure (tab teardown racing with a
/// just-recorded success) from clobbering the recorded outcome.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusLedger {
    entries: BTreeMap<usize, StatusEntry>,
}

impl StatusLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a status for `key`. Returns the accepted entry, or `None` when
    /// the write was dropped because the existing entry is final.
    pub fn set(
        &mut self,
        key: usize,
        message: impl Into<String>,
        is_final: bool,
        is_error: bool,
    ) -> Option<StatusEntry> {
        if self.entries.get(&key).is_some_and(|e| e.is_final) {
            return None;
        }
        let entry = StatusEntry {
            message: message.into(),
            is_final,
            is_error,
        };
        self.entries.insert(key, entry.clone());
        Some(entry)
    }

    pub fn get(&self, key: usize) -> Option<&StatusEntry> {
        self.entries.get(&key)
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &StatusEntry)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn final_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_final).count()
    }
}
