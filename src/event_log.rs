//! Append-only, bounded event log.
//!
//! Every state transition and simulated DB operation is recorded here. The
//! log is a fixed-capacity ring: once full, the oldest entry is evicted for
//! each new append, so a snapshot always holds the most recent entries in
//! append order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Category of a log entry, mirrored from the simulated DB narration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogKind {
    /// General progress notes.
    Info,
    /// A simulated pessimistic-lock acquisition.
    DbLock,
    /// A completed transition.
    Success,
    /// A failed transition (conflict, rollback).
    Error,
    /// Deadlock narrative beats.
    Deadlock,
}

/// One immutable log record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// When the owning operation's atomic phase committed.
    pub timestamp: DateTime<Utc>,
    /// Entry category.
    pub kind: LogKind,
    /// Human-readable description.
    pub message: String,
    /// Illustrative SQL for simulated DB operations.
    pub simulated_query: Option<String>,
}

impl LogEntry {
    /// Creates an entry with no simulated query.
    pub fn new(timestamp: DateTime<Utc>, kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            kind,
            message: message.into(),
            simulated_query: None,
        }
    }

    /// Creates an entry carrying illustrative SQL.
    pub fn with_query(
        timestamp: DateTime<Utc>,
        kind: LogKind,
        message: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            kind,
            message: message.into(),
            simulated_query: Some(query.into()),
        }
    }
}

/// Fixed-capacity FIFO ring of [`LogEntry`] records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl EventLog {
    /// Creates an empty log bounded to `capacity` entries. A zero capacity
    /// is clamped to one so the log always retains the latest entry.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends an entry, evicting the oldest entry when at capacity.
    pub fn append(&mut self, entry: LogEntry) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The configured capacity bound.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterates retained entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// The most recently appended entry.
    #[must_use]
    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    /// Clones the retained entries, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: usize) -> LogEntry {
        LogEntry::new(Utc::now(), LogKind::Info, format!("entry {n}"))
    }

    #[test]
    fn appends_in_order() {
        let mut log = EventLog::new(50);
        log.append(entry(1));
        log.append(entry(2));
        assert_eq!(log.len(), 2);
        let messages: Vec<_> = log.iter().map(|e| e.message.clone()).collect();
        assert_eq!(messages, vec!["entry 1", "entry 2"]);
        assert_eq!(log.latest().map(|e| e.message.as_str()), Some("entry 2"));
    }

    #[test]
    fn evicts_oldest_beyond_capacity() {
        let mut log = EventLog::new(50);
        for n in 0..75 {
            log.append(entry(n));
        }
        assert_eq!(log.len(), 50);
        // Holds exactly the 50 most recent, oldest first.
        let messages: Vec<_> = log.iter().map(|e| e.message.clone()).collect();
        assert_eq!(messages[0], "entry 25");
        assert_eq!(messages[49], "entry 74");
    }

    #[test]
    fn capacity_one_keeps_only_latest() {
        let mut log = EventLog::new(1);
        log.append(entry(1));
        log.append(entry(2));
        assert_eq!(log.len(), 1);
        assert_eq!(log.latest().map(|e| e.message.as_str()), Some("entry 2"));
    }

    #[test]
    fn zero_capacity_clamps_to_one_and_stays_bounded() {
        let mut log = EventLog::new(0);
        assert_eq!(log.capacity(), 1);
        for n in 0..10 {
            log.append(entry(n));
        }
        assert_eq!(log.len(), 1);
        assert_eq!(log.latest().map(|e| e.message.as_str()), Some("entry 9"));
    }

    #[test]
    fn query_text_is_retained() {
        let mut log = EventLog::new(10);
        log.append(LogEntry::with_query(
            Utc::now(),
            LogKind::DbLock,
            "locking",
            "SELECT * FROM seats FOR UPDATE;",
        ));
        assert_eq!(
            log.latest().and_then(|e| e.simulated_query.as_deref()),
            Some("SELECT * FROM seats FOR UPDATE;")
        );
    }
}
