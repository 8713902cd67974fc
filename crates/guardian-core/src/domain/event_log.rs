//! Bounded, newest-first record of processed events.
//!
//! The log holds at most [`DEFAULT_EVENT_LOG_CAPACITY`] entries.  Appending to
//! a full log evicts exactly one entry, the oldest.  Entries are never changed
//! after insertion.

use std::collections::vec_deque;
use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::Millis;

/// Number of entries the console keeps on screen.
pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 50;

/// Severity of an event log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Info,
    Warning,
    Error,
    Critical,
}

impl EventLevel {
    /// Maps an agent threat level onto a log level.
    ///
    /// `critical` → `Critical`, `high` → `Error`, `medium`/`suspicious` →
    /// `Warning`, anything else → `Info`.  Matching ignores ASCII case.
    pub fn from_threat_level(level: &str) -> Self {
        match level.to_ascii_lowercase().as_str() {
            "critical" => EventLevel::Critical,
            "high" => EventLevel::Error,
            "medium" | "suspicious" => EventLevel::Warning,
            _ => EventLevel::Info,
        }
    }
}

impl fmt::Display for EventLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventLevel::Info => "info",
            EventLevel::Warning => "warning",
            EventLevel::Error => "error",
            EventLevel::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// One line of the event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLogEntry {
    /// The message type tag that produced the entry (or a local source such
    /// as `"CONNECTION"`).
    pub event_type: String,
    pub message: String,
    pub level: EventLevel,
    pub timestamp: Millis,
}

impl EventLogEntry {
    pub fn new(
        event_type: impl Into<String>,
        message: impl Into<String>,
        level: EventLevel,
        timestamp: Millis,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            message: message.into(),
            level,
            timestamp,
        }
    }
}

/// Fixed-capacity FIFO of [`EventLogEntry`] values, newest at the head.
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<EventLogEntry>,
    capacity: usize,
}

impl EventLog {
    /// Creates an empty log with the default capacity of 50.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_LOG_CAPACITY)
    }

    /// Creates an empty log holding at most `capacity` entries (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Inserts `entry` at the head.
    ///
    /// Returns the evicted tail entry when the log was already full.
    pub fn append(&mut self, entry: EventLogEntry) -> Option<EventLogEntry> {
        let evicted = if self.entries.len() == self.capacity {
            self.entries.pop_back()
        } else {
            None
        };
        self.entries.push_front(entry);
        evicted
    }

    /// Iterates from newest to oldest.
    ///
    /// The iterator borrows the log, so it is a consistent snapshot; clone it
    /// to walk the same view again.
    pub fn entries(&self) -> Entries<'_> {
        Entries {
            inner: self.entries.iter(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The most recently appended entry.
    pub fn newest(&self) -> Option<&EventLogEntry> {
        self.entries.front()
    }

    /// The entry next in line for eviction.
    pub fn oldest(&self) -> Option<&EventLogEntry> {
        self.entries.back()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Newest-first iterator returned by [`EventLog::entries`].
#[derive(Debug, Clone)]
pub struct Entries<'a> {
    inner: vec_deque::Iter<'a, EventLogEntry>,
}

impl<'a> Iterator for Entries<'a> {
    type Item = &'a EventLogEntry;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Entries<'_> {}

impl DoubleEndedIterator for Entries<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
