//! Append-only record of answered queries
//!
//! Entries are kept in memory for the life of the process and are never
//! mutated or removed. There is no retention limit.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// One answered query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueEntry {
    pub query: String,
    pub context: Vec<String>,
    pub response: String,
    pub recorded_at: DateTime<Utc>,
}

/// Process-wide dialogue log, shared behind an `Arc`
#[derive(Debug, Default)]
pub struct DialogueLog {
    entries: RwLock<Vec<DialogueEntry>>,
}

impl DialogueLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed run
    pub fn append(&self, query: impl Into<String>, context: Vec<String>, response: impl Into<String>) {
        self.entries.write().push(DialogueEntry {
            query: query.into(),
            context,
            response: response.into(),
            recorded_at: Utc::now(),
        });
    }

    /// Snapshot of all entries in call order
    pub fn list(&self) -> Vec<DialogueEntry> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
