//! Append-only message history for a run.

use crate::types::{HistoryEntry, Role};

/// Ordered conversation turns read and extended by the step unit.
///
/// Entries are only ever appended during a run; [`clear`](Self::clear) is reserved for
/// [`ExecutionEngine::reset`](super::ExecutionEngine::reset).
#[derive(Debug, Clone, Default)]
pub struct MessageHistory {
    entries: Vec<HistoryEntry>,
}

impl MessageHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user entry.
    pub fn add_user(&mut self, text: impl Into<String>) {
        self.entries.push(HistoryEntry::user(text));
    }

    /// Add an assistant entry.
    pub fn add_assistant(&mut self, text: impl Into<String>) {
        self.entries.push(HistoryEntry::assistant(text));
    }

    /// Add a tool output entry.
    pub fn add_tool(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.entries.push(HistoryEntry::tool(name, text));
    }

    /// Add a raw entry.
    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    /// Get all entries.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Get the last N entries.
    pub fn last_n(&self, n: usize) -> &[HistoryEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    /// Most recent entry with the given role.
    pub fn last_with_role(&self, role: Role) -> Option<&HistoryEntry> {
        self.entries.iter().rev().find(|entry| entry.role == role)
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
