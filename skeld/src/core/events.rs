//! Append-only narrative log of notable occurrences.
//!
//! The log is the product narrative read by oracles (as recent history) and by
//! spectators. Diagnostics belong in `tracing`, not here.

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EventLog {
    entries: Vec<String>,
}

impl EventLog {
    /// Append a line prefixed with the round number and return it.
    pub fn record(&mut self, round: u32, text: impl AsRef<str>) -> String {
        let line = format!("Round {round}: {}", text.as_ref());
        self.entries.push(line.clone());
        line
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// The most recent `n` entries, oldest first.
    pub fn tail(&self, n: usize) -> &[String] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    /// Entries appended after the first `start` entries.
    pub fn since(&self, start: usize) -> &[String] {
        &self.entries[start.min(self.entries.len())..]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
