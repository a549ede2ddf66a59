//! Bounded ledger of completed rounds.
//!
//! The engine is the only writer. Readers only ever receive owned copies, so a
//! concurrent append can never be observed half-done.

use std::collections::VecDeque;

use liftoff_types::{HistoryEntry, RoundOutcome, Terminal};

/// Aggregate view over the retained window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HistoryStats {
    pub rounds: usize,
    pub crashed: usize,
    pub escaped: usize,
    /// `None` while the ledger is empty.
    pub mean_final_multiplier: Option<f64>,
}

/// Fixed-capacity FIFO of completed rounds, iterated newest first.
#[derive(Clone, Debug)]
pub struct HistoryLedger {
    capacity: usize,
    entries: VecDeque<HistoryEntry>,
    next_id: u64,
}

impl HistoryLedger {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
            next_id: 1,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a finished round, evicting the oldest entry when full.
    ///
    /// Returns a copy of the stored entry.
    pub fn record(
        &mut self,
        round_id: u64,
        occurred_at_ms: u64,
        outcome: &RoundOutcome,
    ) -> HistoryEntry {
        let entry = HistoryEntry {
            id: self.next_id,
            round_id,
            occurred_at_ms,
            final_multiplier: outcome.final_multiplier,
            duration_ms: outcome.duration_ms,
            terminal: outcome.terminal,
        };
        self.next_id = self.next_id.saturating_add(1);

        self.entries.push_front(entry.clone());
        while self.entries.len() > self.capacity {
            self.entries.pop_back();
        }
        entry
    }

    /// Most recently appended entry.
    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    /// Owned copy of the ledger, newest first.
    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn stats(&self) -> HistoryStats {
        let escaped = self
            .entries
            .iter()
            .filter(|entry| entry.terminal == Terminal::Escaped)
            .count();
        let rounds = self.entries.len();
        let mean_final_multiplier = (rounds > 0).then(|| {
            self.entries
                .iter()
                .map(|entry| entry.final_multiplier)
                .sum::<f64>()
                / rounds as f64
        });
        HistoryStats {
            rounds,
            crashed: rounds - escaped,
            escaped,
            mean_final_multiplier,
        }
    }
}
