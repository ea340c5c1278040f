//! Bounded crash-point history ring, `MAX_HISTORY` entries deep (default
//! 20), for the public round view's "recent crash points" strip.

use std::collections::VecDeque;

use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub sequence_number: u64,
    pub crash_points: Vec<Decimal>,
}

pub struct History {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self { entries: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn push(&mut self, sequence_number: u64, crash_points: Vec<Decimal>) {
        self.entries.push_back(HistoryEntry { sequence_number, crash_points });
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn recent(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }
}
