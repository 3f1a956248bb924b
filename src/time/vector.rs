//! Vector clock used to timestamp every logged event.
//!
//! Each process owns one clock and ticks its own component on every event.
//! Receiving a message merges the sender's snapshot (component-wise max), so a
//! clock always upper-bounds every event its owner has causal knowledge of.

use crate::types::ProcessId;
use std::collections::BTreeMap;
use std::fmt;

/// Causal relation between two clocks.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PartialOrder {
    LessThan,
    GreaterThan,
    Equal,
    Concurrent,
}

/// Mapping from process id to the number of events observed from it.
/// Backed by a `BTreeMap` so iteration, and therefore the canonical text
/// form, is sorted by process id.
#[derive(Clone, Default, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct VectorClock {
    counters: BTreeMap<ProcessId, u64>,
}

impl VectorClock {
    /// Creates an empty clock (every component implicitly zero).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the clock a process starts with: its own component already at 1,
    /// so the first recorded event is distinguishable from "never initialised".
    pub fn for_process(pid: &ProcessId) -> Self {
        let mut vc = Self::new();
        vc.tick(pid);
        vc
    }

    /// Increments the counter for `pid`, creating it at 1 when absent.
    /// Returns the new value.
    pub fn tick(&mut self, pid: &ProcessId) -> u64 {
        let counter = self.counters.entry(pid.clone()).or_insert(0);
        *counter = counter.saturating_add(1);
        *counter
    }

    /// Causal join: every component becomes the max of both sides.
    /// Components present only in `self` are left as they are.
    pub fn merge(&mut self, other: &VectorClock) {
        for (pid, other_ticks) in &other.counters {
            let local = self.counters.entry(pid.clone()).or_insert(0);
            *local = (*local).max(*other_ticks);
        }
    }

    /// Returns the counter for `pid`, or `None` if this clock has never seen it.
    pub fn find_ticks(&self, pid: &str) -> Option<u64> {
        self.counters.get(pid).copied()
    }

    /// Copy of the underlying counters. Mutating the result does not touch the clock.
    pub fn export_map(&self) -> BTreeMap<ProcessId, u64> {
        self.counters.clone()
    }

    /// Deterministic text form written into log records, e.g. `{"P1":2, "P2":1}`.
    /// Process ids are JSON-escaped and sorted lexicographically.
    pub fn serialize_canonical(&self) -> String {
        let entries: Vec<String> = self
            .counters
            .iter()
            .map(|(pid, ticks)| format!("{}:{}", serde_json::Value::String(pid.0.clone()), ticks))
            .collect();
        format!("{{{}}}", entries.join(", "))
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ProcessId, &u64)> {
        self.counters.iter()
    }

    /// Compares two clocks under the happened-before partial order.
    /// Missing components count as zero.
    pub fn compare(&self, other: &VectorClock) -> PartialOrder {
        let mut self_le_other = true;
        let mut other_le_self = true;

        for pid in self.counters.keys().chain(other.counters.keys()) {
            let a = self.find_ticks(pid.as_str()).unwrap_or(0);
            let b = other.find_ticks(pid.as_str()).unwrap_or(0);

            if a > b { self_le_other = false; }
            if a < b { other_le_self = false; }
        }
        match (self_le_other, other_le_self) {
            (true, true) => PartialOrder::Equal,
            (true, false) => PartialOrder::LessThan,
            (false, true) => PartialOrder::GreaterThan,
            (false, false) => PartialOrder::Concurrent,
        }
    }

    /// True when the event stamped `self` causally precedes the one stamped `other`.
    pub fn happened_before(&self, other: &VectorClock) -> bool {
        self.compare(other) == PartialOrder::LessThan
    }
}

impl fmt::Display for VectorClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize_canonical())
    }
}

impl FromIterator<(ProcessId, u64)> for VectorClock {
    fn from_iter<I: IntoIterator<Item = (ProcessId, u64)>>(iter: I) -> Self {
        VectorClock { counters: iter.into_iter().collect() }
    }
}

impl From<BTreeMap<ProcessId, u64>> for VectorClock {
    fn from(counters: BTreeMap<ProcessId, u64>) -> Self {
        VectorClock { counters }
    }
}
