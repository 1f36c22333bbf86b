//! Bounded history of sensor samples for plotting.

use std::collections::{BTreeMap, VecDeque};

use crate::message::Metric;

/// Number of samples kept per series.
pub const HISTORY_CAPACITY: usize = 60;

/// A fixed-capacity FIFO: pushing onto a full buffer evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct Bounded<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> Bounded<T> {
    pub fn new(capacity: usize) -> Self {
        Bounded {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, item: T) {
        if self.capacity == 0 {
            return;
        }
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn last(&self) -> Option<&T> {
        self.items.back()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

/// Per-metric sample buffers plus the shared time-axis buffer.
///
/// Metric names are not validated; a series is created the first time a
/// name is appended to. The three sensor metrics exist from the start so
/// that snapshots always contain them.
#[derive(Debug, Clone)]
pub struct RollingSampleStore {
    series: BTreeMap<String, Bounded<f64>>,
    timestamps: Bounded<String>,
    capacity: usize,
}

impl Default for RollingSampleStore {
    fn default() -> Self {
        RollingSampleStore::new(HISTORY_CAPACITY)
    }
}

impl RollingSampleStore {
    pub fn new(capacity: usize) -> Self {
        let series = Metric::ALL
            .iter()
            .map(|m| (m.as_str().to_string(), Bounded::new(capacity)))
            .collect();

        RollingSampleStore {
            series,
            timestamps: Bounded::new(capacity),
            capacity,
        }
    }

    pub fn append(&mut self, metric: &str, value: f64) {
        let capacity = self.capacity;
        self.series
            .entry(metric.to_string())
            .or_insert_with(|| Bounded::new(capacity))
            .push(value);
    }

    pub fn push_timestamp<T: Into<String>>(&mut self, stamp: T) {
        self.timestamps.push(stamp.into());
    }

    pub fn len(&self, metric: &str) -> usize {
        self.series.get(metric).map_or(0, Bounded::len)
    }

    pub fn latest(&self, metric: &str) -> Option<f64> {
        self.series.get(metric).and_then(|s| s.last().copied())
    }

    /// Copy out every buffer. Later appends do not affect the snapshot.
    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            series: self
                .series
                .iter()
                .map(|(name, buf)| (name.clone(), buf.to_vec()))
                .collect(),
            timestamps: self.timestamps.to_vec(),
        }
    }
}

/// An owned copy of the store at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistorySnapshot {
    pub series: BTreeMap<String, Vec<f64>>,
    pub timestamps: Vec<String>,
}

impl HistorySnapshot {
    pub fn get(&self, metric: &str) -> &[f64] {
        self.series.get(metric).map_or(&[], Vec::as_slice)
    }
}
