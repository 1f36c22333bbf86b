//! Cooperative single-threaded timers.
//!
//! The UI loops are one-shot callbacks that re-arm themselves after each
//! run. A [`TimerQueue`] holds the armed callbacks ordered by deadline and
//! hands them out one at a time, so nothing here ever runs concurrently.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

/// The periodic jobs the dashboard runs on the UI thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    /// Drain the message queue and refresh the status panel.
    Refresh,
    /// Redraw the graphs from the sample history.
    Redraw,
}

/// Identifies one armed timer so it can be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

#[derive(Debug, Default)]
pub struct TimerQueue {
    pending: BTreeMap<(Instant, TimerHandle), Task>,
    deadlines: HashMap<TimerHandle, Instant>,
    next_id: u64,
    closed: bool,
}

impl TimerQueue {
    pub fn new() -> Self {
        TimerQueue::default()
    }

    /// Arm `task` to fire `delay` after `now`.
    pub fn schedule_at(&mut self, now: Instant, delay: Duration, task: Task) -> Result<TimerHandle, Error> {
        if self.closed {
            return Err(Error::SurfaceGone);
        }

        let handle = TimerHandle(self.next_id);
        self.next_id += 1;

        let deadline = now + delay;
        self.pending.insert((deadline, handle), task);
        self.deadlines.insert(handle, deadline);
        Ok(handle)
    }

    pub fn schedule(&mut self, delay: Duration, task: Task) -> Result<TimerHandle, Error> {
        self.schedule_at(Instant::now(), delay, task)
    }

    /// Disarm a timer. Returns `false` if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.deadlines.remove(&handle) {
            Some(deadline) => self.pending.remove(&(deadline, handle)).is_some(),
            None => false,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Take the earliest timer whose deadline is at or before `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<Task> {
        let key = *self.pending.keys().next()?;
        if key.0 > now {
            return None;
        }

        self.deadlines.remove(&key.1);
        self.pending.remove(&key)
    }

    /// Block until the earliest timer is due and take it.
    ///
    /// Returns `None` when nothing is armed.
    pub fn wait_next(&mut self) -> Option<Task> {
        let deadline = self.next_deadline()?;
        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
        self.pop_due(deadline)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop every armed timer and refuse new ones.
    pub fn close(&mut self) {
        self.closed = true;
        self.pending.clear();
        self.deadlines.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("rendering surface is gone")]
    SurfaceGone,
}
