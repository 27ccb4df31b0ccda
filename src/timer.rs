//! Owned, cancellable continuations.
//!
//! Every deferred piece of work in the engine is a task value parked in a
//! [`Timers`] queue under a [`TimerId`]. Whoever schedules a task keeps its id and
//! cancels it when superseded; dropping the queue drops every pending task, so
//! nothing can outlive its owner.

use std::{
    collections::{BTreeMap, BTreeSet},
    time::Duration,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

#[derive(Debug)]
struct Slot<T> {
    due_ms: u64,
    period_ms: Option<u64>,
    task: T,
}

#[derive(Debug)]
pub struct Timers<T> {
    now_ms: u64,
    next_id: u64,
    timed: BTreeMap<TimerId, Slot<T>>,
    /// `(due_ms, id)` for every entry of `timed`; ids break ties in registration order.
    due: BTreeSet<(u64, TimerId)>,
    frame: Vec<(TimerId, T)>,
}

impl<T> Default for Timers<T> {
    fn default() -> Self {
        Self {
            now_ms: 0,
            next_id: 1,
            timed: BTreeMap::new(),
            due: BTreeSet::new(),
            frame: Vec::new(),
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl<T: Clone> Timers<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    fn alloc(&mut self) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        id
    }

    fn insert(&mut self, due_ms: u64, period_ms: Option<u64>, task: T) -> TimerId {
        let id = self.alloc();
        self.timed.insert(
            id,
            Slot {
                due_ms,
                period_ms,
                task,
            },
        );
        self.due.insert((due_ms, id));
        id
    }

    /// Runs `task` once, `delay` after the current time.
    pub fn set_timeout(&mut self, delay: Duration, task: T) -> TimerId {
        self.insert(self.now_ms.saturating_add(millis(delay)), None, task)
    }

    /// Runs `task` every `period` until cancelled. Zero periods run every 1 ms.
    pub fn set_interval(&mut self, period: Duration, task: T) -> TimerId {
        let period_ms = millis(period).max(1);
        self.insert(self.now_ms.saturating_add(period_ms), Some(period_ms), task)
    }

    /// Runs `task` on the next [`take_frame`](Self::take_frame).
    pub fn request_frame(&mut self, task: T) -> TimerId {
        let id = self.alloc();
        self.frame.push((id, task));
        id
    }

    /// Returns whether `id` was still pending. Cancelling twice is harmless.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        if let Some(slot) = self.timed.remove(&id) {
            self.due.remove(&(slot.due_ms, id));
            return true;
        }
        let before = self.frame.len();
        self.frame.retain(|(fid, _)| *fid != id);
        before != self.frame.len()
    }

    /// Cancels and clears a stored handle.
    pub fn cancel_slot(&mut self, slot: &mut Option<TimerId>) {
        if let Some(id) = slot.take() {
            self.cancel(id);
        }
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.timed.contains_key(&id) || self.frame.iter().any(|(fid, _)| *fid == id)
    }

    pub fn pending(&self) -> usize {
        self.timed.len() + self.frame.len()
    }

    pub fn pending_intervals(&self) -> usize {
        self.timed.values().filter(|s| s.period_ms.is_some()).count()
    }

    /// Due time of the earliest timed task, if it is at or before `until_ms`.
    pub fn next_due(&self, until_ms: u64) -> Option<u64> {
        self.due
            .first()
            .map(|&(due_ms, _)| due_ms)
            .filter(|&due_ms| due_ms <= until_ms)
    }

    /// Pops the earliest task due at or before `until_ms` and moves the clock to
    /// its due time. When nothing is due the clock moves to `until_ms`.
    ///
    /// Tasks come out one at a time so that a task can cancel later ones before
    /// they fire. An interval fires once for every period that elapsed.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<(TimerId, T)> {
        let Some(&(due_ms, id)) = self.due.first().filter(|(due_ms, _)| *due_ms <= until_ms) else {
            self.now_ms = self.now_ms.max(until_ms);
            return None;
        };
        self.due.remove(&(due_ms, id));
        self.now_ms = self.now_ms.max(due_ms);

        let slot = self.timed.get_mut(&id)?;
        match slot.period_ms {
            Some(period) => {
                slot.due_ms = due_ms.saturating_add(period);
                self.due.insert((slot.due_ms, id));
                Some((id, slot.task.clone()))
            }
            None => self.timed.remove(&id).map(|slot| (id, slot.task)),
        }
    }

    /// Drains callbacks requested before this call. Callbacks requested while
    /// the drained ones run wait for the next frame.
    pub fn take_frame(&mut self) -> Vec<(TimerId, T)> {
        std::mem::take(&mut self.frame)
    }

    pub fn clear(&mut self) {
        self.timed.clear();
        self.due.clear();
        self.frame.clear();
    }
}
