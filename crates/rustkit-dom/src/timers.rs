//! # Timers
//!
//! Single-threaded `setTimeout`/`clearTimeout` queue driven by a virtual
//! clock. Time only moves when [`TimerQueue::advance`] is called, which makes
//! gesture thresholds deterministic.

use std::cell::{Cell, RefCell};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::trace;

/// Unique identifier for a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

impl TimerId {
    /// Create a new unique TimerId.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for TimerId {
    fn default() -> Self {
        Self::new()
    }
}

/// Timer callback type.
pub type TimerCallback = Box<dyn FnOnce() + 'static>;

struct TimerEntry {
    id: TimerId,
    deadline: Duration,
    seq: u64,
    callback: TimerCallback,
}

/// Pending timeouts ordered by deadline, then by scheduling order.
#[derive(Default)]
pub struct TimerQueue {
    now: Cell<Duration>,
    next_seq: Cell<u64>,
    entries: RefCell<Vec<TimerEntry>>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now.get()
    }

    /// Schedule `callback` to run `delay` after the current virtual time.
    pub fn set_timeout<F>(&self, callback: F, delay: Duration) -> TimerId
    where
        F: FnOnce() + 'static,
    {
        let id = TimerId::new();
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        let deadline = self.now.get() + delay;
        self.entries.borrow_mut().push(TimerEntry {
            id,
            deadline,
            seq,
            callback: Box::new(callback),
        });
        trace!(timer = id.raw(), ?deadline, "timer scheduled");
        id
    }

    /// Cancel a pending timer. Returns false if it already fired or was
    /// cleared.
    pub fn clear_timeout(&self, id: TimerId) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        let cleared = entries.len() != before;
        if cleared {
            trace!(timer = id.raw(), "timer cleared");
        }
        cleared
    }

    /// Number of timers still pending.
    pub fn pending(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Move the clock forward by `by`, firing every timer whose deadline is
    /// reached in order. Timers scheduled by callbacks fire too if they fall
    /// inside the window. Returns the number of timers fired.
    pub fn advance(&self, by: Duration) -> usize {
        let until = self.now.get() + by;
        let mut fired = 0;

        loop {
            let next = {
                let mut entries = self.entries.borrow_mut();
                let due = entries
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| e.deadline <= until)
                    .min_by_key(|(_, e)| (e.deadline, e.seq))
                    .map(|(index, _)| index);
                due.map(|index| entries.remove(index))
            };

            let Some(entry) = next else {
                break;
            };

            if entry.deadline > self.now.get() {
                self.now.set(entry.deadline);
            }
            trace!(timer = entry.id.raw(), "timer fired");
            (entry.callback)();
            fired += 1;
        }

        self.now.set(until);
        fired
    }
}

impl std::fmt::Debug for TimerQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerQueue")
            .field("now", &self.now.get())
            .field("pending", &self.pending())
            .finish()
    }
}
