//! Pending directories and the outstanding-work count.
//!
//! The queue only knows whether a directory is available right now. Whether
//! more work can still arrive is answered by [`Outstanding`] alone.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

pub(crate) enum Pop<D> {
    Task(D),
    /// The stop signal was raised.
    Stopped,
    /// Nothing arrived before the timeout.
    Idle,
}

pub(crate) struct TaskQueue<D> {
    pending: Mutex<Vec<D>>,
    available: Condvar,
}

impl<D> TaskQueue<D> {
    pub(crate) fn new(root: D) -> Self {
        Self {
            pending: Mutex::new(vec![root]),
            available: Condvar::new(),
        }
    }

    pub(crate) fn push_all(&self, dirs: Vec<D>) {
        let count = dirs.len();
        if count == 0 {
            return;
        }

        self.pending.lock().extend(dirs);
        if count == 1 {
            self.available.notify_one();
        } else {
            self.available.notify_all();
        }
    }

    /// Takes the most recently pushed directory, parking for up to `timeout`
    /// when none is available. `is_stopped` is checked under the queue lock
    /// so a concurrent [`TaskQueue::wake_all`] cannot be missed.
    pub(crate) fn pop(&self, is_stopped: impl Fn() -> bool, timeout: Duration) -> Pop<D> {
        let mut pending = self.pending.lock();
        loop {
            if is_stopped() {
                return Pop::Stopped;
            }
            if let Some(dir) = pending.pop() {
                return Pop::Task(dir);
            }
            if self.available.wait_for(&mut pending, timeout).timed_out() {
                return match pending.pop() {
                    Some(dir) => Pop::Task(dir),
                    None => Pop::Idle,
                };
            }
        }
    }

    /// Wakes every parked worker. Callers raise their stop flag first.
    pub(crate) fn wake_all(&self) {
        let _pending = self.pending.lock();
        self.available.notify_all();
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.lock().len()
    }
}

/// Directories enqueued but not yet fully expanded. Starts at one for the
/// root. Children are added before they are pushed, and a task is retired
/// only after its children were added, so the count cannot touch zero while
/// any directory is still in flight.
pub(crate) struct Outstanding(AtomicU64);

impl Outstanding {
    pub(crate) fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    pub(crate) fn add(&self, count: u64) {
        if count > 0 {
            self.0.fetch_add(count, Ordering::AcqRel);
        }
    }

    /// Retires one task. Returns true for the single call that brings the
    /// count to zero.
    pub(crate) fn complete_one(&self) -> bool {
        let previous = self.0.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "outstanding work count underflow");
        previous == 1
    }

    pub(crate) fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }
}
