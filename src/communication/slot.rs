//! Single-value signal mailbox shared by exactly two threads.
//!
//! A slot is one-directional: one thread is the designated writer
//! (`set`), the opposite thread is the sole consumer (`wait`/`reset`).
//! That single-writer rule is what keeps the mutex discipline race-free
//! without extra bookkeeping.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// A thread-safe single-value mailbox with blocking wait.
///
/// Holds exactly one pending value at a time; a new `set` overwrites any
/// unconsumed value (last write wins — the writer never queues signals).
pub struct SignalSlot<T> {
    value: Mutex<T>,
    ready: Condvar,
    idle: T,
}

impl<T: Copy + PartialEq> SignalSlot<T> {
    /// Create a slot holding the given idle sentinel.
    pub fn new(idle: T) -> Self {
        Self {
            value: Mutex::new(idle),
            ready: Condvar::new(),
            idle,
        }
    }

    /// Atomically replace the pending value and wake every waiter.
    pub fn set(&self, value: T) {
        {
            let mut slot = self.value.lock();
            *slot = value;
        }
        self.ready.notify_all();
    }

    /// Current value without blocking or clearing.
    pub fn peek(&self) -> T {
        *self.value.lock()
    }

    /// Restore the idle sentinel.
    pub fn reset(&self) {
        *self.value.lock() = self.idle;
    }

    /// Read and reset under one lock; returns the value that was pending.
    pub fn take(&self) -> T {
        let mut slot = self.value.lock();
        std::mem::replace(&mut *slot, self.idle)
    }

    /// Block until a non-idle value is pending, returning it without
    /// clearing. Returns immediately if a value is already pending.
    pub fn wait(&self) -> T {
        let mut slot = self.value.lock();
        while *slot == self.idle {
            self.ready.wait(&mut slot);
        }
        *slot
    }

    /// Like [`wait`](Self::wait), bounded. `None` blocks indefinitely;
    /// `Some(timeout)` returns `None` if the deadline passes with the slot
    /// still idle (the slot itself is left untouched).
    pub fn wait_for(&self, timeout: Option<Duration>) -> Option<T> {
        let Some(timeout) = timeout else {
            return Some(self.wait());
        };
        let deadline = Instant::now() + timeout;
        let mut slot = self.value.lock();
        while *slot == self.idle {
            if self.ready.wait_until(&mut slot, deadline).timed_out() {
                if *slot == self.idle {
                    return None;
                }
                break;
            }
        }
        Some(*slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::NodeSignal;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_starts_idle() {
        let slot = SignalSlot::new(NodeSignal::None);
        assert_eq!(slot.peek(), NodeSignal::None);
    }

    #[test]
    fn test_wait_returns_pending_value_immediately() {
        let slot = SignalSlot::new(NodeSignal::None);
        slot.set(NodeSignal::UpdateY);
        assert_eq!(slot.wait(), NodeSignal::UpdateY);
        // wait does not clear
        assert_eq!(slot.peek(), NodeSignal::UpdateY);
    }

    #[test]
    fn test_last_write_wins() {
        let slot = SignalSlot::new(NodeSignal::None);
        slot.set(NodeSignal::Start);
        slot.set(NodeSignal::UpdateY);
        slot.set(NodeSignal::Quit);
        // Exactly the most recent value is observed; nothing queues.
        assert_eq!(slot.wait(), NodeSignal::Quit);
        slot.reset();
        assert_eq!(slot.peek(), NodeSignal::None);
    }

    #[test]
    fn test_take_reads_and_clears() {
        let slot = SignalSlot::new(NodeSignal::None);
        slot.set(NodeSignal::Terminate);
        assert_eq!(slot.take(), NodeSignal::Terminate);
        assert_eq!(slot.peek(), NodeSignal::None);
        assert_eq!(slot.take(), NodeSignal::None);
    }

    #[test]
    fn test_wait_for_times_out_and_leaves_slot_idle() {
        let slot = SignalSlot::new(NodeSignal::None);
        let got = slot.wait_for(Some(Duration::from_millis(30)));
        assert_eq!(got, None);
        assert_eq!(slot.peek(), NodeSignal::None);
    }

    #[test]
    fn test_wait_for_sees_value_set_before_deadline() {
        let slot = Arc::new(SignalSlot::new(NodeSignal::None));
        let writer = Arc::clone(&slot);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            writer.set(NodeSignal::UpdateX);
        });
        let got = slot.wait_for(Some(Duration::from_secs(5)));
        assert_eq!(got, Some(NodeSignal::UpdateX));
        handle.join().unwrap();
    }

    #[test]
    fn test_cross_thread_wakeup_without_timeout() {
        let slot = Arc::new(SignalSlot::new(NodeSignal::None));
        let writer = Arc::clone(&slot);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            writer.set(NodeSignal::Terminate);
        });
        assert_eq!(slot.wait(), NodeSignal::Terminate);
        handle.join().unwrap();
    }
}
