//! Countdown latch

use parking_lot::{Condvar, Mutex};
use std::time::Duration;

/// Blocks waiters until `count` slots have been counted down.
#[derive(Debug)]
pub struct CountDownLatch {
    remaining: Mutex<usize>,
    zero: Condvar,
}

impl CountDownLatch {
    /// Latch with `count` slots
    pub fn new(count: usize) -> Self {
        CountDownLatch {
            remaining: Mutex::new(count),
            zero: Condvar::new(),
        }
    }

    /// Release one slot. Extra calls at zero are ignored.
    pub fn count_down(&self) {
        let mut remaining = self.remaining.lock();
        if *remaining > 0 {
            *remaining -= 1;
            if *remaining == 0 {
                self.zero.notify_all();
            }
        }
    }

    /// Release every remaining slot at once.
    pub fn release_all(&self) {
        let mut remaining = self.remaining.lock();
        *remaining = 0;
        self.zero.notify_all();
    }

    /// Slots still outstanding
    pub fn count(&self) -> usize {
        *self.remaining.lock()
    }

    /// Block until the count reaches zero.
    pub fn wait(&self) {
        let mut remaining = self.remaining.lock();
        while *remaining > 0 {
            self.zero.wait(&mut remaining);
        }
    }

    /// Block until zero or `timeout`; returns whether zero was reached.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let mut remaining = self.remaining.lock();
        if *remaining == 0 {
            return true;
        }
        let _ = self
            .zero
            .wait_while_for(&mut remaining, |remaining| *remaining > 0, timeout);
        *remaining == 0
    }
}
