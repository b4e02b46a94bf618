//! Blocking work queue implementing [`BornDieController`]
//!
//! Workers block in [`JobQueue::pop`] until work arrives or the run ends.
//! The queue is the only blocking point on the worker side.

use crate::job::{BornDieController, PairingJob};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

/// Item handed to a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Work {
    /// Issue the pairing jobs unlocked by an activated born column
    Activate(usize),
    /// Execute one pairing job
    Pair(PairingJob),
}

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<Work>,
    terminated: bool,
    aborted: Option<String>,
}

/// FIFO of [`Work`] shared by a worker pool.
#[derive(Debug, Default)]
pub struct JobQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
}

impl JobQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, work: Work) {
        let mut state = self.state.lock();
        state.items.push_back(work);
        drop(state);
        self.ready.notify_one();
    }

    /// Next work item, blocking while the queue is empty.
    ///
    /// Returns `None` once the run terminated and the queue drained, or
    /// immediately after [`abort`](Self::abort).
    pub fn pop(&self) -> Option<Work> {
        let mut state = self.state.lock();
        loop {
            if state.aborted.is_some() {
                return None;
            }
            if let Some(work) = state.items.pop_front() {
                return Some(work);
            }
            if state.terminated {
                return None;
            }
            self.ready.wait(&mut state);
        }
    }

    /// Stop every worker; pending items are dropped.
    pub fn abort(&self, reason: impl Into<String>) {
        let mut state = self.state.lock();
        if state.aborted.is_none() {
            state.aborted = Some(reason.into());
        }
        state.items.clear();
        drop(state);
        self.ready.notify_all();
    }

    /// Reason passed to the first [`abort`](Self::abort), if any
    pub fn abort_reason(&self) -> Option<String> {
        self.state.lock().aborted.clone()
    }

    /// Check if the termination signal arrived.
    pub fn is_terminated(&self) -> bool {
        self.state.lock().terminated
    }

    /// Number of queued items
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Check if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BornDieController for JobQueue {
    fn submit(&self, job: PairingJob) {
        self.push(Work::Pair(job));
    }

    fn born_column_activated(&self, column: usize) {
        self.push(Work::Activate(column));
    }

    fn terminated(&self) {
        let mut state = self.state.lock();
        state.terminated = true;
        drop(state);
        self.ready.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use borndie_core::Cell;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_fifo_order() {
        let queue = JobQueue::new();
        let job = PairingJob::new(Cell::new(0, 0), Cell::new(0, 1));
        queue.born_column_activated(0);
        queue.submit(job);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop(), Some(Work::Activate(0)));
        assert_eq!(queue.pop(), Some(Work::Pair(job)));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_terminated_drains_then_stops() {
        let queue = JobQueue::new();
        queue.born_column_activated(1);
        queue.terminated();
        assert!(queue.is_terminated());
        assert_eq!(queue.pop(), Some(Work::Activate(1)));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_pop_blocks_until_push() {
        let queue = Arc::new(JobQueue::new());
        let waiter = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        };
        thread::sleep(Duration::from_millis(20));
        queue.born_column_activated(3);
        assert_eq!(waiter.join().unwrap(), Some(Work::Activate(3)));
    }

    #[test]
    fn test_abort_wakes_all_workers() {
        let queue = Arc::new(JobQueue::new());
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || queue.pop())
            })
            .collect();
        thread::sleep(Duration::from_millis(20));
        queue.abort("kernel failed");
        queue.abort("second reason ignored");
        for w in waiters {
            assert_eq!(w.join().unwrap(), None);
        }
        assert_eq!(queue.abort_reason().as_deref(), Some("kernel failed"));
    }
}
