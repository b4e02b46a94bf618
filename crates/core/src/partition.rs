//! Demand-driven partition assignment
//!
//! Combinatorial work is split into `part_count` opaque partitions. Workers
//! pull the next index whenever they are idle, which balances load across
//! workers of different speed without any scheduling state.

use std::sync::atomic::{AtomicI64, Ordering};

/// Sentinel returned once every partition has been handed out
pub const NO_MORE_PARTS: i32 = -1;

/// Atomic fetch-and-increment counter over `0..part_count`.
///
/// Once exhausted every call returns [`NO_MORE_PARTS`]; the counter never
/// wraps and never hands out an index twice.
#[derive(Debug)]
pub struct PartitionCounter {
    next: AtomicI64,
    part_count: i32,
}

impl PartitionCounter {
    /// Counter over `0..part_count`
    pub fn new(part_count: i32) -> Self {
        PartitionCounter {
            next: AtomicI64::new(0),
            part_count: part_count.max(0),
        }
    }

    /// Total number of partitions
    pub fn part_count(&self) -> i32 {
        self.part_count
    }

    /// Next partition index, or [`NO_MORE_PARTS`].
    pub fn next_part(&self) -> i32 {
        // Clamp instead of fetch_add so the counter stays bounded no matter
        // how often exhausted workers poll.
        let taken = self
            .next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                if current < self.part_count as i64 {
                    Some(current + 1)
                } else {
                    None
                }
            });
        match taken {
            Ok(part) => part as i32,
            Err(_) => NO_MORE_PARTS,
        }
    }

    /// Number of partitions handed out so far
    pub fn handed_out(&self) -> i32 {
        self.next.load(Ordering::Acquire) as i32
    }

    /// Check if every partition has been handed out.
    pub fn is_exhausted(&self) -> bool {
        self.handed_out() >= self.part_count
    }
}
