//! Pairing jobs and the controller seam
//!
//! The coordinator never executes work itself. It emits [`PairingJob`]s and
//! progress events to a [`BornDieController`], which feeds an external
//! worker pool; workers report completion back to the coordinator.

use borndie_core::{Cell, Column};
use std::fmt;

/// One unit of pairing work.
///
/// Combines the dying modes of `owner` with the surviving modes of
/// `partner`. Modes generated by the job are born at `owner.die + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PairingJob {
    /// Cell whose modes die at this job's iteration
    pub owner: Cell,
    /// Cell whose modes survive beyond `owner.die`
    pub partner: Cell,
}

impl PairingJob {
    /// Create a job
    pub fn new(owner: Cell, partner: Cell) -> Self {
        PairingJob { owner, partner }
    }

    /// Born column of every mode this job generates
    pub fn target_born(&self) -> usize {
        self.owner.die + 1
    }
}

impl fmt::Display for PairingJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x {}", self.owner, self.partner)
    }
}

/// A mode produced by a pairing job, tagged with the row it dies at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedMode {
    /// Iteration at which the new mode becomes infeasible
    pub die_row: usize,
    /// The mode itself
    pub column: Column,
}

impl GeneratedMode {
    /// Create a generated mode
    pub fn new(die_row: usize, column: Column) -> Self {
        GeneratedMode { die_row, column }
    }
}

/// Receives work and progress events from the coordinator.
///
/// Callbacks run on whichever worker thread triggered them and must not
/// block on coordinator progress.
pub trait BornDieController: Send + Sync {
    /// Queue a pairing job for execution.
    fn submit(&self, job: PairingJob);

    /// Born column `column` became active; its pairing jobs may be issued.
    fn born_column_activated(&self, column: usize);

    /// The final row completed. Emitted exactly once.
    fn terminated(&self);
}
