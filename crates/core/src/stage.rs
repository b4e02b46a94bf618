//! Cell lifecycle stages
//!
//! A cell's stage is never stored. It is a pure function of the global
//! `lowest_bearing_row` cursor, the cell coordinates and the cell's
//! remaining job count, so a reader can never observe a half-updated stage:
//!
//! ```text
//! die  < cursor           -> Done
//! born > cursor           -> Accumulating
//! otherwise, jobs > 0     -> Bearing
//! otherwise               -> Collaborating
//! ```
//!
//! The cursor starts at `-1` (nothing active) and only grows, so stages
//! only move forward: `Accumulating -> Bearing -> Collaborating -> Done`,
//! with Bearing skipped for cells that own no jobs.

use crate::cell::Cell;
use std::fmt;

/// Lifecycle stage of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CellStage {
    /// Still receiving appended modes; storage is append-only
    Accumulating,
    /// Column active and the cell still owns outstanding pairing jobs
    Bearing,
    /// Column active, own jobs finished, still read by other owners
    Collaborating,
    /// Row completed; storage released (kept only for the final row)
    Done,
}

impl CellStage {
    /// Compute the stage of `cell` from the cursor and its job counter.
    #[inline]
    pub fn compute(cell: Cell, lowest_bearing_row: i64, jobs_remaining: usize) -> CellStage {
        if (cell.die as i64) < lowest_bearing_row {
            CellStage::Done
        } else if (cell.born as i64) > lowest_bearing_row {
            CellStage::Accumulating
        } else if jobs_remaining > 0 {
            CellStage::Bearing
        } else {
            CellStage::Collaborating
        }
    }

    /// Bearing or Collaborating: storage is sortable and readable.
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self, CellStage::Bearing | CellStage::Collaborating)
    }

    /// Stage name
    pub fn as_str(&self) -> &'static str {
        match self {
            CellStage::Accumulating => "Accumulating",
            CellStage::Bearing => "Bearing",
            CellStage::Collaborating => "Collaborating",
            CellStage::Done => "Done",
        }
    }
}

impl fmt::Display for CellStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
