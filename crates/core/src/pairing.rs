//! Partner geometry for pairing jobs
//!
//! A cell `(b, d)` holds the modes that die at iteration `d`. They must be
//! combined with every mode still alive strictly beyond `d`, which lives in
//! the cells `born in [0, d]`, `die in (d, n]`. That rectangle is the
//! cell's partner range. The final row has no partners: its content is the
//! result of the enumeration.

use crate::cell::{Cell, TriangularIndex};
use crate::error::{Error, Result};
use std::ops::RangeInclusive;

/// Rectangular, possibly empty, range of cells.
///
/// Ranges are inclusive on both axes; an empty range has `born_to <
/// born_from` or `die_to < die_from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    /// First born column
    pub born_from: usize,
    /// Last born column (inclusive)
    pub born_to: usize,
    /// First die row
    pub die_from: usize,
    /// Last die row (inclusive)
    pub die_to: usize,
}

impl CellRange {
    /// An empty range
    pub const EMPTY: CellRange = CellRange {
        born_from: 1,
        born_to: 0,
        die_from: 1,
        die_to: 0,
    };

    /// Check if the range holds no cells.
    pub fn is_empty(&self) -> bool {
        self.born_to < self.born_from || self.die_to < self.die_from
    }

    /// Number of cells in the range
    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.born_to - self.born_from + 1) * (self.die_to - self.die_from + 1)
        }
    }

    /// Born columns covered
    pub fn born_columns(&self) -> RangeInclusive<usize> {
        self.born_from..=self.born_to
    }

    /// Die rows covered
    pub fn die_rows(&self) -> RangeInclusive<usize> {
        self.die_from..=self.die_to
    }

    /// Check if `cell` lies inside the range.
    pub fn contains(&self, cell: Cell) -> bool {
        self.born_columns().contains(&cell.born) && self.die_rows().contains(&cell.die)
    }

    /// Restrict the born axis to `[from, to]`.
    pub fn restrict_born(&self, from: usize, to: usize) -> CellRange {
        if self.is_empty() || to < from {
            return CellRange::EMPTY;
        }
        let born_from = self.born_from.max(from);
        let born_to = self.born_to.min(to);
        if born_to < born_from {
            return CellRange::EMPTY;
        }
        CellRange {
            born_from,
            born_to,
            ..*self
        }
    }

    /// Iterate the cells, born-major.
    pub fn cells(&self) -> impl Iterator<Item = Cell> {
        let range = *self;
        let dies = if range.is_empty() {
            1..=0
        } else {
            range.die_rows()
        };
        range
            .born_columns()
            .flat_map(move |born| dies.clone().map(move |die| Cell::new(born, die)))
    }
}

/// Computes the partner cells a cell pairs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairingRule {
    index: TriangularIndex,
}

impl PairingRule {
    /// Pairing geometry for the given matrix
    pub fn new(index: TriangularIndex) -> Self {
        PairingRule { index }
    }

    /// Underlying matrix geometry
    pub fn index(&self) -> &TriangularIndex {
        &self.index
    }

    /// Partner range `born in [0, d]`, `die in (d, n]` of `cell`.
    ///
    /// Empty for the final row.
    pub fn partner_cells(&self, cell: Cell) -> Result<CellRange> {
        self.index.check(cell)?;
        if self.index.is_final_row(cell.die) {
            return Ok(CellRange::EMPTY);
        }
        Ok(CellRange {
            born_from: 0,
            born_to: cell.die,
            die_from: cell.die + 1,
            die_to: self.index.final_row(),
        })
    }

    /// Number of pairing jobs `cell` owns.
    pub fn partner_count(&self, cell: Cell) -> Result<usize> {
        Ok(self.partner_cells(cell)?.len())
    }

    /// Partner range of a job owner, restricted to a born sub-range.
    ///
    /// Fails with [`Error::InvalidArgument`] for the final row, which has
    /// nothing left to pair with.
    pub fn owner_partners(&self, owner: Cell, born_from: usize, born_to: usize) -> Result<CellRange> {
        self.index.check(owner)?;
        if self.index.is_final_row(owner.die) {
            return Err(Error::InvalidArgument(format!(
                "cell {} is in the final row and has no pairing partners",
                owner
            )));
        }
        Ok(self.partner_cells(owner)?.restrict_born(born_from, born_to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rule(n: usize) -> PairingRule {
        PairingRule::new(TriangularIndex::new(n))
    }

    #[test]
    fn test_partner_cells_n2() {
        let rule = rule(2);
        let range = rule.partner_cells(Cell::new(0, 0)).unwrap();
        let cells: Vec<_> = range.cells().collect();
        assert_eq!(cells, vec![Cell::new(0, 1), Cell::new(0, 2)]);

        let range = rule.partner_cells(Cell::new(1, 1)).unwrap();
        let cells: Vec<_> = range.cells().collect();
        assert_eq!(cells, vec![Cell::new(0, 2), Cell::new(1, 2)]);
    }

    #[test]
    fn test_final_row_has_no_partners() {
        let rule = rule(3);
        for born in 0..=3 {
            let range = rule.partner_cells(Cell::new(born, 3)).unwrap();
            assert!(range.is_empty());
            assert_eq!(range.cells().count(), 0);
        }
    }

    #[test]
    fn test_owner_partners_final_row_is_argument_error() {
        let rule = rule(3);
        let err = rule.owner_partners(Cell::new(1, 3), 0, 3).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_restrict_born() {
        let rule = rule(4);
        let range = rule.owner_partners(Cell::new(1, 2), 2, 2).unwrap();
        let cells: Vec<_> = range.cells().collect();
        assert_eq!(cells, vec![Cell::new(2, 3), Cell::new(2, 4)]);

        let range = rule.owner_partners(Cell::new(1, 2), 3, 4).unwrap();
        assert!(range.is_empty());
    }

    #[test]
    fn test_empty_range() {
        assert!(CellRange::EMPTY.is_empty());
        assert_eq!(CellRange::EMPTY.len(), 0);
        assert!(!CellRange::EMPTY.contains(Cell::new(0, 0)));
    }

    proptest! {
        #[test]
        fn prop_partner_range_shape(n in 0usize..32, born_seed in any::<usize>(), die_seed in any::<usize>()) {
            let rule = rule(n);
            let die = die_seed % (n + 1);
            let born = born_seed % (die + 1);
            let cell = Cell::new(born, die);
            let range = rule.partner_cells(cell).unwrap();
            if die == n {
                prop_assert!(range.is_empty());
            } else {
                prop_assert_eq!(range.len(), (die + 1) * (n - die));
                for partner in range.cells() {
                    prop_assert!(partner.born <= die);
                    prop_assert!(partner.die > die && partner.die <= n);
                    prop_assert!(rule.index().contains(partner));
                }
            }
        }
    }
}
