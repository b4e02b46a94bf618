//! Cell addressing in the triangular born/die matrix
//!
//! A [`Cell`] holds all modes born at iteration `born` that die at
//! iteration `die`. Cells exist for `0 <= born <= die <= n`, where `n` is
//! the iteration count, giving `(n+1)(n+2)/2` cells in total.
//!
//! [`TriangularIndex`] maps cells to a dense linear slot and back. Slots are
//! laid out row by row, so the cells of one die row are contiguous:
//!
//! ```text
//! die\born  0  1  2
//!    0      0
//!    1      1  2
//!    2      3  4  5
//! ```

use crate::error::{Error, Result};
use std::fmt;
use std::ops::{Range, RangeInclusive};

/// Coordinates of one cell: born column and die row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    /// Iteration at which the cell's modes were generated
    pub born: usize,
    /// Iteration at which the cell's modes become infeasible
    pub die: usize,
}

impl Cell {
    /// Create a cell without range checks.
    ///
    /// Use [`TriangularIndex::cell`] to validate against a matrix.
    pub const fn new(born: usize, die: usize) -> Self {
        Cell { born, die }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.born, self.die)
    }
}

/// Addressing geometry of an `(n+1) x (n+1)` lower-triangular matrix.
///
/// Pure arithmetic, no state beyond `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriangularIndex {
    iterations: usize,
}

impl TriangularIndex {
    /// Create the geometry for `iterations` steps (rows `0..=iterations`).
    pub const fn new(iterations: usize) -> Self {
        TriangularIndex { iterations }
    }

    /// Iteration count `n`
    #[inline]
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Total number of cells, `(n+1)(n+2)/2`
    #[inline]
    pub fn cell_count(&self) -> usize {
        (self.iterations + 1) * (self.iterations + 2) / 2
    }

    /// Number of rows (and columns), `n+1`
    #[inline]
    pub fn row_count(&self) -> usize {
        self.iterations + 1
    }

    /// The final die row, `n`
    #[inline]
    pub fn final_row(&self) -> usize {
        self.iterations
    }

    /// Check if `row` is the final row.
    #[inline]
    pub fn is_final_row(&self, row: usize) -> bool {
        row == self.iterations
    }

    /// Check if `cell` lies inside the matrix.
    #[inline]
    pub fn contains(&self, cell: Cell) -> bool {
        cell.born <= cell.die && cell.die <= self.iterations
    }

    /// Validated cell constructor
    pub fn cell(&self, born: usize, die: usize) -> Result<Cell> {
        let cell = Cell::new(born, die);
        self.check(cell)?;
        Ok(cell)
    }

    /// Fail with [`Error::OutOfRange`] unless `cell` lies inside the matrix.
    pub fn check(&self, cell: Cell) -> Result<()> {
        if cell.born > cell.die {
            return Err(Error::OutOfRange(format!(
                "born column {} exceeds die row {}",
                cell.born, cell.die
            )));
        }
        if cell.die > self.iterations {
            return Err(Error::OutOfRange(format!(
                "die row {} exceeds final row {}",
                cell.die, self.iterations
            )));
        }
        Ok(())
    }

    fn check_row(&self, row: usize) -> Result<()> {
        if row > self.iterations {
            return Err(Error::OutOfRange(format!(
                "row {} exceeds final row {}",
                row, self.iterations
            )));
        }
        Ok(())
    }

    /// Linear slot of `cell`
    pub fn cell_index(&self, cell: Cell) -> Result<usize> {
        self.check(cell)?;
        Ok(row_start(cell.die) + cell.born)
    }

    /// Inverse of [`cell_index`](Self::cell_index)
    pub fn cell_at(&self, index: usize) -> Result<Cell> {
        if index >= self.cell_count() {
            return Err(Error::OutOfRange(format!(
                "cell index {} outside 0..{}",
                index,
                self.cell_count()
            )));
        }
        // Largest die with row_start(die) <= index; rows are short enough
        // that a linear walk beats float sqrt for correctness.
        let mut die = 0;
        while row_start(die + 1) <= index {
            die += 1;
        }
        Ok(Cell::new(index - row_start(die), die))
    }

    /// Linear slots occupied by the cells of `row`
    pub fn row_range(&self, row: usize) -> Result<Range<usize>> {
        self.check_row(row)?;
        Ok(row_start(row)..row_start(row + 1))
    }

    /// Cells of die row `row`, born `0..=row`
    pub fn row_cells(&self, row: usize) -> Result<impl Iterator<Item = Cell>> {
        self.check_row(row)?;
        Ok((0..=row).map(move |born| Cell::new(born, row)))
    }

    /// Die rows spanned by born column `column`, `column..=n`
    pub fn column_rows(&self, column: usize) -> Result<RangeInclusive<usize>> {
        self.check_row(column)?;
        Ok(column..=self.iterations)
    }

    /// Cells of born column `column`
    pub fn column_cells(&self, column: usize) -> Result<impl Iterator<Item = Cell>> {
        let rows = self.column_rows(column)?;
        Ok(rows.map(move |die| Cell::new(column, die)))
    }

    /// Number of cells in die row `row`
    pub fn row_len(&self, row: usize) -> Result<usize> {
        self.check_row(row)?;
        Ok(row + 1)
    }

    /// Iterate all cells in slot order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> {
        let n = self.iterations;
        (0..=n).flat_map(|die| (0..=die).map(move |born| Cell::new(born, die)))
    }
}

#[inline]
fn row_start(row: usize) -> usize {
    row * (row + 1) / 2
}
