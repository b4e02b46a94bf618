//! Storage handle contracts
//!
//! A cell's storage goes through two kinds of handle:
//! - [`AppendableMemory`]: write-sequential, single pass, shared by every
//!   worker appending generated modes into the cell
//! - [`SortableMemory`]: random access, read-only for the coordinator's
//!   purposes, created exactly once from the appendable handle
//!
//! Backends are black boxes behind these traits; the coordinator only ever
//! moves handles around.

use borndie_core::{Column, Result};

/// Random-access, read-only view of a column set.
pub trait IndexableMemory: Send + Sync {
    /// Number of columns
    fn column_count(&self) -> Result<usize>;

    /// Column at `index`
    fn get_column(&self, index: usize) -> Result<Column>;

    /// Check if the memory holds no columns.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.column_count()? == 0)
    }
}

/// Random-access storage that supports in-place reordering.
pub trait SortableMemory: IndexableMemory {
    /// Sort columns in `start..end` into ascending order.
    fn sort_columns(&self, start: usize, end: usize) -> Result<()>;

    /// Swap the columns at `a` and `b`.
    fn swap_columns(&self, a: usize, b: usize) -> Result<()>;

    /// Persist any buffered state.
    fn flush(&self) -> Result<()>;
}

/// Write-sequential storage.
///
/// Implementations synchronise internally: many workers append into the
/// same cell concurrently.
pub trait AppendableMemory: Send + Sync {
    /// Append one column.
    fn append_column(&self, column: Column) -> Result<()>;

    /// Append several columns, in order.
    fn append_columns(&self, columns: Vec<Column>) -> Result<()> {
        for column in columns {
            self.append_column(column)?;
        }
        Ok(())
    }

    /// Number of columns appended so far
    fn column_count(&self) -> Result<usize>;

    /// Check if nothing has been appended.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.column_count()? == 0)
    }

    /// Persist any buffered state.
    fn flush(&self) -> Result<()>;
}

/// Read every column of `memory` in index order.
pub fn read_all<M: IndexableMemory + ?Sized>(memory: &M) -> Result<Vec<Column>> {
    let count = memory.column_count()?;
    let mut columns = Vec::with_capacity(count);
    for index in 0..count {
        columns.push(memory.get_column(index)?);
    }
    Ok(columns)
}
