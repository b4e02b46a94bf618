//! In-memory storage handles
//!
//! Vec-backed implementations of the memory contracts. Appends take a
//! short write lock; reads share a read lock.

use crate::memory::{AppendableMemory, IndexableMemory, SortableMemory};
use borndie_core::{Column, Error, Result};
use parking_lot::{Mutex, RwLock};

/// Append-only column buffer
#[derive(Debug, Default)]
pub struct VecAppendableMemory {
    columns: Mutex<Vec<Column>>,
}

impl VecAppendableMemory {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer pre-filled with `columns`
    pub fn with_columns(columns: Vec<Column>) -> Self {
        VecAppendableMemory {
            columns: Mutex::new(columns),
        }
    }

    /// Take every column out, leaving the buffer empty.
    pub fn drain(&self) -> Vec<Column> {
        std::mem::take(&mut *self.columns.lock())
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> Vec<Column> {
        self.columns.lock().clone()
    }
}

impl AppendableMemory for VecAppendableMemory {
    fn append_column(&self, column: Column) -> Result<()> {
        self.columns.lock().push(column);
        Ok(())
    }

    fn append_columns(&self, columns: Vec<Column>) -> Result<()> {
        self.columns.lock().extend(columns);
        Ok(())
    }

    fn column_count(&self) -> Result<usize> {
        Ok(self.columns.lock().len())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Random-access column store
#[derive(Debug, Default)]
pub struct VecSortableMemory {
    columns: RwLock<Vec<Column>>,
}

impl VecSortableMemory {
    /// Wrap `columns`
    pub fn new(columns: Vec<Column>) -> Self {
        VecSortableMemory {
            columns: RwLock::new(columns),
        }
    }

    /// Copy of the current contents
    pub fn to_vec(&self) -> Vec<Column> {
        self.columns.read().clone()
    }

    fn check_bounds(&self, len: usize, index: usize) -> Result<()> {
        if index >= len {
            return Err(Error::OutOfRange(format!(
                "column index {} outside 0..{}",
                index, len
            )));
        }
        Ok(())
    }
}

impl IndexableMemory for VecSortableMemory {
    fn column_count(&self) -> Result<usize> {
        Ok(self.columns.read().len())
    }

    fn get_column(&self, index: usize) -> Result<Column> {
        let columns = self.columns.read();
        self.check_bounds(columns.len(), index)?;
        Ok(columns[index].clone())
    }
}

impl SortableMemory for VecSortableMemory {
    fn sort_columns(&self, start: usize, end: usize) -> Result<()> {
        let mut columns = self.columns.write();
        if start > end || end > columns.len() {
            return Err(Error::OutOfRange(format!(
                "sort range {}..{} outside 0..{}",
                start,
                end,
                columns.len()
            )));
        }
        columns[start..end].sort_unstable();
        Ok(())
    }

    fn swap_columns(&self, a: usize, b: usize) -> Result<()> {
        let mut columns = self.columns.write();
        self.check_bounds(columns.len(), a)?;
        self.check_bounds(columns.len(), b)?;
        columns.swap(a, b);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}
