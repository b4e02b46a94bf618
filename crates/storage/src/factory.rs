//! Storage handle factories
//!
//! The coordinator creates one appendable handle per cell up front and later
//! converts it, exactly once, into a sortable handle. A [`MemoryFactory`]
//! decides what backs those handles and how a cell's columns are
//! specialised for a particular pairing partner.

use crate::memory::{AppendableMemory, SortableMemory};
use crate::vec_memory::{VecAppendableMemory, VecSortableMemory};
use borndie_core::{Cell, Column, Result};
use std::fmt;
use std::sync::Arc;

/// Creates and converts the storage handles of born/die cells.
pub trait MemoryFactory: Send + Sync + 'static {
    /// Append-only handle type
    type Append: AppendableMemory + 'static;
    /// Sortable, readable handle type
    type Sortable: SortableMemory + 'static;

    /// Create the append-only handle for `cell`.
    fn create_appendable(&self, cell: Cell) -> Result<Self::Append>;

    /// Convert the append-only handle of `cell` into its sortable form.
    ///
    /// Called at most once per cell. The appendable handle is discarded
    /// afterwards.
    fn convert(&self, cell: Cell, memory: &Self::Append) -> Result<Self::Sortable>;

    /// View of `cell` specialised for an owner dying at `partner_die_row`.
    ///
    /// The coordinator caches the result per `(cell, partner_die_row)`.
    fn pos_view(
        &self,
        cell: Cell,
        memory: &Arc<Self::Sortable>,
        partner_die_row: usize,
    ) -> Result<Arc<Self::Sortable>> {
        let _ = (cell, partner_die_row);
        Ok(Arc::clone(memory))
    }
}

/// Predicate deciding which columns of a cell an owner row needs to see
pub type PosFilter = Arc<dyn Fn(Cell, usize, &Column) -> bool + Send + Sync>;

/// Vec-backed factory; converted cells are sorted.
#[derive(Default, Clone)]
pub struct InMemoryFactory {
    pos_filter: Option<PosFilter>,
}

impl InMemoryFactory {
    /// Factory with unfiltered pos views
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory whose pos views keep only columns accepted by `filter`.
    pub fn with_pos_filter(filter: PosFilter) -> Self {
        InMemoryFactory {
            pos_filter: Some(filter),
        }
    }
}

impl fmt::Debug for InMemoryFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryFactory")
            .field("pos_filter", &self.pos_filter.is_some())
            .finish()
    }
}

impl MemoryFactory for InMemoryFactory {
    type Append = VecAppendableMemory;
    type Sortable = VecSortableMemory;

    fn create_appendable(&self, _cell: Cell) -> Result<VecAppendableMemory> {
        Ok(VecAppendableMemory::new())
    }

    fn convert(&self, cell: Cell, memory: &VecAppendableMemory) -> Result<VecSortableMemory> {
        let sortable = VecSortableMemory::new(memory.drain());
        let count = crate::IndexableMemory::column_count(&sortable)?;
        if count > 1 {
            sortable.sort_columns(0, count)?;
        }
        tracing::trace!(%cell, columns = count, "converted cell to sortable");
        Ok(sortable)
    }

    fn pos_view(
        &self,
        cell: Cell,
        memory: &Arc<VecSortableMemory>,
        partner_die_row: usize,
    ) -> Result<Arc<VecSortableMemory>> {
        match &self.pos_filter {
            None => Ok(Arc::clone(memory)),
            Some(filter) => {
                let kept = memory
                    .to_vec()
                    .into_iter()
                    .filter(|column| filter(cell, partner_die_row, column))
                    .collect();
                Ok(Arc::new(VecSortableMemory::new(kept)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{read_all, IndexableMemory};

    #[test]
    fn test_convert_sorts_and_drains() {
        let factory = InMemoryFactory::new();
        let cell = Cell::new(0, 1);
        let append = factory.create_appendable(cell).unwrap();
        append.append_column(Column::new(vec![9])).unwrap();
        append.append_column(Column::new(vec![4])).unwrap();

        let sortable = factory.convert(cell, &append).unwrap();
        assert_eq!(
            read_all(&sortable).unwrap(),
            vec![Column::new(vec![4]), Column::new(vec![9])]
        );
        assert!(AppendableMemory::is_empty(&append).unwrap());
    }

    #[test]
    fn test_unfiltered_pos_view_shares_handle() {
        let factory = InMemoryFactory::new();
        let memory = Arc::new(VecSortableMemory::new(vec![Column::new(vec![1])]));
        let view = factory.pos_view(Cell::new(0, 2), &memory, 1).unwrap();
        assert!(Arc::ptr_eq(&memory, &view));
    }

    #[test]
    fn test_filtered_pos_view() {
        let filter: PosFilter = Arc::new(|_cell: Cell, row: usize, column: &Column| {
            column.as_bytes()[0] as usize > row
        });
        let factory = InMemoryFactory::with_pos_filter(filter);
        let memory = Arc::new(VecSortableMemory::new(vec![
            Column::new(vec![0]),
            Column::new(vec![2]),
            Column::new(vec![5]),
        ]));
        let view = factory.pos_view(Cell::new(0, 3), &memory, 1).unwrap();
        assert_eq!(view.column_count().unwrap(), 2);
    }
}
