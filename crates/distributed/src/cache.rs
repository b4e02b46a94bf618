//! Direct-mapped cache in front of a remote memory
//!
//! Slot of index `i` is `hash(i) % CACHE_SLOTS`. A miss fetches the column
//! and overwrites whatever the slot held. Entries are never invalidated:
//! remote memory does not change during one iteration.

use borndie_core::{Column, Error, Result};
use borndie_storage::{IndexableMemory, SortableMemory};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

/// Number of cache slots
pub const CACHE_SLOTS: usize = 4096;

/// Caching wrapper around an [`IndexableMemory`].
pub struct RemoteMemoryCache<M: IndexableMemory> {
    inner: M,
    slots: Vec<Mutex<Option<(usize, Column)>>>,
    count: OnceCell<usize>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<M: IndexableMemory> RemoteMemoryCache<M> {
    /// Wrap `inner`
    pub fn new(inner: M) -> Self {
        RemoteMemoryCache {
            inner,
            slots: (0..CACHE_SLOTS).map(|_| Mutex::new(None)).collect(),
            count: OnceCell::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Wrapped memory
    pub fn inner(&self) -> &M {
        &self.inner
    }

    /// Lookups answered from the cache
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Lookups that went to the wrapped memory
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    fn slot_of(index: usize) -> usize {
        let mut hasher = FxHasher::default();
        index.hash(&mut hasher);
        (hasher.finish() % CACHE_SLOTS as u64) as usize
    }
}

impl<M: IndexableMemory> IndexableMemory for RemoteMemoryCache<M> {
    fn column_count(&self) -> Result<usize> {
        self.count
            .get_or_try_init(|| self.inner.column_count())
            .copied()
    }

    fn get_column(&self, index: usize) -> Result<Column> {
        let slot = &self.slots[Self::slot_of(index)];
        if let Some((cached, column)) = slot.lock().as_ref() {
            if *cached == index {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(column.clone());
            }
        }
        // Fetch outside the slot lock; a racing fetch of the same index
        // stores an identical column.
        let column = self.inner.get_column(index)?;
        self.misses.fetch_add(1, Ordering::Relaxed);
        *slot.lock() = Some((index, column.clone()));
        Ok(column)
    }
}

impl<M: IndexableMemory> SortableMemory for RemoteMemoryCache<M> {
    fn sort_columns(&self, _start: usize, _end: usize) -> Result<()> {
        Err(Error::Unsupported("sorting a remote memory"))
    }

    fn swap_columns(&self, _a: usize, _b: usize) -> Result<()> {
        Err(Error::Unsupported("swapping columns of a remote memory"))
    }

    fn flush(&self) -> Result<()> {
        Err(Error::Unsupported("flushing a remote memory"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use borndie_storage::VecSortableMemory;
    use std::sync::atomic::AtomicUsize;

    /// Counts reads that reach the backing memory.
    struct CountingMemory {
        inner: VecSortableMemory,
        counts: AtomicUsize,
        gets: AtomicUsize,
    }

    impl CountingMemory {
        fn with_columns(n: usize) -> Self {
            CountingMemory {
                inner: VecSortableMemory::new(
                    (0..n).map(|i| Column::new(i.to_be_bytes().to_vec())).collect(),
                ),
                counts: AtomicUsize::new(0),
                gets: AtomicUsize::new(0),
            }
        }
    }

    impl IndexableMemory for CountingMemory {
        fn column_count(&self) -> Result<usize> {
            self.counts.fetch_add(1, Ordering::SeqCst);
            self.inner.column_count()
        }

        fn get_column(&self, index: usize) -> Result<Column> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.inner.get_column(index)
        }
    }

    #[test]
    fn test_repeated_reads_hit_cache() {
        let cache = RemoteMemoryCache::new(CountingMemory::with_columns(10));
        for _ in 0..3 {
            for i in 0..10 {
                assert_eq!(
                    cache.get_column(i).unwrap(),
                    Column::new(i.to_be_bytes().to_vec())
                );
            }
        }
        assert_eq!(cache.inner().gets.load(Ordering::SeqCst), 10);
        assert_eq!(cache.misses(), 10);
        assert_eq!(cache.hits(), 20);
    }

    #[test]
    fn test_count_fetched_once() {
        let cache = RemoteMemoryCache::new(CountingMemory::with_columns(4));
        assert_eq!(cache.column_count().unwrap(), 4);
        assert_eq!(cache.column_count().unwrap(), 4);
        assert_eq!(cache.inner().counts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_collisions_overwrite_and_stay_correct() {
        let n = CACHE_SLOTS * 2 + 17;
        let cache = RemoteMemoryCache::new(CountingMemory::with_columns(n));
        for _ in 0..2 {
            for i in 0..n {
                assert_eq!(
                    cache.get_column(i).unwrap(),
                    Column::new(i.to_be_bytes().to_vec())
                );
            }
        }
        assert_eq!(cache.hits() + cache.misses(), 2 * n as u64);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache = RemoteMemoryCache::new(CountingMemory::with_columns(1));
        assert!(cache.get_column(5).is_err());
        assert!(cache.get_column(5).is_err());
        assert_eq!(cache.inner().gets.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_mutations_unsupported() {
        let cache = RemoteMemoryCache::new(CountingMemory::with_columns(2));
        assert!(matches!(cache.sort_columns(0, 2), Err(Error::Unsupported(_))));
        assert!(matches!(cache.swap_columns(0, 1), Err(Error::Unsupported(_))));
        assert!(matches!(cache.flush(), Err(Error::Unsupported(_))));
    }
}
