//! Local enumeration entry point
//!
//! Wires a [`BornDieCoordinator`], a [`JobQueue`] and a [`LocalDriver`]
//! together: seed the initial column, run until the final row completes,
//! collect the final row.

use borndie_concurrency::{
    AdjacencyKernel, BornDieCoordinator, CoordinatorMetrics, JobQueue, LocalDriver,
};
use borndie_core::{Column, Error, Result};
use borndie_storage::{read_all, AppendableMemory, InMemoryFactory, MemoryFactory};
use std::sync::Arc;
use tracing::info;

/// Default number of worker threads
pub const DEFAULT_THREADS: usize = 4;

/// Outcome of a completed enumeration
#[derive(Debug, Clone)]
pub struct EnumerationResult {
    /// Columns of the final row, in born-column order
    pub columns: Vec<Column>,
    /// Coordinator counters at termination
    pub metrics: CoordinatorMetrics,
}

/// A configured, not yet started enumeration.
///
/// # Example
///
/// ```
/// use borndie::prelude::*;
///
/// struct Nothing;
///
/// impl AdjacencyKernel for Nothing {
///     fn generate(
///         &self,
///         _job: &PairingJob,
///         _neg: &dyn IndexableMemory,
///         _pos: &dyn IndexableMemory,
///     ) -> Result<Vec<GeneratedMode>> {
///         Ok(Vec::new())
///     }
/// }
///
/// let enumeration = Enumeration::builder().iterations(2).threads(2).build()?;
/// enumeration.seed(2, Column::new(vec![1, 2, 3]))?;
/// let result = enumeration.run(Nothing)?;
/// assert_eq!(result.columns, vec![Column::new(vec![1, 2, 3])]);
/// # Ok::<(), borndie::Error>(())
/// ```
pub struct Enumeration<F: MemoryFactory> {
    coordinator: Arc<BornDieCoordinator<F>>,
    queue: Arc<JobQueue>,
    threads: usize,
}

impl Enumeration<InMemoryFactory> {
    /// Builder with in-memory storage
    pub fn builder() -> EnumerationBuilder<InMemoryFactory> {
        EnumerationBuilder::new()
    }
}

impl<F: MemoryFactory> Enumeration<F> {
    /// Add an initial mode that dies at `die_row`.
    pub fn seed(&self, die_row: usize, column: Column) -> Result<()> {
        let cell = self.coordinator.index().cell(0, die_row)?;
        self.coordinator.get_for_appending(cell)?.append_column(column)
    }

    /// Add initial modes as `(die_row, column)` pairs.
    pub fn seed_all(&self, modes: impl IntoIterator<Item = (usize, Column)>) -> Result<()> {
        modes
            .into_iter()
            .try_for_each(|(die_row, column)| self.seed(die_row, column))
    }

    /// Underlying coordinator
    pub fn coordinator(&self) -> &Arc<BornDieCoordinator<F>> {
        &self.coordinator
    }

    /// Run every pairing job with `kernel` and collect the final row.
    pub fn run<K: AdjacencyKernel + 'static>(self, kernel: K) -> Result<EnumerationResult> {
        let driver = LocalDriver::new(
            Arc::clone(&self.coordinator),
            self.queue,
            Arc::new(kernel),
            self.threads,
        );
        driver.run()?;

        let mut columns = Vec::new();
        for born in 0..=self.coordinator.iterations() {
            columns.extend(read_all(&*self.coordinator.get_final(born)?)?);
        }
        let metrics = self.coordinator.metrics();
        info!(columns = columns.len(), ?metrics, "enumeration complete");
        Ok(EnumerationResult { columns, metrics })
    }
}

/// Builder for [`Enumeration`].
#[derive(Debug)]
pub struct EnumerationBuilder<F> {
    iterations: Option<usize>,
    threads: usize,
    factory: F,
}

impl EnumerationBuilder<InMemoryFactory> {
    /// Builder with in-memory storage and default thread count.
    pub fn new() -> Self {
        EnumerationBuilder {
            iterations: None,
            threads: DEFAULT_THREADS,
            factory: InMemoryFactory::new(),
        }
    }
}

impl Default for EnumerationBuilder<InMemoryFactory> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: MemoryFactory> EnumerationBuilder<F> {
    /// Set the iteration count `n` (required).
    pub fn iterations(mut self, iterations: usize) -> Self {
        self.iterations = Some(iterations);
        self
    }

    /// Set the number of worker threads.
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Use a different storage backend.
    pub fn factory<G: MemoryFactory>(self, factory: G) -> EnumerationBuilder<G> {
        EnumerationBuilder {
            iterations: self.iterations,
            threads: self.threads,
            factory,
        }
    }

    /// Create the coordinator and all cells.
    pub fn build(self) -> Result<Enumeration<F>> {
        let iterations = self
            .iterations
            .ok_or_else(|| Error::InvalidArgument("iteration count not set".to_string()))?;
        if self.threads == 0 {
            return Err(Error::InvalidArgument(
                "at least one worker thread is required".to_string(),
            ));
        }
        let queue = Arc::new(JobQueue::new());
        let coordinator = Arc::new(BornDieCoordinator::new(
            iterations,
            self.factory,
            queue.clone(),
        )?);
        Ok(Enumeration {
            coordinator,
            queue,
            threads: self.threads,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use borndie_concurrency::{GeneratedMode, PairingJob};
    use borndie_storage::IndexableMemory;

    struct NoModes;

    impl AdjacencyKernel for NoModes {
        fn generate(
            &self,
            _job: &PairingJob,
            _neg: &dyn IndexableMemory,
            _pos: &dyn IndexableMemory,
        ) -> Result<Vec<GeneratedMode>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_build_requires_iterations() {
        let err = Enumeration::builder().build().err().unwrap();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_build_rejects_zero_threads() {
        let err = Enumeration::builder()
            .iterations(2)
            .threads(0)
            .build()
            .err()
            .unwrap();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_seed_outside_matrix_rejected() {
        let enumeration = Enumeration::builder().iterations(2).build().unwrap();
        assert!(enumeration.seed(3, Column::new(vec![1])).is_err());
    }

    #[test]
    fn test_survivors_reach_final_row() {
        let enumeration = Enumeration::builder().iterations(3).threads(2).build().unwrap();
        enumeration
            .seed_all(vec![
                (0, Column::new(vec![0])),
                (1, Column::new(vec![1])),
                (3, Column::new(vec![3])),
            ])
            .unwrap();
        let result = enumeration.run(NoModes).unwrap();
        assert_eq!(result.columns, vec![Column::new(vec![3])]);
        assert!(result.metrics.terminated);
    }
}
