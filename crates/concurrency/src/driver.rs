//! Single-process execution of a born/die enumeration
//!
//! [`LocalDriver`] runs a pool of worker threads over a [`JobQueue`]:
//! - `Work::Activate(c)` issues the jobs unlocked by born column `c`
//! - `Work::Pair(job)` runs the adjacency kernel on the job's two cells,
//!   appends the generated modes and reports completion
//!
//! The first failure aborts the queue and is returned from
//! [`LocalDriver::run`]; nothing is retried.

use crate::coordinator::BornDieCoordinator;
use crate::job::{GeneratedMode, PairingJob};
use crate::queue::{JobQueue, Work};
use borndie_core::{Cell, Error, Result};
use borndie_storage::{AppendableMemory, IndexableMemory, MemoryFactory};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info};

/// The external adjacency test.
///
/// Given the dying modes of a job's owner and the surviving modes of its
/// partner, produce the new modes and the row each of them dies at.
pub trait AdjacencyKernel: Send + Sync {
    /// Pair `neg` (owner) with `pos` (partner).
    fn generate(
        &self,
        job: &PairingJob,
        neg: &dyn IndexableMemory,
        pos: &dyn IndexableMemory,
    ) -> Result<Vec<GeneratedMode>>;
}

/// Worker pool driving one enumeration to termination.
pub struct LocalDriver<F: MemoryFactory, K: AdjacencyKernel> {
    coordinator: Arc<BornDieCoordinator<F>>,
    queue: Arc<JobQueue>,
    kernel: Arc<K>,
    threads: usize,
}

impl<F: MemoryFactory, K: AdjacencyKernel + 'static> LocalDriver<F, K> {
    /// Create a driver.
    ///
    /// `queue` must be the controller the coordinator was created with.
    pub fn new(
        coordinator: Arc<BornDieCoordinator<F>>,
        queue: Arc<JobQueue>,
        kernel: Arc<K>,
        threads: usize,
    ) -> Self {
        LocalDriver {
            coordinator,
            queue,
            kernel,
            threads: threads.max(1),
        }
    }

    /// Complete the initial column and work until the final row is done.
    pub fn run(&self) -> Result<()> {
        info!(
            iterations = self.coordinator.iterations(),
            threads = self.threads,
            "starting local enumeration"
        );
        let failure: Arc<Mutex<Option<Error>>> = Arc::new(Mutex::new(None));

        let workers: Vec<_> = (0..self.threads)
            .map(|worker| {
                let coordinator = Arc::clone(&self.coordinator);
                let queue = Arc::clone(&self.queue);
                let kernel = Arc::clone(&self.kernel);
                let failure = Arc::clone(&failure);
                thread::Builder::new()
                    .name(format!("borndie-worker-{}", worker))
                    .spawn(move || worker_loop(&coordinator, &queue, &*kernel, &failure))
            })
            .collect::<std::io::Result<_>>()?;

        if let Err(e) = self.coordinator.notify_initial_column_complete() {
            self.queue.abort(e.to_string());
            record_failure(&failure, e);
        }

        for worker in workers {
            if worker.join().is_err() {
                self.queue.abort("worker panicked");
                record_failure(&failure, Error::Internal("worker thread panicked".into()));
            }
        }

        if let Some(e) = failure.lock().take() {
            return Err(e);
        }
        if !self.coordinator.is_terminated() {
            return Err(Error::Internal(
                "workers stopped before the final row completed".into(),
            ));
        }
        info!(metrics = ?self.coordinator.metrics(), "local enumeration finished");
        Ok(())
    }
}

fn record_failure(slot: &Mutex<Option<Error>>, e: Error) {
    let mut slot = slot.lock();
    if slot.is_none() {
        *slot = Some(e);
    }
}

fn worker_loop<F: MemoryFactory, K: AdjacencyKernel>(
    coordinator: &BornDieCoordinator<F>,
    queue: &JobQueue,
    kernel: &K,
    failure: &Mutex<Option<Error>>,
) {
    while let Some(work) = queue.pop() {
        let outcome = match work {
            Work::Activate(column) => coordinator.schedule_active_column(column).map(|_| ()),
            Work::Pair(job) => execute(coordinator, kernel, job),
        };
        if let Err(e) = outcome {
            error!(?work, error = %e, "work item failed, aborting enumeration");
            queue.abort(e.to_string());
            record_failure(failure, e);
            return;
        }
    }
}

fn execute<F: MemoryFactory, K: AdjacencyKernel>(
    coordinator: &BornDieCoordinator<F>,
    kernel: &K,
    job: PairingJob,
) -> Result<()> {
    let neg = coordinator.get_neg_for_generating(job.owner)?;
    let pos = coordinator.get_pos_for_generating(job.partner, job.owner.die)?;
    let modes = kernel.generate(&job, &*neg, &*pos)?;

    let appended = modes.len();
    let born = job.target_born();
    for mode in modes {
        if mode.die_row < born {
            return Err(Error::InvalidArgument(format!(
                "job {} generated a mode dying at {} before it is born at {}",
                job, mode.die_row, born
            )));
        }
        let target = coordinator.index().cell(born, mode.die_row)?;
        append(coordinator, target, mode)?;
    }
    debug!(%job, appended, "pairing job done");
    coordinator.notify_pairing_job_completed(job, appended)
}

fn append<F: MemoryFactory>(
    coordinator: &BornDieCoordinator<F>,
    target: Cell,
    mode: GeneratedMode,
) -> Result<()> {
    coordinator.get_for_appending(target)?.append_column(mode.column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use borndie_core::Column;
    use borndie_storage::{read_all, InMemoryFactory};

    /// Emits one mode per (neg, pos) column pair that dies one row later
    /// than the owner, capped at the final row.
    struct CrossKernel {
        final_row: usize,
    }

    impl AdjacencyKernel for CrossKernel {
        fn generate(
            &self,
            job: &PairingJob,
            neg: &dyn IndexableMemory,
            pos: &dyn IndexableMemory,
        ) -> Result<Vec<GeneratedMode>> {
            let die_row = (job.owner.die + 2).min(self.final_row);
            let mut out = Vec::new();
            for a in read_all(neg)? {
                for b in read_all(pos)? {
                    let mut bytes = a.as_bytes().to_vec();
                    bytes.extend_from_slice(b.as_bytes());
                    out.push(GeneratedMode::new(die_row, Column::new(bytes)));
                }
            }
            Ok(out)
        }
    }

    struct FailingKernel;

    impl AdjacencyKernel for FailingKernel {
        fn generate(
            &self,
            _job: &PairingJob,
            _neg: &dyn IndexableMemory,
            _pos: &dyn IndexableMemory,
        ) -> Result<Vec<GeneratedMode>> {
            Err(Error::Storage("disk full".into()))
        }
    }

    fn setup(n: usize) -> (Arc<BornDieCoordinator<InMemoryFactory>>, Arc<JobQueue>) {
        let queue = Arc::new(JobQueue::new());
        let coordinator =
            Arc::new(BornDieCoordinator::new(n, InMemoryFactory::new(), queue.clone()).unwrap());
        (coordinator, queue)
    }

    #[test]
    fn test_run_to_termination() {
        let n = 3;
        let (coordinator, queue) = setup(n);
        for die in 0..=n {
            let memory = coordinator.get_for_appending(Cell::new(0, die)).unwrap();
            memory.append_column(Column::new(vec![die as u8])).unwrap();
        }

        let driver = LocalDriver::new(
            Arc::clone(&coordinator),
            queue,
            Arc::new(CrossKernel { final_row: n }),
            4,
        );
        driver.run().unwrap();

        assert!(coordinator.is_terminated());
        let metrics = coordinator.metrics();
        assert!(metrics.jobs_completed > 0);
        // Final row keeps its storage; everything else is Done and gone.
        let total: usize = (0..=n)
            .map(|born| coordinator.get_final(born).unwrap().column_count().unwrap())
            .sum();
        assert!(total >= 1);
    }

    #[test]
    fn test_kernel_failure_aborts_run() {
        let n = 2;
        let (coordinator, queue) = setup(n);
        for die in 0..=n {
            let memory = coordinator.get_for_appending(Cell::new(0, die)).unwrap();
            memory.append_column(Column::new(vec![die as u8])).unwrap();
        }
        let driver = LocalDriver::new(coordinator, queue.clone(), Arc::new(FailingKernel), 2);
        let err = driver.run().unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert!(queue.abort_reason().is_some());
    }
}
