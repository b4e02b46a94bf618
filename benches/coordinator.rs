//! Coordinator Benchmarks
//!
//! ## What These Benchmarks Measure
//!
//! | Benchmark | Path |
//! |-----------|------|
//! | stage/* | Stage recomputation from the atomics |
//! | sweep/* | Full run with zero-effort jobs, single thread |
//! | enumeration/* | Local driver with a forwarding kernel |
//!
//! ## Running
//!
//! ```bash
//! cargo bench --bench coordinator
//! cargo bench --bench coordinator -- "sweep"  # specific group
//! ```

use borndie::borndie_concurrency::{BornDieController, BornDieCoordinator, PairingJob, Work};
use borndie::prelude::*;
use borndie::borndie_storage::{read_all, InMemoryFactory};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use parking_lot::Mutex;
use std::sync::Arc;

// =============================================================================
// Utilities
// =============================================================================

#[derive(Default)]
struct Stack {
    work: Mutex<Vec<Work>>,
}

impl BornDieController for Stack {
    fn submit(&self, job: PairingJob) {
        self.work.lock().push(Work::Pair(job));
    }

    fn born_column_activated(&self, column: usize) {
        self.work.lock().push(Work::Activate(column));
    }

    fn terminated(&self) {}
}

fn seeded(n: usize, controller: Arc<Stack>) -> BornDieCoordinator<InMemoryFactory> {
    let coordinator = BornDieCoordinator::new(n, InMemoryFactory::new(), controller).unwrap();
    for die in 0..=n {
        coordinator
            .get_for_appending(Cell::new(0, die))
            .unwrap()
            .append_column(Column::new(vec![die as u8; 16]))
            .unwrap();
    }
    coordinator
}

fn drain(coordinator: &BornDieCoordinator<InMemoryFactory>, controller: &Stack) {
    coordinator.notify_initial_column_complete().unwrap();
    loop {
        let next = controller.work.lock().pop();
        match next {
            Some(Work::Activate(column)) => {
                coordinator.schedule_active_column(column).unwrap();
            }
            Some(Work::Pair(job)) => coordinator.notify_pairing_job_completed(job, 0).unwrap(),
            None => break,
        }
    }
}

struct Forward {
    final_row: usize,
}

impl AdjacencyKernel for Forward {
    fn generate(
        &self,
        job: &PairingJob,
        neg: &dyn IndexableMemory,
        _pos: &dyn IndexableMemory,
    ) -> Result<Vec<GeneratedMode>> {
        let die_row = (job.owner.die + 1).min(self.final_row);
        Ok(read_all(neg)?
            .into_iter()
            .take(4)
            .map(|column| GeneratedMode::new(die_row, column))
            .collect())
    }
}

// =============================================================================
// Benchmarks
// =============================================================================

fn stage_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("stage");
    let controller = Arc::new(Stack::default());
    let coordinator = seeded(32, controller);
    coordinator.notify_initial_column_complete().unwrap();
    let cells: Vec<Cell> = coordinator.index().cells().collect();

    group.throughput(Throughput::Elements(cells.len() as u64));
    group.bench_function("all_cells_n32", |b| {
        b.iter(|| {
            for cell in &cells {
                black_box(coordinator.stage(*cell).unwrap());
            }
        })
    });
    group.finish();
}

fn sweep_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweep");
    for n in [8usize, 16, 32] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let controller = Arc::new(Stack::default());
                let coordinator = seeded(n, controller.clone());
                drain(&coordinator, &controller);
                black_box(coordinator.metrics())
            })
        });
    }
    group.finish();
}

fn enumeration_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("enumeration");
    group.sample_size(20);
    for threads in [1usize, 4] {
        group.bench_with_input(
            BenchmarkId::new("n12", threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    let n = 12;
                    let enumeration = Enumeration::builder()
                        .iterations(n)
                        .threads(threads)
                        .build()
                        .unwrap();
                    enumeration
                        .seed_all((0..=n).map(|die| (die, Column::new(vec![die as u8; 16]))))
                        .unwrap();
                    black_box(enumeration.run(Forward { final_row: n }).unwrap())
                })
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    stage_benchmarks,
    sweep_benchmarks,
    enumeration_benchmarks
);
criterion_main!(benches);
