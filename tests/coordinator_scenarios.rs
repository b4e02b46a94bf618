//! Coordinator scenarios driven step by step
//!
//! Jobs are collected by a recording controller and completed by the test
//! itself, so every stage can be checked between steps.

use borndie::borndie_concurrency::{BornDieController, BornDieCoordinator, PairingJob};
use borndie::borndie_core::{Cell, CellStage, Column};
use borndie::borndie_storage::{AppendableMemory, InMemoryFactory};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct Recorder {
    jobs: Mutex<Vec<PairingJob>>,
    activated: Mutex<Vec<usize>>,
    terminations: Mutex<usize>,
}

impl BornDieController for Recorder {
    fn submit(&self, job: PairingJob) {
        self.jobs.lock().push(job);
    }

    fn born_column_activated(&self, column: usize) {
        self.activated.lock().push(column);
    }

    fn terminated(&self) {
        *self.terminations.lock() += 1;
    }
}

fn coordinator(n: usize) -> (BornDieCoordinator<InMemoryFactory>, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let coordinator = BornDieCoordinator::new(n, InMemoryFactory::new(), recorder.clone()).unwrap();
    (coordinator, recorder)
}

fn seed(coordinator: &BornDieCoordinator<InMemoryFactory>, die: usize, modes: u8) {
    let memory = coordinator.get_for_appending(Cell::new(0, die)).unwrap();
    for mode in 0..modes {
        memory.append_column(Column::new(vec![die as u8, mode])).unwrap();
    }
}

/// Test: n = 2, seed (0,0), complete its jobs, row 0 retires, column 1 bears
#[test]
fn test_first_row_cascade() {
    let (coordinator, recorder) = coordinator(2);
    seed(&coordinator, 0, 3);
    seed(&coordinator, 1, 1);
    seed(&coordinator, 2, 1);
    for die in 0..=2 {
        assert_eq!(
            coordinator.stage(Cell::new(0, die)).unwrap(),
            CellStage::Accumulating
        );
    }

    coordinator.notify_initial_column_complete().unwrap();
    assert_eq!(coordinator.lowest_bearing_row(), 0);
    assert_eq!(recorder.activated.lock().clone(), vec![0]);
    assert_eq!(coordinator.stage(Cell::new(0, 0)).unwrap(), CellStage::Bearing);
    assert_eq!(coordinator.column_count(Cell::new(0, 0)).unwrap(), 3);

    let scheduled = coordinator
        .schedule_pairing_jobs(Cell::new(0, 0), 0, 0)
        .unwrap();
    assert_eq!(scheduled, 2);
    let jobs: Vec<_> = recorder.jobs.lock().drain(..).collect();
    let partners: Vec<_> = jobs.iter().map(|job| job.partner).collect();
    assert_eq!(partners, vec![Cell::new(0, 1), Cell::new(0, 2)]);

    // Owner dies at row 0, so its modes go to column 1.
    let target = coordinator.get_for_appending(Cell::new(1, 2)).unwrap();
    target.append_column(Column::new(vec![9])).unwrap();
    coordinator.notify_pairing_job_completed(jobs[0], 1).unwrap();
    assert_eq!(coordinator.stage(Cell::new(0, 0)).unwrap(), CellStage::Bearing);
    assert_eq!(coordinator.lowest_bearing_row(), 0);

    coordinator.notify_pairing_job_completed(jobs[1], 0).unwrap();
    assert_eq!(coordinator.lowest_bearing_row(), 1);
    assert_eq!(coordinator.stage(Cell::new(0, 0)).unwrap(), CellStage::Done);
    assert_eq!(coordinator.stage(Cell::new(1, 1)).unwrap(), CellStage::Bearing);
    assert_eq!(coordinator.column_count(Cell::new(1, 2)).unwrap(), 1);
    assert_eq!(recorder.activated.lock().clone(), vec![0, 1]);

    // Row 0 storage is gone for good.
    assert!(coordinator
        .get_neg_for_generating(Cell::new(0, 0))
        .unwrap_err()
        .is_stage_violation());
    assert_eq!(*recorder.terminations.lock(), 0);
}

/// Test: a run whose partners are all empty finishes without any submitted job
#[test]
fn test_empty_partners_complete_without_jobs() {
    let (coordinator, recorder) = coordinator(3);
    seed(&coordinator, 0, 2);
    coordinator.notify_initial_column_complete().unwrap();

    let mut column = 0;
    while !coordinator.is_terminated() {
        let activated = recorder.activated.lock().clone();
        if column >= activated.len() {
            panic!("stalled at cursor {}", coordinator.lowest_bearing_row());
        }
        coordinator.schedule_active_column(activated[column]).unwrap();
        column += 1;
    }

    assert!(recorder.jobs.lock().is_empty());
    assert_eq!(*recorder.terminations.lock(), 1);
    let metrics = coordinator.metrics();
    assert_eq!(metrics.jobs_scheduled, 0);
    assert_eq!(metrics.jobs_skipped, metrics.jobs_completed);
    assert_eq!(metrics.lowest_bearing_row, 4);
    for born in 0..=3 {
        assert!(coordinator.get_final(born).is_ok());
    }
}

/// Test: scheduling the final row is an argument error, not a stage violation
#[test]
fn test_final_row_scheduling_rejected() {
    let (coordinator, _) = coordinator(2);
    coordinator.notify_initial_column_complete().unwrap();
    let err = coordinator
        .schedule_pairing_jobs(Cell::new(0, 2), 0, 0)
        .unwrap_err();
    assert!(err.is_invalid_argument());
    assert!(coordinator
        .schedule_active_column(2)
        .unwrap_err()
        .is_invalid_argument());
}

/// Test: appending to a bearing cell and reading before activation both fail
#[test]
fn test_stage_violations() {
    let (coordinator, _) = coordinator(2);
    seed(&coordinator, 1, 1);
    assert!(coordinator
        .get_neg_for_generating(Cell::new(0, 1))
        .unwrap_err()
        .is_stage_violation());
    assert!(coordinator
        .get_final(0)
        .unwrap_err()
        .is_stage_violation());

    coordinator.notify_initial_column_complete().unwrap();
    assert!(coordinator
        .get_for_appending(Cell::new(0, 1))
        .unwrap_err()
        .is_stage_violation());
    assert!(coordinator
        .get_for_appending(Cell::new(3, 1))
        .is_err());
}
