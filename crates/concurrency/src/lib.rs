//! Concurrency layer for the born/die enumeration
//!
//! This crate implements the lock-free stage coordination with:
//! - BornDieCoordinator: per-cell handles and counters, row-completion cascade
//! - PairingJob / BornDieController: the seam to the external worker pool
//! - JobQueue: blocking queue implementing the controller
//! - LocalDriver: single-process worker pool running an AdjacencyKernel
//! - CountDownLatch: connection accounting for the job server

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coordinator;
pub mod driver;
pub mod job;
pub mod latch;
pub mod queue;

pub use coordinator::{BornDieCoordinator, CoordinatorMetrics};
pub use driver::{AdjacencyKernel, LocalDriver};
pub use job::{BornDieController, GeneratedMode, PairingJob};
pub use latch::CountDownLatch;
pub use queue::{JobQueue, Work};
