//! # borndie
//!
//! Concurrent cell-stage coordination for staged extreme-ray ("mode")
//! enumeration.
//!
//! Intermediate modes live in the cells of a triangular born/die matrix:
//! cell `(b, d)` holds the modes born at iteration `b` that become
//! infeasible at iteration `d`. A lock-free coordinator moves every cell
//! through its storage stages, schedules pairing work between cells and
//! reclaims rows as soon as nothing can read them again.
//!
//! ## Quick Start
//!
//! ```ignore
//! use borndie::prelude::*;
//!
//! let enumeration = Enumeration::builder().iterations(n).threads(8).build()?;
//! enumeration.seed_all(initial_modes)?;
//! let result = enumeration.run(MyAdjacencyKernel::new())?;
//! println!("{} extreme rays", result.columns.len());
//! ```
//!
//! ## Crates
//!
//! - [`borndie_core`] - matrix geometry, cell stages, partitions, errors
//! - [`borndie_storage`] - storage handle contracts and in-memory backend
//! - [`borndie_concurrency`] - the coordinator, job queue and local driver
//! - [`borndie_wire`] - job server protocol
//! - [`borndie_distributed`] - job server, job client, remote memory cache

#![warn(missing_docs)]
#![warn(clippy::all)]

mod enumeration;

pub mod prelude;

// Re-export main entry points
pub use enumeration::{Enumeration, EnumerationBuilder, EnumerationResult, DEFAULT_THREADS};

pub use borndie_core::{Error, Result};

// Re-export member crates
pub use borndie_concurrency;
pub use borndie_core;
pub use borndie_distributed;
pub use borndie_storage;
pub use borndie_wire;
