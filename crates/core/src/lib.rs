//! Core types for the born/die enumeration
//!
//! This crate holds the pure, stateless pieces every other layer builds on:
//! - [`TriangularIndex`]: cell addressing in the born/die matrix
//! - [`PairingRule`]: which cells a cell must pair with
//! - [`CellStage`]: lifecycle stage computed from global progress
//! - [`PartitionCounter`]: demand-driven partition assignment
//! - [`Error`]: the error taxonomy shared by all crates

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cell;
pub mod column;
pub mod error;
pub mod pairing;
pub mod partition;
pub mod stage;

pub use cell::{Cell, TriangularIndex};
pub use column::Column;
pub use error::{Error, Result};
pub use pairing::{CellRange, PairingRule};
pub use partition::{PartitionCounter, NO_MORE_PARTS};
pub use stage::CellStage;
