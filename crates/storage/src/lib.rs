//! Storage layer for born/die cells
//!
//! This crate defines the storage handle contracts the coordinator moves
//! between stages, plus an in-memory backend:
//! - [`AppendableMemory`]: append-only handle of an accumulating cell
//! - [`IndexableMemory`] / [`SortableMemory`]: readable handle of an active cell
//! - [`MemoryFactory`]: creates handles and performs the one-time conversion
//! - [`InMemoryFactory`]: Vec-backed factory

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod factory;
pub mod memory;
pub mod vec_memory;

pub use factory::{InMemoryFactory, MemoryFactory, PosFilter};
pub use memory::{read_all, AppendableMemory, IndexableMemory, SortableMemory};
pub use vec_memory::{VecAppendableMemory, VecSortableMemory};
