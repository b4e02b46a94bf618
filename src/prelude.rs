//! Convenient imports for borndie.
//!
//! ```
//! use borndie::prelude::*;
//!
//! let enumeration = Enumeration::builder().iterations(4).build()?;
//! # Ok::<(), borndie::Error>(())
//! ```

// Main entry point
pub use crate::enumeration::{Enumeration, EnumerationBuilder, EnumerationResult};

// Error handling
pub use borndie_core::{Error, Result};

// Geometry
pub use borndie_core::{Cell, CellStage, Column, TriangularIndex};

// Storage
pub use borndie_storage::{AppendableMemory, IndexableMemory, MemoryFactory, SortableMemory};

// Jobs
pub use borndie_concurrency::{AdjacencyKernel, GeneratedMode, PairingJob};

// Distributed
pub use borndie_distributed::{ClientConfig, JobClient, JobServer, ServerConfig};
