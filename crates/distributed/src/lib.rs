//! Distributed execution for the born/die enumeration
//!
//! This crate spreads the combinatorial work of one iteration over worker
//! processes:
//! - [`JobServer`]: hands out partitions, serves memory parts, collects columns
//! - [`JobClient`]: worker-side connection, one command at a time
//! - [`RemoteMemoryCache`]: direct-mapped cache over a [`RemoteMemory`]
//!
//! See `borndie-wire` for the protocol itself.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod client;
pub mod config;
pub mod server;

pub use cache::{RemoteMemoryCache, CACHE_SLOTS};
pub use client::{JobClient, RemoteMemory};
pub use config::{ClientConfig, ServerConfig, PROGRESS_UNITS_PER_WHOLE};
pub use server::{JobServer, ServerMemories, ServerStats};
