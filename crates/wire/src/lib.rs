//! Wire protocol for distributed born/die enumeration
//!
//! A client connects to the job server over TCP and issues one-byte
//! commands. The server answers with bare big-endian integers or with
//! marshalled columns; there is no framing beyond that.
//!
//! ## Commands
//!
//! | Code | Command | Request payload | Response |
//! |------|---------|-----------------|----------|
//! | 0 | COUNT | part:u8 | count:i32 |
//! | 1 | GET | part:u8, index:i32 | column |
//! | 2 | APPEND | column | none |
//! | 3 | NEXTJOB | none | part:i32, -1 when exhausted |
//! | 4 | PROGRESS | increment:i32 | none |
//!
//! ## Examples
//!
//! ```
//! use borndie_wire::{read_request, write_request, LengthPrefixedMarshaller, MemoryPart, Request};
//! use std::io::Cursor;
//!
//! let marshaller = LengthPrefixedMarshaller::default();
//! let mut buf = Vec::new();
//! let request = Request::Count { part: MemoryPart::Pos };
//! write_request(&mut buf, &request, &marshaller)?;
//!
//! let decoded = read_request(&mut Cursor::new(buf), &marshaller)?;
//! assert_eq!(decoded, Some(request));
//! # Ok::<(), borndie_core::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod command;

pub use codec::{
    read_int, read_request, write_int, write_request, ColumnMarshaller,
    LengthPrefixedMarshaller, Request, DEFAULT_MAX_COLUMN_BYTES,
};
pub use command::{Command, MemoryPart};
