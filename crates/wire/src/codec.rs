//! Frame encoding and decoding
//!
//! All multi-byte integers travel in network byte order. A request is a
//! command byte followed by its payload; responses carry no header.
//!
//! ```text
//! COUNT     0 | part:u8                  -> count:i32
//! GET       1 | part:u8 | index:i32      -> column
//! APPEND    2 | column                   -> (none)
//! NEXTJOB   3                            -> part:i32 (-1 when exhausted)
//! PROGRESS  4 | increment:i32            -> (none)
//! ```
//!
//! Column bytes are produced by a [`ColumnMarshaller`]; the default
//! [`LengthPrefixedMarshaller`] writes a u32 length followed by the payload.

use crate::command::{Command, MemoryPart};
use borndie_core::{Column, Error, Result};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{ErrorKind, Read, Write};

/// Default upper bound for one serialized column (64 MiB)
pub const DEFAULT_MAX_COLUMN_BYTES: u32 = 64 * 1024 * 1024;

/// Serializes columns onto the wire.
pub trait ColumnMarshaller: Send + Sync {
    /// Write `column` to `out`.
    fn write_column(&self, out: &mut dyn Write, column: &Column) -> Result<()>;

    /// Read one column from `input`.
    fn read_column(&self, input: &mut dyn Read) -> Result<Column>;
}

/// u32 length prefix followed by the raw column bytes
#[derive(Debug, Clone, Copy)]
pub struct LengthPrefixedMarshaller {
    max_column_bytes: u32,
}

impl LengthPrefixedMarshaller {
    /// Marshaller rejecting columns above `max_column_bytes`
    pub fn new(max_column_bytes: u32) -> Self {
        LengthPrefixedMarshaller { max_column_bytes }
    }
}

impl Default for LengthPrefixedMarshaller {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_COLUMN_BYTES)
    }
}

impl ColumnMarshaller for LengthPrefixedMarshaller {
    fn write_column(&self, out: &mut dyn Write, column: &Column) -> Result<()> {
        let len = u32::try_from(column.len())
            .ok()
            .filter(|len| *len <= self.max_column_bytes)
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "column of {} bytes exceeds limit of {}",
                    column.len(),
                    self.max_column_bytes
                ))
            })?;
        out.write_u32::<BigEndian>(len)?;
        out.write_all(column.as_bytes())?;
        Ok(())
    }

    fn read_column(&self, input: &mut dyn Read) -> Result<Column> {
        let len = input.read_u32::<BigEndian>()?;
        if len > self.max_column_bytes {
            return Err(Error::Protocol(format!(
                "column length {} exceeds limit of {}",
                len, self.max_column_bytes
            )));
        }
        let mut bytes = vec![0u8; len as usize];
        input.read_exact(&mut bytes)?;
        Ok(Column::new(bytes))
    }
}

/// A decoded client request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Column count of `part`
    Count {
        /// Memory part to count
        part: MemoryPart,
    },
    /// Column `index` of `part`
    Get {
        /// Memory part to read
        part: MemoryPart,
        /// Column index within the part
        index: u32,
    },
    /// A newly generated column
    Append(Column),
    /// Next work partition
    NextJob,
    /// Progress increment in fixed-point units
    Progress(u32),
}

impl Request {
    /// Command code of this request
    pub fn command(&self) -> Command {
        match self {
            Request::Count { .. } => Command::Count,
            Request::Get { .. } => Command::Get,
            Request::Append(_) => Command::Append,
            Request::NextJob => Command::NextJob,
            Request::Progress(_) => Command::Progress,
        }
    }
}

/// Encode `request` onto `out`. The caller flushes.
pub fn write_request(
    out: &mut dyn Write,
    request: &Request,
    marshaller: &dyn ColumnMarshaller,
) -> Result<()> {
    out.write_u8(request.command().code())?;
    match request {
        Request::Count { part } => out.write_u8(part.code())?,
        Request::Get { part, index } => {
            out.write_u8(part.code())?;
            out.write_i32::<BigEndian>(to_wire_int(*index)?)?;
        }
        Request::Append(column) => marshaller.write_column(out, column)?,
        Request::NextJob => {}
        Request::Progress(units) => out.write_i32::<BigEndian>(to_wire_int(*units)?)?,
    }
    Ok(())
}

/// Decode the next request from `input`.
///
/// Returns `Ok(None)` when the peer closed the connection cleanly before a
/// command byte. Unknown codes and out-of-range values are
/// [`Error::Protocol`].
pub fn read_request(
    input: &mut dyn Read,
    marshaller: &dyn ColumnMarshaller,
) -> Result<Option<Request>> {
    let code = match input.read_u8() {
        Ok(code) => code,
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let request = match Command::try_from(code)? {
        Command::Count => Request::Count {
            part: MemoryPart::try_from(input.read_u8()?)?,
        },
        Command::Get => {
            let part = MemoryPart::try_from(input.read_u8()?)?;
            let index = from_wire_int(input.read_i32::<BigEndian>()?, "column index")?;
            Request::Get { part, index }
        }
        Command::Append => Request::Append(marshaller.read_column(input)?),
        Command::NextJob => Request::NextJob,
        Command::Progress => Request::Progress(from_wire_int(
            input.read_i32::<BigEndian>()?,
            "progress increment",
        )?),
    };
    Ok(Some(request))
}

/// Write a bare i32 response.
pub fn write_int(out: &mut dyn Write, value: i32) -> Result<()> {
    out.write_i32::<BigEndian>(value)?;
    Ok(())
}

/// Read a bare i32 response.
pub fn read_int(input: &mut dyn Read) -> Result<i32> {
    Ok(input.read_i32::<BigEndian>()?)
}

fn to_wire_int(value: u32) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| Error::InvalidArgument(format!("{} does not fit a wire int", value)))
}

fn from_wire_int(value: i32, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::Protocol(format!("negative {}: {}", what, value)))
}
