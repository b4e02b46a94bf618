//! Job client
//!
//! One persistent connection to the [`JobServer`](crate::JobServer). Every
//! operation is a single request/response exchange performed under one
//! mutex, so concurrent callers never interleave two commands on the wire.

use crate::config::{ClientConfig, PROGRESS_UNITS_PER_WHOLE};
use borndie_core::{Column, Error, Result, NO_MORE_PARTS};
use borndie_storage::IndexableMemory;
use borndie_wire::{
    read_int, write_request, ColumnMarshaller, LengthPrefixedMarshaller, MemoryPart, Request,
};
use parking_lot::Mutex;
use std::io::{BufReader, BufWriter, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use tracing::debug;

struct Connection {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

/// Worker-side connection to a job server
pub struct JobClient {
    conn: Mutex<Connection>,
    marshaller: LengthPrefixedMarshaller,
    peer: SocketAddr,
}

impl JobClient {
    /// Connect to the server named by `config`.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let stream = TcpStream::connect(config.addr)?;
        stream.set_nodelay(config.nodelay)?;
        let peer = stream.peer_addr()?;
        debug!(%peer, "connected to job server");
        Ok(JobClient {
            conn: Mutex::new(Connection {
                reader: BufReader::new(stream.try_clone()?),
                writer: BufWriter::new(stream),
            }),
            marshaller: LengthPrefixedMarshaller::new(config.max_column_bytes),
            peer,
        })
    }

    /// Server address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Next work partition, or `None` once every partition is handed out.
    pub fn next_part(&self) -> Result<Option<i32>> {
        let mut conn = self.conn.lock();
        self.send(&mut conn, &Request::NextJob)?;
        match read_int(&mut conn.reader)? {
            NO_MORE_PARTS => Ok(None),
            part if part >= 0 => Ok(Some(part)),
            part => Err(Error::Protocol(format!("server sent partition {}", part))),
        }
    }

    /// Ship a generated column to the server.
    pub fn append_column(&self, column: &Column) -> Result<()> {
        let mut conn = self.conn.lock();
        self.send(&mut conn, &Request::Append(column.clone()))
    }

    /// Report `fraction` of the total work as done.
    ///
    /// Progress travels in units of 1e-9. Increments that are negative, not
    /// finite, above 1.0 or too small to register are rejected before
    /// anything is written.
    pub fn add_progress(&self, fraction: f64) -> Result<()> {
        let units = progress_units(fraction)?;
        let mut conn = self.conn.lock();
        self.send(&mut conn, &Request::Progress(units))
    }

    /// Column count of a remote memory part
    pub fn column_count(&self, part: MemoryPart) -> Result<usize> {
        let mut conn = self.conn.lock();
        self.send(&mut conn, &Request::Count { part })?;
        let count = read_int(&mut conn.reader)?;
        usize::try_from(count)
            .map_err(|_| Error::Protocol(format!("server sent column count {}", count)))
    }

    /// Column `index` of a remote memory part
    pub fn get_column(&self, part: MemoryPart, index: usize) -> Result<Column> {
        let index = u32::try_from(index)
            .map_err(|_| Error::InvalidArgument(format!("column index {} too large", index)))?;
        let mut conn = self.conn.lock();
        self.send(&mut conn, &Request::Get { part, index })?;
        self.marshaller.read_column(&mut conn.reader)
    }

    /// Readable view of a remote memory part
    pub fn memory(self: &Arc<Self>, part: MemoryPart) -> RemoteMemory {
        RemoteMemory {
            client: Arc::clone(self),
            part,
        }
    }

    fn send(&self, conn: &mut Connection, request: &Request) -> Result<()> {
        write_request(&mut conn.writer, request, &self.marshaller)?;
        conn.writer.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for JobClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobClient").field("peer", &self.peer).finish()
    }
}

fn progress_units(fraction: f64) -> Result<u32> {
    if !fraction.is_finite() || fraction < 0.0 {
        return Err(Error::InvalidArgument(format!(
            "progress increment must be non-negative, got {}",
            fraction
        )));
    }
    if fraction > 1.0 {
        return Err(Error::InvalidArgument(format!(
            "progress increment {} exceeds 1.0",
            fraction
        )));
    }
    let units = (fraction * PROGRESS_UNITS_PER_WHOLE as f64).round() as u32;
    if units == 0 {
        return Err(Error::InvalidArgument(format!(
            "progress increment {} is below the 1e-9 granularity",
            fraction
        )));
    }
    Ok(units)
}

/// One remote memory part read through a [`JobClient`]
#[derive(Debug, Clone)]
pub struct RemoteMemory {
    client: Arc<JobClient>,
    part: MemoryPart,
}

impl RemoteMemory {
    /// Part this view reads
    pub fn part(&self) -> MemoryPart {
        self.part
    }
}

impl IndexableMemory for RemoteMemory {
    fn column_count(&self) -> Result<usize> {
        self.client.column_count(self.part)
    }

    fn get_column(&self, index: usize) -> Result<Column> {
        self.client.get_column(self.part, index)
    }
}
