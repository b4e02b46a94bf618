//! Job server
//!
//! Hands out work partitions to a fixed number of worker connections,
//! serves reads of the current iteration's memory parts, and collects the
//! columns workers generate.
//!
//! ## Threads
//!
//! ```text
//! borndie-accept      polls the listener until node_count workers connected
//! borndie-conn-{id}   one per connection, serves requests until disconnect
//! ```
//!
//! ## Termination
//!
//! A [`CountDownLatch`] holds one slot per expected connection. A slot is
//! released when its connection first receives `-1` from NEXTJOB, or when
//! the connection ends for any reason. [`JobServer::close`] force-releases
//! every slot and shuts all sockets down.
//!
//! The server applies no read timeouts: a stalled worker holds its thread
//! and its latch slot until it disconnects or the server is closed.

use crate::config::{ServerConfig, PROGRESS_UNITS_PER_WHOLE};
use borndie_concurrency::CountDownLatch;
use borndie_core::{Error, PartitionCounter, Result, NO_MORE_PARTS};
use borndie_storage::{AppendableMemory, IndexableMemory, VecSortableMemory};
use borndie_wire::{
    read_request, write_int, ColumnMarshaller, LengthPrefixedMarshaller, MemoryPart, Request,
};
use parking_lot::Mutex;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Readable memory parts served through COUNT and GET
#[derive(Clone)]
pub struct ServerMemories {
    zero: Arc<dyn IndexableMemory>,
    pos: Arc<dyn IndexableMemory>,
    neg: Arc<dyn IndexableMemory>,
}

impl ServerMemories {
    /// Serve `zero`, `pos` and `neg` under their part ids
    pub fn new(
        zero: Arc<dyn IndexableMemory>,
        pos: Arc<dyn IndexableMemory>,
        neg: Arc<dyn IndexableMemory>,
    ) -> Self {
        ServerMemories { zero, pos, neg }
    }

    /// Three empty parts
    pub fn empty() -> Self {
        let empty: Arc<dyn IndexableMemory> = Arc::new(VecSortableMemory::new(Vec::new()));
        ServerMemories {
            zero: Arc::clone(&empty),
            pos: Arc::clone(&empty),
            neg: empty,
        }
    }

    /// Memory served for `part`
    pub fn part(&self, part: MemoryPart) -> &Arc<dyn IndexableMemory> {
        match part {
            MemoryPart::Zero => &self.zero,
            MemoryPart::Pos => &self.pos,
            MemoryPart::Neg => &self.neg,
        }
    }
}

/// Point-in-time counters of a job server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerStats {
    /// Connections accepted so far
    pub connections_accepted: usize,
    /// Partitions handed out (excluding `-1` answers)
    pub partitions_handed_out: i32,
    /// Columns received through APPEND
    pub columns_received: u64,
    /// Requests answered
    pub requests_served: u64,
    /// Connections terminated by a protocol error
    pub protocol_errors: u64,
    /// Aggregated progress, as a fraction
    pub progress: f64,
}

#[derive(Debug, Default)]
struct Counters {
    accepted: AtomicUsize,
    columns_received: AtomicU64,
    requests_served: AtomicU64,
    protocol_errors: AtomicU64,
    progress_units: AtomicU64,
}

struct Shared<A> {
    config: ServerConfig,
    memories: ServerMemories,
    generated: Arc<A>,
    partitions: PartitionCounter,
    latch: CountDownLatch,
    marshaller: LengthPrefixedMarshaller,
    closing: AtomicBool,
    failure: Mutex<Option<Error>>,
    connections: Mutex<Vec<TcpStream>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    counters: Counters,
}

/// Distributes work partitions to worker connections.
///
/// # Example
///
/// ```no_run
/// use borndie_distributed::{JobServer, ServerConfig, ServerMemories};
/// use borndie_storage::VecAppendableMemory;
///
/// let server = JobServer::start(
///     ServerConfig::local(2, 16),
///     ServerMemories::empty(),
///     VecAppendableMemory::new(),
/// )?;
/// println!("listening on {}", server.local_addr());
/// server.await_completion();
/// let generated = server.close()?;
/// # Ok::<(), borndie_core::Error>(())
/// ```
pub struct JobServer<A: AppendableMemory + 'static> {
    shared: Arc<Shared<A>>,
    local_addr: SocketAddr,
    acceptor: Option<JoinHandle<()>>,
}

impl<A: AppendableMemory + 'static> JobServer<A> {
    /// Bind the listener and start accepting workers.
    ///
    /// Columns received through APPEND are appended to `generated`.
    pub fn start(config: ServerConfig, memories: ServerMemories, generated: A) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_addr)?;
        let local_addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;

        let shared = Arc::new(Shared {
            partitions: PartitionCounter::new(config.part_count),
            latch: CountDownLatch::new(config.node_count),
            marshaller: LengthPrefixedMarshaller::new(config.max_column_bytes),
            memories,
            generated: Arc::new(generated),
            closing: AtomicBool::new(false),
            failure: Mutex::new(None),
            connections: Mutex::new(Vec::new()),
            workers: Mutex::new(Vec::new()),
            counters: Counters::default(),
            config,
        });

        info!(
            %local_addr,
            node_count = shared.config.node_count,
            part_count = shared.config.part_count,
            "job server listening"
        );

        let acceptor = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("borndie-accept".to_string())
                .spawn(move || accept_loop(&shared, listener))?
        };

        Ok(JobServer {
            shared,
            local_addr,
            acceptor: Some(acceptor),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Block until every connection slot has been released.
    pub fn await_completion(&self) {
        self.shared.latch.wait();
    }

    /// Like [`await_completion`](Self::await_completion) with a deadline;
    /// returns whether every slot was released.
    pub fn await_completion_for(&self, timeout: Duration) -> bool {
        self.shared.latch.wait_for(timeout)
    }

    /// Connection slots not yet released
    pub fn pending_connections(&self) -> usize {
        self.shared.latch.count()
    }

    /// Aggregated progress reported by all workers, as a fraction
    pub fn progress(&self) -> f64 {
        self.shared.progress()
    }

    /// Snapshot of the server's counters
    pub fn stats(&self) -> ServerStats {
        let counters = &self.shared.counters;
        ServerStats {
            connections_accepted: counters.accepted.load(Ordering::Relaxed),
            partitions_handed_out: self.shared.partitions.handed_out(),
            columns_received: counters.columns_received.load(Ordering::Relaxed),
            requests_served: counters.requests_served.load(Ordering::Relaxed),
            protocol_errors: counters.protocol_errors.load(Ordering::Relaxed),
            progress: self.shared.progress(),
        }
    }

    /// Stop the server and return the generated columns.
    ///
    /// Releases the latch, closes the listener, shuts every connection down
    /// and joins all threads. In-flight client requests fail with a
    /// connection error. The first captured I/O or storage failure of any
    /// connection is returned instead of the memory.
    pub fn close(mut self) -> Result<Arc<A>> {
        let shared = Arc::clone(&self.shared);
        shared.closing.store(true, Ordering::SeqCst);
        shared.latch.release_all();

        if let Some(acceptor) = self.acceptor.take() {
            if acceptor.join().is_err() {
                shared.record_failure(Error::Internal("accept thread panicked".to_string()));
            }
        }
        for stream in shared.connections.lock().drain(..) {
            let _ = stream.shutdown(Shutdown::Both);
        }
        let workers: Vec<_> = shared.workers.lock().drain(..).collect();
        for worker in workers {
            if worker.join().is_err() {
                shared.record_failure(Error::Internal("connection thread panicked".to_string()));
            }
        }

        let stats = self.stats();
        if let Some(e) = shared.failure.lock().take() {
            error!(error = %e, ?stats, "job server closed after a worker failure");
            return Err(e);
        }
        shared.generated.flush()?;
        info!(?stats, "job server closed");
        Ok(Arc::clone(&shared.generated))
    }
}

impl<A: AppendableMemory + 'static> Drop for JobServer<A> {
    fn drop(&mut self) {
        // Only reached without close(): stop the acceptor and connections.
        if let Some(acceptor) = self.acceptor.take() {
            self.shared.closing.store(true, Ordering::SeqCst);
            self.shared.latch.release_all();
            let _ = acceptor.join();
            for stream in self.shared.connections.lock().drain(..) {
                let _ = stream.shutdown(Shutdown::Both);
            }
        }
    }
}

impl<A: AppendableMemory + 'static> Shared<A> {
    fn progress(&self) -> f64 {
        self.counters.progress_units.load(Ordering::Relaxed) as f64
            / PROGRESS_UNITS_PER_WHOLE as f64
    }

    fn record_failure(&self, e: Error) {
        let mut slot = self.failure.lock();
        if slot.is_none() {
            *slot = Some(e);
        }
    }

    fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Accepting
// ============================================================================

fn accept_loop<A: AppendableMemory + 'static>(shared: &Arc<Shared<A>>, listener: TcpListener) {
    let node_count = shared.config.node_count;
    let mut accepted = 0;
    while accepted < node_count && !shared.is_closing() {
        match listener.accept() {
            Ok((stream, peer)) => {
                if let Err(e) = spawn_connection(shared, stream, accepted) {
                    error!(%peer, error = %e, "failed to start connection thread");
                    shared.record_failure(e);
                    shared.latch.count_down();
                }
                accepted += 1;
                shared.counters.accepted.store(accepted, Ordering::Relaxed);
                debug!(%peer, accepted, node_count, "worker connected");
            }
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                thread::sleep(shared.config.accept_poll_interval);
            }
            Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => {
                error!(error = %e, "accept failed, no further workers accepted");
                shared.record_failure(e.into());
                // Slots of workers that can no longer connect.
                for _ in accepted..node_count {
                    shared.latch.count_down();
                }
                break;
            }
        }
    }
    debug!(accepted, "listener closed");
}

fn spawn_connection<A: AppendableMemory + 'static>(
    shared: &Arc<Shared<A>>,
    stream: TcpStream,
    id: usize,
) -> Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_nodelay(true)?;
    shared.connections.lock().push(stream.try_clone()?);

    let worker = {
        let shared = Arc::clone(shared);
        thread::Builder::new()
            .name(format!("borndie-conn-{}", id))
            .spawn(move || serve_connection(&shared, stream, id))?
    };
    shared.workers.lock().push(worker);
    Ok(())
}

// ============================================================================
// Serving
// ============================================================================

fn serve_connection<A: AppendableMemory + 'static>(
    shared: &Shared<A>,
    stream: TcpStream,
    id: usize,
) {
    let mut released = false;
    let outcome = serve_requests(shared, &stream, &mut released);
    let _ = stream.shutdown(Shutdown::Both);

    match outcome {
        Ok(()) => debug!(connection = id, "worker disconnected"),
        Err(e) if shared.is_closing() => {
            debug!(connection = id, error = %e, "connection closed by shutdown")
        }
        Err(e) if !e.is_captured_failure() => {
            shared.counters.protocol_errors.fetch_add(1, Ordering::Relaxed);
            warn!(connection = id, error = %e, "protocol error, dropping connection");
        }
        Err(e) => {
            error!(connection = id, error = %e, "worker connection failed");
            shared.record_failure(e);
        }
    }
    if !released {
        shared.latch.count_down();
    }
}

fn serve_requests<A: AppendableMemory + 'static>(
    shared: &Shared<A>,
    stream: &TcpStream,
    released: &mut bool,
) -> Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = BufWriter::new(stream.try_clone()?);
    while let Some(request) = read_request(&mut reader, &shared.marshaller)? {
        handle_request(shared, request, &mut writer, released)?;
        shared.counters.requests_served.fetch_add(1, Ordering::Relaxed);
    }
    Ok(())
}

fn handle_request<A: AppendableMemory + 'static>(
    shared: &Shared<A>,
    request: Request,
    out: &mut BufWriter<TcpStream>,
    released: &mut bool,
) -> Result<()> {
    match request {
        Request::Count { part } => {
            let count = shared.memories.part(part).column_count()?;
            let count = i32::try_from(count).map_err(|_| {
                Error::Internal(format!("{:?} holds {} columns, beyond a wire int", part, count))
            })?;
            write_int(out, count)?;
            out.flush()?;
        }
        Request::Get { part, index } => {
            let memory = shared.memories.part(part);
            let count = memory.column_count()?;
            let index = index as usize;
            if index >= count {
                return Err(Error::Protocol(format!(
                    "GET {:?}[{}] outside 0..{}",
                    part, index, count
                )));
            }
            let column = memory.get_column(index)?;
            shared.marshaller.write_column(out, &column)?;
            out.flush()?;
        }
        Request::Append(column) => {
            shared.generated.append_column(column)?;
            shared.counters.columns_received.fetch_add(1, Ordering::Relaxed);
        }
        Request::NextJob => {
            let part = shared.partitions.next_part();
            write_int(out, part)?;
            out.flush()?;
            if part == NO_MORE_PARTS && !*released {
                *released = true;
                shared.latch.count_down();
                debug!(remaining = shared.latch.count(), "worker exhausted partitions");
            }
        }
        Request::Progress(units) => {
            shared
                .counters
                .progress_units
                .fetch_add(units as u64, Ordering::Relaxed);
        }
    }
    Ok(())
}
