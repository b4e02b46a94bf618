//! Server and client configuration

use borndie_wire::DEFAULT_MAX_COLUMN_BYTES;
use std::net::SocketAddr;
use std::time::Duration;

/// Fixed-point units per whole unit of progress (granularity 1e-9)
pub const PROGRESS_UNITS_PER_WHOLE: u32 = 1_000_000_000;

// ============================================================================
// Server
// ============================================================================

/// Job server options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on; port 0 picks a free port
    pub bind_addr: SocketAddr,
    /// Number of worker connections to accept before the listener closes
    pub node_count: usize,
    /// Number of work partitions to hand out
    pub part_count: i32,
    /// Sleep between accept attempts while waiting for workers
    pub accept_poll_interval: Duration,
    /// Largest column accepted on APPEND or sent on GET
    pub max_column_bytes: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            node_count: 1,
            part_count: 1,
            accept_poll_interval: Duration::from_millis(10),
            max_column_bytes: DEFAULT_MAX_COLUMN_BYTES,
        }
    }
}

impl ServerConfig {
    /// Loopback server for `node_count` workers sharing `part_count` partitions
    pub fn local(node_count: usize, part_count: i32) -> Self {
        ServerConfig {
            node_count,
            part_count,
            ..Default::default()
        }
    }

    /// Server listening on every interface at `port`
    pub fn cluster(port: u16, node_count: usize, part_count: i32) -> Self {
        ServerConfig {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            node_count,
            part_count,
            accept_poll_interval: Duration::from_millis(50),
            ..Default::default()
        }
    }

    /// Override the listen address
    pub fn with_bind_addr(mut self, bind_addr: SocketAddr) -> Self {
        self.bind_addr = bind_addr;
        self
    }

    /// Override the column size limit
    pub fn with_max_column_bytes(mut self, max_column_bytes: u32) -> Self {
        self.max_column_bytes = max_column_bytes;
        self
    }
}

// ============================================================================
// Client
// ============================================================================

/// Job client options
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address
    pub addr: SocketAddr,
    /// Disable Nagle's algorithm on the connection
    pub nodelay: bool,
    /// Largest column accepted on GET or sent on APPEND
    pub max_column_bytes: u32,
}

impl ClientConfig {
    /// Client for the server at `addr`
    pub fn new(addr: SocketAddr) -> Self {
        ClientConfig {
            addr,
            nodelay: true,
            max_column_bytes: DEFAULT_MAX_COLUMN_BYTES,
        }
    }

    /// Override `TCP_NODELAY`
    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    /// Override the column size limit
    pub fn with_max_column_bytes(mut self, max_column_bytes: u32) -> Self {
        self.max_column_bytes = max_column_bytes;
        self
    }
}
