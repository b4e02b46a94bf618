//! Error types for the born/die enumeration core
//!
//! Every failure falls into one of these classes:
//! - Stage violation: an operation against a cell that is not in the
//!   required stage. Always a programming or protocol error, never retried.
//! - Protocol error: a malformed or out-of-range wire command. Terminates
//!   the offending connection only.
//! - I/O failure: socket or storage failure. Captured by the job server and
//!   re-raised when it is closed.
//! - Argument error: rejected synchronously at the call site.
//! - Converting: a cell read between the two halves of its conversion.
//!
//! No variant is retried internally; retry policy belongs to the driver.

use crate::cell::Cell;
use crate::stage::CellStage;
use thiserror::Error;

/// All errors raised by the born/die core.
#[derive(Debug, Error)]
pub enum Error {
    /// Operation requested against a cell in the wrong stage
    #[error("stage violation on {cell}: expected {expected}, found {actual}")]
    StageViolation {
        /// Cell the operation targeted
        cell: Cell,
        /// Stage(s) the operation requires
        expected: &'static str,
        /// Stage observed when the operation was attempted
        actual: CellStage,
    },

    /// Cell caught between giving up its append handle and installing its
    /// readable one; the conversion completes without caller action
    #[error("cell {0} is being converted to readable storage")]
    Converting(Cell),

    /// Cell coordinates or indices outside the triangular matrix
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// Argument rejected at the call site
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Malformed or unknown wire command
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Socket or file I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage backend failure
    #[error("storage error: {0}")]
    Storage(String),

    /// Operation not supported by this storage handle
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Internal error (bug or invariant violation)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for born/die operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a stage violation for `cell`.
    pub fn stage_violation(cell: Cell, expected: &'static str, actual: CellStage) -> Self {
        Error::StageViolation {
            cell,
            expected,
            actual,
        }
    }

    /// Check if this is a stage violation.
    pub fn is_stage_violation(&self) -> bool {
        matches!(self, Error::StageViolation { .. })
    }

    /// Check if the cell was observed mid-conversion.
    pub fn is_converting(&self) -> bool {
        matches!(self, Error::Converting(_))
    }

    /// Check if this is an argument error.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }

    /// Check if this is a protocol error.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Error::Protocol(_))
    }

    /// Check if this is an I/O failure.
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io(_))
    }

    /// Check if the underlying I/O failure means the peer went away.
    ///
    /// Used by clients to report a closed server as a connection error.
    pub fn is_connection_lost(&self) -> bool {
        use std::io::ErrorKind;
        match self {
            Error::Io(e) => matches!(
                e.kind(),
                ErrorKind::UnexpectedEof
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
                    | ErrorKind::NotConnected
            ),
            _ => false,
        }
    }

    /// Failures the job server records as "a worker failed".
    ///
    /// Protocol errors only terminate their own connection and are not
    /// captured; everything else except argument errors is.
    pub fn is_captured_failure(&self) -> bool {
        !matches!(self, Error::Protocol(_) | Error::InvalidArgument(_))
    }
}
