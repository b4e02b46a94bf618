//! Command and memory-part codes
//!
//! Both enums carry explicit, frozen discriminants. They are part of the
//! wire format and must never be renumbered:
//!
//! | Code | Command  |
//! |------|----------|
//! | 0    | Count    |
//! | 1    | Get      |
//! | 2    | Append   |
//! | 3    | NextJob  |
//! | 4    | Progress |

use borndie_core::{Error, Result};
use std::fmt;

/// One-byte command code sent by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Column count of a remote memory part
    Count = 0,
    /// One column of a remote memory part
    Get = 1,
    /// Ship a newly generated column to the server
    Append = 2,
    /// Request the next work partition
    NextJob = 3,
    /// Report a progress increment
    Progress = 4,
}

impl Command {
    /// Wire code
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Command {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Command::Count),
            1 => Ok(Command::Get),
            2 => Ok(Command::Append),
            3 => Ok(Command::NextJob),
            4 => Ok(Command::Progress),
            other => Err(Error::Protocol(format!("unknown command code {}", other))),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::Count => "COUNT",
            Command::Get => "GET",
            Command::Append => "APPEND",
            Command::NextJob => "NEXTJOB",
            Command::Progress => "PROGRESS",
        };
        f.write_str(name)
    }
}

/// Remote memory a worker may read through COUNT and GET.
///
/// Client and server builds must agree on these ordinals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum MemoryPart {
    /// Modes with a zero entry at the current iteration
    Zero = 0,
    /// Modes surviving the current iteration
    Pos = 1,
    /// Modes dying at the current iteration
    Neg = 2,
}

impl MemoryPart {
    /// All parts, in code order
    pub const ALL: [MemoryPart; 3] = [MemoryPart::Zero, MemoryPart::Pos, MemoryPart::Neg];

    /// Wire code
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for MemoryPart {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(MemoryPart::Zero),
            1 => Ok(MemoryPart::Pos),
            2 => Ok(MemoryPart::Neg),
            other => Err(Error::Protocol(format!("unknown memory part {}", other))),
        }
    }
}
