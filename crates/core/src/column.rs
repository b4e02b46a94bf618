//! Opaque mode payload

use std::fmt;

/// One mode (extreme-ray candidate) as an opaque byte payload.
///
/// The coordinator never inspects or copies columns; it only moves them
/// between storage handles. Ordering is bytewise, which is all sortable
/// storage needs.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Column(Vec<u8>);

impl Column {
    /// Wrap raw bytes
    pub fn new(bytes: Vec<u8>) -> Self {
        Column(bytes)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume into raw bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Column {
    fn from(bytes: Vec<u8>) -> Self {
        Column(bytes)
    }
}

impl From<&[u8]> for Column {
    fn from(bytes: &[u8]) -> Self {
        Column(bytes.to_vec())
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Column({} bytes)", self.0.len())
    }
}
