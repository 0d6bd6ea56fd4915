//! Arena-specific error types.

use std::error::Error;
use std::fmt;

use kestrel_core::BagError;

/// Errors that can occur during arena and segmented-stack operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// A new chunk could not be obtained, either because the configured
    /// budget is exhausted or because the system allocator refused.
    OutOfMemory {
        /// Number of bytes requested.
        requested: usize,
        /// Bytes held at the time of the request.
        capacity: usize,
    },
    /// An [`ArenaRef`](crate::ArenaRef) from before the last
    /// [`Arena::clear`](crate::Arena::clear).
    StaleRef {
        /// The epoch encoded in the reference.
        ref_epoch: u32,
        /// The arena's current epoch.
        arena_epoch: u32,
    },
    /// A reference that does not lie within an allocated region.
    OutOfBounds {
        /// Chunk index encoded in the reference.
        chunk: u32,
        /// Byte offset encoded in the reference.
        offset: usize,
        /// Length encoded in the reference.
        len: usize,
    },
    /// The arena configuration is invalid.
    InvalidConfig {
        /// Description of the violated constraint.
        reason: String,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory {
                requested,
                capacity,
            } => {
                write!(
                    f,
                    "arena out of memory: requested {requested} bytes, holding {capacity} bytes"
                )
            }
            Self::StaleRef {
                ref_epoch,
                arena_epoch,
            } => {
                write!(
                    f,
                    "stale arena reference: epoch {ref_epoch}, arena epoch {arena_epoch}"
                )
            }
            Self::OutOfBounds { chunk, offset, len } => {
                write!(
                    f,
                    "arena reference out of bounds: chunk {chunk}, offset {offset}, len {len}"
                )
            }
            Self::InvalidConfig { reason } => write!(f, "invalid arena config: {reason}"),
        }
    }
}

impl Error for ArenaError {}

impl From<ArenaError> for BagError {
    fn from(e: ArenaError) -> Self {
        match e {
            ArenaError::OutOfMemory { requested, .. } => BagError::OutOfMemory { requested },
            other => BagError::FrameCorruption {
                reason: other.to_string(),
            },
        }
    }
}
