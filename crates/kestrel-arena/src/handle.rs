//! Arena references.
//!
//! An [`ArenaRef`] encodes the location of one allocation inside an
//! [`Arena`](crate::Arena). It is epoch-scoped: the `epoch` field allows
//! O(1) staleness checks after the arena has been cleared.

use std::fmt;

/// Location of one allocation within an arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ArenaRef {
    /// Arena epoch when this allocation was made.
    pub(crate) epoch: u32,
    /// Chunk index: 0 is the inline first chunk, `k` the k-th overflow chunk.
    pub(crate) chunk: u32,
    /// Byte offset within the chunk. Always a multiple of
    /// [`ARENA_ALIGN`](crate::config::ARENA_ALIGN).
    pub(crate) offset: usize,
    /// Requested length in bytes (before alignment rounding).
    pub(crate) len: usize,
}

impl ArenaRef {
    pub(crate) fn new(epoch: u32, chunk: u32, offset: usize, len: usize) -> Self {
        Self {
            epoch,
            chunk,
            offset,
            len,
        }
    }

    /// The arena epoch this reference belongs to.
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Length of the allocation in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether this is a zero-length allocation.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Byte offset within its chunk.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl fmt::Display for ArenaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ArenaRef(epoch={}, chunk={}, off={}, len={})",
            self.epoch, self.chunk, self.offset, self.len
        )
    }
}
