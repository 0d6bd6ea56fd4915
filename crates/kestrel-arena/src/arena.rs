//! Chunked bump allocator with bulk release.
//!
//! An [`Arena`] starts with an inline first chunk of
//! [`FIRST_CHUNK_BYTES`] and overflows into heap chunks whose capacity
//! doubles with each new chunk. Bytes are never freed individually: the
//! only way to release memory is [`Arena::clear`], which drops every
//! overflow chunk and invalidates all outstanding [`ArenaRef`]s.

use kestrel_core::{AllocError, SnapshotAllocator};

use crate::config::{ArenaConfig, ARENA_ALIGN, FIRST_CHUNK_BYTES};
use crate::error::ArenaError;
use crate::handle::ArenaRef;

/// One heap-allocated overflow chunk.
struct Chunk {
    /// Backing storage, zero-filled to full capacity at creation.
    data: Vec<u8>,
    /// Bump pointer in bytes.
    used: usize,
}

impl Chunk {
    fn with_capacity(capacity: usize) -> Option<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(capacity).ok()?;
        data.resize(capacity, 0);
        Some(Self { data, used: 0 })
    }
}

/// Bump allocator over an inline first chunk plus geometric overflow chunks.
///
/// Allocation only ever bumps the most recent chunk. When it cannot hold
/// the (alignment-rounded) request, a new chunk is linked in and the
/// remaining space of the old head is abandoned until the next clear.
pub struct Arena {
    /// Inline first chunk. Never released.
    first: [u8; FIRST_CHUNK_BYTES],
    /// Bump pointer into `first`.
    first_used: usize,
    /// Overflow chunks, oldest first. The last one is the head.
    chunks: Vec<Chunk>,
    /// Incremented by every `clear()`; stamped into each `ArenaRef`.
    epoch: u32,
    config: ArenaConfig,
}

impl Arena {
    /// Create an empty arena.
    ///
    /// Returns `Err(ArenaError::InvalidConfig)` if `config` fails validation.
    pub fn new(config: ArenaConfig) -> Result<Self, ArenaError> {
        config.validate()?;
        Ok(Self {
            first: [0; FIRST_CHUNK_BYTES],
            first_used: 0,
            chunks: Vec::new(),
            epoch: 0,
            config,
        })
    }

    /// Allocate `bytes` bytes and return a reference to them.
    ///
    /// The request is rounded up to [`ARENA_ALIGN`]; the returned offset is
    /// always aligned. Newly allocated bytes are zeroed.
    pub fn alloc(&mut self, bytes: usize) -> Result<ArenaRef, ArenaError> {
        let rounded = round_up(bytes).ok_or(ArenaError::OutOfMemory {
            requested: bytes,
            capacity: self.capacity_bytes(),
        })?;

        let head = self.chunks.len();
        let (used, capacity) = match self.chunks.last() {
            Some(chunk) => (chunk.used, chunk.data.len()),
            None => (self.first_used, FIRST_CHUNK_BYTES),
        };
        if rounded <= capacity - used {
            self.set_used(head, used + rounded);
            let r = ArenaRef::new(self.epoch, head as u32, used, bytes);
            self.fill_zero(&r);
            return Ok(r);
        }

        let capacity = self.next_chunk_capacity(rounded);
        let held = self.capacity_bytes();
        let total = held.checked_add(capacity);
        if total.is_none_or(|total| total > self.config.max_total_bytes) {
            return Err(ArenaError::OutOfMemory {
                requested: bytes,
                capacity: held,
            });
        }
        let mut chunk = Chunk::with_capacity(capacity).ok_or(ArenaError::OutOfMemory {
            requested: bytes,
            capacity: held,
        })?;
        chunk.used = rounded;
        self.chunks.push(chunk);
        Ok(ArenaRef::new(self.epoch, self.chunks.len() as u32, 0, bytes))
    }

    /// Shared view of an allocation.
    pub fn get(&self, r: &ArenaRef) -> Result<&[u8], ArenaError> {
        self.check(r)?;
        let data: &[u8] = match r.chunk {
            0 => &self.first,
            k => &self.chunks[k as usize - 1].data,
        };
        Ok(&data[r.offset..r.offset + r.len])
    }

    /// Mutable view of an allocation.
    pub fn get_mut(&mut self, r: &ArenaRef) -> Result<&mut [u8], ArenaError> {
        self.check(r)?;
        let data: &mut [u8] = match r.chunk {
            0 => &mut self.first,
            k => &mut self.chunks[k as usize - 1].data,
        };
        Ok(&mut data[r.offset..r.offset + r.len])
    }

    /// Release every overflow chunk and reset the inline chunk.
    ///
    /// All references handed out so far become stale. O(chunk count).
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.first_used = 0;
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Bytes handed out since the last clear, including alignment padding
    /// but not the abandoned tail of superseded chunks.
    pub fn used_bytes(&self) -> usize {
        self.first_used + self.chunks.iter().map(|c| c.used).sum::<usize>()
    }

    /// Bytes held across all chunks, inline chunk included.
    pub fn capacity_bytes(&self) -> usize {
        FIRST_CHUNK_BYTES + self.chunks.iter().map(|c| c.data.len()).sum::<usize>()
    }

    /// Number of chunks, inline chunk included.
    pub fn chunk_count(&self) -> usize {
        1 + self.chunks.len()
    }

    /// Current epoch. Advances on every clear.
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Free bytes left in the head chunk.
    pub fn head_remaining(&self) -> usize {
        match self.chunks.last() {
            Some(chunk) => chunk.data.len() - chunk.used,
            None => FIRST_CHUNK_BYTES - self.first_used,
        }
    }

    /// Start an allocator that records the location of the snapshot a
    /// term compiler writes.
    pub fn allocator(&mut self) -> ArenaAllocator<'_> {
        ArenaAllocator {
            arena: self,
            last: None,
        }
    }

    fn next_chunk_capacity(&self, rounded: usize) -> usize {
        let shift = self.chunk_count() as u32;
        let grown = 1usize
            .checked_shl(shift)
            .and_then(|factor| self.config.chunk_base_bytes.checked_mul(factor))
            .unwrap_or(usize::MAX);
        grown.max(rounded)
    }

    fn set_used(&mut self, chunk: usize, used: usize) {
        match chunk {
            0 => self.first_used = used,
            k => self.chunks[k - 1].used = used,
        }
    }

    fn fill_zero(&mut self, r: &ArenaRef) {
        let data: &mut [u8] = match r.chunk {
            0 => &mut self.first,
            k => &mut self.chunks[k as usize - 1].data,
        };
        data[r.offset..r.offset + r.len].fill(0);
    }

    fn check(&self, r: &ArenaRef) -> Result<(), ArenaError> {
        if r.epoch != self.epoch {
            return Err(ArenaError::StaleRef {
                ref_epoch: r.epoch,
                arena_epoch: self.epoch,
            });
        }
        let used = match r.chunk {
            0 => self.first_used,
            k => match self.chunks.get(k as usize - 1) {
                Some(chunk) => chunk.used,
                None => 0,
            },
        };
        let in_bounds = r
            .offset
            .checked_add(r.len)
            .is_some_and(|end| end <= used);
        if !in_bounds || (r.chunk as usize) > self.chunks.len() {
            return Err(ArenaError::OutOfBounds {
                chunk: r.chunk,
                offset: r.offset,
                len: r.len,
            });
        }
        Ok(())
    }
}

fn round_up(bytes: usize) -> Option<usize> {
    Some(bytes.checked_add(ARENA_ALIGN - 1)? & !(ARENA_ALIGN - 1))
}

/// [`SnapshotAllocator`] over an [`Arena`].
///
/// Remembers the most recent allocation so the caller can find the
/// snapshot the compiler wrote.
pub struct ArenaAllocator<'a> {
    arena: &'a mut Arena,
    last: Option<ArenaRef>,
}

impl ArenaAllocator<'_> {
    /// The most recent allocation made through this allocator.
    pub fn last(&self) -> Option<ArenaRef> {
        self.last
    }
}

impl SnapshotAllocator for ArenaAllocator<'_> {
    fn alloc(&mut self, bytes: usize) -> Result<&mut [u8], AllocError> {
        let available = self.arena.head_remaining();
        let r = self
            .arena
            .alloc(bytes)
            .map_err(|_| AllocError {
                requested: bytes,
                available,
            })?;
        self.last = Some(r);
        self.arena.get_mut(&r).map_err(|_| AllocError {
            requested: bytes,
            available,
        })
    }
}
