//! Arena configuration parameters.

use crate::error::ArenaError;

/// Size of the inline first chunk of every [`Arena`](crate::Arena).
///
/// Large enough for the snapshots of a typical small `findall/3` call,
/// so most bags never touch the system allocator for snapshot storage.
pub const FIRST_CHUNK_BYTES: usize = 256 * std::mem::size_of::<usize>();

/// Alignment of every offset handed out by an arena.
pub const ARENA_ALIGN: usize = std::mem::size_of::<usize>();

/// Configuration for the chunked arena.
///
/// Validated by [`ArenaConfig::validate`]; all values are immutable after
/// the arena is created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Base size of overflow chunks in bytes.
    ///
    /// The k-th overflow chunk (counting from 1) has capacity
    /// `chunk_base_bytes << k`, or the request size if that is larger.
    /// Default: 4000.
    pub chunk_base_bytes: usize,

    /// Upper bound on the total bytes held by one arena, inline chunk
    /// included. Allocations beyond it fail with `OutOfMemory`.
    ///
    /// Default: `usize::MAX` (bounded only by the system allocator).
    pub max_total_bytes: usize,
}

impl ArenaConfig {
    /// Default overflow chunk base size.
    pub const DEFAULT_CHUNK_BASE_BYTES: usize = 4000;

    /// Create a config with default values.
    pub fn new() -> Self {
        Self {
            chunk_base_bytes: Self::DEFAULT_CHUNK_BASE_BYTES,
            max_total_bytes: usize::MAX,
        }
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.chunk_base_bytes == 0 {
            return Err(ArenaError::InvalidConfig {
                reason: "chunk_base_bytes must be > 0".into(),
            });
        }
        if self.max_total_bytes < FIRST_CHUNK_BYTES {
            return Err(ArenaError::InvalidConfig {
                reason: format!(
                    "max_total_bytes must be >= {FIRST_CHUNK_BYTES} (got {})",
                    self.max_total_bytes
                ),
            });
        }
        Ok(())
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new()
    }
}
