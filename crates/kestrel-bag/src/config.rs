//! Bag manager configuration and validation.

use std::error::Error;
use std::fmt;

use kestrel_arena::{ArenaConfig, ArenaError};

/// Number of answer slots stored inline in every bag before its answer
/// stack overflows to the heap.
pub const ANSWER_INLINE_SLOTS: usize = 64;

/// Configuration for a [`FindallContext`](crate::FindallContext).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BagConfig {
    /// Arena settings for every bag's private snapshot arena.
    pub arena: ArenaConfig,

    /// Global-stack cells charged per solution on top of its snapshot
    /// size: the list cell that links it into the result. Default: 3.
    pub cells_per_solution: usize,
}

impl BagConfig {
    /// Default per-solution overhead in cells.
    pub const DEFAULT_CELLS_PER_SOLUTION: usize = 3;

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.arena.validate().map_err(ConfigError::Arena)?;
        if self.cells_per_solution == 0 {
            return Err(ConfigError::ZeroCellsPerSolution);
        }
        Ok(())
    }
}

impl Default for BagConfig {
    fn default() -> Self {
        Self {
            arena: ArenaConfig::default(),
            cells_per_solution: Self::DEFAULT_CELLS_PER_SOLUTION,
        }
    }
}

/// Errors detected by [`BagConfig::validate`].
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Arena configuration is invalid.
    Arena(ArenaError),
    /// `cells_per_solution` is zero.
    ZeroCellsPerSolution,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arena(e) => write!(f, "arena: {e}"),
            Self::ZeroCellsPerSolution => write!(f, "cells_per_solution must be > 0"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Arena(e) => Some(e),
            Self::ZeroCellsPerSolution => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert_eq!(BagConfig::default().validate(), Ok(()));
    }

    #[test]
    fn zero_overhead_rejected() {
        let config = BagConfig {
            cells_per_solution: 0,
            ..BagConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroCellsPerSolution));
    }

    #[test]
    fn arena_errors_are_wrapped() {
        let config = BagConfig {
            arena: ArenaConfig {
                chunk_base_bytes: 0,
                ..ArenaConfig::default()
            },
            ..BagConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Arena(_))));
    }
}
