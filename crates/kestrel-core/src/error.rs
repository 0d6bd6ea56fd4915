//! Error types shared across the workspace.
//!
//! [`BagError`] covers every failure the bag manager can report:
//! allocation failure, global-stack overflow, protocol violations by the
//! caller, and frame-stack corruption. The smaller error types are the
//! failure channels of the collaborator traits in [`crate::traits`].
//! [`HandleError`] is the failure channel of the dbref handle registry.

use std::error::Error;
use std::fmt;

use crate::id::{BagId, HandleKind, TargetAddr};

/// A snapshot allocator could not provide the requested bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocError {
    /// Number of bytes requested.
    pub requested: usize,
    /// Bytes the allocator could still have handed out.
    pub available: usize,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "snapshot allocation of {} bytes failed ({} bytes available)",
            self.requested, self.available
        )
    }
}

impl Error for AllocError {}

/// Errors from turning a term into a snapshot or back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompileError {
    /// The allocator handed to the compiler ran out of memory.
    Alloc(AllocError),
    /// The term cannot be represented as a snapshot, or the snapshot
    /// bytes do not decode.
    Malformed {
        /// Description of what went wrong.
        reason: String,
    },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alloc(e) => write!(f, "snapshot allocation failed: {e}"),
            Self::Malformed { reason } => write!(f, "malformed snapshot: {reason}"),
        }
    }
}

impl Error for CompileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Alloc(e) => Some(e),
            Self::Malformed { .. } => None,
        }
    }
}

impl From<AllocError> for CompileError {
    fn from(e: AllocError) -> Self {
        Self::Alloc(e)
    }
}

/// The global evaluation stack cannot hold the requested number of cells,
/// even after the engine tried to grow it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackOverflow {
    /// Cells the operation needed.
    pub required_cells: usize,
    /// The stack limit in cells at the time of failure.
    pub limit_cells: usize,
}

impl fmt::Display for StackOverflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "global stack overflow: {} cells required, limit is {} cells",
            self.required_cells, self.limit_cells
        )
    }
}

impl Error for StackOverflow {}

/// Errors from the solution bag manager.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BagError {
    /// A chunk, frame or snapshot allocation failed. Never retried.
    OutOfMemory {
        /// Bytes (or slots, for frame growth) requested.
        requested: usize,
    },
    /// Accumulated solutions exceed the global stack budget and the
    /// engine's growth path could not make room.
    StackOverflow(StackOverflow),
    /// A solution was added (or a bag collected/suspended) while no
    /// Active bag exists, i.e. outside any collect-all call.
    ///
    /// Reported as a permission error naming the offending goal.
    NoActiveBag {
        /// Rendering of the term or call that was rejected.
        goal: String,
    },
    /// A resume or commit named a frame that is not suspended.
    NotSuspended {
        /// The frame named by the resumption token.
        bag: BagId,
    },
    /// The frame stack is inconsistent: destroying a frame that is not
    /// the topmost, or not Active. This is an engine bug, not a user error.
    FrameCorruption {
        /// Description of the inconsistency.
        reason: String,
    },
    /// The term compiler failed.
    Compile(CompileError),
}

impl BagError {
    /// Whether this error indicates frame-stack corruption.
    ///
    /// Fatal errors must not be turned into user-visible exceptions; the
    /// execution context that produced them can no longer be trusted.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FrameCorruption { .. })
    }
}

impl fmt::Display for BagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory { requested } => {
                write!(f, "out of memory: could not allocate {requested} bytes")
            }
            Self::StackOverflow(e) => write!(f, "{e}"),
            Self::NoActiveBag { goal } => write!(
                f,
                "permission error: no permission to append findall-bag `{goal}' \
                 (continuation in findall/3 generator?)"
            ),
            Self::NotSuspended { bag } => write!(f, "{bag} is not suspended"),
            Self::FrameCorruption { reason } => write!(f, "bag frame stack corrupt: {reason}"),
            Self::Compile(e) => write!(f, "{e}"),
        }
    }
}

impl Error for BagError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StackOverflow(e) => Some(e),
            Self::Compile(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StackOverflow> for BagError {
    fn from(e: StackOverflow) -> Self {
        Self::StackOverflow(e)
    }
}

impl From<CompileError> for BagError {
    fn from(e: CompileError) -> Self {
        match e {
            CompileError::Alloc(AllocError { requested, .. }) => Self::OutOfMemory { requested },
            other => Self::Compile(other),
        }
    }
}

/// Errors from the external reference handle registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandleError {
    /// The token is not a registered handle: never issued, or already
    /// fully released.
    InvalidHandle {
        /// Kind claimed by the token.
        kind: HandleKind,
        /// Target claimed by the token.
        target: TargetAddr,
    },
    /// The token is a handle of the other kind.
    WrongKind {
        /// Kind the caller asked for.
        expected: HandleKind,
        /// Kind of the token.
        found: HandleKind,
    },
    /// Handles cannot be saved to a persistent image.
    NotPersistable {
        /// Kind of the refused handle.
        kind: HandleKind,
        /// The wrapped target.
        target: TargetAddr,
    },
}

impl fmt::Display for HandleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHandle { kind, target } => {
                write!(f, "invalid handle: <{kind}>({target}) is not registered")
            }
            Self::WrongKind { expected, found } => {
                write!(f, "type error: expected {expected} reference, found {found} reference")
            }
            Self::NotPersistable { kind, target } => {
                write!(f, "cannot save <{kind}>({target}): database references are not persistent")
            }
        }
    }
}

impl Error for HandleError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_failure_inside_compiler_is_out_of_memory() {
        let err: BagError = CompileError::Alloc(AllocError {
            requested: 64,
            available: 8,
        })
        .into();
        assert_eq!(err, BagError::OutOfMemory { requested: 64 });
        assert!(!err.is_fatal());
    }

    #[test]
    fn no_active_bag_names_the_goal() {
        let err = BagError::NoActiveBag {
            goal: "foo(X)".into(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("permission error"));
        assert!(msg.contains("foo(X)"));
    }

    #[test]
    fn only_corruption_is_fatal() {
        assert!(BagError::FrameCorruption {
            reason: "x".into()
        }
        .is_fatal());
        assert!(!BagError::NotSuspended { bag: BagId(1) }.is_fatal());
    }

    #[test]
    fn stack_overflow_exposes_source() {
        let err = BagError::from(StackOverflow {
            required_cells: 10,
            limit_cells: 4,
        });
        assert!(err.source().is_some());
    }

    #[test]
    fn not_persistable_names_target() {
        let err = HandleError::NotPersistable {
            kind: HandleKind::Record,
            target: TargetAddr(0x40),
        };
        assert_eq!(
            err.to_string(),
            "cannot save <record>(0x40): database references are not persistent"
        );
    }
}
