//! Strongly-typed identifiers.

use std::fmt;

/// Identifies one bag frame within an execution context.
///
/// Ids are allocated from a per-context monotonic counter, so a frame
/// pushed at the same depth as an earlier, destroyed frame never reuses
/// its id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BagId(pub u64);

impl fmt::Display for BagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bag#{}", self.0)
    }
}

/// Address of an engine-owned clause or record.
///
/// Only the numeric value is used: it is the interning key for handles
/// and is never dereferenced by this workspace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetAddr(pub usize);

impl fmt::Display for TargetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<usize> for TargetAddr {
    fn from(v: usize) -> Self {
        Self(v)
    }
}

/// The two kinds of external database reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HandleKind {
    /// Reference to a clause of a dynamic predicate.
    Clause,
    /// Reference to a recorded term.
    Record,
}

impl HandleKind {
    /// Tag used when printing a handle, e.g. `clause` in `<clause>(0x10)`.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Clause => "clause",
            Self::Record => "record",
        }
    }
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
