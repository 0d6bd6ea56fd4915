//! Per-kind behaviour of clause and record handles.

use std::fmt;

use kestrel_core::{Database, HandleKind, TargetAddr};

/// What differs between the two handle kinds.
pub trait KindHooks: Sync {
    /// The kind these hooks serve.
    fn kind(&self) -> HandleKind;

    /// Deallocate an erased target whose last reference was released.
    fn release_erased(&self, db: &mut dyn Database, target: TargetAddr);

    /// Free the wrapper of a target whose storage is already gone.
    fn release_gone(&self, db: &mut dyn Database, target: TargetAddr) {
        db.discard_wrapper(self.kind(), target);
    }

    /// Print a handle as `<kind>(0x...)`.
    fn write(&self, f: &mut fmt::Formatter<'_>, target: TargetAddr) -> fmt::Result {
        write!(f, "<{}>({})", self.kind().tag(), target)
    }

    /// Name printed for a placeholder loaded from a saved image.
    fn saved_name(&self) -> &'static str;
}

struct ClauseHooks;
struct RecordHooks;

impl KindHooks for ClauseHooks {
    fn kind(&self) -> HandleKind {
        HandleKind::Clause
    }

    fn release_erased(&self, db: &mut dyn Database, target: TargetAddr) {
        db.reclaim(HandleKind::Clause, target);
        db.erased_ref_released(target);
    }

    fn saved_name(&self) -> &'static str {
        "<saved-clause-ref>"
    }
}

impl KindHooks for RecordHooks {
    fn kind(&self) -> HandleKind {
        HandleKind::Record
    }

    fn release_erased(&self, db: &mut dyn Database, target: TargetAddr) {
        db.reclaim(HandleKind::Record, target);
    }

    fn saved_name(&self) -> &'static str {
        "<saved-record-ref>"
    }
}

static CLAUSE: ClauseHooks = ClauseHooks;
static RECORD: RecordHooks = RecordHooks;

/// The hooks for `kind`.
pub fn hooks(kind: HandleKind) -> &'static dyn KindHooks {
    match kind {
        HandleKind::Clause => &CLAUSE,
        HandleKind::Record => &RECORD,
    }
}

/// Placeholder produced when loading a handle from a saved image.
///
/// Carries a fresh identity and no target: it can never be turned back
/// into a live handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SavedRef {
    pub(crate) kind: HandleKind,
    pub(crate) serial: u64,
}

impl SavedRef {
    /// Kind of the handle that was saved.
    pub fn kind(&self) -> HandleKind {
        self.kind
    }

    /// Identity of this placeholder, unique within its registry.
    pub fn serial(&self) -> u64 {
        self.serial
    }
}

impl fmt::Display for SavedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(hooks(self.kind).saved_name())
    }
}
