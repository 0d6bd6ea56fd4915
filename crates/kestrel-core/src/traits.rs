//! Collaborator traits consumed by the bag manager and handle registry.
//!
//! None of these are implemented in this workspace outside of test mocks:
//! the engine supplies the term compiler, the global stack, the atom
//! marker, and the clause/record database.

use crate::error::{AllocError, CompileError, StackOverflow};
use crate::id::{HandleKind, TargetAddr};

/// Byte allocator handed to a [`TermCompiler`].
///
/// The bag manager passes an allocator backed by the bag's private arena,
/// so snapshot storage lives exactly as long as the bag's current chunk.
pub trait SnapshotAllocator {
    /// Allocate `bytes` bytes of zeroed, pointer-aligned storage.
    fn alloc(&mut self, bytes: usize) -> Result<&mut [u8], AllocError>;
}

/// Result of compiling a term into a snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompiledTerm {
    /// Number of global-stack cells needed to materialize the snapshot.
    pub gsize: usize,
}

/// Turns live terms into self-contained snapshots and back.
///
/// A compiler must obtain the storage for one snapshot with a single
/// [`SnapshotAllocator::alloc`] call.
pub trait TermCompiler {
    /// The engine's term representation.
    type Term;

    /// Copy `term` into storage obtained from `alloc`.
    fn compile(
        &self,
        term: &Self::Term,
        alloc: &mut dyn SnapshotAllocator,
    ) -> Result<CompiledTerm, CompileError>;

    /// Build a fresh term from snapshot bytes previously written by
    /// [`compile`](TermCompiler::compile).
    fn materialize(&self, snapshot: &[u8]) -> Result<Self::Term, CompileError>;
}

/// The engine's global evaluation stack, as seen by `collect`.
pub trait GlobalStack {
    /// The engine's term representation.
    type Term;

    /// Current stack budget in cells.
    fn limit_cells(&self) -> usize;

    /// Whether `cells` more cells can be allocated without growing.
    fn has_space(&self, cells: usize) -> bool;

    /// Try to make room for `cells` more cells, beyond those already in
    /// use, by garbage collection or by growing the stack. Returns `Err`
    /// if that conclusively cannot help.
    fn grow(&mut self, cells: usize) -> Result<(), StackOverflow>;

    /// Prepend `head` to the list `tail`.
    fn cons(&mut self, head: Self::Term, tail: Self::Term) -> Self::Term;
}

/// The atom-liveness marker.
///
/// Called from the owning thread while materializing answers and from a
/// scanning thread while walking bags, hence `Sync`.
pub trait AtomMarker: Sync {
    /// Whether an atom garbage collection is currently marking.
    fn gc_active(&self) -> bool;

    /// Mark every atom referenced by a stored snapshot.
    fn mark_snapshot(&self, snapshot: &[u8]);
}

/// Lifecycle of a clause or record, owned by the database.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetState {
    /// Not erased.
    Live,
    /// Logically erased; physical deallocation is deferred until no
    /// external reference remains.
    ErasedPending,
    /// Storage has been released. Only a wrapper may survive.
    Gone,
}

/// The clause/record database, as seen by the handle registry.
pub trait Database {
    /// Erasure state of a target.
    fn target_state(&self, kind: HandleKind, addr: TargetAddr) -> TargetState;

    /// Set or clear the "externally referenced" mark that keeps the
    /// database from deallocating a target.
    fn set_external_ref(&mut self, kind: HandleKind, addr: TargetAddr, referenced: bool);

    /// Physically deallocate an erased target (ErasedPending to Gone).
    fn reclaim(&mut self, kind: HandleKind, addr: TargetAddr);

    /// Free the wrapper of a target whose storage is already gone.
    fn discard_wrapper(&mut self, kind: HandleKind, addr: TargetAddr);

    /// An external reference to an erased clause was dropped.
    ///
    /// The database keeps a count of such references to decide when
    /// erased clauses may be garbage collected.
    fn erased_ref_released(&mut self, _addr: TargetAddr) {}
}
