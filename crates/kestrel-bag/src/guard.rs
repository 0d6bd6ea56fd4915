//! Synchronization between bag mutation and the atom liveness scan.
//!
//! The atom garbage collector may run on another thread and must see
//! every snapshot stored in every bag of every context, including bags
//! that are suspended. Each context therefore keeps its frame stack
//! behind one mutex, the [`GcGuard`]. The owning thread takes it for
//! every frame push/pop, arena clear, answer push and answer pop; the
//! scanner takes it for a whole walk through a [`ScanHandle`].
//!
//! There is no unlocked fast path: every answer pop during `collect`
//! takes the lock, so a scanner observes each snapshot either fully
//! stored or not at all.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use kestrel_arena::{ArenaError, SegStack};
use kestrel_core::{AtomMarker, BagId};
use tracing::warn;

use crate::bag::{Bag, BagState};

/// The frame stack of one execution context. Only reachable through the
/// guard's lock.
pub(crate) struct Frames {
    pub(crate) bags: SegStack<Bag, 1>,
}

impl Frames {
    fn new() -> Self {
        Self {
            bags: SegStack::new(),
        }
    }

    /// The nearest Active frame, walking down through Suspended ones.
    pub(crate) fn current(&self) -> Option<&Bag> {
        self.bags
            .iter()
            .rev()
            .find(|bag| bag.state == BagState::Active)
    }

    pub(crate) fn current_mut(&mut self) -> Option<&mut Bag> {
        self.bags
            .iter_mut()
            .rev()
            .find(|bag| bag.state == BagState::Active)
    }

    pub(crate) fn find(&self, id: BagId) -> Option<&Bag> {
        self.bags.iter().rev().find(|bag| bag.id == id)
    }

    pub(crate) fn find_mut(&mut self, id: BagId) -> Option<&mut Bag> {
        self.bags.iter_mut().rev().find(|bag| bag.id == id)
    }

    /// The frame directly below `id`.
    pub(crate) fn parent_of(&self, id: BagId) -> Option<BagId> {
        self.bags
            .iter()
            .rev()
            .skip_while(|bag| bag.id != id)
            .nth(1)
            .map(|bag| bag.id)
    }

    pub(crate) fn push(&mut self, bag: Bag) -> Result<(), ArenaError> {
        self.bags.push(bag).map(|_| ())
    }
}

/// Per-context mutex over the bag frame stack.
pub struct GcGuard {
    frames: Arc<Mutex<Frames>>,
}

impl GcGuard {
    pub(crate) fn new() -> Self {
        Self {
            frames: Arc::new(Mutex::new(Frames::new())),
        }
    }

    /// Take the lock.
    ///
    /// A scanner that panicked while holding the lock leaves the frames
    /// untouched (it only reads), so poisoning is ignored.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Frames> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A handle the liveness scanner can keep and use from any thread.
    pub fn scan_handle(&self) -> ScanHandle {
        ScanHandle {
            frames: Arc::clone(&self.frames),
        }
    }
}

/// Scanner-side view of one context's bags.
///
/// Cheap to clone, `Send + Sync`. Outlives the context safely: once the
/// context is dropped the handle sees an empty frame stack.
#[derive(Clone)]
pub struct ScanHandle {
    frames: Arc<Mutex<Frames>>,
}

// Compile-time assertion: ScanHandle must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<ScanHandle>();
};

impl ScanHandle {
    /// Visit every stored snapshot of every frame, topmost frame first.
    ///
    /// Suspended frames are included. Holds the context's lock for the
    /// whole walk.
    pub fn scan(&self, mut visit: impl FnMut(BagId, &[u8])) {
        let frames = self.frames.lock().unwrap_or_else(PoisonError::into_inner);
        for bag in frames.bags.iter().rev() {
            bag.answers.scan(|snapshot| match bag.records.get(&snapshot.data) {
                Ok(bytes) => visit(bag.id, bytes),
                Err(e) => warn!(bag = %bag.id, error = %e, "unresolvable snapshot during scan"),
            });
        }
    }

    /// Mark the atoms of every stored snapshot.
    pub fn mark_atoms(&self, marker: &dyn AtomMarker) {
        self.scan(|_, bytes| marker.mark_snapshot(bytes));
    }

    /// Number of frames currently on the context's stack.
    pub fn depth(&self) -> usize {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .bags
            .len()
    }
}
