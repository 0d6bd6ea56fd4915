//! Bag frames.

use kestrel_arena::{Arena, ArenaConfig, ArenaError, ArenaRef, SegStack};
use kestrel_core::BagId;

use crate::config::ANSWER_INLINE_SLOTS;

/// Lifecycle state of a bag frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BagState {
    /// Accepting solutions.
    Active,
    /// Checkpointed after delivering a chunk; solutions go to the nearest
    /// Active ancestor until the frame is resumed or committed.
    Suspended,
    /// Popped off the frame stack. Terminal.
    Destroyed,
}

/// One stored solution: where its snapshot lives and how many global
/// stack cells materializing it will take.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Snapshot {
    /// Location of the snapshot bytes in the bag's arena.
    pub data: ArenaRef,
    /// Global-stack cells needed to materialize it.
    pub gsize: usize,
}

/// Frame for one in-progress or suspended collect-all call.
///
/// The parent link is implicit: it is the frame directly below this one
/// on the frame stack.
pub(crate) struct Bag {
    pub(crate) id: BagId,
    pub(crate) state: BagState,
    /// Solutions already handed out in earlier chunks.
    pub(crate) suspended_solutions: usize,
    /// Solutions added since the last suspend.
    pub(crate) solutions: usize,
    /// Sum of `Snapshot::gsize` since the last suspend.
    pub(crate) gsize: usize,
    pub(crate) records: Arena,
    pub(crate) answers: SegStack<Snapshot, ANSWER_INLINE_SLOTS>,
}

impl Bag {
    pub(crate) fn new(id: BagId, config: ArenaConfig) -> Result<Self, ArenaError> {
        Ok(Self {
            id,
            state: BagState::Active,
            suspended_solutions: 0,
            solutions: 0,
            gsize: 0,
            records: Arena::new(config)?,
            answers: SegStack::new(),
        })
    }

    /// Running total reported to the caller of `add_solution`.
    pub(crate) fn total_solutions(&self) -> usize {
        self.solutions + self.suspended_solutions
    }

    pub(crate) fn info(&self, parent: Option<BagId>) -> BagInfo {
        BagInfo {
            id: self.id,
            parent,
            state: self.state,
            solutions: self.solutions,
            suspended_solutions: self.suspended_solutions,
            gsize: self.gsize,
            pending_answers: self.answers.len(),
            arena_bytes: self.records.used_bytes(),
        }
    }
}

/// Point-in-time view of a bag frame, for diagnostics and tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BagInfo {
    /// The frame's id.
    pub id: BagId,
    /// The enclosing frame, if any.
    pub parent: Option<BagId>,
    /// Lifecycle state.
    pub state: BagState,
    /// Solutions added since the last suspend.
    pub solutions: usize,
    /// Solutions delivered in earlier chunks.
    pub suspended_solutions: usize,
    /// Accumulated global-stack size estimate.
    pub gsize: usize,
    /// Answers stored and not yet collected.
    pub pending_answers: usize,
    /// Arena bytes in use.
    pub arena_bytes: usize,
}
