//! In-memory clause/record database.

use std::collections::HashMap;

use kestrel_core::{Database, HandleKind, TargetAddr, TargetState};

/// Per-target bookkeeping of [`MockDatabase`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MockTarget {
    pub state: TargetState,
    pub referenced: bool,
}

/// Database mock that follows the erase/reclaim rules of a real one:
/// erasing an externally referenced target only marks it pending.
#[derive(Debug, Default)]
pub struct MockDatabase {
    targets: HashMap<(HandleKind, TargetAddr), MockTarget>,
    reclaimed: Vec<(HandleKind, TargetAddr)>,
    discarded: Vec<(HandleKind, TargetAddr)>,
    erased_refs: usize,
}

impl MockDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a live target.
    pub fn insert(&mut self, kind: HandleKind, addr: TargetAddr) {
        self.targets.insert(
            (kind, addr),
            MockTarget {
                state: TargetState::Live,
                referenced: false,
            },
        );
    }

    /// Logically erase a target. Referenced targets stay pending until
    /// their last handle is released.
    pub fn erase(&mut self, kind: HandleKind, addr: TargetAddr) {
        let Some(target) = self.targets.get_mut(&(kind, addr)) else {
            return;
        };
        if target.state != TargetState::Live {
            return;
        }
        if target.referenced {
            target.state = TargetState::ErasedPending;
            if kind == HandleKind::Clause {
                self.erased_refs += 1;
            }
        } else {
            target.state = TargetState::Gone;
            self.reclaimed.push((kind, addr));
        }
    }

    /// Release a target's storage while a wrapper survives.
    pub fn drop_storage(&mut self, kind: HandleKind, addr: TargetAddr) {
        if let Some(target) = self.targets.get_mut(&(kind, addr)) {
            target.state = TargetState::Gone;
        }
    }

    pub fn target(&self, kind: HandleKind, addr: TargetAddr) -> Option<MockTarget> {
        self.targets.get(&(kind, addr)).copied()
    }

    /// Targets physically deallocated, in order.
    pub fn reclaimed(&self) -> &[(HandleKind, TargetAddr)] {
        &self.reclaimed
    }

    /// Wrappers freed after their storage was gone, in order.
    pub fn discarded_wrappers(&self) -> &[(HandleKind, TargetAddr)] {
        &self.discarded
    }

    /// Outstanding external references to erased clauses.
    pub fn erased_refs(&self) -> usize {
        self.erased_refs
    }
}

impl Database for MockDatabase {
    fn target_state(&self, kind: HandleKind, addr: TargetAddr) -> TargetState {
        self.targets
            .get(&(kind, addr))
            .map_or(TargetState::Gone, |target| target.state)
    }

    fn set_external_ref(&mut self, kind: HandleKind, addr: TargetAddr, referenced: bool) {
        if let Some(target) = self.targets.get_mut(&(kind, addr)) {
            target.referenced = referenced;
        }
    }

    fn reclaim(&mut self, kind: HandleKind, addr: TargetAddr) {
        if let Some(target) = self.targets.get_mut(&(kind, addr)) {
            target.state = TargetState::Gone;
        }
        self.reclaimed.push((kind, addr));
    }

    fn discard_wrapper(&mut self, kind: HandleKind, addr: TargetAddr) {
        self.targets.remove(&(kind, addr));
        self.discarded.push((kind, addr));
    }

    fn erased_ref_released(&mut self, _addr: TargetAddr) {
        self.erased_refs = self.erased_refs.saturating_sub(1);
    }
}
