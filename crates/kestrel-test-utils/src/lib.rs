//! Test utilities and mock collaborators for Kestrel development.
//!
//! Provides mock implementations of the engine-side traits
//! ([`TermCompiler`](kestrel_core::TermCompiler),
//! [`GlobalStack`](kestrel_core::GlobalStack),
//! [`AtomMarker`](kestrel_core::AtomMarker),
//! [`Database`](kestrel_core::Database)) over a small [`Term`] model.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod database;
pub mod term;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use kestrel_core::{AtomMarker, GlobalStack, StackOverflow};

pub use database::{MockDatabase, MockTarget};
pub use term::{atoms_of, CodecCompiler, Term};

/// Mock global stack with a cell budget and an optional one-shot growth.
///
/// `cons` charges three cells per list cell, like a real engine.
pub struct MockStack {
    limit_cells: usize,
    used_cells: usize,
    growth: Option<usize>,
    grow_calls: usize,
}

impl MockStack {
    /// A stack that can never grow.
    pub fn new(limit_cells: usize) -> Self {
        Self {
            limit_cells,
            used_cells: 0,
            growth: None,
            grow_calls: 0,
        }
    }

    /// A stack whose first `grow` call adds `extra_cells` to the limit.
    pub fn with_growth(limit_cells: usize, extra_cells: usize) -> Self {
        Self {
            growth: Some(extra_cells),
            ..Self::new(limit_cells)
        }
    }

    /// Effectively unlimited.
    pub fn unbounded() -> Self {
        Self::new(usize::MAX / 2)
    }

    pub fn used_cells(&self) -> usize {
        self.used_cells
    }

    pub fn grow_calls(&self) -> usize {
        self.grow_calls
    }
}

impl GlobalStack for MockStack {
    type Term = Term;

    fn limit_cells(&self) -> usize {
        self.limit_cells
    }

    fn has_space(&self, cells: usize) -> bool {
        self.used_cells.saturating_add(cells) <= self.limit_cells
    }

    fn grow(&mut self, cells: usize) -> Result<(), StackOverflow> {
        self.grow_calls += 1;
        if let Some(extra) = self.growth.take() {
            self.limit_cells = self.limit_cells.saturating_add(extra);
        }
        if self.has_space(cells) {
            Ok(())
        } else {
            Err(StackOverflow {
                required_cells: cells,
                limit_cells: self.limit_cells,
            })
        }
    }

    fn cons(&mut self, head: Term, tail: Term) -> Term {
        self.used_cells += 3;
        Term::Cons(Box::new(head), Box::new(tail))
    }
}

/// Atom marker that records what it was asked to mark.
///
/// Snapshots that fail to decode are counted as corrupt rather than
/// panicking, so concurrent tests can assert on the count.
pub struct RecordingMarker {
    active: AtomicBool,
    marked: Mutex<Vec<String>>,
    snapshots: AtomicUsize,
    corrupt: AtomicUsize,
}

impl RecordingMarker {
    pub fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            marked: Mutex::new(Vec::new()),
            snapshots: AtomicUsize::new(0),
            corrupt: AtomicUsize::new(0),
        }
    }

    /// Simulate an atom GC in progress (or not).
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }

    pub fn marked_atoms(&self) -> Vec<String> {
        self.marked.lock().unwrap().clone()
    }

    pub fn snapshots_seen(&self) -> usize {
        self.snapshots.load(Ordering::Acquire)
    }

    pub fn corrupt_seen(&self) -> usize {
        self.corrupt.load(Ordering::Acquire)
    }
}

impl Default for RecordingMarker {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomMarker for RecordingMarker {
    fn gc_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn mark_snapshot(&self, snapshot: &[u8]) {
        self.snapshots.fetch_add(1, Ordering::AcqRel);
        match atoms_of(snapshot) {
            Ok(atoms) => self.marked.lock().unwrap().extend(atoms),
            Err(_) => {
                self.corrupt.fetch_add(1, Ordering::AcqRel);
            }
        }
    }
}
