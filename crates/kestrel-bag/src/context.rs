//! The bag manager: one frame stack per execution context.

use std::fmt;

use kestrel_core::{
    AtomMarker, BagError, BagId, CompileError, GlobalStack, StackOverflow, TermCompiler,
};
use tracing::{debug, trace};

use crate::bag::{Bag, BagInfo, BagState, Snapshot};
use crate::config::{BagConfig, ConfigError};
use crate::guard::{GcGuard, ScanHandle};
use crate::scope::BagScope;

/// Resumption token handed out when a bag is suspended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct SuspendToken {
    bag: BagId,
}

impl SuspendToken {
    /// The suspended frame.
    pub fn bag(&self) -> BagId {
        self.bag
    }
}

/// How control enters [`FindallContext::suspend`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reentry {
    /// A chunk was just delivered: checkpoint and yield.
    FirstCall,
    /// Backtracking into the suspension point: produce the next chunk.
    Redo(SuspendToken),
    /// The caller committed (cut) past the suspension point.
    Cut(SuspendToken),
}

/// Outcome of [`FindallContext::suspend`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Suspension {
    /// The bag is suspended; the call succeeds with a resumption token.
    Yield(SuspendToken),
    /// The bag is Active again and the call fails, forcing the generator
    /// to produce more solutions.
    Fail,
    /// The bag is Active again and the call succeeds deterministically.
    Succeed,
}

/// Owner of one execution context's bag frames.
///
/// All operations act on the implicit current bag: the topmost Active
/// frame, skipping Suspended ones.
pub struct FindallContext<C: TermCompiler> {
    compiler: C,
    guard: GcGuard,
    config: BagConfig,
    next_id: u64,
}

impl<C: TermCompiler> FindallContext<C> {
    /// Create a context with an empty frame stack.
    pub fn new(compiler: C, config: BagConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            compiler,
            guard: GcGuard::new(),
            config,
            next_id: 1,
        })
    }

    /// Push a new Active frame on top of the current one.
    pub fn new_bag(&mut self) -> Result<BagId, BagError> {
        let id = BagId(self.next_id);
        let bag = Bag::new(id, self.config.arena.clone())?;
        let depth = {
            let mut frames = self.guard.lock();
            frames.push(bag)?;
            frames.bags.len()
        };
        self.next_id += 1;
        debug!(bag = %id, depth, "new findall bag");
        Ok(id)
    }

    /// Store a snapshot of `term` in the current bag.
    ///
    /// Returns the running count of solutions, those delivered in earlier
    /// chunks included. Fails with [`BagError::NoActiveBag`] if there is
    /// no Active frame, and with [`BagError::StackOverflow`] if the
    /// accumulated solutions exceed the global stack limit even after
    /// `stack` was asked to grow by the shortfall. The solution stays
    /// stored in the overflow case.
    pub fn add_solution<S: GlobalStack>(
        &mut self,
        term: &C::Term,
        stack: &mut S,
    ) -> Result<usize, BagError>
    where
        C::Term: fmt::Debug,
    {
        let (required, count) = {
            let mut frames = self.guard.lock();
            let Some(bag) = frames.current_mut() else {
                return Err(BagError::NoActiveBag {
                    goal: format!("{term:?}"),
                });
            };

            let snapshot = {
                let mut alloc = bag.records.allocator();
                let compiled = self.compiler.compile(term, &mut alloc)?;
                let data = alloc.last().ok_or_else(|| CompileError::Malformed {
                    reason: "compiler allocated no snapshot storage".into(),
                })?;
                Snapshot {
                    data,
                    gsize: compiled.gsize,
                }
            };
            bag.answers.push(snapshot)?;
            bag.gsize += snapshot.gsize;
            bag.solutions += 1;
            trace!(bag = %bag.id, solutions = bag.solutions, gsize = bag.gsize, "added solution");

            (
                bag.gsize + bag.solutions * self.config.cells_per_solution,
                bag.total_solutions(),
            )
        };

        let limit_cells = stack.limit_cells();
        if required > limit_cells {
            // Only the limit decides; a failed grow shows up there.
            if let Err(e) = stack.grow(required - limit_cells) {
                trace!(required, error = %e, "global stack growth refused");
            }
            let limit_cells = stack.limit_cells();
            if required > limit_cells {
                return Err(StackOverflow {
                    required_cells: required,
                    limit_cells,
                }
                .into());
            }
        }
        Ok(count)
    }

    /// Turn the current bag's answers into a list ending in `tail`.
    ///
    /// Answers come out in the order they were added. The answer stack
    /// is empty afterwards; the solution count and size estimate are left
    /// alone. A bag without solutions returns `tail` as is.
    pub fn collect<S>(
        &mut self,
        tail: C::Term,
        stack: &mut S,
        marker: &dyn AtomMarker,
    ) -> Result<C::Term, BagError>
    where
        S: GlobalStack<Term = C::Term>,
    {
        let (id, solutions, gsize) = {
            let frames = self.guard.lock();
            let bag = frames.current().ok_or_else(|| BagError::NoActiveBag {
                goal: "collect".into(),
            })?;
            (bag.id, bag.solutions, bag.gsize)
        };
        if solutions == 0 {
            return Ok(tail);
        }

        let space = gsize + solutions * self.config.cells_per_solution;
        if !stack.has_space(space) {
            stack.grow(space)?;
            if !stack.has_space(space) {
                return Err(StackOverflow {
                    required_cells: space,
                    limit_cells: stack.limit_cells(),
                }
                .into());
            }
        }

        let mut list = tail;
        let mut collected = 0usize;
        loop {
            let answer = {
                let mut frames = self.guard.lock();
                let bag = frames.find_mut(id).ok_or_else(|| BagError::FrameCorruption {
                    reason: format!("{id} vanished during collect"),
                })?;
                let Some(snapshot) = bag.answers.top().copied() else {
                    break;
                };
                let bytes = bag.records.get(&snapshot.data)?;
                let term = self.compiler.materialize(bytes)?;
                if marker.gc_active() {
                    marker.mark_snapshot(bytes);
                }
                bag.answers.pop();
                term
            };
            list = stack.cons(answer, list);
            collected += 1;
        }
        trace!(bag = %id, collected, "collected answers");
        Ok(list)
    }

    /// Drive the suspend/resume protocol of chunked collection.
    ///
    /// - [`Reentry::FirstCall`] clears the current bag's arena and answers,
    ///   folds its solution count into the carried total, resets the count
    ///   and size estimate, and marks the frame Suspended.
    /// - [`Reentry::Redo`] re-activates the frame and reports failure.
    /// - [`Reentry::Cut`] re-activates the frame and reports success.
    pub fn suspend(&mut self, reentry: Reentry) -> Result<Suspension, BagError> {
        let mut frames = self.guard.lock();
        match reentry {
            Reentry::FirstCall => {
                let bag = frames.current_mut().ok_or_else(|| BagError::NoActiveBag {
                    goal: "suspend".into(),
                })?;
                bag.records.clear();
                bag.answers.clear();
                bag.suspended_solutions += bag.solutions;
                bag.solutions = 0;
                bag.gsize = 0;
                bag.state = BagState::Suspended;
                debug!(bag = %bag.id, delivered = bag.suspended_solutions, "suspend");
                Ok(Suspension::Yield(SuspendToken { bag: bag.id }))
            }
            Reentry::Redo(token) => {
                Self::reactivate(frames.find_mut(token.bag), token)?;
                debug!(bag = %token.bag, "resume");
                Ok(Suspension::Fail)
            }
            Reentry::Cut(token) => {
                Self::reactivate(frames.find_mut(token.bag), token)?;
                debug!(bag = %token.bag, "resume after cut");
                Ok(Suspension::Succeed)
            }
        }
    }

    fn reactivate(bag: Option<&mut Bag>, token: SuspendToken) -> Result<(), BagError> {
        match bag {
            Some(bag) if bag.state == BagState::Suspended => {
                bag.state = BagState::Active;
                Ok(())
            }
            _ => Err(BagError::NotSuspended { bag: token.bag }),
        }
    }

    /// Pop the topmost frame, which must be `bag` and Active.
    ///
    /// Anything else means the engine's frame bookkeeping is broken and
    /// yields a fatal [`BagError::FrameCorruption`].
    pub fn destroy(&mut self, bag: BagId) -> Result<BagInfo, BagError> {
        let (mut popped, parent) = {
            let mut frames = self.guard.lock();
            let Some(top) = frames.bags.top() else {
                return Err(BagError::FrameCorruption {
                    reason: format!("destroy {bag}: no bag frames"),
                });
            };
            if top.id != bag {
                return Err(BagError::FrameCorruption {
                    reason: format!("destroy {bag}: topmost frame is {}", top.id),
                });
            }
            if top.state != BagState::Active {
                return Err(BagError::FrameCorruption {
                    reason: format!("destroy {bag}: frame is {:?}", top.state),
                });
            }
            let parent = frames.parent_of(bag);
            let popped = frames.bags.pop().ok_or_else(|| BagError::FrameCorruption {
                reason: format!("destroy {bag}: pop failed"),
            })?;
            (popped, parent)
        };

        // Unlinked: the scanner can no longer reach it.
        popped.state = BagState::Destroyed;
        let info = popped.info(parent);
        drop(popped);
        debug!(bag = %bag, "destroy");
        Ok(info)
    }

    /// Destroy frames until only `depth` remain, newest first.
    ///
    /// Suspended frames are committed before being destroyed, as a cut
    /// through their suspension point would.
    pub fn unwind_to(&mut self, depth: usize) -> Result<(), BagError> {
        loop {
            let top = {
                let mut frames = self.guard.lock();
                if frames.bags.len() <= depth {
                    return Ok(());
                }
                match frames.bags.top_mut() {
                    Some(top) => {
                        top.state = BagState::Active;
                        top.id
                    }
                    None => return Ok(()),
                }
            };
            self.destroy(top)?;
        }
    }

    /// Open a scope whose frames are destroyed when it is dropped.
    pub fn scope(&mut self) -> BagScope<'_, C> {
        BagScope::new(self)
    }

    /// Release every frame. Used when the execution context terminates.
    pub fn cleanup(&mut self) {
        let mut frames = self.guard.lock();
        if !frames.bags.is_empty() {
            debug!(frames = frames.bags.len(), "releasing findall bags");
        }
        frames.bags.clear();
    }

    /// Number of frames on the stack, suspended ones included.
    pub fn depth(&self) -> usize {
        self.guard.lock().bags.len()
    }

    /// The frame solutions currently go to.
    pub fn current_bag(&self) -> Option<BagId> {
        self.guard.lock().current().map(|bag| bag.id)
    }

    /// Diagnostic view of a frame on the stack.
    pub fn bag_info(&self, bag: BagId) -> Option<BagInfo> {
        let frames = self.guard.lock();
        frames
            .find(bag)
            .map(|found| found.info(frames.parent_of(bag)))
    }

    /// A handle for the atom liveness scanner.
    pub fn scan_handle(&self) -> ScanHandle {
        self.guard.scan_handle()
    }

    /// The term compiler.
    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    /// The active configuration.
    pub fn config(&self) -> &BagConfig {
        &self.config
    }
}

impl<C: TermCompiler> Drop for FindallContext<C> {
    fn drop(&mut self) {
        self.cleanup();
    }
}
