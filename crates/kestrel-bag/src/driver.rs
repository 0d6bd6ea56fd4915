//! Collect-all calls built from the bag primitives.
//!
//! The generator of a collect-all call is modelled as an iterator of
//! solution terms. [`findall`] gathers all of them into one list;
//! [`FindNSols`] delivers them in chunks of at most `n`, suspending the
//! bag between chunks.

use std::fmt;
use std::iter::Fuse;
use std::num::NonZeroUsize;

use kestrel_core::{AtomMarker, BagError, BagId, GlobalStack, TermCompiler};

use crate::bag::BagInfo;
use crate::context::{FindallContext, Reentry, SuspendToken, Suspension};
use crate::scope::BagScope;

/// Collect every solution into a list ending in `tail`.
///
/// The bag is destroyed on every exit path.
pub fn findall<C, S, I>(
    ctx: &mut FindallContext<C>,
    solutions: I,
    tail: C::Term,
    stack: &mut S,
    marker: &dyn AtomMarker,
) -> Result<C::Term, BagError>
where
    C: TermCompiler,
    C::Term: fmt::Debug,
    S: GlobalStack<Term = C::Term>,
    I: IntoIterator<Item = C::Term>,
{
    let mut scope = ctx.scope();
    let bag = scope.new_bag()?;
    for term in solutions {
        scope.add_solution(&term, stack)?;
    }
    let list = scope.collect(tail, stack, marker)?;
    scope.destroy(bag)?;
    Ok(list)
}

/// Chunked collection: yields lists of at most `n` solutions.
///
/// Each full chunk is followed by a suspension of the bag; asking for the
/// next chunk resumes it. When the generator is exhausted the remaining
/// solutions form the last chunk, which is empty if the solution count
/// was a multiple of `n`. Dropping the iterator early commits and
/// destroys the bag.
pub struct FindNSols<'a, C, S, I>
where
    C: TermCompiler,
    I: Iterator,
{
    scope: BagScope<'a, C>,
    bag: BagId,
    stack: &'a mut S,
    marker: &'a dyn AtomMarker,
    source: Fuse<I>,
    chunk: NonZeroUsize,
    tail: C::Term,
    token: Option<SuspendToken>,
    done: bool,
}

impl<'a, C, S, I> FindNSols<'a, C, S, I>
where
    C: TermCompiler,
    C::Term: Clone + fmt::Debug,
    S: GlobalStack<Term = C::Term>,
    I: Iterator<Item = C::Term>,
{
    /// Open a bag for chunked collection of `solutions`.
    pub fn new(
        ctx: &'a mut FindallContext<C>,
        chunk: NonZeroUsize,
        solutions: impl IntoIterator<IntoIter = I>,
        tail: C::Term,
        stack: &'a mut S,
        marker: &'a dyn AtomMarker,
    ) -> Result<Self, BagError> {
        let mut scope = ctx.scope();
        let bag = scope.new_bag()?;
        Ok(Self {
            scope,
            bag,
            stack,
            marker,
            source: solutions.into_iter().fuse(),
            chunk,
            tail,
            token: None,
            done: false,
        })
    }

    /// The bag backing this collection.
    pub fn bag(&self) -> BagId {
        self.bag
    }

    /// Diagnostic view of the backing bag, `None` once it is destroyed.
    pub fn info(&self) -> Option<BagInfo> {
        self.scope.bag_info(self.bag)
    }

    fn next_chunk(&mut self) -> Result<C::Term, BagError> {
        if let Some(token) = self.token.take() {
            self.scope.suspend(Reentry::Redo(token))?;
        }

        while let Some(term) = self.source.next() {
            let count = self.scope.add_solution(&term, &mut *self.stack)?;
            if count % self.chunk.get() == 0 {
                let list = self
                    .scope
                    .collect(self.tail.clone(), &mut *self.stack, self.marker)?;
                if let Suspension::Yield(token) = self.scope.suspend(Reentry::FirstCall)? {
                    self.token = Some(token);
                }
                return Ok(list);
            }
        }

        self.done = true;
        let list = self
            .scope
            .collect(self.tail.clone(), &mut *self.stack, self.marker)?;
        self.scope.destroy(self.bag)?;
        Ok(list)
    }
}

impl<C, S, I> Iterator for FindNSols<'_, C, S, I>
where
    C: TermCompiler,
    C::Term: Clone + fmt::Debug,
    S: GlobalStack<Term = C::Term>,
    I: Iterator<Item = C::Term>,
{
    type Item = Result<C::Term, BagError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = self.next_chunk();
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}
