//! Growable LIFO stack of fixed-size slots.
//!
//! A [`SegStack`] stores its first `N` slots inline and overflows into
//! heap chunks of `N << k` slots. Popping never releases a chunk: emptied
//! chunks are kept for the next push, and memory is only returned by
//! [`SegStack::clear`] or drop.

use smallvec::SmallVec;

use crate::error::ArenaError;

/// Segmented stack with an inline first chunk of `N` slots.
///
/// # Invariants
///
/// - Every chunk below the top chunk is full.
/// - Every chunk above the top chunk is empty (retained for reuse).
/// - The top chunk is non-empty unless the stack is empty.
pub struct SegStack<T, const N: usize> {
    /// Inline first chunk, capacity `N`. Never spills: the overflow path
    /// moves to `chunks` instead.
    first: SmallVec<[T; N]>,
    /// Overflow chunks. `chunks[k - 1]` is chunk `k`, capacity `N << k`.
    chunks: Vec<Vec<T>>,
    /// Index of the chunk holding the top slot.
    top: usize,
    len: usize,
}

impl<T, const N: usize> SegStack<T, N> {
    const NONEMPTY: () = assert!(N > 0, "SegStack inline capacity must be > 0");

    /// Create an empty stack. Does not allocate.
    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::NONEMPTY;
        Self {
            first: SmallVec::new(),
            chunks: Vec::new(),
            top: 0,
            len: 0,
        }
    }

    /// Push a value, growing into a new chunk if the top chunk is full.
    ///
    /// Returns a mutable reference to the new top slot, or
    /// `Err(ArenaError::OutOfMemory)` if a chunk could not be allocated.
    /// On error the stack is unchanged and `value` is dropped.
    pub fn push(&mut self, value: T) -> Result<&mut T, ArenaError> {
        let mut top = self.top;
        if self.slots_in(top) == Self::chunk_capacity(top) {
            top += 1;
            if top > self.chunks.len() {
                let capacity = Self::chunk_capacity(top);
                let mut chunk = Vec::new();
                chunk
                    .try_reserve_exact(capacity)
                    .map_err(|_| ArenaError::OutOfMemory {
                        requested: capacity.saturating_mul(std::mem::size_of::<T>()),
                        capacity: self.capacity().saturating_mul(std::mem::size_of::<T>()),
                    })?;
                self.chunks.push(chunk);
            }
            self.top = top;
        }

        self.len += 1;
        if top == 0 {
            let i = self.first.len();
            self.first.push(value);
            Ok(&mut self.first[i])
        } else {
            let chunk = &mut self.chunks[top - 1];
            let i = chunk.len();
            chunk.push(value);
            Ok(&mut chunk[i])
        }
    }

    /// Remove and return the most recently pushed value.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let value = if self.top == 0 {
            self.first.pop()
        } else {
            self.chunks[self.top - 1].pop()
        };
        self.len -= 1;
        if self.top > 0 && self.chunks[self.top - 1].is_empty() {
            self.top -= 1;
        }
        value
    }

    /// The most recently pushed value, without removing it.
    pub fn top(&self) -> Option<&T> {
        if self.top == 0 {
            self.first.last()
        } else {
            self.chunks[self.top - 1].last()
        }
    }

    /// Mutable access to the most recently pushed value.
    pub fn top_mut(&mut self) -> Option<&mut T> {
        if self.top == 0 {
            self.first.last_mut()
        } else {
            self.chunks[self.top - 1].last_mut()
        }
    }

    /// Visit every present slot exactly once, oldest first.
    pub fn scan(&self, mut visit: impl FnMut(&T)) {
        for value in self.iter() {
            visit(value);
        }
    }

    /// Iterate oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        self.first
            .iter()
            .chain(self.chunks.iter().flat_map(|chunk| chunk.iter()))
    }

    /// Iterate oldest first, mutably.
    pub fn iter_mut(&mut self) -> impl DoubleEndedIterator<Item = &mut T> + '_ {
        self.first
            .iter_mut()
            .chain(self.chunks.iter_mut().flat_map(|chunk| chunk.iter_mut()))
    }

    /// Drop every value and release all overflow chunks.
    pub fn clear(&mut self) {
        self.first.clear();
        self.chunks.clear();
        self.top = 0;
        self.len = 0;
    }

    /// Number of values on the stack.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the stack holds no values.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of chunks, inline chunk included.
    pub fn chunk_count(&self) -> usize {
        1 + self.chunks.len()
    }

    /// Total slots across all chunks, retained empty chunks included.
    pub fn capacity(&self) -> usize {
        (0..self.chunk_count()).map(Self::chunk_capacity).sum()
    }

    fn slots_in(&self, chunk: usize) -> usize {
        match chunk {
            0 => self.first.len(),
            k => self.chunks[k - 1].len(),
        }
    }

    fn chunk_capacity(chunk: usize) -> usize {
        1usize
            .checked_shl(chunk as u32)
            .map_or(usize::MAX, |factor| N.saturating_mul(factor))
    }
}

impl<T, const N: usize> Default for SegStack<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
