//! Scoped frame ownership.
//!
//! A collect-all call owns its bag frames for exactly its dynamic extent.
//! [`BagScope`] ties that extent to a Rust scope: frames pushed while the
//! scope is alive are destroyed, newest first, when it is dropped. This
//! covers normal exit, early return through `?`, and unwinding.

use std::ops::{Deref, DerefMut};

use kestrel_core::TermCompiler;
use tracing::error;

use crate::context::FindallContext;

/// Guard returned by [`FindallContext::scope`].
///
/// Dereferences to the context, so every bag operation is available
/// through it.
pub struct BagScope<'a, C: TermCompiler> {
    ctx: &'a mut FindallContext<C>,
    depth: usize,
}

impl<'a, C: TermCompiler> BagScope<'a, C> {
    pub(crate) fn new(ctx: &'a mut FindallContext<C>) -> Self {
        let depth = ctx.depth();
        Self { ctx, depth }
    }

    /// Frame depth when the scope was opened.
    pub fn base_depth(&self) -> usize {
        self.depth
    }
}

impl<C: TermCompiler> Deref for BagScope<'_, C> {
    type Target = FindallContext<C>;

    fn deref(&self) -> &Self::Target {
        self.ctx
    }
}

impl<C: TermCompiler> DerefMut for BagScope<'_, C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ctx
    }
}

impl<C: TermCompiler> Drop for BagScope<'_, C> {
    fn drop(&mut self) {
        if let Err(e) = self.ctx.unwind_to(self.depth) {
            error!(error = %e, depth = self.depth, "failed to unwind findall bags");
        }
    }
}
