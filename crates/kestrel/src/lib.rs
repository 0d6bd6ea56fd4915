//! Kestrel: transient memory for collect-all calls and GC-safe database
//! references, for logic-programming engines.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Kestrel sub-crates. The engine plugs in through the traits in
//! [`types`]: a term compiler, its global stack, an atom marker and its
//! clause/record database.
//!
//! # Quick start
//!
//! ```rust
//! use kestrel::prelude::*;
//! use kestrel_test_utils::{CodecCompiler, MockStack, RecordingMarker, Term};
//!
//! let mut ctx = FindallContext::new(CodecCompiler, BagConfig::default()).unwrap();
//! let mut stack = MockStack::unbounded();
//! let marker = RecordingMarker::new();
//!
//! let solutions = (1..=3).map(Term::Int);
//! let list = findall(&mut ctx, solutions, Term::Nil, &mut stack, &marker).unwrap();
//! assert_eq!(list.to_vec(), vec![Term::Int(1), Term::Int(2), Term::Int(3)]);
//! assert_eq!(ctx.depth(), 0);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `kestrel-core` | IDs, error types, collaborator traits |
//! | [`arena`] | `kestrel-arena` | Chunked bump arena and segmented stack |
//! | [`bag`] | `kestrel-bag` | Solution bags, GC guard, collect-all drivers |
//! | [`dbref`] | `kestrel-dbref` | Interned clause/record handles |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Chunked arena and segmented stack (`kestrel-arena`).
pub use kestrel_arena as arena;

/// Core ids, errors and collaborator traits (`kestrel-core`).
///
/// Implement [`types::TermCompiler`], [`types::GlobalStack`],
/// [`types::AtomMarker`] and [`types::Database`] to connect an engine.
pub use kestrel_core as types;

/// Solution bags (`kestrel-bag`).
///
/// [`bag::FindallContext`] owns one execution context's frames;
/// [`bag::ScanHandle`] gives the atom garbage collector access to them
/// from another thread.
pub use kestrel_bag as bag;

/// External database references (`kestrel-dbref`).
pub use kestrel_dbref as dbref;

/// Common imports for typical Kestrel usage.
pub mod prelude {
    // Types and traits
    pub use kestrel_core::{
        AtomMarker, BagError, BagId, Database, GlobalStack, HandleError, HandleKind, TargetAddr,
        TargetState, TermCompiler,
    };

    // Bags
    pub use kestrel_bag::{
        findall, BagConfig, BagScope, FindNSols, FindallContext, Reentry, ScanHandle, Suspension,
    };

    // Handles
    pub use kestrel_dbref::{DbRef, Deref, HandleRegistry};
}
