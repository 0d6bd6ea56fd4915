//! Core types and traits for the Kestrel collect-all and dbref machinery.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the abstractions shared by the rest of the workspace: typed ids,
//! error enums, and the traits through which the engine's collaborators
//! (term compiler, global stack, atom marker, clause/record database)
//! are consumed.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod traits;

pub use error::{AllocError, BagError, CompileError, HandleError, StackOverflow};
pub use id::{BagId, HandleKind, TargetAddr};
pub use traits::{
    AtomMarker, CompiledTerm, Database, GlobalStack, SnapshotAllocator, TargetState, TermCompiler,
};
