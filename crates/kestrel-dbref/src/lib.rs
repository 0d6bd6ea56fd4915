//! External references to database clauses and records.
//!
//! A [`HandleRegistry`] hands out opaque [`DbRef`] tokens wrapping the
//! address of an engine-owned clause or record. Tokens are interned: two
//! requests for the same target return the same token, and the target is
//! kept from being physically deallocated while any reference remains.
//!
//! The target's erasure state belongs to the database
//! ([`Database`](kestrel_core::Database)); the registry owns only the
//! reference count. Storage is reclaimed when the count reaches zero and
//! the target has already been erased.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod kind;
pub mod registry;

pub use kind::{hooks, KindHooks, SavedRef};
pub use registry::{DbRef, Deref, HandleRegistry};
