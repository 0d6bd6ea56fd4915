//! Solution bags for collect-all calls.
//!
//! A [`FindallContext`] owns the per-execution-context stack of bag
//! frames. Each frame accumulates compiled snapshots of the solutions of
//! one `findall/3`-style call:
//!
//! ```text
//! FindallContext
//! ├── TermCompiler          (engine-supplied)
//! └── GcGuard ── Arc<Mutex<Frames>> ──┐
//!                                     ├── ScanHandle (atom GC, any thread)
//!     Frames: SegStack<Bag, 1>        │
//!     └── Bag × depth  ───────────────┘
//!         ├── Arena                 snapshot bytes
//!         └── SegStack<Snapshot>    answers, newest on top
//! ```
//!
//! # Bag lifecycle
//!
//! `Active --suspend--> Suspended --redo/cut--> Active --destroy--> Destroyed`
//!
//! A frame is destroyed when the dynamic extent of its call ends. The
//! [`BagScope`] guard makes that happen on every exit path, including
//! errors and early drops.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod bag;
pub mod config;
pub mod context;
pub mod driver;
pub mod guard;
pub mod scope;

pub use bag::{BagInfo, BagState, Snapshot};
pub use config::{BagConfig, ConfigError};
pub use context::{FindallContext, Reentry, SuspendToken, Suspension};
pub use driver::{findall, FindNSols};
pub use guard::{GcGuard, ScanHandle};
pub use scope::BagScope;
