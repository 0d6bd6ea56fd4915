//! Chunked bump allocation and segmented stacks for solution bags.
//!
//! Two containers back every bag frame:
//!
//! ```text
//! Bag
//! ├── Arena               (snapshot bytes; bulk-freed only)
//! │   ├── inline first chunk   [u8; FIRST_CHUNK_BYTES]
//! │   └── overflow chunks      Vec<u8> × k, capacity chunk_base << k
//! └── SegStack<ArenaRef>  (answer handles; LIFO)
//!     ├── inline first chunk   SmallVec<[T; N]>
//!     └── overflow chunks      Vec<T> × k, capacity N << k
//! ```
//!
//! Neither container ever returns memory piecemeal: arena chunks go away
//! on [`Arena::clear`], stack chunks on [`SegStack::clear`] or drop.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod arena;
pub mod config;
pub mod error;
pub mod handle;
pub mod segstack;

pub use arena::{Arena, ArenaAllocator};
pub use config::ArenaConfig;
pub use error::ArenaError;
pub use handle::ArenaRef;
pub use segstack::SegStack;
