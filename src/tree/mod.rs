//! Description trees: compression, rendering and re-addressing.
//!
//! The compressor and the resolver share one numbering contract. Numbers
//! are assigned in post-order, so every subtree covers a contiguous range
//! ending at its root's number, and the resolver can find a target by
//! descending into the first child whose number is not below it.

mod compress;
mod render;
mod resolve;

pub use compress::{compress, CompactNode, Compressor, EXCLUDED_KINDS, INCLUDED_KINDS};
pub use render::{contains_uuid, describe_line, render, STABLE_IDENTIFIER_PREFIX};
pub use resolve::{resolve, ResolveError};
