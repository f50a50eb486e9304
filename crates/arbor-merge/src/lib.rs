//! The merge engine for Arbor metadata trees.
//!
//! A merge folds a disposable producer tree into the persistent tree while
//! preserving node identity: handles held by external subsystems keep
//! addressing the same logical entities afterwards. Order-insensitive
//! containers (namespaces and the like) merge as keyed sets; everything
//! else merges positionally, aligning child sequences by content hash and
//! recovering pure insertions next to their matched neighbors.

pub mod align;
pub mod engine;
pub mod error;

pub use align::{align, AlignedSlot, Element, Family};
pub use engine::MergeEngine;
pub use error::{MergeError, MergeResult};
