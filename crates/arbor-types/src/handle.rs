//! Generation-checked arena addresses for tree nodes.

use serde::{Deserialize, Serialize};

/// The address of a node slot in a tree arena.
///
/// A handle pairs a slot index with the generation the slot had when the
/// node was created. Freeing a slot bumps its generation, so a retained
/// handle to a destroyed node resolves to "gone" rather than aliasing
/// whatever node later reuses the slot.
///
/// The handle is also the opaque identity token of a node: it is unaffected
/// by field copies and changes only when the node itself is destroyed and
/// replaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeHandle {
    /// Slot index in the arena.
    pub index: u32,
    /// Generation the slot had when this node was created.
    pub generation: u32,
}

impl NodeHandle {
    /// Create a handle from raw parts.
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

impl std::fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}
