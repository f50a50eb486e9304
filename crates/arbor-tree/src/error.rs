//! Error types for tree operations.

use arbor_ext::ExtError;
use arbor_types::NodeHandle;

/// Errors that can occur while mutating or traversing a tree.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// The handle's slot was freed or recycled since the handle was taken.
    #[error("stale node handle {0}")]
    StaleHandle(NodeHandle),

    /// A child operation named a node that is not a child of the parent.
    #[error("node {child} is not a child of {parent}")]
    NotAChild {
        parent: NodeHandle,
        child: NodeHandle,
    },

    /// An insertion position lies beyond the parent's child list.
    #[error("position {at} out of bounds for {parent} with {len} children")]
    PositionOutOfBounds {
        parent: NodeHandle,
        at: usize,
        len: usize,
    },

    /// The root node cannot be detached or removed.
    #[error("the root node cannot be detached")]
    RootDetach,

    /// An extension state copy failed while copying node fields.
    #[error(transparent)]
    Extension(#[from] ExtError),
}

/// Convenience alias for tree results.
pub type TreeResult<T> = Result<T, TreeError>;
