//! Error types for merge operations.

use arbor_tree::TreeError;
use arbor_types::NodeHandle;

/// Errors that can abort a merge.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// A positional merge reached a node that was never stamped. Producers
    /// realize serials on disposable trees before merging them.
    #[error("unstamped node {0} in a positional merge")]
    UnstampedNode(NodeHandle),

    /// Insertion recovery exhausted its rounds with elements left over; the
    /// child topologies cannot be reconciled.
    #[error("unrecoverable child topology under {parent}")]
    UnrecoverableTopology { parent: NodeHandle },

    /// A tree operation failed underneath the merge.
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Convenience alias for merge results.
pub type MergeResult<T> = Result<T, MergeError>;
