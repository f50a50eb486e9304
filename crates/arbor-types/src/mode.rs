//! Freshness-arbitration policy for a merge call.

use serde::{Deserialize, Serialize};

/// How conflicting versions of a logical node are arbitrated by serial.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MergeMode {
    /// The higher-serial side wins; the usual mode after a reparse.
    OverwriteOld,
    /// The lower-serial side wins; the persisted past is authoritative.
    KeepOld,
    /// Like `KeepOld` for shape election, but leaf fields still upgrade;
    /// used when folding a partial subset projection back in.
    UpdateSubset,
}

impl MergeMode {
    /// Returns `true` if the higher-serial side is elected primary.
    pub fn favors_fresh(self) -> bool {
        matches!(self, MergeMode::OverwriteOld)
    }
}

impl std::fmt::Display for MergeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeMode::OverwriteOld => write!(f, "OverwriteOld"),
            MergeMode::KeepOld => write!(f, "KeepOld"),
            MergeMode::UpdateSubset => write!(f, "UpdateSubset"),
        }
    }
}
