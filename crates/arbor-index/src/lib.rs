//! Weak lookup indices over one Arbor tree.
//!
//! The [`Indices`] map file-position hashes and type keys to the nodes last
//! registered under them. They are caches, not owners: entries are plain
//! handles, go stale when a merge destroys the node behind them, and are
//! compacted opportunistically on the next refresh of the same bucket.
//! Lookups filter stale entries, so a hit is always live; a miss means
//! "unknown declaration", never an error.

pub mod index;

pub use index::Indices;
