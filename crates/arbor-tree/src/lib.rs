//! The arena-backed metadata tree at the heart of Arbor.
//!
//! A [`Tree`] owns its nodes in slot storage addressed by generation-checked
//! [`NodeHandle`]s: a retained handle to a destroyed node goes stale instead
//! of aliasing the slot's next occupant. On top of the arena this crate
//! provides child-list structure, path navigation, keyed upserts, symbolic
//! link resolution, the two subtree hashes the merge engine aligns on,
//! cross-tree adoption, source-scope projection, and deep extension
//! lifecycle sweeps.
//!
//! [`NodeHandle`]: arbor_types::NodeHandle

pub mod diag;
pub mod error;
pub mod node;
pub mod scope;
pub mod tree;

pub use error::{TreeError, TreeResult};
pub use node::ValueNode;
pub use tree::{Descendants, Tree};
