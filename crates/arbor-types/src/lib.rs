//! Foundation types for the Arbor metadata tree.
//!
//! This crate provides the identity, freshness, and payload types used
//! throughout the Arbor system. Every other Arbor crate depends on
//! `arbor-types`.
//!
//! # Key Types
//!
//! - [`Hash64`] — 64-bit content hash (BLAKE3-derived) used for type,
//!   file-position, and source-scope identities
//! - [`ContentHasher`] — incremental combiner producing [`Hash64`] values
//! - [`Serial`] / [`SerialClock`] — monotonic freshness stamps arbitrating
//!   conflicting versions of a logical node
//! - [`NodeHandle`] — generation-checked arena address of a tree node
//! - [`AstVariant`] — payload representing one parsed source declaration
//! - [`NodeValue`] — the tagged value slot of a tree node
//! - [`MergeMode`] — freshness-arbitration policy for a merge call

pub mod ast;
pub mod handle;
pub mod hash;
pub mod mode;
pub mod serial;
pub mod value;

pub use ast::{kind, AstVariant, KIND_LIMIT};
pub use handle::NodeHandle;
pub use hash::{ContentHasher, Hash64};
pub use mode::MergeMode;
pub use serial::{Serial, SerialClock};
pub use value::{NodeValue, Primitive};
