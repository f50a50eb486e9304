//! Polymorphic per-node extensions for the Arbor metadata tree.
//!
//! An extension is an independently-lifecycled payload attached to a tree
//! node by a 64-bit type key. This crate provides the [`Extension`] trait
//! (the contract extension payloads must satisfy), the [`ExtensionHost`]
//! wrapper enforcing the lifecycle state machine and tracking dependencies,
//! and the [`ExtensionFactory`] registry of constructors.
//!
//! # Lifecycle
//!
//! Uninitialized → Initialized → (optionally) Started → Stopped →
//! Uninitialized. [`ExtensionHost::uninitialize_deep`] is the only safe
//! teardown entry: it is a no-op unless the extension is currently
//! initialized and always clears dependency links first.

pub mod error;
pub mod extension;
pub mod factory;
pub mod host;
pub mod world;

pub use error::{ExtError, ExtResult};
pub use extension::Extension;
pub use factory::ExtensionFactory;
pub use host::{ExtensionHost, Phase};
pub use world::WorldState;
