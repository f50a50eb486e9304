//! Environment glue for Arbor.
//!
//! An [`Environment`] owns one persistent metadata tree together with the
//! serial clock, the lookup indices, the extension factory, the world
//! state, and the seen-path registry. Producers build disposable trees,
//! stamp them from the environment's clock, and fold them in through
//! [`Environment::merge_value`].

pub mod environment;

pub use environment::Environment;
