//! The contract extension payloads must satisfy.

use arbor_types::Hash64;

use crate::error::ExtResult;
use crate::world::WorldState;

/// A polymorphic payload attached to a tree node by a 64-bit type key.
///
/// Implementations expose their persistent fields as a *visitable state*
/// (a JSON value): the merge engine copies a fresher version's fields by
/// round-tripping through [`state`]/[`apply_state`] without destroying the
/// persistent object's identity, and tests equality by hashing the state.
///
/// The lifecycle hooks return `bool`: `false` from [`initialize`] degrades
/// the owning node to "extension empty" instead of failing the merge.
///
/// [`state`]: Extension::state
/// [`apply_state`]: Extension::apply_state
/// [`initialize`]: Extension::initialize
pub trait Extension: Send {
    /// The stable 64-bit type key; must equal `Hash64::of_str(type_name())`.
    fn type_hash(&self) -> Hash64 {
        Hash64::of_str(self.type_name())
    }

    /// The stable type name this extension was registered under.
    fn type_name(&self) -> &'static str;

    /// The visitable state: every field the persistence layer round-trips.
    fn state(&self) -> serde_json::Value;

    /// Replace the visitable state with `state`.
    fn apply_state(&mut self, state: &serde_json::Value) -> ExtResult<()>;

    /// Acquire resources against the world state. `false` degrades the
    /// node to "extension empty".
    fn initialize(&mut self, _world: &WorldState) -> bool {
        true
    }

    /// Second initialization phase, after every sibling is initialized.
    fn post_initialize(&mut self) -> bool {
        true
    }

    /// Begin active operation.
    fn start(&mut self) -> bool {
        true
    }

    /// End active operation.
    fn stop(&mut self) {}

    /// Release resources. Called only through the host's teardown entry.
    fn uninitialize(&mut self) {}
}
