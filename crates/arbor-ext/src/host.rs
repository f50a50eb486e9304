//! The lifecycle wrapper around a boxed extension.

use arbor_types::{ContentHasher, Hash64, NodeHandle};

use crate::error::{ExtError, ExtResult};
use crate::extension::Extension;
use crate::world::WorldState;

/// Lifecycle phase of a hosted extension.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    /// Constructed, holds no resources.
    #[default]
    Uninitialized,
    /// Resources acquired against the world state.
    Initialized,
    /// Actively operating.
    Started,
    /// Operation ended; still initialized.
    Stopped,
}

/// Hosts one extension instance and enforces its lifecycle.
///
/// The host also keeps the flat, duplicate-free list of provider nodes this
/// extension relies on, so a merge can notify dependents whose referenced
/// node changed identity.
pub struct ExtensionHost {
    ext: Box<dyn Extension>,
    phase: Phase,
    deps: Vec<NodeHandle>,
}

impl std::fmt::Debug for ExtensionHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionHost")
            .field("type_name", &self.ext.type_name())
            .field("phase", &self.phase)
            .field("deps", &self.deps.len())
            .finish()
    }
}

impl ExtensionHost {
    /// Host a freshly constructed extension (phase Uninitialized).
    pub fn new(ext: Box<dyn Extension>) -> Self {
        Self {
            ext,
            phase: Phase::Uninitialized,
            deps: Vec::new(),
        }
    }

    /// The hosted extension's stable type key.
    pub fn type_hash(&self) -> Hash64 {
        self.ext.type_hash()
    }

    /// The hosted extension's registered type name.
    pub fn type_name(&self) -> &'static str {
        self.ext.type_name()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns `true` while the extension holds resources.
    pub fn is_initialized(&self) -> bool {
        self.phase != Phase::Uninitialized
    }

    /// Borrow the hosted extension.
    pub fn ext(&self) -> &dyn Extension {
        &*self.ext
    }

    /// Mutably borrow the hosted extension.
    pub fn ext_mut(&mut self) -> &mut dyn Extension {
        &mut *self.ext
    }

    // ---------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------

    /// Initialize the extension if it is not already. Returns `false` if
    /// the extension refused, in which case the caller degrades the node.
    pub fn ensure_initialized(&mut self, world: &WorldState) -> bool {
        if self.phase != Phase::Uninitialized {
            return true;
        }
        if !self.ext.initialize(world) {
            return false;
        }
        self.phase = Phase::Initialized;
        true
    }

    /// Second initialization phase.
    pub fn post_initialize(&mut self) -> bool {
        self.ext.post_initialize()
    }

    /// Begin active operation. Requires an initialized extension.
    pub fn start(&mut self) -> bool {
        if self.phase != Phase::Initialized && self.phase != Phase::Stopped {
            return false;
        }
        if !self.ext.start() {
            return false;
        }
        self.phase = Phase::Started;
        true
    }

    /// End active operation. No-op unless started.
    pub fn stop(&mut self) {
        if self.phase == Phase::Started {
            self.ext.stop();
            self.phase = Phase::Stopped;
        }
    }

    /// The only safe teardown entry. No-op unless currently initialized;
    /// always clears dependency links before releasing resources.
    pub fn uninitialize_deep(&mut self) {
        if self.phase == Phase::Uninitialized {
            return;
        }
        self.stop();
        self.clear_dependencies();
        self.ext.uninitialize();
        self.phase = Phase::Uninitialized;
    }

    // ---------------------------------------------------------------
    // Dependencies
    // ---------------------------------------------------------------

    /// Record that this extension relies on the extension at `provider`.
    /// Duplicate registrations are ignored.
    pub fn add_dependency(&mut self, provider: NodeHandle) {
        if !self.deps.contains(&provider) {
            self.deps.push(provider);
        }
    }

    /// Drop a recorded dependency, if present.
    pub fn remove_dependency(&mut self, provider: NodeHandle) {
        self.deps.retain(|d| *d != provider);
    }

    /// Drop every recorded dependency.
    pub fn clear_dependencies(&mut self) {
        self.deps.clear();
    }

    /// The provider nodes this extension relies on.
    pub fn dependencies(&self) -> &[NodeHandle] {
        &self.deps
    }

    // ---------------------------------------------------------------
    // State codec
    // ---------------------------------------------------------------

    /// Adopt `other`'s visitable state, producing a value-identical copy
    /// without destroying this instance's identity. Fails on type mismatch.
    pub fn copy_from(&mut self, other: &ExtensionHost) -> ExtResult<()> {
        if self.type_hash() != other.type_hash() {
            return Err(ExtError::TypeMismatch {
                expected: self.type_hash(),
                actual: other.type_hash(),
            });
        }
        self.ext.apply_state(&other.ext.state())
    }

    /// Pure hash of type + visitable state; equality without copying.
    pub fn hash_value(&self) -> Hash64 {
        let mut h = ContentHasher::new();
        h.put_hash(self.type_hash());
        h.put_str(&self.ext.state().to_string());
        h.finish()
    }

    /// Returns `true` if both hosts carry value-identical extensions.
    pub fn is_same(&self, other: &ExtensionHost) -> bool {
        self.hash_value() == other.hash_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Default, Serialize, Deserialize)]
    struct Counter {
        count: i64,
        #[serde(skip)]
        refuse_init: bool,
    }

    impl Extension for Counter {
        fn type_name(&self) -> &'static str {
            "Counter"
        }
        fn state(&self) -> serde_json::Value {
            serde_json::json!({ "count": self.count })
        }
        fn apply_state(&mut self, state: &serde_json::Value) -> ExtResult<()> {
            let loaded: Counter = serde_json::from_value(state.clone())?;
            self.count = loaded.count;
            Ok(())
        }
        fn initialize(&mut self, _world: &WorldState) -> bool {
            !self.refuse_init
        }
    }

    fn host_with(count: i64) -> ExtensionHost {
        ExtensionHost::new(Box::new(Counter {
            count,
            refuse_init: false,
        }))
    }

    #[test]
    fn fresh_host_is_uninitialized() {
        let host = host_with(0);
        assert_eq!(host.phase(), Phase::Uninitialized);
        assert!(!host.is_initialized());
        assert_eq!(host.type_hash(), Hash64::of_str("Counter"));
    }

    #[test]
    fn lifecycle_walks_the_state_machine() {
        let mut host = host_with(0);
        let world = WorldState::new();

        assert!(host.ensure_initialized(&world));
        assert_eq!(host.phase(), Phase::Initialized);

        // Re-initialization is a no-op, not a restart.
        assert!(host.ensure_initialized(&world));
        assert_eq!(host.phase(), Phase::Initialized);

        assert!(host.start());
        assert_eq!(host.phase(), Phase::Started);

        host.stop();
        assert_eq!(host.phase(), Phase::Stopped);

        host.uninitialize_deep();
        assert_eq!(host.phase(), Phase::Uninitialized);
    }

    #[test]
    fn refused_initialize_reports_false() {
        let mut host = ExtensionHost::new(Box::new(Counter {
            count: 0,
            refuse_init: true,
        }));
        assert!(!host.ensure_initialized(&WorldState::new()));
        assert_eq!(host.phase(), Phase::Uninitialized);
    }

    #[test]
    fn start_requires_initialization() {
        let mut host = host_with(0);
        assert!(!host.start());
    }

    #[test]
    fn uninitialize_deep_is_noop_when_uninitialized() {
        let mut host = host_with(0);
        host.add_dependency(NodeHandle::new(1, 1));
        host.uninitialize_deep();
        // Not initialized, so nothing was torn down; deps stay.
        assert_eq!(host.dependencies().len(), 1);
    }

    #[test]
    fn uninitialize_deep_clears_dependencies_first() {
        let mut host = host_with(0);
        host.ensure_initialized(&WorldState::new());
        host.add_dependency(NodeHandle::new(1, 1));
        host.uninitialize_deep();
        assert!(host.dependencies().is_empty());
        assert_eq!(host.phase(), Phase::Uninitialized);
    }

    #[test]
    fn dependencies_are_duplicate_free() {
        let mut host = host_with(0);
        let dep = NodeHandle::new(5, 1);
        host.add_dependency(dep);
        host.add_dependency(dep);
        assert_eq!(host.dependencies(), &[dep]);

        host.remove_dependency(dep);
        assert!(host.dependencies().is_empty());
    }

    #[test]
    fn copy_from_round_trips_state() {
        let mut dst = host_with(1);
        let src = host_with(42);
        dst.copy_from(&src).unwrap();
        assert!(dst.is_same(&src));
        assert_eq!(dst.ext().state(), serde_json::json!({ "count": 42 }));
    }

    #[test]
    fn copy_from_rejects_type_mismatch() {
        struct Other;
        impl Extension for Other {
            fn type_name(&self) -> &'static str {
                "Other"
            }
            fn state(&self) -> serde_json::Value {
                serde_json::Value::Null
            }
            fn apply_state(&mut self, _state: &serde_json::Value) -> ExtResult<()> {
                Ok(())
            }
        }
        let mut dst = host_with(1);
        let src = ExtensionHost::new(Box::new(Other));
        assert!(matches!(
            dst.copy_from(&src),
            Err(ExtError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn hash_value_tracks_state() {
        let a = host_with(1);
        let b = host_with(1);
        let c = host_with(2);
        assert_eq!(a.hash_value(), b.hash_value());
        assert_ne!(a.hash_value(), c.hash_value());
    }
}
