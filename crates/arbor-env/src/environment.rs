//! The owning environment around one persistent metadata tree.

use std::collections::HashMap;
use std::sync::Mutex;

use arbor_ext::{ExtensionFactory, WorldState};
use arbor_index::Indices;
use arbor_merge::{MergeEngine, MergeResult};
use arbor_tree::{Tree, TreeResult};
use arbor_types::{kind, AstVariant, Hash64, MergeMode, NodeHandle, Serial, SerialClock};
use tracing::debug;

/// Owns the persistent tree and every facility a merge consults: the serial
/// clock, the lookup indices, the extension factory, and the world state.
///
/// [`merge_value`] is the sole structural mutation entry point. A merge
/// runs to completion or returns a typed error; on error the caller
/// restores the affected scope from persistence. Everything except
/// [`add_seen_path`]/[`seen_path`] (internally locked) and the clock
/// (atomic) requires the caller's exclusive access.
///
/// [`merge_value`]: Environment::merge_value
/// [`add_seen_path`]: Environment::add_seen_path
/// [`seen_path`]: Environment::seen_path
#[derive(Debug)]
pub struct Environment {
    tree: Tree,
    clock: SerialClock,
    indices: Indices,
    factory: ExtensionFactory,
    world: WorldState,
    seen_paths: Mutex<HashMap<Hash64, String>>,
}

impl Environment {
    /// A fresh environment. The tree root becomes a stamped namespace
    /// declaration, so top-level merges take the keyed path.
    pub fn new(factory: ExtensionFactory) -> Self {
        Self::with_clock(factory, SerialClock::new())
    }

    /// Restore an environment whose clock resumes after the highest serial
    /// ever issued, as recorded by the persistence layer.
    pub fn resume(factory: ExtensionFactory, last_serial: Serial) -> Self {
        Self::with_clock(factory, SerialClock::resume_from(last_serial))
    }

    fn with_clock(factory: ExtensionFactory, clock: SerialClock) -> Self {
        let mut tree = Tree::new();
        if let Some(root) = tree.node_mut(tree.root()) {
            root.value = AstVariant::with_kind(kind::NAMESPACE).into();
            root.serial = clock.next();
        }
        Self {
            tree,
            clock,
            indices: Indices::new(),
            factory,
            world: WorldState::new(),
            seen_paths: Mutex::new(HashMap::new()),
        }
    }

    // ---------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------

    /// The persistent tree, read-only. Mutation goes through
    /// [`Environment::merge_value`].
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// The root of the persistent tree.
    pub fn root(&self) -> NodeHandle {
        self.tree.root()
    }

    /// The serial clock. Producers stamp their disposable trees from the
    /// same clock before merging them in.
    pub fn clock(&self) -> &SerialClock {
        &self.clock
    }

    /// The extension factory consulted when nodes are adopted.
    pub fn factory(&self) -> &ExtensionFactory {
        &self.factory
    }

    /// Register an extension constructor under `name`, returning its type
    /// key.
    pub fn register_extension(
        &mut self,
        name: &'static str,
        ctor: fn() -> Box<dyn arbor_ext::Extension>,
    ) -> Hash64 {
        self.factory.register(name, ctor)
    }

    /// The world state handed to extension `initialize`.
    pub fn world(&self) -> &WorldState {
        &self.world
    }

    /// Mutable world state, for recording facts before merges run.
    pub fn world_mut(&mut self) -> &mut WorldState {
        &mut self.world
    }

    // ---------------------------------------------------------------
    // Merging
    // ---------------------------------------------------------------

    /// Fold the subtree at `other_root` of a disposable producer tree into
    /// the persistent node `at`. The sole structural mutation entry point.
    pub fn merge_value(
        &mut self,
        at: NodeHandle,
        other: &Tree,
        other_root: NodeHandle,
        mode: MergeMode,
    ) -> MergeResult<()> {
        MergeEngine::new(
            &mut self.tree,
            other,
            &self.clock,
            &mut self.indices,
            &self.factory,
            &self.world,
            mode,
        )
        .merge(at, other_root)
    }

    /// Merge a whole producer tree at the persistent root.
    pub fn merge_root(&mut self, other: &Tree, mode: MergeMode) -> MergeResult<()> {
        self.merge_value(self.tree.root(), other, other.root(), mode)
    }

    /// Deep-copy projection of the branches whose origin matches `pkg` and
    /// `file`, for partial re-merges of a single changed file.
    pub fn subset(&self, pkg: Hash64, file: Hash64) -> TreeResult<Tree> {
        self.tree.subset(pkg, file, &self.factory)
    }

    // ---------------------------------------------------------------
    // Lookups
    // ---------------------------------------------------------------

    /// The definition node last merged for a file position. Valid until
    /// the next merge.
    pub fn find_declaration(&self, filepos_hash: Hash64) -> Option<NodeHandle> {
        self.indices.find_declaration(&self.tree, filepos_hash)
    }

    /// The definition node last merged for a type key. Valid until the
    /// next merge.
    pub fn find_type_declaration(&self, type_hash: Hash64) -> Option<NodeHandle> {
        self.indices.find_type_declaration(&self.tree, type_hash)
    }

    /// Every live node registered for a type key.
    pub fn type_nodes(&self, type_hash: Hash64) -> Vec<NodeHandle> {
        self.indices.type_nodes(&self.tree, type_hash)
    }

    /// Intern a human-readable type path, returning its key.
    pub fn realize_type_path(&mut self, path: &str) -> Hash64 {
        self.indices.realize_type_path(path)
    }

    /// The human-readable path last interned for a type key.
    pub fn seen_type(&self, type_hash: Hash64) -> Option<String> {
        self.indices.seen_type(type_hash).map(str::to_string)
    }

    // ---------------------------------------------------------------
    // Seen paths
    // ---------------------------------------------------------------

    /// Record an observed path name, returning its key. Safe under
    /// concurrent calls.
    pub fn add_seen_path(&self, path: &str) -> Hash64 {
        let key = Hash64::of_str(path);
        let mut map = self.seen_paths.lock().unwrap_or_else(|e| e.into_inner());
        if !map.contains_key(&key) {
            debug!(path, %key, "recorded seen path");
            map.insert(key, path.to_string());
        }
        key
    }

    /// Record a batch of observed path names.
    pub fn add_seen_paths<'p>(&self, paths: impl IntoIterator<Item = &'p str>) {
        for path in paths {
            self.add_seen_path(path);
        }
    }

    /// The path name recorded for a key, if any.
    pub fn seen_path(&self, key: Hash64) -> Option<String> {
        let map = self.seen_paths.lock().unwrap_or_else(|e| e.into_inner());
        map.get(&key).cloned()
    }
}
