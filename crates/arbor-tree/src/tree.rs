//! The arena holding one tree of [`ValueNode`]s.

use arbor_ext::ExtensionFactory;
use arbor_types::{ContentHasher, Hash64, NodeHandle, SerialClock};
use tracing::debug;

use crate::error::{TreeError, TreeResult};
use crate::node::ValueNode;

/// Longest symbolic-link chain [`Tree::resolve`] will walk.
const MAX_LINK_HOPS: usize = 100;

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    node: Option<ValueNode>,
}

/// An arena of node slots addressed by generation-checked handles.
///
/// Nodes are destroyed only through [`remove_child`] and
/// [`detach_subtree`]; freeing a slot bumps its generation, so retained
/// handles to destroyed nodes resolve to stale rather than aliasing a later
/// occupant.
///
/// [`remove_child`]: Tree::remove_child
/// [`detach_subtree`]: Tree::detach_subtree
#[derive(Debug)]
pub struct Tree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    root: NodeHandle,
}

impl Tree {
    /// Create a tree holding a single empty root node.
    pub fn new() -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            root: NodeHandle::new(0, 0),
        };
        tree.root = tree.alloc(ValueNode::new(""));
        tree
    }

    /// The root handle. Always live.
    pub fn root(&self) -> NodeHandle {
        self.root
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if only the root exists.
    pub fn is_empty(&self) -> bool {
        self.live == 1
    }

    /// Returns `true` if `h` addresses a live node.
    pub fn contains(&self, h: NodeHandle) -> bool {
        self.node(h).is_some()
    }

    /// Lenient lookup: `None` for stale handles.
    pub fn node(&self, h: NodeHandle) -> Option<&ValueNode> {
        let slot = self.slots.get(h.index as usize)?;
        if slot.generation != h.generation {
            return None;
        }
        slot.node.as_ref()
    }

    /// Lenient mutable lookup: `None` for stale handles.
    pub fn node_mut(&mut self, h: NodeHandle) -> Option<&mut ValueNode> {
        let slot = self.slots.get_mut(h.index as usize)?;
        if slot.generation != h.generation {
            return None;
        }
        slot.node.as_mut()
    }

    /// Checked lookup.
    pub fn get(&self, h: NodeHandle) -> TreeResult<&ValueNode> {
        self.node(h).ok_or(TreeError::StaleHandle(h))
    }

    /// Checked mutable lookup.
    pub fn get_mut(&mut self, h: NodeHandle) -> TreeResult<&mut ValueNode> {
        self.node_mut(h).ok_or(TreeError::StaleHandle(h))
    }

    fn alloc(&mut self, node: ValueNode) -> NodeHandle {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeHandle::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 1,
            node: Some(node),
        });
        NodeHandle::new(index, 1)
    }

    fn free_one(&mut self, h: NodeHandle) {
        if let Some(slot) = self.slots.get_mut(h.index as usize) {
            if slot.generation == h.generation && slot.node.is_some() {
                if let Some(node) = slot.node.as_mut() {
                    if let Some(ext) = node.ext.as_mut() {
                        ext.uninitialize_deep();
                    }
                }
                slot.node = None;
                slot.generation += 1;
                self.free.push(h.index);
                self.live -= 1;
            }
        }
    }

    fn free_subtree(&mut self, h: NodeHandle) {
        let order: Vec<NodeHandle> = self.descendants(h).collect();
        for node in order.into_iter().rev() {
            self.free_one(node);
        }
    }

    // ---------------------------------------------------------------
    // Structure
    // ---------------------------------------------------------------

    /// Append `node` as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeHandle, node: ValueNode) -> TreeResult<NodeHandle> {
        let len = self.get(parent)?.sub.len();
        self.insert_child(parent, len, node)
    }

    /// Insert `node` as a child of `parent` at position `at`.
    pub fn insert_child(
        &mut self,
        parent: NodeHandle,
        at: usize,
        mut node: ValueNode,
    ) -> TreeResult<NodeHandle> {
        let len = self.get(parent)?.sub.len();
        if at > len {
            return Err(TreeError::PositionOutOfBounds { parent, at, len });
        }
        node.owner = Some(parent);
        let h = self.alloc(node);
        self.get_mut(parent)?.sub.insert(at, h);
        Ok(h)
    }

    /// Destroy `child` (and its whole subtree) and unlink it from `parent`.
    pub fn remove_child(&mut self, parent: NodeHandle, child: NodeHandle) -> TreeResult<()> {
        self.get(child)?;
        let sub = &mut self.get_mut(parent)?.sub;
        let pos = sub
            .iter()
            .position(|&c| c == child)
            .ok_or(TreeError::NotAChild { parent, child })?;
        sub.remove(pos);
        self.free_subtree(child);
        debug!(parent = %parent, child = %child, "removed child subtree");
        Ok(())
    }

    /// Destroy the subtree rooted at `h`, unlinking it from its owner.
    pub fn detach_subtree(&mut self, h: NodeHandle) -> TreeResult<()> {
        if h == self.root {
            return Err(TreeError::RootDetach);
        }
        let owner = self.get(h)?.owner;
        if let Some(owner) = owner {
            if let Some(parent) = self.node_mut(owner) {
                parent.sub.retain(|&c| c != h);
            }
        }
        self.free_subtree(h);
        Ok(())
    }

    /// The child handles of `h`.
    pub fn children(&self, h: NodeHandle) -> TreeResult<&[NodeHandle]> {
        Ok(&self.get(h)?.sub)
    }

    /// Preorder iterator over `h` and every node below it.
    pub fn descendants(&self, h: NodeHandle) -> Descendants<'_> {
        Descendants {
            tree: self,
            stack: if self.contains(h) { vec![h] } else { Vec::new() },
        }
    }

    // ---------------------------------------------------------------
    // Navigation
    // ---------------------------------------------------------------

    /// First child of `parent` with the given id, regardless of payload.
    pub fn find_child(&self, parent: NodeHandle, id: &str) -> Option<NodeHandle> {
        self.node(parent)?
            .sub
            .iter()
            .copied()
            .find(|&c| self.node(c).is_some_and(|n| n.id == id))
    }

    /// First non-declaration child of `parent` matching id and type key.
    pub fn find_child_typed(
        &self,
        parent: NodeHandle,
        id: &str,
        type_hash: Hash64,
    ) -> Option<NodeHandle> {
        self.node(parent)?.sub.iter().copied().find(|&c| {
            self.node(c)
                .is_some_and(|n| !n.value.is_ast() && n.id == id && n.type_hash == type_hash)
        })
    }

    /// First declaration child of `parent` matching kind and id.
    pub fn ast_find(&self, parent: NodeHandle, kind: i32, id: &str) -> Option<NodeHandle> {
        self.node(parent)?.sub.iter().copied().find(|&c| {
            self.node(c)
                .is_some_and(|n| n.id == id && n.value.ast_kind() == Some(kind))
        })
    }

    /// Declaration children of `h` with the given kind.
    pub fn ast_find_all_shallow(&self, h: NodeHandle, kind: i32) -> Vec<NodeHandle> {
        self.node(h)
            .map(|n| {
                n.sub
                    .iter()
                    .copied()
                    .filter(|&c| self.node(c).is_some_and(|n| n.value.ast_kind() == Some(kind)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Declaration nodes of the given kind anywhere below `h`, `h` included.
    pub fn ast_find_all_deep(&self, h: NodeHandle, kind: i32) -> Vec<NodeHandle> {
        self.descendants(h)
            .filter(|&d| self.node(d).is_some_and(|n| n.value.ast_kind() == Some(kind)))
            .collect()
    }

    /// Walk the id path from the root. An empty path is the root itself.
    pub fn find_path(&self, path: &[&str]) -> Option<NodeHandle> {
        let mut at = self.root;
        for segment in path {
            at = self.find_child(at, segment)?;
        }
        Some(at)
    }

    /// Dotted id path of `h` from the root (empty string for the root).
    pub fn path_of(&self, h: NodeHandle) -> TreeResult<String> {
        let mut segments = Vec::new();
        let mut at = h;
        loop {
            let node = self.get(at)?;
            match node.owner {
                Some(owner) => {
                    segments.push(node.id.clone());
                    at = owner;
                }
                None => break,
            }
        }
        segments.reverse();
        Ok(segments.join("."))
    }

    /// Follow the symbolic-link chain from `h` to its final target.
    ///
    /// A node without a link resolves to itself. A dangling link, a cycle,
    /// or a chain longer than the hop bound resolves to `None`.
    pub fn resolve(&self, h: NodeHandle) -> Option<NodeHandle> {
        let mut at = h;
        for _ in 0..=MAX_LINK_HOPS {
            match self.node(at)?.symbolic_link {
                Some(target) => at = target,
                None => return Some(at),
            }
        }
        None
    }

    // ---------------------------------------------------------------
    // Keyed upserts
    // ---------------------------------------------------------------

    /// Find a child of `parent` by id, creating an empty one if absent.
    pub fn get_add(&mut self, parent: NodeHandle, id: &str) -> TreeResult<NodeHandle> {
        if let Some(found) = self.find_child(parent, id) {
            return Ok(found);
        }
        self.add_child(parent, ValueNode::new(id))
    }

    /// Find a declaration child by kind and id, creating one if absent.
    pub fn ast_get_add(
        &mut self,
        parent: NodeHandle,
        id: &str,
        type_sig: &str,
        kind: i32,
    ) -> TreeResult<NodeHandle> {
        if let Some(found) = self.ast_find(parent, kind, id) {
            return Ok(found);
        }
        let mut node = ValueNode::ast(kind, id);
        if let Some(a) = node.value.as_ast_mut() {
            a.type_sig = type_sig.to_string();
        }
        self.add_child(parent, node)
    }

    /// Append a declaration child unconditionally.
    pub fn ast_add(&mut self, parent: NodeHandle, kind: i32, id: &str) -> TreeResult<NodeHandle> {
        self.add_child(parent, ValueNode::ast(kind, id))
    }

    // ---------------------------------------------------------------
    // Hashing
    // ---------------------------------------------------------------

    /// Structural identity of a declaration subtree: kind, id, and type
    /// signature, recursing into declaration children only. Non-declaration
    /// descendants do not contribute, so attaching analysis payloads under
    /// a declaration does not change its source identity.
    pub fn source_hash(&self, h: NodeHandle) -> TreeResult<Hash64> {
        let mut ch = ContentHasher::new();
        self.feed_source_hash(h, &mut ch)?;
        Ok(ch.finish())
    }

    fn feed_source_hash(&self, h: NodeHandle, ch: &mut ContentHasher) -> TreeResult<()> {
        let node = self.get(h)?;
        if let Some(a) = node.value.as_ast() {
            ch.put_i64(i64::from(a.kind))
                .put_str(&node.id)
                .put_str(&a.type_sig);
            for &c in &node.sub {
                if self.get(c)?.value.is_ast() {
                    self.feed_source_hash(c, ch)?;
                }
            }
        }
        Ok(())
    }

    /// Full identity of a subtree: every payload field, the serial, and
    /// every descendant. Equal total hashes mean the subtrees are
    /// indistinguishable to a merge.
    pub fn total_hash(&self, h: NodeHandle) -> TreeResult<Hash64> {
        let mut ch = ContentHasher::new();
        self.feed_total_hash(h, &mut ch)?;
        Ok(ch.finish())
    }

    fn feed_total_hash(&self, h: NodeHandle, ch: &mut ContentHasher) -> TreeResult<()> {
        let node = self.get(h)?;
        node.feed_payload(ch);
        ch.put_u64(node.serial.as_u64());
        ch.put_u64(node.sub.len() as u64);
        for &c in &node.sub {
            self.feed_total_hash(c, ch)?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Serials and adoption
    // ---------------------------------------------------------------

    /// Stamp every unstamped node in the tree. Producers building
    /// disposable trees call this before handing them to a merge.
    pub fn realize_serials(&mut self, clock: &SerialClock) -> usize {
        let mut stamped = 0;
        for slot in &mut self.slots {
            if let Some(node) = slot.node.as_mut() {
                if node.serial.is_unstamped() {
                    node.serial = clock.next();
                    stamped += 1;
                }
            }
        }
        if stamped > 0 {
            debug!(stamped, "realized serials");
        }
        stamped
    }

    /// Deep-copy the subtree at `src` in `src_tree` to the end of
    /// `parent`'s child list.
    pub fn adopt_from(
        &mut self,
        parent: NodeHandle,
        src_tree: &Tree,
        src: NodeHandle,
        factory: &ExtensionFactory,
        clock: &SerialClock,
    ) -> TreeResult<NodeHandle> {
        let at = self.get(parent)?.sub.len();
        self.adopt_at(parent, at, src_tree, src, factory, clock)
    }

    /// Deep-copy the subtree at `src` in `src_tree` into `parent` at
    /// position `at`.
    ///
    /// Source serials are preserved so an adopted node still compares equal
    /// to its origin; unstamped nodes are stamped on the way in. Extensions
    /// come back as fresh uninitialized copies (or degrade to empty when
    /// the type is unregistered). Symbolic links are dropped, since their
    /// handles address the source arena.
    pub fn adopt_at(
        &mut self,
        parent: NodeHandle,
        at: usize,
        src_tree: &Tree,
        src: NodeHandle,
        factory: &ExtensionFactory,
        clock: &SerialClock,
    ) -> TreeResult<NodeHandle> {
        let len = self.get(parent)?.sub.len();
        if at > len {
            return Err(TreeError::PositionOutOfBounds { parent, at, len });
        }
        let h = self.adopt_rec(parent, src_tree, src, factory, clock)?;
        let sub = &mut self.get_mut(parent)?.sub;
        let end = sub.pop().ok_or(TreeError::StaleHandle(parent))?;
        sub.insert(at, end);
        debug!(parent = %parent, adopted = %h, "adopted subtree");
        Ok(h)
    }

    fn adopt_rec(
        &mut self,
        parent: NodeHandle,
        src_tree: &Tree,
        src: NodeHandle,
        factory: &ExtensionFactory,
        clock: &SerialClock,
    ) -> TreeResult<NodeHandle> {
        let src_node = src_tree.get(src)?;
        let mut copy = ValueNode::default();
        copy.copy_payload_from(src_node, factory)?;
        copy.serial = if src_node.serial.is_unstamped() {
            clock.next()
        } else {
            src_node.serial
        };
        let children = src_node.sub.clone();

        let h = self.add_child(parent, copy)?;
        for c in children {
            self.adopt_rec(h, src_tree, c, factory, clock)?;
        }
        Ok(h)
    }

    // ---------------------------------------------------------------
    // Deep lifecycle sweeps
    // ---------------------------------------------------------------

    /// Stop every started extension in the subtree at `h`.
    pub fn stop_deep(&mut self, h: NodeHandle) -> TreeResult<()> {
        self.sweep(h, |node| {
            if let Some(ext) = node.ext.as_mut() {
                ext.stop();
            }
        })
    }

    /// Tear down every extension in the subtree at `h`.
    pub fn uninitialize_deep(&mut self, h: NodeHandle) -> TreeResult<()> {
        self.sweep(h, |node| {
            if let Some(ext) = node.ext.as_mut() {
                ext.uninitialize_deep();
            }
        })
    }

    /// Drop every extension dependency link in the subtree at `h`.
    pub fn clear_dependencies_deep(&mut self, h: NodeHandle) -> TreeResult<()> {
        self.sweep(h, |node| {
            if let Some(ext) = node.ext.as_mut() {
                ext.clear_dependencies();
            }
        })
    }

    fn sweep(&mut self, h: NodeHandle, f: impl Fn(&mut ValueNode)) -> TreeResult<()> {
        self.get(h)?;
        let order: Vec<NodeHandle> = self.descendants(h).collect();
        for node in order {
            if let Some(node) = self.node_mut(node) {
                f(node);
            }
        }
        Ok(())
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

/// Preorder traversal over a subtree. See [`Tree::descendants`].
pub struct Descendants<'a> {
    tree: &'a Tree,
    stack: Vec<NodeHandle>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeHandle;

    fn next(&mut self) -> Option<NodeHandle> {
        let h = self.stack.pop()?;
        if let Some(node) = self.tree.node(h) {
            self.stack.extend(node.sub.iter().rev().copied());
        }
        Some(h)
    }
}
