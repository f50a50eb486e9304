//! The merge engine: keyed-container merge and positional sequence merge.

use arbor_ext::{ExtensionFactory, WorldState};
use arbor_index::Indices;
use arbor_tree::{Tree, TreeError};
use arbor_types::{kind, MergeMode, NodeHandle, Serial, SerialClock};
use tracing::debug;

use crate::align::{align, AlignedSlot, Element, Family};
use crate::error::{MergeError, MergeResult};

/// One merge call's working state: the persistent tree being mutated, the
/// incoming disposable tree, and the environment facilities the merge
/// consults along the way.
///
/// The engine runs synchronously to completion; on error the persistent
/// tree may be partially updated, and the application restores the affected
/// scope from persistence.
pub struct MergeEngine<'a> {
    tree: &'a mut Tree,
    other: &'a Tree,
    clock: &'a SerialClock,
    indices: &'a mut Indices,
    factory: &'a ExtensionFactory,
    world: &'a WorldState,
    mode: MergeMode,
}

impl<'a> MergeEngine<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tree: &'a mut Tree,
        other: &'a Tree,
        clock: &'a SerialClock,
        indices: &'a mut Indices,
        factory: &'a ExtensionFactory,
        world: &'a WorldState,
        mode: MergeMode,
    ) -> Self {
        Self {
            tree,
            other,
            clock,
            indices,
            factory,
            world,
            mode,
        }
    }

    /// Fold the subtree at `n1` in the incoming tree into the persistent
    /// node `n0`.
    pub fn merge(&mut self, n0: NodeHandle, n1: NodeHandle) -> MergeResult<()> {
        debug!(at = %n0, incoming = %n1, mode = %self.mode, "merge");
        self.visit(n0, n1)
    }

    fn visit(&mut self, n0: NodeHandle, n1: NodeHandle) -> MergeResult<()> {
        if self.is_keyed_pair(n0, n1)? {
            self.merge_keyed(n0, n1)
        } else {
            self.merge_sequence(n0, n1)
        }
    }

    /// A pair merges as a keyed set when both sides are namespace-like
    /// declarations, or both are extension/primitive/empty containers.
    /// Childless non-declaration pairs are leaves and reconcile by serial
    /// in the positional path instead.
    fn is_keyed_pair(&self, n0: NodeHandle, n1: NodeHandle) -> MergeResult<bool> {
        let a = self.tree.get(n0)?;
        let b = self.other.get(n1)?;
        Ok(match (a.value.ast_kind(), b.value.ast_kind()) {
            (Some(k0), Some(k1)) => kind::is_keyed(k0) && kind::is_keyed(k1),
            (None, None) => !(a.sub.is_empty() && b.sub.is_empty()),
            _ => false,
        })
    }

    // ---------------------------------------------------------------
    // Keyed merge
    // ---------------------------------------------------------------

    /// Merge an order-insensitive child set: each incoming child is looked
    /// up by `(kind, id)` for declarations and `(id, type_hash)` otherwise;
    /// hits recurse, misses are adopted. Children are never removed here,
    /// since a reopened namespace only grows across files.
    fn merge_keyed(&mut self, n0: NodeHandle, n1: NodeHandle) -> MergeResult<()> {
        let incoming = self.other.get(n1)?.sub.clone();
        for c1 in incoming {
            let (ast_kind, id, type_hash) = {
                let child = self.other.get(c1)?;
                (child.value.ast_kind(), child.id.clone(), child.type_hash)
            };
            let found = match ast_kind {
                Some(k) => self.tree.ast_find(n0, k, &id),
                None => self.tree.find_child_typed(n0, &id, type_hash),
            };
            match found {
                Some(c0) => self.visit(c0, c1)?,
                None => {
                    let adopted =
                        self.tree
                            .adopt_from(n0, self.other, c1, self.factory, self.clock)?;
                    self.merge_visit_post(adopted)?;
                    self.tree.get_mut(n0)?.serial = self.clock.next();
                }
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Sequence merge
    // ---------------------------------------------------------------

    fn merge_sequence(&mut self, n0: NodeHandle, n1: NodeHandle) -> MergeResult<()> {
        let s0 = self.tree.get(n0)?.serial;
        let s1 = self.other.get(n1)?.serial;
        if s0 == s1 {
            // Equal stamps mean known-identical sides.
            return Ok(());
        }
        if s0.is_unstamped() {
            return Err(MergeError::UnstampedNode(n0));
        }
        if s1.is_unstamped() {
            return Err(MergeError::UnstampedNode(n1));
        }

        let n0_children = self.tree.get(n0)?.sub.clone();
        let n1_children = self.other.get(n1)?.sub.clone();
        if n0_children.is_empty() && n1_children.is_empty() {
            return self.reconcile_leaf(n0, n1, s0, s1);
        }

        let pri_is_persistent = if self.mode.favors_fresh() {
            s0 > s1
        } else {
            s0 < s1
        };

        // The recursion below requires child serials; persistent children
        // that were never stamped inherit the parent's stamp.
        if pri_is_persistent {
            for &c in &n0_children {
                let child = self.tree.get_mut(c)?;
                if child.serial.is_unstamped() {
                    child.serial = s0;
                }
            }
        }

        let (pri_handles, sec_handles) = if pri_is_persistent {
            (&n0_children, &n1_children)
        } else {
            (&n1_children, &n0_children)
        };
        let pri_elems = if pri_is_persistent {
            elements_of(self.tree, pri_handles)?
        } else {
            elements_of(self.other, pri_handles)?
        };
        let sec_elems = if pri_is_persistent {
            elements_of(self.other, sec_handles)?
        } else {
            elements_of(self.tree, sec_handles)?
        };

        let slots = align(&pri_elems, &sec_elems)
            .ok_or(MergeError::UnrecoverableTopology { parent: n0 })?;

        // Field reconciliation on the pair itself. Only a real payload
        // difference consumes a serial.
        let mut minted = false;
        let copies_in = match self.mode {
            MergeMode::OverwriteOld | MergeMode::UpdateSubset => s0 < s1,
            MergeMode::KeepOld => s0 > s1,
        };
        if copies_in && !self.tree.get(n0)?.payload_same(self.other.get(n1)?) {
            let src = self.other.get(n1)?;
            let dst = self.tree.get_mut(n0)?;
            dst.copy_payload_from(src, self.factory)
                .map_err(TreeError::from)?;
            dst.serial = self.clock.next();
            minted = true;
        }

        // Resolve the aligned shape into (persistent, incoming) sides.
        let resolved: Vec<(Option<NodeHandle>, Option<NodeHandle>)> = slots
            .iter()
            .map(|s| match *s {
                AlignedSlot::Pair { pri, sec } => {
                    if pri_is_persistent {
                        (Some(pri_handles[pri]), Some(sec_handles[sec]))
                    } else {
                        (Some(sec_handles[sec]), Some(pri_handles[pri]))
                    }
                }
                AlignedSlot::PriOnly(p) => {
                    if pri_is_persistent {
                        (Some(pri_handles[p]), None)
                    } else {
                        (None, Some(pri_handles[p]))
                    }
                }
                AlignedSlot::SecInsert(s) => {
                    if pri_is_persistent {
                        (None, Some(sec_handles[s]))
                    } else {
                        (Some(sec_handles[s]), None)
                    }
                }
            })
            .collect();

        // Rewrite the persistent child list to the aligned shape.
        let mut new_sub: Vec<NodeHandle> = Vec::with_capacity(resolved.len());
        for (persistent, incoming) in resolved {
            match (persistent, incoming) {
                (Some(p), Some(i)) => {
                    self.ensure_ext_initialized(p)?;
                    let before = self.tree.get(p)?.serial;
                    self.visit(p, i)?;
                    if self.tree.get(p)?.serial != before && !minted {
                        self.tree.get_mut(n0)?.serial = self.clock.next();
                        minted = true;
                    }
                    new_sub.push(p);
                }
                (Some(p), None) => new_sub.push(p),
                (None, Some(i)) => {
                    let adopted =
                        self.tree
                            .adopt_from(n0, self.other, i, self.factory, self.clock)?;
                    self.merge_visit_post(adopted)?;
                    new_sub.push(adopted);
                    if !minted {
                        self.tree.get_mut(n0)?.serial = self.clock.next();
                        minted = true;
                    }
                }
                (None, None) => {}
            }
        }

        // Persistent children absent from the shape are gone: tear down
        // and destroy, and record the shape change on the parent.
        let current = self.tree.get(n0)?.sub.clone();
        let mut removed = false;
        for c in current {
            if !new_sub.contains(&c) {
                self.tree.remove_child(n0, c)?;
                removed = true;
            }
        }
        if removed && !minted {
            self.tree.get_mut(n0)?.serial = self.clock.next();
        }
        self.tree.get_mut(n0)?.sub = new_sub;
        Ok(())
    }

    /// Leaf pair: the winning side's fields are adopted wholesale, serial
    /// included, so a repeated merge short-circuits on equal stamps.
    fn reconcile_leaf(
        &mut self,
        n0: NodeHandle,
        n1: NodeHandle,
        s0: Serial,
        s1: Serial,
    ) -> MergeResult<()> {
        let copies_in = match self.mode {
            MergeMode::OverwriteOld | MergeMode::UpdateSubset => s0 < s1,
            MergeMode::KeepOld => s0 > s1,
        };
        if copies_in {
            let src = self.other.get(n1)?;
            let dst = self.tree.get_mut(n0)?;
            dst.copy_payload_from(src, self.factory)
                .map_err(TreeError::from)?;
            dst.serial = s1;
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Post-adoption
    // ---------------------------------------------------------------

    /// Register every node of a freshly adopted subtree in the indices and
    /// bring its extensions up.
    fn merge_visit_post(&mut self, h: NodeHandle) -> MergeResult<()> {
        let order: Vec<NodeHandle> = self.tree.descendants(h).collect();
        for node in order {
            self.indices.refresh_node(self.tree, self.clock, node)?;
            self.ensure_ext_initialized(node)?;
        }
        Ok(())
    }

    /// Initialize a node's extension if present; a refusal degrades the
    /// node to "extension empty" instead of failing the merge.
    fn ensure_ext_initialized(&mut self, h: NodeHandle) -> MergeResult<()> {
        let node = self.tree.get_mut(h)?;
        let refused = match node.ext.as_mut() {
            Some(ext) => !ext.ensure_initialized(self.world),
            None => false,
        };
        if refused {
            debug!(node = %h, "extension refused to initialize, degrading");
            node.ext = None;
        }
        Ok(())
    }
}

fn elements_of(tree: &Tree, children: &[NodeHandle]) -> MergeResult<Vec<Element>> {
    children
        .iter()
        .map(|&c| {
            let node = tree.get(c)?;
            Ok(if node.value.is_ast() {
                Element {
                    family: Family::Source,
                    hash: tree.source_hash(c)?,
                }
            } else {
                Element {
                    family: Family::Extension,
                    hash: tree.total_hash(c)?,
                }
            })
        })
        .collect()
}
