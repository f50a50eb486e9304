//! Source-scope tagging and projection.
//!
//! Every node remembers the package and file it originated from, so a
//! producer can re-merge a single file's fragment without touching branches
//! owned by other files. [`Tree::subset`] projects the branches of one
//! origin into a fresh tree for exactly that purpose.

use arbor_ext::ExtensionFactory;
use arbor_types::{Hash64, NodeHandle};

use crate::error::TreeResult;
use crate::node::ValueNode;
use crate::tree::Tree;

impl Tree {
    /// Tag `h` and every node below it with an origin scope.
    pub fn set_source_deep(
        &mut self,
        h: NodeHandle,
        pkg_hash: Hash64,
        file_hash: Hash64,
    ) -> TreeResult<()> {
        self.get(h)?;
        let order: Vec<NodeHandle> = self.descendants(h).collect();
        for node in order {
            if let Some(node) = self.node_mut(node) {
                node.pkg_hash = pkg_hash;
                node.file_hash = file_hash;
            }
        }
        Ok(())
    }

    /// Returns `true` if `h` or any node below it carries the given origin.
    pub fn has_source_deep(
        &self,
        h: NodeHandle,
        pkg_hash: Hash64,
        file_hash: Hash64,
    ) -> TreeResult<bool> {
        self.get(h)?;
        Ok(self.descendants(h).any(|d| {
            self.node(d)
                .is_some_and(|n| n.pkg_hash == pkg_hash && n.file_hash == file_hash)
        }))
    }

    /// Project the branches originating from one package and file into a
    /// fresh tree.
    ///
    /// A child is carried over when it, or anything below it, carries the
    /// origin; within a carried branch, descendants of a different origin
    /// are filtered the same way. Serials are preserved so the projection
    /// still merges cleanly against the source.
    pub fn subset(
        &self,
        pkg_hash: Hash64,
        file_hash: Hash64,
        factory: &ExtensionFactory,
    ) -> TreeResult<Tree> {
        let mut out = Tree::new();
        let out_root = out.root();
        {
            let src_root = self.get(self.root())?;
            let dst_root = out.get_mut(out_root)?;
            dst_root.copy_payload_from(src_root, factory)?;
            dst_root.serial = src_root.serial;
        }
        self.subset_rec(self.root(), out_root, &mut out, pkg_hash, file_hash, factory)?;
        Ok(out)
    }

    fn subset_rec(
        &self,
        src: NodeHandle,
        dst: NodeHandle,
        out: &mut Tree,
        pkg_hash: Hash64,
        file_hash: Hash64,
        factory: &ExtensionFactory,
    ) -> TreeResult<()> {
        let children = self.get(src)?.sub.clone();
        for c in children {
            if !self.has_source_deep(c, pkg_hash, file_hash)? {
                continue;
            }
            let src_node = self.get(c)?;
            let mut copy = ValueNode::default();
            copy.copy_payload_from(src_node, factory)?;
            copy.serial = src_node.serial;
            let nd = out.add_child(dst, copy)?;
            self.subset_rec(c, nd, out, pkg_hash, file_hash, factory)?;
        }
        Ok(())
    }
}
