//! Human-readable tree diagnostics.

use arbor_types::{NodeHandle, NodeValue};

use crate::error::TreeResult;
use crate::tree::Tree;

impl Tree {
    /// Field-by-field difference report between the subtree at `h` and the
    /// subtree at `oh` in `other`, capped at `max` entries. Children are
    /// compared pairwise by position; an empty report means the subtrees
    /// are structurally and field-wise identical.
    pub fn find_differences(
        &self,
        h: NodeHandle,
        other: &Tree,
        oh: NodeHandle,
        max: usize,
    ) -> TreeResult<Vec<String>> {
        let mut out = Vec::new();
        self.diff_rec(h, other, oh, max, &mut out)?;
        Ok(out)
    }

    fn diff_rec(
        &self,
        h: NodeHandle,
        other: &Tree,
        oh: NodeHandle,
        max: usize,
        out: &mut Vec<String>,
    ) -> TreeResult<()> {
        if out.len() >= max {
            return Ok(());
        }
        let path = self.path_of(h)?;
        let prefix = if path.is_empty() { "<root>".to_string() } else { path };
        let a = self.get(h)?;
        let b = other.get(oh)?;

        let mut push = |field: &str, left: String, right: String, out: &mut Vec<String>| {
            if out.len() < max {
                out.push(format!("{prefix}: {field}: {left} != {right}"));
            }
        };

        if a.id != b.id {
            push("id", a.id.clone(), b.id.clone(), out);
        }
        if a.type_hash != b.type_hash {
            push("type", a.type_hash.short_hex(), b.type_hash.short_hex(), out);
        }
        if a.serial != b.serial {
            push("serial", a.serial.to_string(), b.serial.to_string(), out);
        }
        if a.pkg_hash != b.pkg_hash {
            push("pkg", a.pkg_hash.short_hex(), b.pkg_hash.short_hex(), out);
        }
        if a.file_hash != b.file_hash {
            push("file", a.file_hash.short_hex(), b.file_hash.short_hex(), out);
        }
        if a.value != b.value {
            push("value", format!("{:?}", a.value), format!("{:?}", b.value), out);
        }
        if a.ext_hash() != b.ext_hash() {
            push("ext", a.ext_hash().short_hex(), b.ext_hash().short_hex(), out);
        }
        if a.sub.len() != b.sub.len() {
            push(
                "children",
                a.sub.len().to_string(),
                b.sub.len().to_string(),
                out,
            );
        }

        let pairs: Vec<(NodeHandle, NodeHandle)> = a
            .sub
            .iter()
            .zip(b.sub.iter())
            .map(|(&x, &y)| (x, y))
            .collect();
        for (x, y) in pairs {
            if out.len() >= max {
                break;
            }
            self.diff_rec(x, other, y, max, out)?;
        }
        Ok(())
    }

    /// Indented one-line-per-node dump of the subtree at `h`.
    pub fn tree_string(&self, h: NodeHandle) -> TreeResult<String> {
        let mut out = String::new();
        self.dump_rec(h, 0, &mut out)?;
        Ok(out)
    }

    fn dump_rec(&self, h: NodeHandle, depth: usize, out: &mut String) -> TreeResult<()> {
        let node = self.get(h)?;
        for _ in 0..depth {
            out.push_str("  ");
        }
        let id = if node.id.is_empty() { "<root>" } else { &node.id };
        out.push_str(id);
        match &node.value {
            NodeValue::Empty => {}
            NodeValue::Ast(a) => {
                out.push_str(&format!(" kind={}", a.kind));
                if !a.type_sig.is_empty() {
                    out.push_str(&format!(" sig={}", a.type_sig));
                }
            }
            NodeValue::Primitive(p) => {
                out.push_str(&format!(" value={p:?}"));
            }
        }
        if let Some(ext) = &node.ext {
            out.push_str(&format!(" ext={}", ext.type_name()));
        }
        out.push_str(&format!(" serial={}", node.serial));
        out.push('\n');
        let children = node.sub.clone();
        for c in children {
            self.dump_rec(c, depth + 1, out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ValueNode;
    use arbor_types::{kind, Serial};

    #[test]
    fn identical_trees_have_no_differences() {
        let mut a = Tree::new();
        let x = a.ast_add(a.root(), kind::CLASS_DECL, "Foo").unwrap();
        a.get_mut(x).unwrap().serial = Serial::from_u64(1);

        let mut b = Tree::new();
        let y = b.ast_add(b.root(), kind::CLASS_DECL, "Foo").unwrap();
        b.get_mut(y).unwrap().serial = Serial::from_u64(1);

        let diffs = a.find_differences(a.root(), &b, b.root(), 16).unwrap();
        assert!(diffs.is_empty(), "unexpected diffs: {diffs:?}");
    }

    #[test]
    fn differences_name_path_and_field() {
        let mut a = Tree::new();
        let x = a.add_child(a.root(), ValueNode::new("n")).unwrap();
        a.get_mut(x).unwrap().serial = Serial::from_u64(1);

        let mut b = Tree::new();
        let y = b.add_child(b.root(), ValueNode::new("n")).unwrap();
        b.get_mut(y).unwrap().serial = Serial::from_u64(2);

        let diffs = a.find_differences(a.root(), &b, b.root(), 16).unwrap();
        assert_eq!(diffs.len(), 1);
        assert!(diffs[0].contains("n: serial: 1 != 2"), "{}", diffs[0]);
    }

    #[test]
    fn difference_report_is_capped() {
        let mut a = Tree::new();
        let mut b = Tree::new();
        for i in 0..10 {
            let x = a.add_child(a.root(), ValueNode::new(format!("c{i}"))).unwrap();
            a.get_mut(x).unwrap().serial = Serial::from_u64(1);
            let y = b.add_child(b.root(), ValueNode::new(format!("c{i}"))).unwrap();
            b.get_mut(y).unwrap().serial = Serial::from_u64(2);
        }
        let diffs = a.find_differences(a.root(), &b, b.root(), 3).unwrap();
        assert_eq!(diffs.len(), 3);
    }

    #[test]
    fn tree_string_is_indented() {
        let mut tree = Tree::new();
        let ns = tree.ast_get_add(tree.root(), "Foo", "", kind::NAMESPACE).unwrap();
        tree.ast_add(ns, kind::FUNCTION_DECL, "bar").unwrap();

        let dump = tree.tree_string(tree.root()).unwrap();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("<root>"));
        assert!(lines[1].starts_with("  Foo kind=22"));
        assert!(lines[2].starts_with("    bar kind=8"));
    }
}
