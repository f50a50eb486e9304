//! The versioned node stored in each arena slot.

use arbor_ext::{ExtResult, ExtensionFactory, ExtensionHost};
use arbor_types::{AstVariant, ContentHasher, Hash64, NodeHandle, NodeValue, Serial};

/// One node of the metadata tree.
///
/// Invariants: `type_hash == Hash64::NONE` implies `ext` is empty; when
/// `ext` is present its type hash equals `type_hash` (the reverse does not
/// hold, since a factory may not know the type); `serial` is a
/// happens-before token, zero meaning "unstamped".
#[derive(Debug, Default)]
pub struct ValueNode {
    /// Name, unique among siblings in keyed containers.
    pub id: String,
    /// Extension type key; NONE means no extension.
    pub type_hash: Hash64,
    /// Freshness stamp; zero means unstamped.
    pub serial: Serial,
    /// Hash of the package this node originated from.
    pub pkg_hash: Hash64,
    /// Hash of the file this node originated from.
    pub file_hash: Hash64,
    /// The payload.
    pub value: NodeValue,
    /// The attached extension, if materialized.
    pub ext: Option<ExtensionHost>,
    /// Parent handle; None only for the root.
    pub owner: Option<NodeHandle>,
    /// Child handles. Order is meaningful only in positional containers.
    pub sub: Vec<NodeHandle>,
    /// Alias target, resolved through a hop-bounded chain walk.
    pub symbolic_link: Option<NodeHandle>,
}

impl ValueNode {
    /// A plain container node with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// A declaration node with the given kind and id.
    pub fn ast(kind: i32, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: NodeValue::Ast(AstVariant::with_kind(kind)),
            ..Self::default()
        }
    }

    /// A declaration node carrying a full payload.
    pub fn ast_with(id: impl Into<String>, payload: AstVariant) -> Self {
        Self {
            id: id.into(),
            value: NodeValue::Ast(payload),
            ..Self::default()
        }
    }

    /// The hash of the attached extension's state, NONE when absent.
    pub fn ext_hash(&self) -> Hash64 {
        self.ext.as_ref().map_or(Hash64::NONE, |e| e.hash_value())
    }

    /// Compares every payload field, excluding the serial and all
    /// structural fields (owner, children, link). Two nodes that are
    /// payload-same need no field reconciliation, so a no-op update never
    /// consumes a serial.
    pub fn payload_same(&self, other: &ValueNode) -> bool {
        self.id == other.id
            && self.type_hash == other.type_hash
            && self.pkg_hash == other.pkg_hash
            && self.file_hash == other.file_hash
            && self.value == other.value
            && self.ext_hash() == other.ext_hash()
    }

    /// Feed every payload field into an ongoing combine.
    pub fn feed_payload(&self, h: &mut ContentHasher) {
        h.put_str(&self.id)
            .put_hash(self.type_hash)
            .put_hash(self.pkg_hash)
            .put_hash(self.file_hash);
        self.value.feed(h);
        h.put_hash(self.ext_hash());
    }

    /// Copy `src`'s payload fields into this node, leaving identity
    /// (handle), serial, and structure untouched.
    ///
    /// The extension is reconciled through its visitable state: same type
    /// copies in place, a different registered type is rebuilt through the
    /// factory, and an unregistered type degrades this node to "extension
    /// empty". Symbolic links are not copied; their handles are only
    /// meaningful inside the source tree.
    pub fn copy_payload_from(
        &mut self,
        src: &ValueNode,
        factory: &ExtensionFactory,
    ) -> ExtResult<()> {
        self.id = src.id.clone();
        self.type_hash = src.type_hash;
        self.pkg_hash = src.pkg_hash;
        self.file_hash = src.file_hash;
        self.value = src.value.clone();

        match &src.ext {
            Some(src_ext) => {
                let same_type = self
                    .ext
                    .as_ref()
                    .is_some_and(|e| e.type_hash() == src_ext.type_hash());
                if same_type {
                    if let Some(ext) = self.ext.as_mut() {
                        ext.copy_from(src_ext)?;
                    }
                } else {
                    if let Some(old) = self.ext.as_mut() {
                        old.uninitialize_deep();
                    }
                    self.ext = match factory.clone_ext(src_ext) {
                        Some(copy) => Some(copy?),
                        None => None,
                    };
                }
            }
            None => {
                if let Some(old) = self.ext.as_mut() {
                    old.uninitialize_deep();
                }
                self.ext = None;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_ext::{Extension, WorldState};
    use arbor_types::kind;

    struct Tag {
        text: String,
    }

    impl Extension for Tag {
        fn type_name(&self) -> &'static str {
            "Tag"
        }
        fn state(&self) -> serde_json::Value {
            serde_json::json!({ "text": self.text })
        }
        fn apply_state(&mut self, state: &serde_json::Value) -> ExtResult<()> {
            self.text = state["text"].as_str().unwrap_or_default().to_string();
            Ok(())
        }
    }

    fn tag_node(id: &str, text: &str) -> ValueNode {
        let mut n = ValueNode::new(id);
        n.type_hash = Hash64::of_str("Tag");
        n.ext = Some(ExtensionHost::new(Box::new(Tag { text: text.into() })));
        n
    }

    fn tag_factory() -> ExtensionFactory {
        let mut f = ExtensionFactory::new();
        f.register("Tag", || Box::new(Tag { text: String::new() }));
        f
    }

    #[test]
    fn payload_same_ignores_serial_and_structure() {
        let mut a = ValueNode::ast(kind::CLASS_DECL, "Foo");
        let mut b = ValueNode::ast(kind::CLASS_DECL, "Foo");
        a.serial = Serial::from_u64(3);
        b.serial = Serial::from_u64(9);
        b.sub.push(NodeHandle::new(5, 1));
        assert!(a.payload_same(&b));

        b.value.as_ast_mut().unwrap().is_definition = true;
        assert!(!a.payload_same(&b));
    }

    #[test]
    fn payload_same_sees_extension_state() {
        let a = tag_node("n", "one");
        let b = tag_node("n", "one");
        let c = tag_node("n", "two");
        assert!(a.payload_same(&b));
        assert!(!a.payload_same(&c));
    }

    #[test]
    fn copy_payload_preserves_identity_fields() {
        let factory = tag_factory();
        let mut dst = ValueNode::new("old");
        dst.serial = Serial::from_u64(7);
        dst.owner = Some(NodeHandle::new(1, 1));

        let mut src = ValueNode::ast(kind::VAR_DECL, "fresh");
        src.serial = Serial::from_u64(99);
        dst.copy_payload_from(&src, &factory).unwrap();

        assert_eq!(dst.id, "fresh");
        assert!(dst.value.is_ast());
        // Serial and structure are not payload.
        assert_eq!(dst.serial, Serial::from_u64(7));
        assert_eq!(dst.owner, Some(NodeHandle::new(1, 1)));
    }

    #[test]
    fn copy_payload_copies_extension_state_in_place() {
        let factory = tag_factory();
        let mut dst = tag_node("n", "stale");
        dst.ext.as_mut().unwrap().ensure_initialized(&WorldState::new());
        let src = tag_node("n", "fresh");

        dst.copy_payload_from(&src, &factory).unwrap();
        // Same type: state copied without replacing the host.
        assert!(dst.ext.as_ref().unwrap().is_initialized());
        assert!(dst.payload_same(&src));
    }

    #[test]
    fn copy_payload_degrades_on_unregistered_type() {
        let factory = ExtensionFactory::new();
        let mut dst = ValueNode::new("n");
        let src = tag_node("n", "fresh");

        dst.copy_payload_from(&src, &factory).unwrap();
        assert_eq!(dst.type_hash, Hash64::of_str("Tag"));
        assert!(dst.ext.is_none());
    }

    #[test]
    fn copy_payload_clears_extension_when_source_has_none() {
        let factory = tag_factory();
        let mut dst = tag_node("n", "stale");
        let src = ValueNode::new("n");

        dst.copy_payload_from(&src, &factory).unwrap();
        assert!(dst.ext.is_none());
        assert!(dst.type_hash.is_none());
    }
}
