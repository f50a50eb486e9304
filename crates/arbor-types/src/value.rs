//! The tagged value slot of a tree node.

use serde::{Deserialize, Serialize};

use crate::ast::AstVariant;
use crate::hash::{ContentHasher, Hash64};

/// A scalar value carried by a non-declaration node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Primitive {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Primitive {
    /// Feed the scalar into an ongoing combine.
    pub fn feed(&self, h: &mut ContentHasher) {
        match self {
            Primitive::Bool(b) => {
                h.put_u64(1).put_bool(*b);
            }
            Primitive::Int(i) => {
                h.put_u64(2).put_i64(*i);
            }
            Primitive::Float(f) => {
                h.put_u64(3).put_u64(f.to_bits());
            }
            Primitive::Str(s) => {
                h.put_u64(4).put_str(s);
            }
        }
    }
}

/// The value slot of a node: empty, a parsed declaration, or a scalar.
///
/// The three forms never coexist; an empty slot is explicit rather than a
/// plausible-but-absent payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum NodeValue {
    /// No payload (plain container node).
    #[default]
    Empty,
    /// One parsed source declaration.
    Ast(AstVariant),
    /// A scalar value.
    Primitive(Primitive),
}

impl NodeValue {
    /// Returns `true` for the AST form.
    pub fn is_ast(&self) -> bool {
        matches!(self, NodeValue::Ast(_))
    }

    /// The declaration payload, if this is the AST form.
    pub fn as_ast(&self) -> Option<&AstVariant> {
        match self {
            NodeValue::Ast(a) => Some(a),
            _ => None,
        }
    }

    /// Mutable declaration payload, if this is the AST form.
    pub fn as_ast_mut(&mut self) -> Option<&mut AstVariant> {
        match self {
            NodeValue::Ast(a) => Some(a),
            _ => None,
        }
    }

    /// The declaration kind, if this is the AST form.
    pub fn ast_kind(&self) -> Option<i32> {
        self.as_ast().map(|a| a.kind)
    }

    /// Hash over the value form and its contents.
    pub fn hash_value(&self) -> Hash64 {
        let mut h = ContentHasher::new();
        self.feed(&mut h);
        h.finish()
    }

    /// Feed the value form and its contents into an ongoing combine.
    pub fn feed(&self, h: &mut ContentHasher) {
        match self {
            NodeValue::Empty => {
                h.put_u64(0);
            }
            NodeValue::Ast(a) => {
                h.put_u64(1);
                a.feed(h);
            }
            NodeValue::Primitive(p) => {
                h.put_u64(2);
                p.feed(h);
            }
        }
    }
}

impl From<AstVariant> for NodeValue {
    fn from(a: AstVariant) -> Self {
        NodeValue::Ast(a)
    }
}

impl From<Primitive> for NodeValue {
    fn from(p: Primitive) -> Self {
        NodeValue::Primitive(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::kind;

    #[test]
    fn default_is_empty() {
        let v = NodeValue::default();
        assert_eq!(v, NodeValue::Empty);
        assert!(!v.is_ast());
        assert!(v.as_ast().is_none());
    }

    #[test]
    fn ast_accessors() {
        let mut v = NodeValue::from(AstVariant::with_kind(kind::NAMESPACE));
        assert!(v.is_ast());
        assert_eq!(v.ast_kind(), Some(kind::NAMESPACE));
        v.as_ast_mut().unwrap().is_definition = true;
        assert!(v.as_ast().unwrap().is_definition);
    }

    #[test]
    fn forms_hash_distinctly() {
        let empty = NodeValue::Empty.hash_value();
        let scalar = NodeValue::from(Primitive::Int(0)).hash_value();
        let ast = NodeValue::from(AstVariant::default()).hash_value();
        assert_ne!(empty, scalar);
        assert_ne!(empty, ast);
        assert_ne!(scalar, ast);
    }

    #[test]
    fn primitive_variants_hash_distinctly() {
        let b = NodeValue::from(Primitive::Bool(true)).hash_value();
        let i = NodeValue::from(Primitive::Int(1)).hash_value();
        let s = NodeValue::from(Primitive::Str("1".into())).hash_value();
        assert_ne!(b, i);
        assert_ne!(i, s);
    }
}
