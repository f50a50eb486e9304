//! The parsed-declaration payload carried by AST nodes.

use serde::{Deserialize, Serialize};

use crate::hash::{ContentHasher, Hash64};

/// Exclusive upper bound of the declaration kind space.
///
/// Kinds are a closed integer space mirroring the front-end parser's cursor
/// kinds; anything at or above this bound is not a declaration kind.
pub const KIND_LIMIT: i32 = 1000;

/// Well-known declaration kinds.
///
/// Only the kinds this engine needs to name are listed; the space itself is
/// owned by the out-of-scope front end.
pub mod kind {
    /// A class or struct declaration.
    pub const CLASS_DECL: i32 = 4;
    /// A function declaration.
    pub const FUNCTION_DECL: i32 = 8;
    /// A variable declaration.
    pub const VAR_DECL: i32 = 9;
    /// A namespace: an order-insensitive, reopenable container.
    pub const NAMESPACE: i32 = 22;
    /// A linkage specification (`extern "C"`), also order-insensitive.
    pub const LINKAGE_SPEC: i32 = 23;

    /// Returns `true` for the closed set of "namespace"-like kinds whose
    /// children form an order-insensitive keyed set.
    pub fn is_keyed(kind: i32) -> bool {
        matches!(kind, NAMESPACE | LINKAGE_SPEC)
    }
}

/// Payload representing one parsed source declaration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AstVariant {
    /// Declaration kind; valid kinds satisfy `0 < kind < KIND_LIMIT`.
    pub kind: i32,
    /// Type signature string.
    pub type_sig: String,
    /// Source offset where the declaration begins.
    pub begin: u32,
    /// Source offset where the declaration ends.
    pub end: u32,
    /// Hash of file + offset, the reverse declaration-lookup key.
    pub filepos_hash: Hash64,
    /// This occurrence is a reference, not the declaration itself.
    pub is_ref: bool,
    /// This occurrence is the definition.
    pub is_definition: bool,
    /// Disabled by preprocessor conditions.
    pub is_disabled: bool,
}

impl AstVariant {
    /// Create a payload with just a kind.
    pub fn with_kind(kind: i32) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Returns `true` if the kind lies in the valid declaration space.
    pub fn has_valid_kind(&self) -> bool {
        self.kind > 0 && self.kind < KIND_LIMIT
    }

    /// Hash over every payload field.
    pub fn hash_value(&self) -> Hash64 {
        let mut h = ContentHasher::new();
        self.feed(&mut h);
        h.finish()
    }

    /// Feed every payload field into an ongoing combine.
    pub fn feed(&self, h: &mut ContentHasher) {
        h.put_i64(i64::from(self.kind))
            .put_str(&self.type_sig)
            .put_u64(u64::from(self.begin))
            .put_u64(u64::from(self.end))
            .put_hash(self.filepos_hash)
            .put_bool(self.is_ref)
            .put_bool(self.is_definition)
            .put_bool(self.is_disabled);
    }
}
