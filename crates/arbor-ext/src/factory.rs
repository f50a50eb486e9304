//! Registry of extension constructors, keyed by type hash.

use std::collections::HashMap;

use arbor_types::Hash64;

use crate::error::ExtResult;
use crate::extension::Extension;
use crate::host::ExtensionHost;

type Constructor = fn() -> Box<dyn Extension>;

/// Maps 64-bit type keys to constructors for the extension types an
/// environment knows about.
///
/// The factory is an explicit value owned by the environment, not a global.
/// Cross-tree node copies consult it to construct the receiving side's
/// extension before adopting the source's visitable state.
#[derive(Default)]
pub struct ExtensionFactory {
    constructors: HashMap<Hash64, (&'static str, Constructor)>,
}

impl std::fmt::Debug for ExtensionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionFactory")
            .field("registered", &self.constructors.len())
            .finish()
    }
}

impl ExtensionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor under `name`. The type key is
    /// `Hash64::of_str(name)`; registering the same name twice replaces
    /// the constructor.
    pub fn register(&mut self, name: &'static str, ctor: Constructor) -> Hash64 {
        let key = Hash64::of_str(name);
        self.constructors.insert(key, (name, ctor));
        key
    }

    /// Returns `true` if a constructor is registered for `type_hash`.
    pub fn knows(&self, type_hash: Hash64) -> bool {
        self.constructors.contains_key(&type_hash)
    }

    /// The name a type key was registered under.
    pub fn type_name(&self, type_hash: Hash64) -> Option<&'static str> {
        self.constructors.get(&type_hash).map(|(name, _)| *name)
    }

    /// Construct a fresh, uninitialized extension for `type_hash`.
    pub fn create(&self, type_hash: Hash64) -> Option<Box<dyn Extension>> {
        self.constructors.get(&type_hash).map(|(_, ctor)| ctor())
    }

    /// Construct a fresh host carrying a value-identical copy of `source`'s
    /// extension. Returns `None` when the type is not registered here.
    pub fn clone_ext(&self, source: &ExtensionHost) -> Option<ExtResult<ExtensionHost>> {
        let mut ext = self.create(source.type_hash())?;
        Some(match ext.apply_state(&source.ext().state()) {
            Ok(()) => Ok(ExtensionHost::new(ext)),
            Err(e) => Err(e),
        })
    }
}
