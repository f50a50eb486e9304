//! The file-position and type lookup tables.

use std::collections::HashMap;

use arbor_tree::{Tree, TreeResult};
use arbor_types::{Hash64, NodeHandle, SerialClock};
use tracing::debug;

#[derive(Debug, Default)]
struct TypeBucket {
    entries: Vec<NodeHandle>,
    /// Last human-readable path registered for this type key.
    seen_path: Option<String>,
}

/// The weak lookup tables of one environment.
///
/// Results of every lookup are valid until the next merge; external holders
/// re-resolve afterwards.
#[derive(Debug, Default)]
pub struct Indices {
    filepos: HashMap<Hash64, Vec<NodeHandle>>,
    types: HashMap<Hash64, TypeBucket>,
}

impl Indices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total entries across both tables, stale ones included.
    pub fn len(&self) -> usize {
        self.filepos.values().map(Vec::len).sum::<usize>()
            + self.types.values().map(|b| b.entries.len()).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. The next refresh pass rebuilds from the tree.
    pub fn clear(&mut self) {
        self.filepos.clear();
        self.types.clear();
    }

    // ---------------------------------------------------------------
    // Registration
    // ---------------------------------------------------------------

    /// Register `h` under its lookup keys.
    ///
    /// Stamps the node if it is unstamped, deduplicates repeat
    /// registrations, and compacts any stale entries sharing the touched
    /// buckets.
    pub fn refresh_node(
        &mut self,
        tree: &mut Tree,
        clock: &SerialClock,
        h: NodeHandle,
    ) -> TreeResult<()> {
        let node = tree.get_mut(h)?;
        if node.serial.is_unstamped() {
            node.serial = clock.next();
        }
        let filepos_hash = node
            .value
            .as_ast()
            .map_or(Hash64::NONE, |a| a.filepos_hash);
        let type_hash = node.type_hash;

        if !filepos_hash.is_none() {
            let bucket = self.filepos.entry(filepos_hash).or_default();
            compact(bucket, tree, h);
        }
        if !type_hash.is_none() {
            let bucket = self.types.entry(type_hash).or_default();
            compact(&mut bucket.entries, tree, h);
        }
        Ok(())
    }

    /// Register `h` and every node below it.
    pub fn refresh_deep(
        &mut self,
        tree: &mut Tree,
        clock: &SerialClock,
        h: NodeHandle,
    ) -> TreeResult<()> {
        let order: Vec<NodeHandle> = tree.descendants(h).collect();
        for node in order {
            self.refresh_node(tree, clock, node)?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Lookups
    // ---------------------------------------------------------------

    /// The definition node last seen at a file position, if any is live.
    pub fn find_declaration(&self, tree: &Tree, filepos_hash: Hash64) -> Option<NodeHandle> {
        first_definition(self.filepos.get(&filepos_hash)?, tree)
    }

    /// The definition node last seen for a type key, if any is live.
    pub fn find_type_declaration(&self, tree: &Tree, type_hash: Hash64) -> Option<NodeHandle> {
        first_definition(&self.types.get(&type_hash)?.entries, tree)
    }

    /// Every live node registered for a type key.
    pub fn type_nodes(&self, tree: &Tree, type_hash: Hash64) -> Vec<NodeHandle> {
        self.types
            .get(&type_hash)
            .map(|b| {
                b.entries
                    .iter()
                    .copied()
                    .filter(|&h| tree.contains(h))
                    .collect()
            })
            .unwrap_or_default()
    }

    // ---------------------------------------------------------------
    // Type paths
    // ---------------------------------------------------------------

    /// Intern a human-readable type path, returning its key.
    pub fn realize_type_path(&mut self, path: &str) -> Hash64 {
        let key = Hash64::of_str(path);
        let bucket = self.types.entry(key).or_default();
        if bucket.seen_path.is_none() {
            bucket.seen_path = Some(path.to_string());
        }
        key
    }

    /// The human-readable path last interned for a type key.
    pub fn seen_type(&self, type_hash: Hash64) -> Option<&str> {
        self.types.get(&type_hash)?.seen_path.as_deref()
    }
}

/// Drop stale entries from a bucket and append `h` if not yet present.
fn compact(bucket: &mut Vec<NodeHandle>, tree: &Tree, h: NodeHandle) {
    let before = bucket.len();
    bucket.retain(|&e| tree.contains(e));
    let dropped = before - bucket.len();
    if dropped > 0 {
        debug!(dropped, "compacted stale index entries");
    }
    if !bucket.contains(&h) {
        bucket.push(h);
    }
}

fn first_definition(bucket: &[NodeHandle], tree: &Tree) -> Option<NodeHandle> {
    bucket.iter().copied().find(|&h| {
        tree.node(h)
            .and_then(|n| n.value.as_ast())
            .is_some_and(|a| a.is_definition)
    })
}
