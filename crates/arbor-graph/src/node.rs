//! Graph node - one keyed vertex and the keys of its neighbors
//!
//! Nodes live in a [`Graph`](crate::Graph) arena and refer to each other
//! by key, so the mutual (cyclic) neighbor relation carries no ownership.

use std::hash::Hash;

use arbor_core::KeySet;

/// A node in a graph
///
/// Neighbor keys are kept in attachment order. The arena keeps the
/// relation mutual: if A lists B, B lists A.
#[derive(Clone, Debug)]
pub struct GraphNode<K, V> {
    /// Unique key within the graph
    pub key: K,
    /// Opaque payload
    pub value: V,
    neighbors: Vec<K>,
}

impl<K, V> GraphNode<K, V>
where
    K: Clone + Eq + Hash,
{
    /// Create a node with no neighbors
    pub fn new(key: K, value: V) -> Self {
        GraphNode {
            key,
            value,
            neighbors: Vec::new(),
        }
    }

    /// Neighbor keys in attachment order
    pub fn neighbors(&self) -> &[K] {
        &self.neighbors
    }

    /// Number of neighbors
    #[inline]
    pub fn degree(&self) -> usize {
        self.neighbors.len()
    }

    #[inline]
    pub fn is_isolated(&self) -> bool {
        self.neighbors.is_empty()
    }

    pub fn has_neighbor(&self, key: &K) -> bool {
        self.neighbors.contains(key)
    }

    /// Neighbor keys as a set
    pub fn neighbor_keys(&self) -> KeySet<K> {
        self.neighbors.iter().cloned().collect()
    }

    /// One-sided link; the arena adds the reverse link
    pub(crate) fn add_neighbor(&mut self, key: K) -> bool {
        add_key(&mut self.neighbors, key)
    }

    /// One-sided unlink; the arena removes the reverse link
    pub(crate) fn remove_neighbor(&mut self, key: &K) -> bool {
        let before = self.neighbors.len();
        self.neighbors.retain(|k| k != key);
        self.neighbors.len() != before
    }

    pub(crate) fn take_neighbors(&mut self) -> Vec<K> {
        std::mem::take(&mut self.neighbors)
    }
}

/// Keys of `keys` that are not in `excluded`, order preserved
pub fn exclude_keys<K>(keys: &[K], excluded: &KeySet<K>) -> Vec<K>
where
    K: Clone + Eq + Hash,
{
    keys.iter()
        .filter(|k| !excluded.contains(k))
        .cloned()
        .collect()
}

/// True if any of `keys` is in `wanted`
pub fn has_any_key<K>(keys: &[K], wanted: &KeySet<K>) -> bool
where
    K: Eq + Hash,
{
    keys.iter().any(|k| wanted.contains(k))
}

/// Append `key` unless already present. Returns true if appended.
pub fn add_key<K: PartialEq>(keys: &mut Vec<K>, key: K) -> bool {
    if keys.contains(&key) {
        return false;
    }
    keys.push(key);
    true
}
