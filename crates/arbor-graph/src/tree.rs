//! Tree - an optional root over a node arena
//!
//! The arena holds exactly the nodes reachable from the root, so key
//! lookups go straight to the arena.

use std::hash::Hash;

use arbor_core::{KeySet, TreeConfig};
use tracing::debug;

use crate::{AdjacencyList, Graph};

/// Bounded-degree undirected tree
///
/// Between calls: empty iff there is no root, keys are unique, the nodes
/// form one connected acyclic component with mutual links.
#[derive(Clone, Debug)]
pub struct Tree<K, V> {
    graph: Graph<K, V>,
    root: Option<K>,
    config: TreeConfig,
}

impl<K, V> Default for Tree<K, V> {
    fn default() -> Self {
        Tree {
            graph: Graph::default(),
            root: None,
            config: TreeConfig::default(),
        }
    }
}

impl<K, V> Tree<K, V>
where
    K: Clone + Eq + Hash + Ord,
{
    /// Create an empty tree with the default degree bound
    pub fn new() -> Self {
        Tree::default()
    }

    /// Create an empty tree with a custom configuration
    pub fn with_config(config: TreeConfig) -> Self {
        Tree {
            graph: Graph::new(),
            root: None,
            config,
        }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn root(&self) -> Option<&K> {
        self.root.as_ref()
    }

    /// Read-only view of the node arena
    pub fn graph(&self) -> &Graph<K, V> {
        &self.graph
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Insert a node, or replace the value of an existing one
    ///
    /// Returns the keys whose neighbor set or value changed: `{key}` for
    /// a replacement or a first node, `{parent, key}` for an attachment.
    pub fn upsert(&mut self, key: K, value: V) -> KeySet<K> {
        let Some(root) = self.root.clone() else {
            self.graph.insert_isolated(key.clone(), value);
            self.root = Some(key.clone());
            return KeySet::single(key);
        };
        self.graph
            .upsert_from(&root, key, value, self.config.max_degree, &KeySet::new())
    }

    /// Delete a node, keeping the rest of the tree connected
    ///
    /// An absent key changes nothing and returns an empty set.
    pub fn delete_by_key(&mut self, key: &K) -> KeySet<K> {
        let Some(root) = self.root.clone() else {
            return KeySet::new();
        };
        if !self.graph.contains(key) {
            return KeySet::new();
        }

        let (new_root, changed) = self.graph.delete_by_key_from(&root, key, &KeySet::new());
        if new_root.as_ref() != Some(&root) {
            debug!(replaced = new_root.is_some(), "tree root changed");
        }
        self.root = new_root;
        changed
    }

    pub fn find(&self, key: &K) -> Option<&V> {
        self.graph.get(key).map(|node| &node.value)
    }

    pub fn has(&self, key: &K) -> bool {
        self.graph.contains(key)
    }
}

impl<K, V> Tree<K, V>
where
    K: Clone + Eq + Hash + Ord,
    V: Clone,
{
    /// Neighbors of a node as (key, value) pairs, in attachment order
    pub fn neighbors_of_node(&self, key: &K) -> Option<Vec<(K, V)>> {
        let node = self.graph.get(key)?;
        Some(
            node.neighbors()
                .iter()
                .filter_map(|n| self.graph.get(n).map(|n| (n.key.clone(), n.value.clone())))
                .collect(),
        )
    }

    /// Flattened snapshot of the whole tree
    pub fn adjacency_list(&self) -> AdjacencyList<K, V> {
        match &self.root {
            Some(root) => self.graph.adjacency_list(root, &KeySet::new()),
            None => AdjacencyList::new(),
        }
    }

    /// All (key, value) pairs, depth-first from the root
    pub fn to_vec(&self) -> Vec<(K, V)> {
        match &self.root {
            Some(root) => self.graph.to_vec(root),
            None => Vec::new(),
        }
    }
}
