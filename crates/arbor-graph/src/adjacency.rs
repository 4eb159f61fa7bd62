//! Adjacency list - flattened key → (value, neighbor keys) snapshot
//!
//! Derived from a graph and disposable. Used for export to transport
//! subscribers and for checking tree invariants.

use std::collections::hash_map;
use std::collections::HashMap;
use std::hash::Hash;

use arbor_core::KeySet;

/// One entry of an adjacency list
#[derive(Clone, Debug)]
pub struct AdjacencyListNode<K: Eq + Hash, V> {
    pub value: V,
    pub neighbors: KeySet<K>,
}

impl<K, V> AdjacencyListNode<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    pub fn new(value: V, neighbors: KeySet<K>) -> Self {
        AdjacencyListNode { value, neighbors }
    }

    /// Same value, with `links` added to the neighbor set
    pub fn union_links(&self, links: &KeySet<K>) -> Self {
        AdjacencyListNode {
            value: self.value.clone(),
            neighbors: self.neighbors.union(links),
        }
    }

    /// Same value, with `link` added to the neighbor set
    pub fn add_link(&self, link: K) -> Self {
        let mut neighbors = self.neighbors.clone();
        neighbors.insert(link);
        AdjacencyListNode {
            value: self.value.clone(),
            neighbors,
        }
    }
}

/// Mapping of every node key to its value and outgoing links
#[derive(Clone, Debug)]
pub struct AdjacencyList<K: Eq + Hash, V> {
    entries: HashMap<K, AdjacencyListNode<K, V>>,
}

impl<K: Eq + Hash, V> Default for AdjacencyList<K, V> {
    fn default() -> Self {
        AdjacencyList {
            entries: HashMap::new(),
        }
    }
}

impl<K, V> AdjacencyList<K, V>
where
    K: Clone + Eq + Hash,
{
    pub fn new() -> Self {
        AdjacencyList::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &K) -> Option<&AdjacencyListNode<K, V>> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> hash_map::Iter<'_, K, AdjacencyListNode<K, V>> {
        self.entries.iter()
    }

    /// Set a node's value, keeping any links it already has
    pub fn set_link(&mut self, key: K, value: V) {
        match self.entries.entry(key) {
            hash_map::Entry::Occupied(mut e) => e.get_mut().value = value,
            hash_map::Entry::Vacant(e) => {
                e.insert(AdjacencyListNode {
                    value,
                    neighbors: KeySet::new(),
                });
            }
        }
    }

    /// Add links to a node
    ///
    /// A node seen for the first time takes `default_value`. An existing
    /// node keeps its value; only its neighbor set grows.
    pub fn add_links(&mut self, key: K, links: KeySet<K>, default_value: V) {
        match self.entries.entry(key) {
            hash_map::Entry::Occupied(mut e) => e.get_mut().neighbors.union_with(links),
            hash_map::Entry::Vacant(e) => {
                e.insert(AdjacencyListNode {
                    value: default_value,
                    neighbors: links,
                });
            }
        }
    }

    /// All keys
    pub fn keys(&self) -> KeySet<K> {
        self.entries.keys().cloned().collect()
    }

    /// Structural equality
    ///
    /// Same key set and, key by key, the same neighbor set. Values are
    /// not compared.
    pub fn equal(&self, other: &AdjacencyList<K, V>) -> bool {
        if self.entries.len() != other.entries.len() {
            return false;
        }
        self.entries.iter().all(|(key, node)| {
            other
                .entries
                .get(key)
                .is_some_and(|o| o.neighbors == node.neighbors)
        })
    }

    /// Number of directed links; an undirected edge counts twice
    pub fn link_count(&self) -> usize {
        self.entries.values().map(|n| n.neighbors.len()).sum()
    }

    /// Depth-first walk from `start` following outgoing links
    pub fn traverse<'a, 'v>(
        &'a self,
        start: &'a K,
        visited: &'v mut KeySet<K>,
    ) -> AdjacencyTraverse<'a, 'v, K, V> {
        AdjacencyTraverse {
            list: self,
            visited,
            stack: vec![start],
        }
    }
}

impl<K, V> AdjacencyList<K, V>
where
    K: Clone + Eq + Hash + Ord,
{
    /// Some key of the list, or None when empty
    ///
    /// Always the lowest key, so seeded checks are repeatable.
    pub fn any_key(&self) -> Option<&K> {
        self.entries.keys().min()
    }
}

impl<K, V> AdjacencyList<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    /// Combine two lists
    ///
    /// A key present in both keeps the value from `self`; neighbor sets
    /// are unioned.
    pub fn union(&self, other: &AdjacencyList<K, V>) -> AdjacencyList<K, V> {
        let mut list = AdjacencyList::new();
        for (key, node) in self.entries.iter().chain(other.entries.iter()) {
            list.add_links(key.clone(), node.neighbors.clone(), node.value.clone());
        }
        list
    }

    /// The same graph with every link pointing the other way
    ///
    /// Every key of `self` stays present with its own value, even one
    /// with no incoming links.
    pub fn reversed(&self) -> AdjacencyList<K, V> {
        let mut list = AdjacencyList::new();
        for (key, node) in &self.entries {
            list.set_link(key.clone(), node.value.clone());
        }
        for (key, node) in &self.entries {
            for link in &node.neighbors {
                list.add_links(link.clone(), KeySet::single(key.clone()), node.value.clone());
            }
        }
        list
    }
}

impl<K: Eq + Hash, V> IntoIterator for AdjacencyList<K, V> {
    type Item = (K, AdjacencyListNode<K, V>);
    type IntoIter = hash_map::IntoIter<K, AdjacencyListNode<K, V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a, K: Eq + Hash, V> IntoIterator for &'a AdjacencyList<K, V> {
    type Item = (&'a K, &'a AdjacencyListNode<K, V>);
    type IntoIter = hash_map::Iter<'a, K, AdjacencyListNode<K, V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<K: Eq + Hash, V> FromIterator<(K, AdjacencyListNode<K, V>)> for AdjacencyList<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, AdjacencyListNode<K, V>)>>(iter: I) -> Self {
        AdjacencyList {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Depth-first iterator over an adjacency list
pub struct AdjacencyTraverse<'a, 'v, K: Eq + Hash, V> {
    list: &'a AdjacencyList<K, V>,
    visited: &'v mut KeySet<K>,
    stack: Vec<&'a K>,
}

impl<'a, 'v, K, V> Iterator for AdjacencyTraverse<'a, 'v, K, V>
where
    K: Clone + Eq + Hash,
{
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(key) = self.stack.pop() {
            if self.visited.contains(key) {
                continue;
            }
            let Some((key, node)) = self.list.entries.get_key_value(key) else {
                continue;
            };
            self.visited.insert(key.clone());
            for link in &node.neighbors {
                if !self.visited.contains(link) {
                    self.stack.push(link);
                }
            }
            return Some((key, &node.value));
        }
        None
    }
}

/// Collect the keys yielded by a traversal
pub fn keys_from_traversal<'a, K, V, I>(traversal: I) -> KeySet<K>
where
    K: Clone + Eq + Hash + 'a,
    V: 'a,
    I: IntoIterator<Item = (&'a K, &'a V)>,
{
    traversal.into_iter().map(|(k, _)| k.clone()).collect()
}
