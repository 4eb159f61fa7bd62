//! Graph - keyed node arena with traversal and structural surgery
//!
//! Every node is owned by the arena; neighbor relations are keys. A node
//! is freed when it is removed from the arena, never by reference count.

use std::collections::HashMap;
use std::hash::Hash;

use arbor_core::KeySet;

use crate::{AdjacencyList, GraphNode};

/// Node arena
#[derive(Clone, Debug)]
pub struct Graph<K, V> {
    nodes: HashMap<K, GraphNode<K, V>>,
}

impl<K, V> Default for Graph<K, V> {
    fn default() -> Self {
        Graph {
            nodes: HashMap::new(),
        }
    }
}

impl<K, V> Graph<K, V>
where
    K: Clone + Eq + Hash,
{
    pub fn new() -> Self {
        Graph::default()
    }

    /// Number of nodes in the arena, across all components
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn get(&self, key: &K) -> Option<&GraphNode<K, V>> {
        self.nodes.get(key)
    }

    /// Mutable access to a node's payload
    pub fn value_mut(&mut self, key: &K) -> Option<&mut V> {
        self.nodes.get_mut(key).map(|n| &mut n.value)
    }

    /// Add a node with no neighbors. Returns false if the key is taken.
    pub fn insert_isolated(&mut self, key: K, value: V) -> bool {
        if self.nodes.contains_key(&key) {
            return false;
        }
        self.nodes.insert(key.clone(), GraphNode::new(key, value));
        true
    }

    /// Cleave a node and drop it from the arena
    pub fn remove_node(&mut self, key: &K) -> Option<(V, KeySet<K>)> {
        if !self.nodes.contains_key(key) {
            return None;
        }
        let (_, changed) = self.cleave(key);
        self.nodes.remove(key).map(|node| (node.value, changed))
    }

    /// Mutually link two nodes. Returns true if a new edge was made.
    pub fn link(&mut self, a: &K, b: &K) -> bool {
        if a == b || !self.nodes.contains_key(a) || !self.nodes.contains_key(b) {
            return false;
        }
        let mut added = false;
        if let Some(node) = self.nodes.get_mut(a) {
            added |= node.add_neighbor(b.clone());
        }
        if let Some(node) = self.nodes.get_mut(b) {
            added |= node.add_neighbor(a.clone());
        }
        added
    }

    /// Remove the edge between two nodes, both directions
    pub fn unlink(&mut self, a: &K, b: &K) -> bool {
        let mut removed = false;
        if let Some(node) = self.nodes.get_mut(a) {
            removed |= node.remove_neighbor(b);
        }
        if let Some(node) = self.nodes.get_mut(b) {
            removed |= node.remove_neighbor(a);
        }
        removed
    }

    /// Depth-first walk of the component reachable from `start`
    ///
    /// Keys already in `visited` are skipped and every yielded key is
    /// added to it, so a second walk sharing the same set yields nothing
    /// already seen. The borrow on the graph rules out concurrent
    /// mutation while the walk is alive.
    pub fn traverse<'g, 'v>(
        &'g self,
        start: &'g K,
        visited: &'v mut KeySet<K>,
    ) -> Traverse<'g, 'v, K, V> {
        Traverse {
            graph: self,
            visited,
            stack: vec![start],
        }
    }

    /// Find a node reachable from `start`
    pub fn find(&self, start: &K, key: &K) -> Option<&GraphNode<K, V>> {
        let mut visited = KeySet::new();
        let found = self
            .traverse(start, &mut visited)
            .any(|(k, _)| k == key);
        if found {
            self.nodes.get(key)
        } else {
            None
        }
    }

    pub fn has(&self, start: &K, key: &K) -> bool {
        self.find(start, key).is_some()
    }

    /// Number of nodes reachable from `start`
    pub fn cardinality(&self, start: &K) -> usize {
        let mut visited = KeySet::new();
        self.traverse(start, &mut visited).count()
    }

    /// Detach a node from every neighbor
    ///
    /// Returns the former neighbors, and the keys whose neighbor set
    /// changed: the node itself plus every former neighbor. Afterwards
    /// the node is isolated.
    pub fn cleave(&mut self, key: &K) -> (Vec<K>, KeySet<K>) {
        let Some(node) = self.nodes.get_mut(key) else {
            return (Vec::new(), KeySet::new());
        };
        let neighbors = node.take_neighbors();

        let mut changed: KeySet<K> = neighbors.iter().cloned().collect();
        changed.insert(key.clone());

        for neighbor in &neighbors {
            if let Some(n) = self.nodes.get_mut(neighbor) {
                n.remove_neighbor(key);
            }
        }

        (neighbors, changed)
    }

    /// Mutually link a node to every node in `new_neighbors`
    ///
    /// Returns the node's key plus every key it was attached to.
    pub fn interject(&mut self, key: &K, new_neighbors: &[K]) -> KeySet<K> {
        let mut changed = KeySet::new();
        if !self.nodes.contains_key(key) {
            return changed;
        }
        changed.insert(key.clone());

        for neighbor in new_neighbors {
            if self.link(key, neighbor) {
                changed.insert(neighbor.clone());
            }
        }
        changed
    }
}

impl<K, V> Graph<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    /// All (key, value) pairs reachable from `start`, depth-first
    pub fn to_vec(&self, start: &K) -> Vec<(K, V)> {
        let mut visited = KeySet::new();
        self.traverse(start, &mut visited)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn to_map(&self, start: &K) -> HashMap<K, V> {
        let mut visited = KeySet::new();
        self.traverse(start, &mut visited)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Flattened snapshot of the component reachable from `start`
    ///
    /// Each node contributes its own key → neighbor-set entry and the
    /// entries of its unvisited neighbors are merged in.
    pub fn adjacency_list(&self, start: &K, visited: &KeySet<K>) -> AdjacencyList<K, V> {
        let mut visited = visited.clone();
        let mut list = AdjacencyList::new();
        self.collect_adjacency(start, &mut visited, &mut list);
        list
    }

    fn collect_adjacency(&self, key: &K, visited: &mut KeySet<K>, list: &mut AdjacencyList<K, V>) {
        let Some(node) = self.nodes.get(key) else {
            return;
        };
        visited.insert(key.clone());
        list.add_links(key.clone(), node.neighbor_keys(), node.value.clone());

        // (node, index of its next neighbor)
        let mut stack: Vec<(&GraphNode<K, V>, usize)> = vec![(node, 0)];
        while let Some(frame) = stack.last_mut() {
            let (node, next) = *frame;
            frame.1 += 1;
            let Some(neighbor) = node.neighbors().get(next) else {
                stack.pop();
                continue;
            };
            if visited.contains(neighbor) {
                continue;
            }
            if let Some(child) = self.nodes.get(neighbor) {
                visited.insert(neighbor.clone());
                list.add_links(neighbor.clone(), child.neighbor_keys(), child.value.clone());
                stack.push((child, 0));
            }
        }
    }
}

/// Depth-first iterator over a graph component, see [`Graph::traverse`]
pub struct Traverse<'g, 'v, K: Eq + Hash, V> {
    graph: &'g Graph<K, V>,
    visited: &'v mut KeySet<K>,
    stack: Vec<&'g K>,
}

impl<'g, 'v, K, V> Iterator for Traverse<'g, 'v, K, V>
where
    K: Clone + Eq + Hash,
{
    type Item = (&'g K, &'g V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(key) = self.stack.pop() {
            if self.visited.contains(key) {
                continue;
            }
            let Some(node) = self.graph.nodes.get(key) else {
                continue;
            };
            self.visited.insert(key.clone());

            // Reversed so the first neighbor is walked first
            for neighbor in node.neighbors().iter().rev() {
                if !self.visited.contains(neighbor) {
                    self.stack.push(neighbor);
                }
            }
            return Some((&node.key, &node.value));
        }
        None
    }
}
