//! Bounded-degree tree algorithms
//!
//! These methods treat the component reachable from a node as an
//! undirected tree. Insertion fills the nearest node with spare capacity
//! (greedy, not height balanced); deletion promotes a leaf into the
//! removed node's position so the tree stays connected.
//!
//! When several neighbor branches tie, the neighbor with the lowest key
//! is chosen.

use std::hash::Hash;

use arbor_core::KeySet;
use tracing::debug;

use crate::{exclude_keys, Graph};

impl<K, V> Graph<K, V>
where
    K: Clone + Eq + Hash + Ord,
{
    /// Insert `key` below `at`, or replace its value if it already exists
    ///
    /// Starting at `at`, a node with fewer than `max_degree` neighbors, or
    /// with no unvisited neighbors at all, takes the new node as a direct
    /// neighbor. Any other node hands the insertion to the neighbor on its
    /// shortest path to the frontier. `max_degree` is advisory: a frontier
    /// leaf always accepts, so the walk terminates.
    ///
    /// Returns the keys whose neighbor set or value changed.
    pub fn upsert_from(
        &mut self,
        at: &K,
        key: K,
        value: V,
        max_degree: usize,
        visited: &KeySet<K>,
    ) -> KeySet<K> {
        // Keys are unique across the arena, not only along the walk
        if let Some(existing) = self.value_mut(&key) {
            *existing = value;
            return KeySet::single(key);
        }
        if !self.contains(at) {
            return KeySet::new();
        }

        let mut visited = visited.clone();
        let mut current = at.clone();
        loop {
            let degree = self.get(&current).map_or(0, |n| n.degree());
            match self.shortest_subtree(&current, &visited) {
                Some(next) if degree >= max_degree => {
                    visited.insert(current);
                    current = next;
                }
                _ => {
                    self.insert_isolated(key.clone(), value);
                    self.link(&current, &key);
                    let mut changed = KeySet::single(current);
                    changed.insert(key);
                    return changed;
                }
            }
        }
    }

    /// Path from `from` to the nearest node with no unvisited neighbors
    ///
    /// The first element is `from`. A node with no unvisited neighbors
    /// yields just itself.
    pub fn shortest_path(&self, from: &K, visited: &KeySet<K>) -> Vec<K> {
        let mut visited = visited.clone();
        let mut path = self.branch(from, &mut visited, Branch::Shortest);
        path.reverse();
        path
    }

    /// The longest branch below `from`
    ///
    /// Picks the longest result among unvisited neighbors and returns it
    /// as is, without prepending `from`; a node with no unvisited
    /// neighbors yields itself. Only the last element is meaningful: the
    /// leaf the branch ends at.
    pub fn longest_path(&self, from: &K, visited: &KeySet<K>) -> Vec<K> {
        let mut visited = visited.clone();
        self.branch(from, &mut visited, Branch::Longest)
    }

    // Post-order walk with an explicit stack. Each node keeps the best
    // result among its unvisited neighbors; `visited` holds the current
    // path only.
    fn branch(&self, from: &K, visited: &mut KeySet<K>, kind: Branch) -> Vec<K> {
        let Some(root) = self.branch_frame(from, visited) else {
            return Vec::new();
        };
        let mut stack = vec![root];

        while let Some(frame) = stack.last_mut() {
            let neighbors = frame.neighbors;
            let Some(neighbor) = neighbors.get(frame.next) else {
                let Some(done) = stack.pop() else {
                    break;
                };
                if done.inserted {
                    visited.remove(&done.key);
                }
                let path = kind.finish(&done.key, done.best.map(|(_, path)| path));
                match stack.last_mut() {
                    Some(parent) => {
                        let neighbors = parent.neighbors;
                        let child = &neighbors[parent.next - 1];
                        parent.offer(kind, child, path);
                    }
                    None => return path,
                }
                continue;
            };
            frame.next += 1;
            if visited.contains(neighbor) {
                continue;
            }
            match self.branch_frame(neighbor, visited) {
                Some(child) => stack.push(child),
                None => frame.offer(kind, neighbor, Vec::new()),
            }
        }
        Vec::new()
    }

    fn branch_frame<'g>(&'g self, key: &K, visited: &mut KeySet<K>) -> Option<BranchFrame<'g, K>> {
        let node = self.get(key)?;
        Some(BranchFrame {
            key: key.clone(),
            neighbors: node.neighbors(),
            next: 0,
            inserted: visited.insert(key.clone()),
            best: None,
        })
    }

    /// The leaf at the end of the longest branch below `from`
    pub fn leafiest_node(&self, from: &K, visited: &KeySet<K>) -> Option<K> {
        self.longest_path(from, visited).pop()
    }

    /// The neighbor of `from` that leads to the nearest frontier
    pub fn shortest_subtree(&self, from: &K, visited: &KeySet<K>) -> Option<K> {
        let node = self.get(from)?;
        if node.neighbors().iter().all(|n| visited.contains(n)) {
            return None;
        }
        let next = self.shortest_path(from, visited).into_iter().nth(1)?;
        node.has_neighbor(&next).then_some(next)
    }

    /// Delete `key` from the tree reachable from `at`
    ///
    /// Returns the node now standing where `at` stood (`None` if `at` was
    /// deleted and had nothing to promote) and the changed keys. Nodes
    /// walked past on the way report themselves as changed as well.
    pub fn delete_by_key_from(
        &mut self,
        at: &K,
        key: &K,
        visited: &KeySet<K>,
    ) -> (Option<K>, KeySet<K>) {
        let mut visited = visited.clone();
        self.delete_inner(at, key, &mut visited)
    }

    fn delete_inner(
        &mut self,
        at: &K,
        key: &K,
        visited: &mut KeySet<K>,
    ) -> (Option<K>, KeySet<K>) {
        if at == key {
            return self.excise(at, visited);
        }
        let Some(root) = self.delete_frame(at, visited) else {
            return (None, KeySet::new());
        };
        let mut stack = vec![root];
        // (neighbor walked into, its replacement, its changed keys)
        let mut returned: Option<(K, Option<K>, KeySet<K>)> = None;

        while let Some(frame) = stack.last_mut() {
            if let Some((neighbor, replacement, sub_changed)) = returned.take() {
                frame.changed.union_with(sub_changed);
                match replacement {
                    Some(replacement) => {
                        self.link(&frame.key, &replacement);
                    }
                    None => {
                        self.unlink(&frame.key, &neighbor);
                        frame.changed.insert(frame.key.clone());
                    }
                }
                continue;
            }

            let Some(neighbor) = frame.neighbors.get(frame.next).cloned() else {
                let Some(done) = stack.pop() else {
                    break;
                };
                if done.inserted {
                    visited.remove(&done.key);
                }
                if stack.is_empty() {
                    return (Some(done.key), done.changed);
                }
                returned = Some((done.key.clone(), Some(done.key), done.changed));
                continue;
            };
            frame.next += 1;

            if visited.contains(&neighbor) {
                frame.changed.insert(frame.key.clone());
            } else if neighbor == *key {
                let (replacement, changed) = self.excise(&neighbor, visited);
                returned = Some((neighbor, replacement, changed));
            } else {
                match self.delete_frame(&neighbor, visited) {
                    Some(child) => stack.push(child),
                    None => returned = Some((neighbor, None, KeySet::new())),
                }
            }
        }
        (None, KeySet::new())
    }

    fn delete_frame(&self, key: &K, visited: &mut KeySet<K>) -> Option<DeleteFrame<K>> {
        let neighbors = self.get(key)?.neighbors().to_vec();
        Some(DeleteFrame {
            key: key.clone(),
            neighbors,
            next: 0,
            inserted: visited.insert(key.clone()),
            changed: KeySet::new(),
        })
    }

    /// Remove `target`, promoting the leafiest node below it into its place
    fn excise(&mut self, target: &K, visited: &KeySet<K>) -> (Option<K>, KeySet<K>) {
        let leaf = match self.leafiest_node(target, visited) {
            Some(leaf) if leaf != *target => leaf,
            _ => {
                let changed = match self.remove_node(target) {
                    Some((_, mut changed)) => {
                        changed.insert(target.clone());
                        changed
                    }
                    None => KeySet::new(),
                };
                return (None, changed);
            }
        };

        let (captured, mut changed) = self.cleave(target);
        let (_, leaf_changed) = self.cleave(&leaf);
        changed.union_with(leaf_changed);

        let captured = exclude_keys(&captured, &KeySet::single(leaf.clone()));
        changed.union_with(self.interject(&leaf, &captured));
        self.remove_node(target);

        debug!(
            reattached = captured.len(),
            changed = changed.len(),
            "promoted leaf into deleted position"
        );

        (Some(leaf), changed)
    }
}

#[derive(Clone, Copy, Debug)]
enum Branch {
    Shortest,
    Longest,
}

impl Branch {
    // Shortest paths come back leaf first, so each level pushes itself
    fn finish<K: Clone>(self, key: &K, best: Option<Vec<K>>) -> Vec<K> {
        match self {
            Branch::Shortest => {
                let mut path = best.unwrap_or_default();
                path.push(key.clone());
                path
            }
            Branch::Longest => best.unwrap_or_else(|| vec![key.clone()]),
        }
    }
}

struct BranchFrame<'g, K> {
    key: K,
    neighbors: &'g [K],
    next: usize,
    inserted: bool,
    best: Option<(&'g K, Vec<K>)>,
}

impl<'g, K: Ord> BranchFrame<'g, K> {
    fn offer(&mut self, kind: Branch, neighbor: &'g K, path: Vec<K>) {
        let better = match &self.best {
            None => true,
            Some((best_key, best_path)) => {
                let tie = path.len() == best_path.len() && neighbor < *best_key;
                match kind {
                    Branch::Shortest => path.len() < best_path.len() || tie,
                    Branch::Longest => path.len() > best_path.len() || tie,
                }
            }
        };
        if better {
            self.best = Some((neighbor, path));
        }
    }
}

struct DeleteFrame<K: Eq + Hash> {
    key: K,
    neighbors: Vec<K>,
    next: usize,
    inserted: bool,
    changed: KeySet<K>,
}
