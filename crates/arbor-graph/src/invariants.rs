//! Tree invariant checks over adjacency snapshots
//!
//! A live tree must be connected, undirected (every link mutual) and
//! acyclic after every operation. These checks work on the flattened
//! snapshot so they can run against any exported state.

use std::hash::Hash;

use arbor_core::KeySet;

use crate::{keys_from_traversal, AdjacencyList};

/// Result of checking a snapshot against the tree invariants
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TreeCheck {
    pub connected: bool,
    pub undirected: bool,
    pub acyclic: bool,
    pub node_count: usize,
    pub max_degree: usize,
}

impl TreeCheck {
    /// True if every invariant holds
    pub fn is_tree(&self) -> bool {
        self.connected && self.undirected && self.acyclic
    }
}

/// Run every check on a snapshot
pub fn check_tree<K, V>(list: &AdjacencyList<K, V>) -> TreeCheck
where
    K: Clone + Eq + Hash + Ord,
    V: Clone,
{
    TreeCheck {
        connected: is_connected(list),
        undirected: is_undirected(list),
        acyclic: is_acyclic(list),
        node_count: list.len(),
        max_degree: max_degree(list),
    }
}

/// Every key reachable from any other, ignoring link direction
///
/// The empty snapshot counts as connected.
pub fn is_connected<K, V>(list: &AdjacencyList<K, V>) -> bool
where
    K: Clone + Eq + Hash + Ord,
    V: Clone,
{
    let Some(start) = list.any_key() else {
        return true;
    };
    let both_ways = list.union(&list.reversed());
    let mut visited = KeySet::new();
    keys_from_traversal(both_ways.traverse(start, &mut visited)) == list.keys()
}

/// Every link has its reverse
pub fn is_undirected<K, V>(list: &AdjacencyList<K, V>) -> bool
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    list.reversed().equal(list)
}

/// No cycles, treating links as undirected edges
///
/// A self-link counts as a cycle.
pub fn is_acyclic<K, V>(list: &AdjacencyList<K, V>) -> bool
where
    K: Clone + Eq + Hash + Ord,
    V: Clone,
{
    let undirected = list.union(&list.reversed());
    let mut visited: KeySet<K> = KeySet::new();

    let mut starts: Vec<&K> = undirected.iter().map(|(k, _)| k).collect();
    starts.sort();

    for start in starts {
        if visited.contains(start) {
            continue;
        }
        // (node, parent)
        let mut stack: Vec<(&K, Option<&K>)> = vec![(start, None)];
        while let Some((key, parent)) = stack.pop() {
            if !visited.insert(key.clone()) {
                return false;
            }
            let Some(node) = undirected.get(key) else {
                continue;
            };
            for link in &node.neighbors {
                if Some(link) == parent {
                    continue;
                }
                if link == key || visited.contains(link) {
                    return false;
                }
                stack.push((link, Some(key)));
            }
        }
    }
    true
}

/// Largest neighbor count in the snapshot
pub fn max_degree<K, V>(list: &AdjacencyList<K, V>) -> usize
where
    K: Clone + Eq + Hash,
{
    list.iter()
        .map(|(_, node)| node.neighbors.len())
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AdjacencyListNode;

    fn undirected(edges: &[(u32, u32)], isolated: &[u32]) -> AdjacencyList<u32, ()> {
        let mut list = AdjacencyList::new();
        for key in isolated {
            list.set_link(*key, ());
        }
        for (a, b) in edges {
            list.add_links(*a, KeySet::single(*b), ());
            list.add_links(*b, KeySet::single(*a), ());
        }
        list
    }

    #[test]
    fn test_path_is_tree() {
        let list = undirected(&[(1, 2), (2, 3), (3, 4)], &[]);
        let check = check_tree(&list);
        assert!(check.is_tree());
        assert_eq!(check.node_count, 4);
        assert_eq!(check.max_degree, 2);
    }

    #[test]
    fn test_empty_and_single() {
        let empty: AdjacencyList<u32, ()> = AdjacencyList::new();
        assert!(check_tree(&empty).is_tree());

        let single = undirected(&[], &[7]);
        assert!(check_tree(&single).is_tree());
    }

    #[test]
    fn test_disconnected() {
        let list = undirected(&[(1, 2), (3, 4)], &[]);
        assert!(!is_connected(&list));
        assert!(is_acyclic(&list));
    }

    #[test]
    fn test_cycle() {
        let list = undirected(&[(1, 2), (2, 3), (3, 1)], &[]);
        assert!(is_connected(&list));
        assert!(is_undirected(&list));
        assert!(!is_acyclic(&list));
        assert!(!check_tree(&list).is_tree());
    }

    #[test]
    fn test_one_way_link() {
        let list: AdjacencyList<u32, ()> = [
            (1, AdjacencyListNode::new((), KeySet::single(2))),
            (2, AdjacencyListNode::new((), KeySet::new())),
        ]
        .into_iter()
        .collect();

        assert!(is_connected(&list));
        assert!(!is_undirected(&list));
        assert!(is_acyclic(&list));
    }

    #[test]
    fn test_self_link_is_cycle() {
        let mut list = AdjacencyList::new();
        list.add_links(1u32, KeySet::single(1), ());
        assert!(!is_acyclic(&list));
    }
}
