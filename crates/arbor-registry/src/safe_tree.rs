//! SafeTree - a tree behind a read/write lock
//!
//! Mutations take the write lock, reads take the read lock, so every
//! read sees the tree between two whole operations. Only the registry
//! mutates; handles given out by it are read-only.

use std::hash::Hash;

use arbor_core::{KeySet, TreeConfig};
use arbor_graph::{AdjacencyList, Tree};
use parking_lot::{RwLock, RwLockReadGuard};

/// Lock-guarded tree for one session
#[derive(Debug)]
pub struct SafeTree<K, V> {
    inner: RwLock<Tree<K, V>>,
}

impl<K, V> Default for SafeTree<K, V> {
    fn default() -> Self {
        SafeTree {
            inner: RwLock::new(Tree::default()),
        }
    }
}

impl<K, V> SafeTree<K, V>
where
    K: Clone + Eq + Hash + Ord,
    V: Clone,
{
    pub fn new() -> Self {
        SafeTree::default()
    }

    pub fn with_config(config: TreeConfig) -> Self {
        SafeTree {
            inner: RwLock::new(Tree::with_config(config)),
        }
    }

    pub(crate) fn upsert(&self, key: K, value: V) -> KeySet<K> {
        self.inner.write().upsert(key, value)
    }

    pub(crate) fn delete_by_key(&self, key: &K) -> KeySet<K> {
        self.inner.write().delete_by_key(key)
    }

    /// Value stored under `key`, cloned out of the lock
    pub fn find(&self, key: &K) -> Option<V> {
        self.inner.read().find(key).cloned()
    }

    pub fn has(&self, key: &K) -> bool {
        self.inner.read().has(key)
    }

    pub fn neighbors_of_node(&self, key: &K) -> Option<Vec<(K, V)>> {
        self.inner.read().neighbors_of_node(key)
    }

    pub fn adjacency_list(&self) -> AdjacencyList<K, V> {
        self.inner.read().adjacency_list()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Hold the read lock for several reads in a row
    pub fn read(&self) -> RwLockReadGuard<'_, Tree<K, V>> {
        self.inner.read()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use arbor_graph::check_tree;

    #[test]
    fn test_safe_tree_basic() {
        let tree = SafeTree::new();
        assert!(tree.is_empty());

        tree.upsert("a", 1);
        tree.upsert("b", 2);
        assert_eq!(tree.find(&"b"), Some(2));
        assert!(tree.has(&"a"));
        assert_eq!(tree.neighbors_of_node(&"a"), Some(vec![("b", 2)]));

        let changed = tree.delete_by_key(&"a");
        assert!(changed.contains(&"a"));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.read().root(), Some(&"b"));
    }

    #[test]
    fn test_safe_tree_concurrent_upserts() {
        let tree = Arc::new(SafeTree::with_config(TreeConfig::default().with_max_degree(2)));

        let handles: Vec<_> = (0..8u32)
            .map(|t| {
                let tree = Arc::clone(&tree);
                thread::spawn(move || {
                    for i in 0..25u32 {
                        tree.upsert(t * 100 + i, i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let list = tree.adjacency_list();
        assert_eq!(list.len(), 200);
        let check = check_tree(&list);
        assert!(check.is_tree());
        assert!(check.max_degree <= 2);
    }
}
