//! TreeRegistry - per-session trees and their listeners
//!
//! The directory lock is held for the full duration of every public call,
//! including the delegated tree operation and listener fan-out. For one
//! session, listeners therefore see changed-key sets in the order the
//! mutations were applied.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use arbor_core::{ArborResult, KeySet, RegistryConfig, SessionId};
use arbor_graph::AdjacencyList;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::{ChangeListener, KeyedListeners, SafeTree};

/// Registry counters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub upserts: u64,
    pub deletes: u64,
    /// Events handed to a listener channel
    pub events_emitted: u64,
    /// Events lost to a full listener buffer
    pub events_dropped: u64,
    pub sessions_reaped: u64,
}

struct Directory<K: Eq + Hash, V> {
    trees: HashMap<SessionId, Arc<SafeTree<K, V>>>,
    listeners: KeyedListeners<K>,
    // Kept while the session has a tree or a listener
    sequences: HashMap<SessionId, u64>,
    stats: RegistryStats,
}

/// Concurrency-safe directory of session trees
///
/// Construct once and share by reference or `Arc`.
pub struct TreeRegistry<K: Eq + Hash, V> {
    config: RegistryConfig,
    directory: Mutex<Directory<K, V>>,
}

impl<K, V> Default for TreeRegistry<K, V>
where
    K: Clone + Eq + Hash + Ord,
    V: Clone,
{
    fn default() -> Self {
        TreeRegistry::build(RegistryConfig::default())
    }
}

impl<K, V> TreeRegistry<K, V>
where
    K: Clone + Eq + Hash + Ord,
    V: Clone,
{
    /// Create a registry with the default configuration
    pub fn new() -> Self {
        TreeRegistry::default()
    }

    /// Create a registry with a custom configuration
    pub fn with_config(config: RegistryConfig) -> ArborResult<Self> {
        config.validate()?;
        Ok(TreeRegistry::build(config))
    }

    fn build(config: RegistryConfig) -> Self {
        TreeRegistry {
            config,
            directory: Mutex::new(Directory {
                trees: HashMap::new(),
                listeners: KeyedListeners::new(config.listener_buffer),
                sequences: HashMap::new(),
                stats: RegistryStats::default(),
            }),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// The tree of `session`, created empty on first access
    ///
    /// The handle is read-only; mutations go through the registry so
    /// listeners hear about them. A handle kept past reaping keeps
    /// showing the tree as it was when the session was removed.
    pub fn get_tree(&self, session: &SessionId) -> Arc<SafeTree<K, V>> {
        let mut dir = self.directory.lock();
        self.tree_entry(&mut dir, session)
    }

    fn tree_entry(&self, dir: &mut Directory<K, V>, session: &SessionId) -> Arc<SafeTree<K, V>> {
        let tree = dir.trees.entry(session.clone()).or_insert_with(|| {
            debug!(session = %session, "session created");
            Arc::new(SafeTree::with_config(self.config.tree))
        });
        Arc::clone(tree)
    }

    /// Insert or update a node, creating the session if needed
    pub fn upsert(&self, session: &SessionId, key: K, value: V) -> KeySet<K> {
        let mut dir = self.directory.lock();
        let tree = self.tree_entry(&mut dir, session);

        let changed = tree.upsert(key, value);
        dir.stats.upserts += 1;
        debug!(session = %session, changed = changed.len(), "upsert");

        Self::notify(&mut dir, session, &changed);
        changed
    }

    /// Delete a node; an emptied session is removed from the directory
    ///
    /// Listener registrations for the session survive the removal.
    pub fn delete_node(&self, session: &SessionId, key: &K) -> KeySet<K> {
        let mut dir = self.directory.lock();
        let Some(tree) = dir.trees.get(session).cloned() else {
            return KeySet::new();
        };

        let changed = tree.delete_by_key(key);
        if !changed.is_empty() {
            dir.stats.deletes += 1;
            debug!(session = %session, changed = changed.len(), "delete");
        }
        if tree.is_empty() {
            dir.trees.remove(session);
            dir.stats.sessions_reaped += 1;
            debug!(session = %session, "session reaped");
        }

        Self::notify(&mut dir, session, &changed);
        Self::forget_if_idle(&mut dir, session);
        changed
    }

    // Drop per-session bookkeeping once nothing refers to the session
    fn forget_if_idle(dir: &mut Directory<K, V>, session: &SessionId) {
        if !dir.trees.contains_key(session) && dir.listeners.count(session) == 0 {
            dir.sequences.remove(session);
        }
    }

    fn notify(dir: &mut Directory<K, V>, session: &SessionId, changed: &KeySet<K>) {
        if changed.is_empty() {
            return;
        }
        let sequence = dir.sequences.entry(session.clone()).or_insert(0);
        let current = *sequence;
        *sequence += 1;

        let delivery = dir.listeners.emit(session, changed, current);
        dir.stats.events_emitted += delivery.delivered as u64;
        dir.stats.events_dropped += delivery.dropped as u64;
    }

    /// Neighbors of a node in attachment order, `None` if not found
    pub fn get_neighbor_of_node(&self, session: &SessionId, key: &K) -> Option<Vec<(K, V)>> {
        let dir = self.directory.lock();
        dir.trees.get(session)?.neighbors_of_node(key)
    }

    pub fn find(&self, session: &SessionId, key: &K) -> Option<V> {
        let dir = self.directory.lock();
        dir.trees.get(session)?.find(key)
    }

    pub fn has(&self, session: &SessionId, key: &K) -> bool {
        let dir = self.directory.lock();
        dir.trees.get(session).is_some_and(|tree| tree.has(key))
    }

    /// Snapshot of a session; empty for an unknown session
    pub fn adjacency_list(&self, session: &SessionId) -> AdjacencyList<K, V> {
        let dir = self.directory.lock();
        dir.trees
            .get(session)
            .map(|tree| tree.adjacency_list())
            .unwrap_or_default()
    }

    pub fn register_change_listener(&self, session: &SessionId) -> ChangeListener<K> {
        self.directory.lock().listeners.register(session)
    }

    /// Release a listener
    ///
    /// The handle is always released under the session it was issued
    /// for; a different `session` argument is logged and ignored. Returns
    /// false if the registration had already been pruned.
    pub fn unregister_change_listener(
        &self,
        session: &SessionId,
        listener: ChangeListener<K>,
    ) -> bool {
        if listener.session() != session {
            warn!(
                given = %session,
                issued = %listener.session(),
                "unregistering listener under its own session"
            );
        }
        let owner = listener.session().clone();
        let mut dir = self.directory.lock();
        let removed = dir.listeners.unregister(listener);
        Self::forget_if_idle(&mut dir, &owner);
        removed
    }

    /// Number of sessions with a live tree
    pub fn session_count(&self) -> usize {
        self.directory.lock().trees.len()
    }

    pub fn listener_count(&self, session: &SessionId) -> usize {
        self.directory.lock().listeners.count(session)
    }

    pub fn stats(&self) -> RegistryStats {
        self.directory.lock().stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;
    use arbor_core::{ArborError, TreeConfig};
    use arbor_graph::check_tree;
    use proptest::prelude::*;

    fn session(name: &str) -> SessionId {
        SessionId::new(name).unwrap()
    }

    #[test]
    fn test_upsert_find_roundtrip() {
        let registry = TreeRegistry::new();
        let s = session("room");

        let changed = registry.upsert(&s, "alice", 1);
        assert_eq!(changed.sorted(), vec!["alice"]);
        assert_eq!(registry.find(&s, &"alice"), Some(1));
        assert!(registry.has(&s, &"alice"));
        assert!(!registry.has(&session("other"), &"alice"));
        assert_eq!(registry.session_count(), 1);
    }

    #[test]
    fn test_repeat_upsert_changes_only_key() {
        let registry = TreeRegistry::new();
        let s = session("room");
        for (i, key) in ["a", "b", "c", "d"].into_iter().enumerate() {
            registry.upsert(&s, key, i);
        }
        let before = registry.adjacency_list(&s);

        let changed = registry.upsert(&s, "c", 2);
        assert_eq!(changed.sorted(), vec!["c"]);
        assert!(before.equal(&registry.adjacency_list(&s)));
    }

    #[test]
    fn test_reads_do_not_create_sessions() {
        let registry: TreeRegistry<&str, i32> = TreeRegistry::new();
        let s = session("ghost");

        assert!(registry.get_neighbor_of_node(&s, &"x").is_none());
        assert!(registry.find(&s, &"x").is_none());
        assert!(registry.adjacency_list(&s).is_empty());
        assert!(registry.delete_node(&s, &"x").is_empty());
        assert_eq!(registry.session_count(), 0);

        let tree = registry.get_tree(&s);
        assert!(tree.is_empty());
        assert_eq!(registry.session_count(), 1);
    }

    #[test]
    fn test_get_neighbor_of_node() {
        let registry = TreeRegistry::new();
        let s = session("room");
        for (i, key) in ["hello", "world", "foo", "bar"].into_iter().enumerate() {
            registry.upsert(&s, key, i);
        }

        let neighbors = registry.get_neighbor_of_node(&s, &"hello").unwrap();
        assert_eq!(neighbors, vec![("world", 1), ("foo", 2), ("bar", 3)]);
        assert!(registry.get_neighbor_of_node(&s, &"nope").is_none());
    }

    #[test]
    fn test_delete_reaps_empty_session() {
        let registry = TreeRegistry::new();
        let s = session("room");
        let mut listener = registry.register_change_listener(&s);

        registry.upsert(&s, "solo", 1);
        let changed = registry.delete_node(&s, &"solo");
        assert_eq!(changed.sorted(), vec!["solo"]);
        assert_eq!(registry.session_count(), 0);
        assert_eq!(registry.stats().sessions_reaped, 1);

        // Listener outlives the session
        assert_eq!(registry.listener_count(&s), 1);
        registry.upsert(&s, "again", 2);
        let sequences: Vec<_> = std::iter::from_fn(|| listener.try_recv())
            .map(|e| e.sequence)
            .collect();
        assert_eq!(sequences, vec![0, 1, 2]);
    }

    #[test]
    fn test_idle_sessions_leave_no_sequence() {
        let registry = TreeRegistry::new();
        for i in 0..1000 {
            let s = session(&format!("churn-{i}"));
            registry.upsert(&s, i, ());
            registry.delete_node(&s, &i);
        }
        assert_eq!(registry.session_count(), 0);
        assert!(registry.directory.lock().sequences.is_empty());

        // A listener keeps the counter alive across reaping
        let s = session("watched");
        let listener = registry.register_change_listener(&s);
        registry.upsert(&s, 1, ());
        registry.delete_node(&s, &1);
        assert_eq!(registry.directory.lock().sequences.get(&s), Some(&2));

        assert!(registry.unregister_change_listener(&s, listener));
        assert!(registry.directory.lock().sequences.is_empty());
    }

    #[test]
    fn test_tree_handle_tracks_registry_writes() {
        let registry = TreeRegistry::new();
        let s = session("room");
        let mut listener = registry.register_change_listener(&s);

        let tree = registry.get_tree(&s);
        registry.upsert(&s, "a", 1);
        registry.upsert(&s, "b", 2);
        assert_eq!(tree.find(&"b"), Some(2));
        assert_eq!(tree.len(), 2);
        assert_eq!(listener.try_recv().unwrap().sequence, 0);
        assert_eq!(listener.try_recv().unwrap().sequence, 1);

        registry.delete_node(&s, &"a");
        registry.delete_node(&s, &"b");
        assert_eq!(registry.session_count(), 0);
        assert!(tree.is_empty());

        // After reaping the session starts over with a fresh tree
        let fresh = registry.get_tree(&s);
        assert!(!Arc::ptr_eq(&tree, &fresh));
        registry.upsert(&s, "c", 3);
        assert!(fresh.has(&"c"));
        assert!(!tree.has(&"c"));
    }

    #[test]
    fn test_unregister_uses_listener_session() {
        let registry: TreeRegistry<u32, ()> = TreeRegistry::new();
        let s = session("room");
        let listener = registry.register_change_listener(&s);

        assert!(registry.unregister_change_listener(&session("elsewhere"), listener));
        assert_eq!(registry.listener_count(&s), 0);

        registry.upsert(&s, 1, ());
        assert_eq!(registry.stats().events_emitted, 0);
    }

    #[test]
    fn test_listener_fan_out() {
        let registry = TreeRegistry::new();
        let s = session("room");
        let mut a = registry.register_change_listener(&s);
        let mut b = registry.register_change_listener(&s);
        let mut elsewhere = registry.register_change_listener(&session("other"));

        registry.upsert(&s, 1u32, ());

        for listener in [&mut a, &mut b] {
            let event = listener.try_recv().unwrap();
            assert_eq!(event.changed.sorted(), vec![1]);
            assert!(listener.try_recv().is_none());
        }
        assert!(elsewhere.try_recv().is_none());
        assert_eq!(registry.stats().events_emitted, 2);

        assert!(registry.unregister_change_listener(&s, a));
        registry.upsert(&s, 2u32, ());
        assert_eq!(b.try_recv().unwrap().changed.sorted(), vec![1, 2]);
        assert_eq!(registry.listener_count(&s), 1);
    }

    #[test]
    fn test_no_event_for_absent_delete() {
        let registry = TreeRegistry::new();
        let s = session("room");
        registry.upsert(&s, "a", 1);
        let mut listener = registry.register_change_listener(&s);

        assert!(registry.delete_node(&s, &"zzz").is_empty());
        assert!(listener.try_recv().is_none());
        assert_eq!(registry.stats().deletes, 0);
    }

    #[test]
    fn test_slow_listener_does_not_block() {
        let config = RegistryConfig::default().with_listener_buffer(1);
        let registry = TreeRegistry::with_config(config).unwrap();
        let s = session("room");
        let mut listener = registry.register_change_listener(&s);

        for i in 0..5u32 {
            registry.upsert(&s, i, i);
        }

        let stats = registry.stats();
        assert_eq!(stats.events_emitted, 1);
        assert_eq!(stats.events_dropped, 4);
        assert_eq!(listener.try_recv().unwrap().sequence, 0);
        assert!(listener.try_recv().is_none());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = RegistryConfig::default().with_tree(TreeConfig::default().with_max_degree(0));
        let result = TreeRegistry::<u32, ()>::with_config(config);
        assert!(matches!(result, Err(ArborError::InvalidConfig(_))));
    }

    #[test]
    fn test_concurrent_distinct_key_upserts() {
        let registry = Arc::new(TreeRegistry::new());
        let s = session("busy");

        let handles: Vec<_> = (0..16u32)
            .map(|i| {
                let registry = Arc::clone(&registry);
                let s = s.clone();
                thread::spawn(move || registry.upsert(&s, i, i * 10))
            })
            .collect();
        for handle in handles {
            assert!(!handle.join().unwrap().is_empty());
        }

        let list = registry.adjacency_list(&s);
        assert_eq!(list.len(), 16);
        assert!(check_tree(&list).is_tree());
        assert_eq!(registry.stats().upserts, 16);
    }

    #[test]
    fn test_sessions_are_independent() {
        let registry = TreeRegistry::new();
        let a = session("a");
        let b = session("b");

        registry.upsert(&a, "x", 1);
        registry.upsert(&b, "x", 2);
        registry.upsert(&b, "y", 3);

        assert_eq!(registry.find(&a, &"x"), Some(1));
        assert_eq!(registry.find(&b, &"x"), Some(2));
        assert_eq!(registry.adjacency_list(&a).len(), 1);
        assert_eq!(registry.session_count(), 2);
    }

    #[derive(Clone, Debug)]
    enum Op {
        Upsert(usize, u8, u16),
        Delete(usize, u8),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..2usize, 0..12u8, any::<u16>()).prop_map(|(s, k, v)| Op::Upsert(s, k, v)),
            (0..2usize, 0..12u8).prop_map(|(s, k)| Op::Delete(s, k)),
        ]
    }

    proptest! {
        #[test]
        fn test_registry_matches_model(ops in prop::collection::vec(op_strategy(), 1..80)) {
            let config = RegistryConfig::default()
                .with_tree(TreeConfig::default().with_max_degree(3))
                .with_listener_buffer(ops.len());
            let registry = TreeRegistry::with_config(config).unwrap();
            let sessions = [session("left"), session("right")];
            let mut listeners: Vec<_> = sessions
                .iter()
                .map(|s| registry.register_change_listener(s))
                .collect();
            let mut models: [HashMap<u8, u16>; 2] = [HashMap::new(), HashMap::new()];
            let mut events = [0u64; 2];

            for op in &ops {
                let (index, changed) = match *op {
                    Op::Upsert(index, key, value) => {
                        models[index].insert(key, value);
                        (index, registry.upsert(&sessions[index], key, value))
                    }
                    Op::Delete(index, key) => {
                        let present = models[index].remove(&key).is_some();
                        let changed = registry.delete_node(&sessions[index], &key);
                        prop_assert_eq!(present, !changed.is_empty());
                        (index, changed)
                    }
                };
                if !changed.is_empty() {
                    events[index] += 1;
                }

                let live = models.iter().filter(|m| !m.is_empty()).count();
                prop_assert_eq!(registry.session_count(), live);
                for (s, model) in sessions.iter().zip(&models) {
                    let list = registry.adjacency_list(s);
                    prop_assert_eq!(list.len(), model.len());
                    prop_assert!(check_tree(&list).is_tree());
                    for (key, value) in model {
                        prop_assert_eq!(registry.find(s, key), Some(*value));
                    }
                }
            }

            for (listener, expected) in listeners.iter_mut().zip(events) {
                let sequences: Vec<u64> = std::iter::from_fn(|| listener.try_recv())
                    .map(|e| e.sequence)
                    .collect();
                prop_assert_eq!(sequences, (0..expected).collect::<Vec<_>>());
            }
        }
    }

    #[tokio::test]
    async fn test_listener_receives_async() {
        let registry = Arc::new(TreeRegistry::new());
        let s = session("live");
        let mut listener = registry.register_change_listener(&s);

        let writer = {
            let registry = Arc::clone(&registry);
            let s = s.clone();
            tokio::spawn(async move {
                for key in ["a", "b", "c"] {
                    registry.upsert(&s, key, 0);
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
            })
        };

        let mut seen = Vec::new();
        while seen.len() < 3 {
            let event = listener.recv().await.unwrap();
            seen.push(event.sequence);
        }
        writer.await.unwrap();

        assert_eq!(seen, vec![0, 1, 2]);
        assert!(registry.unregister_change_listener(&s, listener));
    }
}
