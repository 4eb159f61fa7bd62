//! Concurrent Load - many writers against one shared registry
//!
//! Each writer thread owns a disjoint key range and scatters upserts and
//! deletes over a handful of sessions. Afterwards every session must
//! still be a tree holding exactly the keys its writers left behind, and
//! each session listener must have seen strictly increasing sequences.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use arbor_core::{ArborResult, RegistryConfig, SessionId, TreeConfig};
use arbor_graph::{check_tree, TreeCheck};
use arbor_registry::{ChangeListener, TreeRegistry};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

/// Load configuration
#[derive(Clone, Debug)]
pub struct LoadConfig {
    pub threads: usize,
    pub sessions: usize,
    /// Keys owned by each thread
    pub keys_per_thread: u64,
    /// Operations issued by each thread
    pub ops_per_thread: usize,
    /// Probability an operation deletes one of the thread's keys
    pub delete_prob: f64,
    pub max_degree: usize,
    pub seed: u64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        LoadConfig {
            threads: 8,
            sessions: 4,
            keys_per_thread: 32,
            ops_per_thread: 500,
            delete_prob: 0.2,
            max_degree: 3,
            seed: 42,
        }
    }
}

impl LoadConfig {
    /// Quick run for unit tests
    pub fn light() -> Self {
        LoadConfig {
            threads: 4,
            sessions: 2,
            keys_per_thread: 8,
            ops_per_thread: 100,
            delete_prob: 0.2,
            max_degree: 3,
            seed: 42,
        }
    }

    fn total_ops(&self) -> usize {
        self.threads * self.ops_per_thread
    }
}

/// Per-session outcome
#[derive(Clone, Debug)]
pub struct SessionReport {
    pub session: SessionId,
    pub check: TreeCheck,
    pub expected_nodes: usize,
    pub events_received: usize,
    pub sequences_ordered: bool,
}

impl SessionReport {
    pub fn is_valid(&self) -> bool {
        self.check.is_tree()
            && self.check.node_count == self.expected_nodes
            && self.sequences_ordered
    }
}

/// Load run outcome
#[derive(Clone, Debug)]
pub struct LoadReport {
    pub sessions: Vec<SessionReport>,
    pub operations: usize,
    pub elapsed: Duration,
}

impl LoadReport {
    pub fn is_valid(&self) -> bool {
        self.sessions.iter().all(SessionReport::is_valid)
    }
}

/// Concurrent load harness
pub struct ConcurrentLoad {
    config: LoadConfig,
    registry: Arc<TreeRegistry<u64, u64>>,
    sessions: Vec<SessionId>,
}

// What one writer left in each session
type Residue = HashMap<usize, HashSet<u64>>;

impl ConcurrentLoad {
    /// Create a harness; listener buffers are sized to never drop
    pub fn new(config: LoadConfig) -> ArborResult<Self> {
        let registry_config = RegistryConfig::default()
            .with_tree(TreeConfig::default().with_max_degree(config.max_degree))
            .with_listener_buffer(config.total_ops().max(1));
        let registry = Arc::new(TreeRegistry::with_config(registry_config)?);

        let sessions = (0..config.sessions.max(1))
            .map(|i| SessionId::new(format!("load-{i}")))
            .collect::<ArborResult<Vec<_>>>()?;

        Ok(ConcurrentLoad {
            config,
            registry,
            sessions,
        })
    }

    pub fn registry(&self) -> &Arc<TreeRegistry<u64, u64>> {
        &self.registry
    }

    /// Run all writers to completion and check every session
    pub fn run(&self) -> LoadReport {
        let mut listeners: Vec<ChangeListener<u64>> = self
            .sessions
            .iter()
            .map(|s| self.registry.register_change_listener(s))
            .collect();

        let start = Instant::now();
        let handles: Vec<_> = (0..self.config.threads)
            .map(|t| {
                let registry = Arc::clone(&self.registry);
                let sessions = self.sessions.clone();
                let config = self.config.clone();
                thread::spawn(move || run_writer(t, &config, &registry, &sessions))
            })
            .collect();

        let mut residue: Residue = HashMap::new();
        for handle in handles {
            // A panicking writer leaves its keys unaccounted; the counts
            // below will then disagree
            if let Ok(part) = handle.join() {
                for (session, keys) in part {
                    residue.entry(session).or_default().extend(keys);
                }
            }
        }
        let elapsed = start.elapsed();

        let sessions = self
            .sessions
            .iter()
            .zip(listeners.iter_mut())
            .enumerate()
            .map(|(i, (session, listener))| {
                let mut sequences = Vec::new();
                while let Some(event) = listener.try_recv() {
                    sequences.push(event.sequence);
                }
                SessionReport {
                    session: session.clone(),
                    check: check_tree(&self.registry.adjacency_list(session)),
                    expected_nodes: residue.get(&i).map_or(0, HashSet::len),
                    events_received: sequences.len(),
                    sequences_ordered: sequences.windows(2).all(|w| w[0] < w[1]),
                }
            })
            .collect();

        for (session, listener) in self.sessions.iter().zip(listeners) {
            self.registry.unregister_change_listener(session, listener);
        }

        let report = LoadReport {
            sessions,
            operations: self.config.total_ops(),
            elapsed,
        };
        info!(
            operations = report.operations,
            elapsed_ms = report.elapsed.as_millis() as u64,
            valid = report.is_valid(),
            "load run complete"
        );
        report
    }
}

fn run_writer(
    thread_index: usize,
    config: &LoadConfig,
    registry: &TreeRegistry<u64, u64>,
    sessions: &[SessionId],
) -> Residue {
    let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(thread_index as u64));
    let base = thread_index as u64 * config.keys_per_thread;
    let keys = config.keys_per_thread.max(1);
    // Key → session it currently lives in
    let mut placed: HashMap<u64, usize> = HashMap::new();

    for _ in 0..config.ops_per_thread {
        let key = base + rng.gen_range(0..keys);
        if rng.gen::<f64>() < config.delete_prob {
            if let Some(session) = placed.remove(&key) {
                registry.delete_node(&sessions[session], &key);
            }
        } else {
            // A key stays in one session until deleted
            let session = *placed
                .entry(key)
                .or_insert_with(|| rng.gen_range(0..sessions.len()));
            registry.upsert(&sessions[session], key, thread_index as u64);
        }
    }

    let mut residue = Residue::new();
    for (key, session) in placed {
        residue.entry(session).or_default().insert(key);
    }
    residue
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_light_load() {
        let load = ConcurrentLoad::new(LoadConfig::light()).unwrap();
        let report = load.run();

        assert!(report.is_valid(), "{:?}", report);
        assert_eq!(report.sessions.len(), 2);
        assert_eq!(report.operations, 400);
        assert!(report.sessions.iter().any(|s| s.events_received > 0));
        assert_eq!(load.registry().stats().events_dropped, 0);
    }

    #[test]
    fn test_distinct_keys_single_session() {
        let config = LoadConfig {
            threads: 16,
            sessions: 1,
            keys_per_thread: 1,
            ops_per_thread: 1,
            delete_prob: 0.0,
            max_degree: 3,
            seed: 7,
        };
        let load = ConcurrentLoad::new(config).unwrap();
        let report = load.run();

        assert!(report.is_valid(), "{:?}", report);
        assert_eq!(report.sessions[0].check.node_count, 16);
        assert_eq!(report.sessions[0].events_received, 16);
    }

    #[test]
    fn test_invalid_degree_rejected() {
        let config = LoadConfig {
            max_degree: 0,
            ..LoadConfig::light()
        };
        assert!(ConcurrentLoad::new(config).is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_listener_sees_blocking_writers() {
        let registry: Arc<TreeRegistry<u64, u64>> = Arc::new(TreeRegistry::new());
        let session = SessionId::new("async").unwrap();
        let mut listener = registry.register_change_listener(&session);

        let writers: Vec<_> = (0..4u64)
            .map(|t| {
                let registry = Arc::clone(&registry);
                let session = session.clone();
                tokio::task::spawn_blocking(move || {
                    for i in 0..5 {
                        registry.upsert(&session, t * 10 + i, t);
                    }
                })
            })
            .collect();

        let mut last = None;
        for _ in 0..20 {
            let event = listener.recv().await.unwrap();
            if let Some(prev) = last {
                assert!(event.sequence > prev);
            }
            last = Some(event.sequence);
        }
        for writer in writers {
            writer.await.unwrap();
        }

        assert_eq!(registry.adjacency_list(&session).len(), 20);
        assert!(registry.unregister_change_listener(&session, listener));
    }
}
