//! Tree Fuzzer - Randomized operation sequences against a model
//!
//! Tests:
//! - Tree invariant (connected, undirected, acyclic) after every operation
//! - Cardinality against a HashMap model
//! - Upsert/find round trip
//! - Delete-then-absence
//! - Value updates leave the shape unchanged
//! - Degree bound for `max_degree >= 2`

use std::collections::HashMap;

use arbor_core::TreeConfig;
use arbor_graph::{check_tree, Tree, TreeCheck};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Fuzzer configuration
#[derive(Clone, Debug)]
pub struct FuzzerConfig {
    /// Distinct keys operations draw from
    pub key_space: u32,
    /// Number of operations to run
    pub op_count: usize,
    /// Probability an operation is a delete (0.0 - 1.0)
    pub delete_prob: f64,
    /// Degree bound of the tree under test
    pub max_degree: usize,
    /// Random seed
    pub seed: u64,
}

impl Default for FuzzerConfig {
    fn default() -> Self {
        FuzzerConfig {
            key_space: 64,
            op_count: 1000,
            delete_prob: 0.3,
            max_degree: 3,
            seed: 42,
        }
    }
}

impl FuzzerConfig {
    /// Light fuzzing for quick tests
    pub fn light() -> Self {
        FuzzerConfig {
            key_space: 16,
            op_count: 200,
            delete_prob: 0.25,
            max_degree: 3,
            seed: 42,
        }
    }

    /// Heavy fuzzing for thorough testing
    pub fn heavy() -> Self {
        FuzzerConfig {
            key_space: 512,
            op_count: 10000,
            delete_prob: 0.4,
            max_degree: 4,
            seed: 42,
        }
    }
}

/// Operation applied by the fuzzer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FuzzOp {
    Upsert(u32, u64),
    Delete(u32),
}

/// An invariant broken at a given step
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Violation {
    NotATree { step: usize, check: TreeCheck },
    SizeMismatch { step: usize, expected: usize, actual: usize },
    ValueMismatch { step: usize, key: u32 },
    DeletedKeyPresent { step: usize, key: u32 },
    MissingChangedKey { step: usize, key: u32 },
    ShapeChanged { step: usize, key: u32 },
    DegreeExceeded { step: usize, degree: usize },
}

/// Fuzzing result
#[derive(Debug, Default)]
pub struct FuzzResult {
    pub upserts: usize,
    pub deletes: usize,
    pub final_size: usize,
    pub max_degree_seen: usize,
    pub violations: Vec<Violation>,
}

impl FuzzResult {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Tree fuzzer
pub struct TreeFuzzer {
    config: FuzzerConfig,
    tree: Tree<u32, u64>,
    model: HashMap<u32, u64>,
    rng: StdRng,
}

impl TreeFuzzer {
    /// Create a new fuzzer
    pub fn new(config: FuzzerConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        let tree = Tree::with_config(TreeConfig::default().with_max_degree(config.max_degree));
        TreeFuzzer {
            config,
            tree,
            model: HashMap::new(),
            rng,
        }
    }

    /// The tree under test
    pub fn tree(&self) -> &Tree<u32, u64> {
        &self.tree
    }

    fn generate_op(&mut self) -> FuzzOp {
        let key = self.rng.gen_range(0..self.config.key_space.max(1));
        if self.rng.gen::<f64>() < self.config.delete_prob {
            FuzzOp::Delete(key)
        } else {
            FuzzOp::Upsert(key, self.rng.gen())
        }
    }

    /// Run the fuzzer
    pub fn run(&mut self) -> FuzzResult {
        let mut result = FuzzResult::default();

        for step in 0..self.config.op_count {
            let op = self.generate_op();
            self.apply(step, op, &mut result);
            self.check_invariants(step, &mut result);
        }

        result.final_size = self.tree.len();
        result
    }

    /// Apply one operation and check its immediate postconditions
    pub fn apply(&mut self, step: usize, op: FuzzOp, result: &mut FuzzResult) {
        match op {
            FuzzOp::Upsert(key, value) => {
                result.upserts += 1;
                let existed = self.model.contains_key(&key);
                let before = existed.then(|| self.tree.adjacency_list());

                let changed = self.tree.upsert(key, value);
                self.model.insert(key, value);

                if !changed.contains(&key) {
                    result.violations.push(Violation::MissingChangedKey { step, key });
                }
                if let Some(before) = before {
                    if changed.len() != 1 || !before.equal(&self.tree.adjacency_list()) {
                        result.violations.push(Violation::ShapeChanged { step, key });
                    }
                }
                if self.tree.find(&key) != Some(&value) {
                    result.violations.push(Violation::ValueMismatch { step, key });
                }
            }
            FuzzOp::Delete(key) => {
                result.deletes += 1;
                let existed = self.model.remove(&key).is_some();

                let changed = self.tree.delete_by_key(&key);
                if existed && !changed.contains(&key) {
                    result.violations.push(Violation::MissingChangedKey { step, key });
                }
                if self.tree.has(&key) {
                    result.violations.push(Violation::DeletedKeyPresent { step, key });
                }
            }
        }
    }

    fn check_invariants(&self, step: usize, result: &mut FuzzResult) {
        let list = self.tree.adjacency_list();
        let check = check_tree(&list);

        if !check.is_tree() {
            result.violations.push(Violation::NotATree { step, check });
        }
        if check.node_count != self.model.len() {
            result.violations.push(Violation::SizeMismatch {
                step,
                expected: self.model.len(),
                actual: check.node_count,
            });
        }
        for (key, value) in &self.model {
            if self.tree.find(key) != Some(value) {
                result.violations.push(Violation::ValueMismatch { step, key: *key });
            }
        }

        result.max_degree_seen = result.max_degree_seen.max(check.max_degree);
        // A bound of 1 cannot hold past two nodes; leaves attach anyway
        if self.config.max_degree >= 2 && check.max_degree > self.config.max_degree {
            result.violations.push(Violation::DegreeExceeded {
                step,
                degree: check.max_degree,
            });
        }
    }
}
