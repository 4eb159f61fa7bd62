//! Arbor Test Harness - Fuzzing and load testing
//!
//! This crate provides:
//! - Seeded randomized tree fuzzing against a HashMap model
//! - Multi-threaded load against a shared registry
//! - Criterion benchmarks (see `benches/`)

pub mod concurrency;
pub mod tree_fuzzer;

pub use concurrency::*;
pub use tree_fuzzer::*;
