//! Arbor Graph - Live participant trees
//!
//! This crate implements the structural core:
//! - A keyed node arena with traversal, cleave and interject
//! - Flattened adjacency snapshots with set algebra
//! - Bounded-degree insertion and connectivity-preserving deletion
//! - Tree invariant checks and node/edge export
//!
//! # Layers
//!
//! [`Graph`] does not care what shape it holds. It could be a tree, a
//! lattice, a full mesh. The methods in `bounded` assume the reachable
//! component is an undirected tree, and [`Tree`] keeps it that way
//! between calls.
//!
//! # Example
//!
//! ```rust
//! use arbor_graph::{check_tree, Tree};
//!
//! let mut tree = Tree::new();
//! for (i, key) in ["hello", "world", "foo", "bar"].into_iter().enumerate() {
//!     tree.upsert(key, i);
//! }
//!
//! let changed = tree.delete_by_key(&"hello");
//! assert!(changed.contains(&"hello"));
//! assert!(check_tree(&tree.adjacency_list()).is_tree());
//! ```

pub mod adjacency;
pub mod bounded;
pub mod export;
pub mod graph;
pub mod invariants;
pub mod node;
pub mod tree;

pub use adjacency::*;
pub use export::*;
pub use graph::*;
pub use invariants::*;
pub use node::*;
pub use tree::*;
