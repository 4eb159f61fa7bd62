//! Arbor Registry - Live trees shared between connections
//!
//! One [`TreeRegistry`] is constructed at startup and handed to every
//! connection handler. It maps session ids to trees and fans changed-key
//! sets out to the listeners of each session.
//!
//! # Locking
//!
//! - The directory lock is held for the whole of every registry call,
//!   so mutations and their notifications are totally ordered.
//! - Each [`SafeTree`] carries its own read/write lock for callers that
//!   hold on to a tree handle. Handles are read-only; every mutation
//!   goes through the registry and reaches the listeners.
//! - Listener delivery never blocks: a full subscriber buffer drops the
//!   event for that subscriber.
//!
//! # Example
//!
//! ```rust
//! use arbor_core::SessionId;
//! use arbor_registry::TreeRegistry;
//!
//! let registry = TreeRegistry::new();
//! let session = SessionId::new("lobby").unwrap();
//! let mut listener = registry.register_change_listener(&session);
//!
//! registry.upsert(&session, "alice", 1);
//! registry.upsert(&session, "bob", 2);
//!
//! let event = listener.try_recv().unwrap();
//! assert_eq!(event.changed.sorted(), vec!["alice"]);
//! assert_eq!(registry.get_neighbor_of_node(&session, &"bob"), Some(vec![("alice", 1)]));
//!
//! registry.unregister_change_listener(&session, listener);
//! ```

pub mod listeners;
pub mod logging;
pub mod registry;
pub mod safe_tree;

pub use listeners::*;
pub use logging::*;
pub use registry::*;
pub use safe_tree::*;
