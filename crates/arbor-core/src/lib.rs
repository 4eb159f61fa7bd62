//! Arbor Core - Fundamental types and primitives
//!
//! This crate defines the types shared by every Arbor crate:
//! - Identifiers (SessionId, ListenerId)
//! - The unordered key set used for changed-key reporting
//! - Tree and registry configuration
//! - Error types

pub mod config;
pub mod error;
pub mod id;
pub mod set;

pub use config::*;
pub use error::*;
pub use id::*;
pub use set::*;
