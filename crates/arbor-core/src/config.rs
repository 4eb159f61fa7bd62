//! Tree and registry configuration

use crate::{ArborError, ArborResult};

/// Neighbor count a node may reach before insertion descends past it
pub const DEFAULT_MAX_DEGREE: usize = 3;

/// Pending change events buffered per listener before new ones are dropped
pub const DEFAULT_LISTENER_BUFFER: usize = 64;

/// Bounded tree configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TreeConfig {
    /// Soft cap on neighbors per node, applied at insertion time
    pub max_degree: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        TreeConfig {
            max_degree: DEFAULT_MAX_DEGREE,
        }
    }
}

impl TreeConfig {
    pub fn with_max_degree(mut self, max_degree: usize) -> Self {
        self.max_degree = max_degree;
        self
    }

    pub fn validate(&self) -> ArborResult<()> {
        if self.max_degree == 0 {
            return Err(ArborError::InvalidConfig(
                "max_degree must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Registry configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Configuration applied to every session tree
    pub tree: TreeConfig,
    /// Channel capacity of each change listener
    pub listener_buffer: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            tree: TreeConfig::default(),
            listener_buffer: DEFAULT_LISTENER_BUFFER,
        }
    }
}

impl RegistryConfig {
    pub fn with_tree(mut self, tree: TreeConfig) -> Self {
        self.tree = tree;
        self
    }

    pub fn with_listener_buffer(mut self, listener_buffer: usize) -> Self {
        self.listener_buffer = listener_buffer;
        self
    }

    pub fn validate(&self) -> ArborResult<()> {
        self.tree.validate()?;
        if self.listener_buffer == 0 {
            return Err(ArborError::InvalidConfig(
                "listener_buffer must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RegistryConfig::default();
        assert_eq!(config.tree.max_degree, DEFAULT_MAX_DEGREE);
        assert_eq!(config.listener_buffer, DEFAULT_LISTENER_BUFFER);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_zero() {
        let tree = TreeConfig::default().with_max_degree(0);
        assert!(matches!(tree.validate(), Err(ArborError::InvalidConfig(_))));

        let config = RegistryConfig::default().with_tree(tree);
        assert!(config.validate().is_err());

        let config = RegistryConfig::default().with_listener_buffer(0);
        assert!(config.validate().is_err());
    }
}
