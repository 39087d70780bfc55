//! Configuration for the mapper

use serde::{Deserialize, Serialize};

/// Configuration shared by every mapping registered on a [`crate::Mapper`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapperConfig {
    /// Maximum depth of nested class-to-class auto-mapping
    pub max_nesting_depth: usize,
    /// Initial value of `ignore_all_non_existing` for new mappings
    pub ignore_all_non_existing: bool,
    /// Map nested class instances through a class-to-class mapping instead of cloning them
    pub auto_map_nested_classes: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: 32,
            ignore_all_non_existing: false,
            auto_map_nested_classes: true,
        }
    }
}

impl MapperConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that only maps explicitly configured members
    pub fn explicit_only() -> Self {
        Self {
            ignore_all_non_existing: true,
            auto_map_nested_classes: false,
            ..Self::default()
        }
    }

    /// Set the maximum nesting depth
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Only map explicitly configured members on newly created mappings
    pub fn with_ignore_all_non_existing(mut self, enabled: bool) -> Self {
        self.ignore_all_non_existing = enabled;
        self
    }

    /// Enable/disable nested class-to-class auto-mapping
    pub fn with_auto_map_nested_classes(mut self, enabled: bool) -> Self {
        self.auto_map_nested_classes = enabled;
        self
    }
}
