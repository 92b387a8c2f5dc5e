//! Named storage lookup built from configuration.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::StorageConfig;
use crate::storage::rule::{StorageError, StorageRule};

/// All configured storages, keyed by name.
#[derive(Debug, Default)]
pub struct StorageRegistry {
    storages: HashMap<String, Arc<StorageRule>>,
}

impl StorageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from configuration. A later entry with a duplicate name
    /// replaces the earlier one (validation reports duplicates beforehand).
    pub fn from_config(configs: &[StorageConfig]) -> Result<Self, StorageError> {
        let mut registry = Self::new();
        for config in configs {
            let rule = StorageRule::from_config(config)?;
            tracing::debug!(
                storage = %rule.name(),
                kind = %rule.storage_type(),
                address = %rule.address(),
                watchdog = rule.watchdog().is_some(),
                "Storage declared"
            );
            registry.insert(rule);
        }
        Ok(registry)
    }

    /// Insert a storage, returning the one it replaced.
    pub fn insert(&mut self, rule: StorageRule) -> Option<Arc<StorageRule>> {
        self.storages.insert(rule.name().to_string(), Arc::new(rule))
    }

    pub fn get(&self, name: &str) -> Option<&Arc<StorageRule>> {
        self.storages.get(name)
    }

    pub fn len(&self) -> usize {
        self.storages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storages.is_empty()
    }

    /// Storages that have a watchdog configured.
    pub fn watched(&self) -> impl Iterator<Item = &Arc<StorageRule>> {
        self.storages.values().filter(|s| s.watchdog().is_some())
    }
}
