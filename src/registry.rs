//! Mapping registry and key scheme

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::mapping::Mapping;
use crate::types::TypeKey;

/// Registry key of a mapping: `source + destination`
pub fn mapping_key(source_key: &str, destination_key: &str) -> String {
    format!("{}{}", source_key, destination_key)
}

/// Registry key of a mapping owned by a profile:
/// `profile=>source` + `profile=>destination`
pub fn profile_mapping_key(profile_name: &str, source_key: &str, destination_key: &str) -> String {
    format!(
        "{}=>{}{}=>{}",
        profile_name, source_key, profile_name, destination_key
    )
}

/// Mappings by registry key
#[derive(Debug, Clone, Default)]
pub struct MappingRegistry {
    mappings: BTreeMap<String, Mapping>,
}

impl MappingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Mapping> {
        self.mappings.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.mappings.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Mappings ordered by key
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Mapping)> {
        self.mappings.iter().map(|(key, mapping)| (key.as_str(), mapping))
    }

    /// Register a fresh mapping under `key`, replacing any previous one
    pub(crate) fn register(
        &mut self,
        key: String,
        source: &TypeKey,
        destination: &TypeKey,
        ignore_all_non_existing: bool,
    ) -> &mut Mapping {
        let mut mapping = Mapping::new(source.name(), destination.name(), key.clone());
        mapping.source_type_class = source.class().cloned();
        mapping.destination_type_class = destination.class().cloned();
        mapping.ignore_all_non_existing = ignore_all_non_existing;

        match self.mappings.entry(key) {
            Entry::Occupied(mut entry) => {
                tracing::debug!(key = %entry.key(), "Replacing existing mapping");
                entry.insert(mapping);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(mapping),
        }
    }

    /// Insert a mapping unless its key is already taken; the first
    /// registration stays authoritative
    pub(crate) fn insert_if_absent(&mut self, mapping: Mapping) -> &Mapping {
        self.mappings.entry(mapping.key.clone()).or_insert(mapping)
    }
}
