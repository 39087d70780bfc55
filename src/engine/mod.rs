//! Mapping execution
//!
//! Both engines resolve a single item in the same order: auto-mapped source
//! members first, then explicitly configured members in registration order.
//! Explicit writes merge into whatever the auto-mapping already created, so
//! sibling values survive.

pub(crate) mod asynchronous;
pub(crate) mod sync;

use std::collections::BTreeSet;
use std::sync::{PoisonError, RwLock};

use serde_json::{Map, Value};

use crate::config::MapperConfig;
use crate::error::{MappingError, MappingResult};
use crate::mapping::{ForAllMembersFn, Mapping};
use crate::path;
use crate::registry::{MappingRegistry, mapping_key};
use crate::types::TypeClass;

/// What an engine needs besides the mapping being executed
pub(crate) struct EngineContext<'a> {
    pub(crate) registry: &'a MappingRegistry,
    pub(crate) implicit: &'a RwLock<MappingRegistry>,
    pub(crate) config: &'a MapperConfig,
}

impl EngineContext<'_> {
    /// Class of `member` when it should be mapped as a nested class instance
    pub(crate) fn nested_class<'m>(
        &self,
        mapping: &'m Mapping,
        member: &str,
        value: &Value,
    ) -> Option<&'m TypeClass> {
        if !self.config.auto_map_nested_classes || !(value.is_object() || value.is_array()) {
            return None;
        }
        mapping.source_type_class()?.member_class(member)
    }

    /// Map a nested class instance through its `<Class><Class>` mapping,
    /// registering an implicit one on first encounter
    pub(crate) fn map_nested(
        &self,
        class: &TypeClass,
        value: &Value,
        depth: usize,
    ) -> MappingResult<Value> {
        let key = mapping_key(class.name(), class.name());
        if depth + 1 > self.config.max_nesting_depth {
            return Err(MappingError::MaxDepthExceeded {
                key,
                depth: self.config.max_nesting_depth,
            });
        }

        if let Some(mapping) = self.registry.get(&key) {
            return sync::map_value(self, mapping, value, depth + 1);
        }

        let mapping = self.implicit_mapping(class, key);
        sync::map_value(self, &mapping, value, depth + 1)
    }

    fn implicit_mapping(&self, class: &TypeClass, key: String) -> Mapping {
        {
            let implicit = self.implicit.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(mapping) = implicit.get(&key) {
                return mapping.clone();
            }
        }

        let mut mapping = Mapping::new(class.name(), class.name(), key.clone());
        mapping.source_type_class = Some(class.clone());
        mapping.destination_type_class = Some(class.clone());

        let mut implicit = self.implicit.write().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!(key = %key, "Registering implicit nested class mapping");
        implicit.insert_if_absent(mapping).clone()
    }
}

/// A source member picked up by auto-mapping
pub(crate) struct AutoMember<'v> {
    pub(crate) source_name: &'v str,
    pub(crate) destination_name: String,
    pub(crate) value: &'v Value,
}

/// Source members to copy without explicit configuration.
///
/// A member is skipped when an explicit source root carries its name, when its
/// destination name is configured explicitly, when the mapping ignores all
/// non-existing members, or when a destination class is set and a fresh
/// instance lacks the destination name.
pub(crate) fn auto_members<'v>(
    mapping: &Mapping,
    source: &'v Value,
    destination_template: &Value,
) -> Vec<AutoMember<'v>> {
    if mapping.ignores_all_non_existing() {
        return Vec::new();
    }
    let Some(object) = source.as_object() else {
        return Vec::new();
    };

    let known_members: Option<BTreeSet<&str>> = mapping.destination_type_class().map(|_| {
        destination_template
            .as_object()
            .map(|template| template.keys().map(String::as_str).collect())
            .unwrap_or_default()
    });

    let properties = mapping.properties();
    object
        .iter()
        .filter(|(name, _)| !properties.has_root(name))
        .filter_map(|(name, value)| {
            let destination_name = mapping.destination_member_name(name);
            if properties.has_destination(&destination_name) {
                return None;
            }
            if let Some(known) = &known_members {
                if !known.contains(destination_name.as_str()) {
                    return None;
                }
            }
            Some(AutoMember {
                source_name: name,
                destination_name,
                value,
            })
        })
        .collect()
}

/// Write a resolved value at the dot path `destination_path`.
///
/// Missing objects on the path are created. Without hooks the value is
/// inserted directly; otherwise every hook receives the containing object, the
/// leaf name and the value, and decides what to write.
pub(crate) fn write_member(
    hooks: &[ForAllMembersFn],
    destination: &mut Value,
    destination_path: &str,
    value: Value,
) {
    write_segments(hooks, destination, &path::segments(destination_path), value);
}

/// Write a resolved value under an already split path. Auto-mapped members
/// pass their name as a single segment, so dots in source keys stay literal.
pub(crate) fn write_segments(
    hooks: &[ForAllMembersFn],
    destination: &mut Value,
    segments: &[&str],
    value: Value,
) {
    let Some(name) = segments.last().copied() else {
        return;
    };
    let Some(parent) = path::materialize_parent(destination, segments) else {
        return;
    };

    if hooks.is_empty() {
        if parent.get(name).is_some_and(Value::is_object) && !value.is_object() {
            tracing::warn!(
                path = %segments.join("."),
                "Overwriting nested destination object with a plain value"
            );
        }
        parent.insert(name.to_string(), value);
        return;
    }

    let mut container = Value::Object(std::mem::take(parent));
    for hook in hooks {
        hook(&mut container, name, &value);
    }
    match container {
        Value::Object(map) => *parent = map,
        _ => {
            tracing::warn!(
                path = %segments.join("."),
                "Member hook replaced the containing object, discarding its result"
            );
            *parent = Map::new();
        }
    }
}
