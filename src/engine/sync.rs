//! Synchronous engine

use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use super::{EngineContext, auto_members, write_member, write_segments};
use crate::error::{MappingError, MappingResult};
use crate::mapping::{Mapping, TypeConverterFunction};
use crate::options::MemberOptions;
use crate::path;
use crate::property_tree::DestinationProperty;
use crate::transformation::Transformation;

/// Map `source` through `mapping`: `Null` passes through, a converter takes
/// over the whole value, arrays are mapped element by element
pub(crate) fn map_value(
    context: &EngineContext<'_>,
    mapping: &Mapping,
    source: &Value,
    depth: usize,
) -> MappingResult<Value> {
    if mapping.is_async() {
        return Err(MappingError::Mode);
    }
    if source.is_null() {
        return Ok(Value::Null);
    }

    if let Some(converter) = mapping.type_converter_function() {
        return match converter {
            TypeConverterFunction::Sync(convert) => {
                Ok(convert(&mapping.resolution_context(source.clone())))
            }
            TypeConverterFunction::Async(_) => Err(MappingError::Mode),
        };
    }

    match source {
        Value::Array(items) => items
            .iter()
            .map(|item| map_value(context, mapping, item, depth))
            .collect::<MappingResult<Vec<_>>>()
            .map(Value::Array),
        item => map_item(context, mapping, item, depth),
    }
}

fn map_item(
    context: &EngineContext<'_>,
    mapping: &Mapping,
    source: &Value,
    depth: usize,
) -> MappingResult<Value> {
    let mut destination = mapping.instantiate_destination();
    let hooks = mapping.for_all_member_mappings();

    for member in auto_members(mapping, source, &destination) {
        let value = match context.nested_class(mapping, member.source_name, member.value) {
            Some(class) => context.map_nested(class, member.value, depth)?,
            None => member.value.clone(),
        };
        trace!(mapping = %mapping.key(), member = member.source_name, "Auto-mapped member");
        write_segments(hooks, &mut destination, &[member.destination_name.as_str()], value);
    }

    let properties = mapping.properties();
    let entries = properties.entries();
    if entries.is_empty() {
        return Ok(destination);
    }

    let shared_source = Arc::new(source.clone());
    for entry in entries {
        let property = properties.destination(entry.destination);
        if property.is_ignored() || !property.condition_holds(source) {
            continue;
        }

        match run_chain(property, &shared_source)? {
            Some(value) => {
                trace!(
                    mapping = %mapping.key(),
                    destination = property.full_destination_path(),
                    "Resolved member"
                );
                write_member(hooks, &mut destination, property.full_destination_path(), value);
            }
            None => trace!(
                mapping = %mapping.key(),
                destination = property.full_destination_path(),
                "Member produced no value"
            ),
        }
    }

    Ok(destination)
}

/// Run the transformation chain of one property. `None` means nothing is
/// written.
pub(crate) fn run_chain(
    property: &DestinationProperty,
    source: &Arc<Value>,
) -> MappingResult<Option<Value>> {
    let source_path = property.full_source_path();
    let has_source = path::has_containing_object(source, source_path);
    let mut intermediate = path::value_at_path(source, source_path).cloned();

    for step in property.transformations() {
        match step {
            Transformation::Constant(value) => intermediate = Some(value.clone()),
            Transformation::MemberOptions(function)
            | Transformation::SourceMemberOptions(function) => {
                let mut options =
                    MemberOptions::live(Some(source.clone()), source_path, intermediate.take());
                match function(&mut options) {
                    Some(value) => intermediate = Some(value),
                    None if !has_source => return Ok(None),
                    None => intermediate = options.into_intermediate(),
                }
            }
            Transformation::AsyncMemberOptions(_) | Transformation::AsyncSourceMemberOptions(_) => {
                return Err(MappingError::Mode);
            }
        }
    }

    Ok(intermediate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapperConfig;
    use crate::property_tree::PropertySettings;
    use crate::registry::MappingRegistry;
    use crate::transformation::MemberConfiguration;
    use serde_json::json;
    use std::sync::RwLock;

    fn run(mapping: &Mapping, source: Value) -> MappingResult<Value> {
        let registry = MappingRegistry::new();
        let implicit = RwLock::new(MappingRegistry::new());
        let config = MapperConfig::default();
        let context = EngineContext {
            registry: &registry,
            implicit: &implicit,
            config: &config,
        };
        map_value(&context, mapping, &source, 0)
    }

    fn steps(configurations: Vec<MemberConfiguration>) -> PropertySettings {
        PropertySettings {
            transformations: configurations
                .into_iter()
                .map(MemberConfiguration::into_member_transformation)
                .collect(),
            ..PropertySettings::default()
        }
    }

    #[test]
    fn test_identity_copy() {
        let mapping = Mapping::new("a", "a", "aa");
        let source = json!({"name": "Ada", "tags": ["x"], "nested": {"n": 1}});
        assert_eq!(run(&mapping, source.clone()).unwrap(), source);
    }

    #[test]
    fn test_null_passes_through() {
        let mapping = Mapping::new("a", "b", "ab");
        assert_eq!(run(&mapping, Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_chain_runs_in_order() {
        let mut mapping = Mapping::new("a", "b", "ab");
        mapping
            .properties
            .insert(
                "name",
                "name",
                steps(vec![
                    MemberConfiguration::function(|opts| {
                        opts.intermediate_property_value()
                            .and_then(Value::as_str)
                            .map(|name| json!(name.to_uppercase()))
                    }),
                    MemberConfiguration::function(|opts| {
                        opts.intermediate_property_value()
                            .and_then(Value::as_str)
                            .map(|name| json!(format!("{}!", name)))
                    }),
                ]),
            )
            .unwrap();

        let result = run(&mapping, json!({"name": "ada"})).unwrap();
        assert_eq!(result, json!({"name": "ADA!"}));
    }

    #[test]
    fn test_missing_containing_object_drops_member() {
        let mut mapping = Mapping::new("a", "b", "ab");
        mapping
            .properties
            .insert(
                "address.city",
                "city",
                steps(vec![MemberConfiguration::function(|_| None)]),
            )
            .unwrap();

        assert_eq!(run(&mapping, json!({"other": 1})).unwrap(), json!({"other": 1}));
        assert_eq!(
            run(&mapping, json!({"address": {"city": "Bonn"}})).unwrap(),
            json!({"city": "Bonn"})
        );
    }

    #[test]
    fn test_async_step_rejected() {
        let mut mapping = Mapping::new("a", "b", "ab");
        mapping
            .properties
            .insert(
                "x",
                "x",
                steps(vec![MemberConfiguration::async_function(|_, done| done.skip())]),
            )
            .unwrap();
        mapping.is_async = true;

        assert!(matches!(run(&mapping, json!({})), Err(MappingError::Mode)));
    }

    #[test]
    fn test_array_elements_mapped_independently() {
        let mut mapping = Mapping::new("a", "b", "ab");
        mapping
            .properties
            .insert("flag", "flag", steps(vec![json!(true).into()]))
            .unwrap();

        let result = run(&mapping, json!([{"id": 1}, null, {"id": 2}])).unwrap();
        assert_eq!(
            result,
            json!([{"id": 1, "flag": true}, null, {"id": 2, "flag": true}])
        );
    }
}
