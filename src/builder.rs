//! Fluent configuration of a single mapping
//!
//! Every call folds into the same [`Mapping`] record, so calls may come in any
//! order. Calls that can conflict with earlier ones fail immediately; whatever
//! earlier calls already applied stays applied.

use serde_json::Value;
use tracing::debug;

use crate::error::{MappingError, MappingResult};
use crate::mapping::{ConvertUsing, Mapping};
use crate::profile::{ProfileRegistry, apply_profile};
use crate::property_tree::PropertySettings;
use crate::transformation::MemberConfiguration;
use crate::types::TypeClass;

/// Chainable configuration of one registered mapping
pub struct MappingBuilder<'a> {
    mapping: &'a mut Mapping,
    profiles: Option<&'a ProfileRegistry>,
}

impl<'a> MappingBuilder<'a> {
    pub(crate) fn new(mapping: &'a mut Mapping, profiles: Option<&'a ProfileRegistry>) -> Self {
        Self { mapping, profiles }
    }

    /// The mapping configured so far
    pub fn mapping(&self) -> &Mapping {
        self.mapping
    }

    /// Configure how `destination_path` is produced.
    ///
    /// A literal becomes a constant step. A function is probed once to learn
    /// whether it calls `map_from`, `ignore` or `condition`; repeated calls for
    /// the same path stack their steps in call order.
    ///
    /// A function that panics while probed is still registered as a step. The
    /// panic is caught, but the installed panic hook reports it first.
    pub fn for_member(
        &mut self,
        destination_path: &str,
        configuration: impl Into<MemberConfiguration>,
    ) -> MappingResult<&mut Self> {
        let configuration = configuration.into();
        let probe = configuration.probe(destination_path);
        let is_async =
            !probe.ignore && matches!(configuration, MemberConfiguration::AsyncFunction(_));
        let properties = &mut self.mapping.properties;

        match properties.find_by_destination(destination_path) {
            Some(entry) => {
                let destination = properties.destination_mut(entry.destination);
                if destination.ignore {
                    debug!(
                        mapping = %self.mapping.key,
                        destination = destination_path,
                        "Member already ignored, skipping configuration"
                    );
                    return Ok(self);
                }

                if probe.ignore {
                    destination.ignore = true;
                } else {
                    destination
                        .transformations
                        .push(configuration.into_member_transformation());
                }
                if probe.condition.is_some() {
                    destination.condition = probe.condition;
                }
                destination.source_mapping = false;
                let current_source = destination.full_source_path().to_string();

                if let Some(source_path) = probe.map_from.filter(|path| *path != current_source) {
                    properties.rebase(entry, &source_path)?;
                    debug!(
                        mapping = %self.mapping.key,
                        destination = destination_path,
                        from = %current_source,
                        to = %source_path,
                        "Rebased member"
                    );
                }
            }
            None => {
                let source_path = probe
                    .map_from
                    .clone()
                    .unwrap_or_else(|| destination_path.to_string());
                let transformations = if probe.ignore {
                    Vec::new()
                } else {
                    vec![configuration.into_member_transformation()]
                };
                properties.insert(
                    &source_path,
                    destination_path,
                    PropertySettings {
                        transformations,
                        ignore: probe.ignore,
                        condition: probe.condition,
                        source_mapping: false,
                    },
                )?;
            }
        }

        if is_async {
            self.mapping.is_async = true;
        }

        debug!(
            mapping = %self.mapping.key,
            destination = destination_path,
            is_async,
            "Configured member"
        );
        Ok(self)
    }

    /// Configure a source member by a function; the destination path equals
    /// the source path
    pub fn for_source_member(
        &mut self,
        source_path: &str,
        configuration: impl Into<MemberConfiguration>,
    ) -> MappingResult<&mut Self> {
        let configuration = configuration.into();
        if !configuration.is_function() {
            return Err(MappingError::configuration(
                "Configuration of forSourceMember has to be a function with one (sync) or two (async) options parameters.",
            ));
        }

        let probe = configuration.probe(source_path);
        if probe.map_from.is_some() || probe.condition.is_some() {
            tracing::warn!(
                mapping = %self.mapping.key,
                source = source_path,
                "map_from and condition have no effect on source members"
            );
        }
        let is_async =
            !probe.ignore && matches!(configuration, MemberConfiguration::AsyncFunction(_));
        let properties = &mut self.mapping.properties;

        match properties.find_by_destination(source_path) {
            Some(entry) => {
                let destination = properties.destination_mut(entry.destination);
                if destination.ignore {
                    return Ok(self);
                }
                if probe.ignore {
                    destination.ignore = true;
                } else {
                    destination
                        .transformations
                        .push(configuration.into_source_member_transformation());
                }
                destination.source_mapping = true;
            }
            None => {
                let transformations = if probe.ignore {
                    Vec::new()
                } else {
                    vec![configuration.into_source_member_transformation()]
                };
                properties.insert(
                    source_path,
                    source_path,
                    PropertySettings {
                        transformations,
                        ignore: probe.ignore,
                        condition: None,
                        source_mapping: true,
                    },
                )?;
            }
        }

        if is_async {
            self.mapping.is_async = true;
        }

        debug!(
            mapping = %self.mapping.key,
            source = source_path,
            is_async,
            "Configured source member"
        );
        Ok(self)
    }

    /// Append a hook receiving `(destination object, property name, value)`
    /// for every resolved property. With hooks present, writing the value is
    /// up to the hooks.
    pub fn for_all_members<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut Value, &str, &Value) + Send + Sync + 'static,
    {
        self.mapping
            .for_all_member_mappings
            .push(std::sync::Arc::new(hook));
        self
    }

    /// Only map explicitly configured members
    pub fn ignore_all_non_existing(&mut self) -> &mut Self {
        self.mapping.ignore_all_non_existing = true;
        self
    }

    /// Instantiate destinations from `class`
    pub fn convert_to_type(&mut self, class: TypeClass) -> MappingResult<&mut Self> {
        if self.mapping.destination_type_class.is_some() {
            return Err(MappingError::configuration(
                "Destination type class can only be set once.",
            ));
        }
        debug!(mapping = %self.mapping.key, class = class.name(), "Set destination type class");
        self.mapping.destination_type_class = Some(class);
        Ok(self)
    }

    /// Replace per-member mapping by a whole-object converter
    pub fn convert_using(&mut self, converter: ConvertUsing) -> MappingResult<&mut Self> {
        let converter = converter.resolve()?;
        if converter.is_async() {
            self.mapping.is_async = true;
        }
        debug!(
            mapping = %self.mapping.key,
            is_async = converter.is_async(),
            "Set type converter"
        );
        self.mapping.type_converter_function = Some(converter);
        Ok(self)
    }

    /// Attach a registered profile and merge its scoped configuration
    pub fn with_profile(&mut self, profile_name: &str) -> MappingResult<&mut Self> {
        let profile = self
            .profiles
            .and_then(|profiles| profiles.get(profile_name))
            .filter(|profile| profile.name() == profile_name)
            .ok_or_else(|| {
                MappingError::configuration(format!(
                    "Could not find profile with profile name '{}'.",
                    profile_name
                ))
            })?;

        apply_profile(self.mapping, profile)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member;
    use crate::transformation::{TransformationKind, async_member};
    use serde_json::json;

    fn kinds(mapping: &Mapping, destination_path: &str) -> Vec<TransformationKind> {
        let entry = mapping.properties().find_by_destination(destination_path).unwrap();
        mapping
            .properties()
            .destination(entry.destination)
            .transformations()
            .iter()
            .map(|step| step.kind())
            .collect()
    }

    #[test]
    fn test_for_member_stacks_steps() {
        let mut mapping = Mapping::new("a", "b", "ab");
        let mut builder = MappingBuilder::new(&mut mapping, None);
        builder
            .for_member("name", "fixed")
            .unwrap()
            .for_member("name", member(|opts| opts.intermediate_property_value().cloned()))
            .unwrap();

        assert_eq!(
            kinds(&mapping, "name"),
            vec![TransformationKind::Constant, TransformationKind::MemberOptions]
        );
    }

    #[test]
    fn test_for_member_ignore_is_final() {
        let mut mapping = Mapping::new("a", "b", "ab");
        let mut builder = MappingBuilder::new(&mut mapping, None);
        builder
            .for_member("secret", member(|opts| {
                opts.ignore();
                None
            }))
            .unwrap()
            .for_member("secret", "leaked")
            .unwrap();

        let entry = mapping.properties().find_by_destination("secret").unwrap();
        let destination = mapping.properties().destination(entry.destination);
        assert!(destination.is_ignored());
        assert!(destination.transformations().is_empty());
    }

    #[test]
    fn test_for_member_rebases_on_map_from() {
        let mut mapping = Mapping::new("a", "b", "ab");
        let mut builder = MappingBuilder::new(&mut mapping, None);
        builder
            .for_member("dst", member(|opts| opts.intermediate_property_value().cloned()))
            .unwrap()
            .for_member("dst", member(|opts| opts.map_from("other")))
            .unwrap();

        let entry = mapping.properties().find_by_destination("dst").unwrap();
        assert_eq!(mapping.properties().source(entry.source).full_source_path(), "other");
        assert_eq!(kinds(&mapping, "dst").len(), 2);
        assert!(!mapping.properties().has_root("dst"));
    }

    #[test]
    fn test_for_member_async_marks_mapping() {
        let mut mapping = Mapping::new("a", "b", "ab");
        MappingBuilder::new(&mut mapping, None)
            .for_member("late", async_member(|_, done| done.complete(json!(1))))
            .unwrap();
        assert!(mapping.is_async());
    }

    #[test]
    fn test_panicking_member_is_still_registered() {
        let mut mapping = Mapping::new("a", "b", "ab");
        MappingBuilder::new(&mut mapping, None)
            .for_member("total", member(|opts| {
                let amount = opts.source_object().and_then(|source| source.get("amount"));
                Some(amount.cloned().expect("no source while configuring"))
            }))
            .unwrap();
        assert_eq!(kinds(&mapping, "total"), vec![TransformationKind::MemberOptions]);
    }

    #[test]
    fn test_ignoring_async_member_stays_sync() {
        let mut mapping = Mapping::new("a", "b", "ab");
        MappingBuilder::new(&mut mapping, None)
            .for_member("hidden", async_member(|mut opts, done| {
                opts.ignore();
                done.skip();
            }))
            .unwrap()
            .for_source_member("secret", async_member(|mut opts, done| {
                opts.ignore();
                done.skip();
            }))
            .unwrap();
        assert!(!mapping.is_async());
    }

    #[test]
    fn test_for_source_member_requires_function() {
        let mut mapping = Mapping::new("a", "b", "ab");
        let err = MappingBuilder::new(&mut mapping, None)
            .for_source_member("x", 42)
            .err()
            .unwrap();
        assert!(matches!(err, MappingError::Configuration(_)));
        assert!(
            err.to_string()
                .starts_with("Configuration of forSourceMember has to be a function")
        );
    }

    #[test]
    fn test_for_source_member_marks_source_mapping() {
        let mut mapping = Mapping::new("a", "b", "ab");
        MappingBuilder::new(&mut mapping, None)
            .for_source_member("code", member(|opts| opts.intermediate_property_value().cloned()))
            .unwrap();

        let entry = mapping.properties().find_by_destination("code").unwrap();
        assert!(mapping.properties().destination(entry.destination).is_source_mapping());
    }

    #[test]
    fn test_convert_to_type_only_once() {
        let mut mapping = Mapping::new("a", "b", "ab");
        let mut builder = MappingBuilder::new(&mut mapping, None);
        builder
            .convert_to_type(TypeClass::new("B", || json!({})))
            .unwrap();
        let err = builder
            .convert_to_type(TypeClass::new("B", || json!({})))
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "Destination type class can only be set once.");
    }

    #[test]
    fn test_with_unknown_profile() {
        let mut mapping = Mapping::new("a", "b", "ab");
        let profiles = ProfileRegistry::new();
        let err = MappingBuilder::new(&mut mapping, Some(&profiles))
            .with_profile("missing")
            .err()
            .unwrap();
        assert_eq!(
            err.to_string(),
            "Could not find profile with profile name 'missing'."
        );
    }
}
