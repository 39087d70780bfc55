//! Profiles: named naming conventions plus their own mapping registrations

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::builder::MappingBuilder;
use crate::error::MappingResult;
use crate::mapping::Mapping;
use crate::naming::NamingConvention;
use crate::registry::{MappingRegistry, profile_mapping_key};
use crate::types::TypeKey;

/// Registered profiles by name
pub(crate) type ProfileRegistry = BTreeMap<String, Arc<Profile>>;

/// A named bundle of naming conventions and scoped mappings.
///
/// Mappings created on a profile are merged into a consuming mapping when it
/// calls `with_profile` with this profile's name.
#[derive(Clone)]
pub struct Profile {
    name: String,
    source_member_naming_convention: Option<Arc<dyn NamingConvention>>,
    destination_member_naming_convention: Option<Arc<dyn NamingConvention>>,
    mappings: MappingRegistry,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_member_naming_convention: None,
            destination_member_naming_convention: None,
            mappings: MappingRegistry::new(),
        }
    }

    pub fn with_source_member_naming_convention<C>(mut self, convention: C) -> Self
    where
        C: NamingConvention + 'static,
    {
        self.source_member_naming_convention = Some(Arc::new(convention));
        self
    }

    pub fn with_destination_member_naming_convention<C>(mut self, convention: C) -> Self
    where
        C: NamingConvention + 'static,
    {
        self.destination_member_naming_convention = Some(Arc::new(convention));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_member_naming_convention(&self) -> Option<&dyn NamingConvention> {
        self.source_member_naming_convention.as_deref()
    }

    pub fn destination_member_naming_convention(&self) -> Option<&dyn NamingConvention> {
        self.destination_member_naming_convention.as_deref()
    }

    /// Mappings registered on this profile
    pub fn mappings(&self) -> &MappingRegistry {
        &self.mappings
    }

    /// Register a profile-scoped mapping
    pub fn create_map(
        &mut self,
        source: impl Into<TypeKey>,
        destination: impl Into<TypeKey>,
    ) -> MappingBuilder<'_> {
        let source = source.into();
        let destination = destination.into();
        let key = profile_mapping_key(&self.name, source.name(), destination.name());
        let mapping = self.mappings.register(key, &source, &destination, false);
        MappingBuilder::new(mapping, None)
    }
}

impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profile")
            .field("name", &self.name)
            .field(
                "source_member_naming_convention",
                &self.source_member_naming_convention,
            )
            .field(
                "destination_member_naming_convention",
                &self.destination_member_naming_convention,
            )
            .field("mappings", &self.mappings.len())
            .finish()
    }
}

/// Attach `profile` to `mapping` and merge the profile's registration for the
/// same key pair: hooks are appended, converter and destination class are
/// overwritten when the profile defines them, properties replace those with
/// the same destination path.
pub(crate) fn apply_profile(mapping: &mut Mapping, profile: &Arc<Profile>) -> MappingResult<()> {
    mapping.profile = Some(profile.clone());

    let key = profile_mapping_key(profile.name(), &mapping.source_key, &mapping.destination_key);
    let Some(scoped) = profile.mappings.get(&key) else {
        tracing::debug!(
            profile = profile.name(),
            mapping = %mapping.key,
            "Profile has no scoped mapping to merge"
        );
        return Ok(());
    };

    mapping
        .for_all_member_mappings
        .extend(scoped.for_all_member_mappings.iter().cloned());

    if let Some(converter) = &scoped.type_converter_function {
        mapping.type_converter_function = Some(converter.clone());
    }
    if let Some(class) = &scoped.destination_type_class {
        mapping.destination_type_class = Some(class.clone());
    }
    mapping.ignore_all_non_existing |= scoped.ignore_all_non_existing;
    mapping.is_async |= scoped.is_async;

    let entries = scoped.properties.entries();
    for entry in &entries {
        let destination_path = scoped
            .properties
            .destination(entry.destination)
            .full_destination_path();
        mapping.properties.remove_destination(destination_path);
        mapping.properties.adopt(&scoped.properties, *entry)?;
    }

    tracing::debug!(
        profile = profile.name(),
        mapping = %mapping.key,
        properties = entries.len(),
        "Merged profile mapping"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::{CamelCaseNamingConvention, PascalCaseNamingConvention};
    use crate::registry::mapping_key;
    use serde_json::json;

    #[test]
    fn test_profile_registers_prefixed_keys() {
        let mut profile = Profile::new("api");
        profile.create_map("Person", "PersonDto").ignore_all_non_existing();

        assert!(profile.mappings().contains("api=>Personapi=>PersonDto"));
        assert!(!profile.mappings().contains("PersonPersonDto"));
    }

    #[test]
    fn test_apply_profile_merges_scoped_mapping() {
        let mut profile = Profile::new("api")
            .with_source_member_naming_convention(PascalCaseNamingConvention)
            .with_destination_member_naming_convention(CamelCaseNamingConvention);
        profile
            .create_map("Person", "PersonDto")
            .for_member("status", "active")
            .unwrap()
            .for_all_members(|destination, name, value| {
                destination[name] = value.clone();
            });
        let profile = Arc::new(profile);

        let mut mapping = Mapping::new("Person", "PersonDto", mapping_key("Person", "PersonDto"));
        apply_profile(&mut mapping, &profile).unwrap();

        assert_eq!(mapping.profile().unwrap().name(), "api");
        assert_eq!(mapping.for_all_member_mappings().len(), 1);
        assert!(mapping.properties().has_destination("status"));
        assert_eq!(mapping.destination_member_name("FullName"), "fullName");

        let entry = mapping.properties().find_by_destination("status").unwrap();
        let transformations = mapping.properties().destination(entry.destination).transformations();
        assert!(matches!(
            &transformations[0],
            crate::transformation::Transformation::Constant(value) if *value == json!("active")
        ));
    }

    #[test]
    fn test_apply_profile_without_scoped_mapping() {
        let profile = Arc::new(Profile::new("empty"));
        let mut mapping = Mapping::new("a", "b", "ab");
        apply_profile(&mut mapping, &profile).unwrap();
        assert!(mapping.profile().is_some());
        assert!(mapping.properties().is_empty());
    }
}
