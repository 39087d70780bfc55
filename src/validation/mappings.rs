//! Mapping validation
//!
//! Instantiates the source and destination classes of each mapping and checks
//! that both sides agree on which members exist.

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{MappingError, MappingResult};
use crate::mapping::Mapping;
use crate::registry::MappingRegistry;

/// Validator for registered mappings
#[derive(Debug, Clone, Copy, Default)]
pub struct MappingValidator {
    strict: bool,
}

impl MappingValidator {
    /// Create a validator. In strict mode mappings without source or
    /// destination class are errors; otherwise they are skipped.
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Validate every mapping of `registry` in key order, stopping at the
    /// first invalid one
    pub fn validate(&self, registry: &MappingRegistry) -> MappingResult<()> {
        for (_, mapping) in registry.iter() {
            self.validate_mapping(mapping)?;
        }
        info!(mappings = registry.len(), strict = self.strict, "Mapping configuration is valid");
        Ok(())
    }

    /// Validate a single mapping
    pub fn validate_mapping(&self, mapping: &Mapping) -> MappingResult<()> {
        if mapping.type_converter_function().is_some() {
            debug!(mapping = mapping.key(), "Skipping validation of converted mapping");
            return Ok(());
        }

        let (Some(source_class), Some(destination_class)) =
            (mapping.source_type_class(), mapping.destination_type_class())
        else {
            if self.strict {
                return Err(MappingError::Validation(format!(
                    "Mapping '{}' cannot be validated, since mapping.sourceType or mapping.destinationType are unspecified.",
                    mapping.key()
                )));
            }
            debug!(mapping = mapping.key(), "Skipping validation of untyped mapping");
            return Ok(());
        };

        let source = source_class.instantiate();
        let destination = destination_class.instantiate();
        let source_members = member_names(&source);
        let destination_members = member_names(&destination);

        let properties = mapping.properties();
        let mut configured_destinations = BTreeSet::new();

        for entry in properties.entries() {
            let property = properties.destination(entry.destination);
            let source_root = root_segment(property.full_source_path());
            let destination_root = root_segment(property.full_destination_path());
            configured_destinations.insert(destination_root);

            if property.is_source_mapping() {
                if !source_members.contains(source_root) {
                    return Err(invalid(
                        mapping,
                        "configured source member does not exist on the source type",
                        source_root,
                        destination_root,
                    ));
                }
            } else if !property.is_ignored() && !destination_members.contains(destination_root) {
                return Err(invalid(
                    mapping,
                    "configured destination member does not exist on the destination type",
                    source_root,
                    destination_root,
                ));
            }
        }

        let mut produced: BTreeSet<String> = configured_destinations
            .iter()
            .map(|name| name.to_string())
            .collect();
        for name in &source_members {
            if properties.has_root(name) || mapping.ignores_all_non_existing() {
                continue;
            }
            let destination_name = mapping.destination_member_name(name);
            if configured_destinations.contains(destination_name.as_str()) {
                continue;
            }
            if !destination_members.contains(destination_name.as_str()) {
                return Err(invalid(
                    mapping,
                    "source member has no counterpart on the destination type",
                    name,
                    &destination_name,
                ));
            }
            produced.insert(destination_name);
        }

        for name in &destination_members {
            if !produced.contains(*name) {
                return Err(invalid(
                    mapping,
                    "destination member is not mapped from any source member",
                    name,
                    name,
                ));
            }
        }

        debug!(mapping = mapping.key(), "Mapping is valid");
        Ok(())
    }
}

fn member_names(instance: &Value) -> BTreeSet<&str> {
    instance
        .as_object()
        .map(|object| object.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

fn root_segment(path: &str) -> &str {
    path.split('.').next().unwrap_or(path)
}

fn invalid(mapping: &Mapping, reason: &str, source: &str, destination: &str) -> MappingError {
    MappingError::Validation(format!(
        "Mapping '{}=>`{}`' is invalid: {} (source: '{}', destination: '{}').",
        mapping.source_key(),
        mapping.destination_key(),
        reason,
        source,
        destination
    ))
}
