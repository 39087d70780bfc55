//! Mapper facade: registration, profiles, mapping entry points and validation
//!
//! A [`Mapper`] owns its registry; there is no global instance. Configuration
//! takes `&mut self` and mapping takes `&self`, so a host that shares one
//! mapper across threads wraps it itself, e.g. in `Arc<RwLock<Mapper>>`.

use std::fmt;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, debug_span};

use crate::builder::MappingBuilder;
use crate::config::MapperConfig;
use crate::engine::{EngineContext, asynchronous, sync};
use crate::error::{MappingError, MappingResult};
use crate::mapping::Mapping;
use crate::profile::{Profile, ProfileRegistry};
use crate::registry::{MappingRegistry, mapping_key};
use crate::types::TypeKey;
use crate::validation::MappingValidator;

/// Object-to-object mapper
pub struct Mapper {
    config: MapperConfig,
    registry: MappingRegistry,
    profiles: ProfileRegistry,
    implicit: RwLock<MappingRegistry>,
}

impl Mapper {
    pub fn new() -> Self {
        Self::with_config(MapperConfig::default())
    }

    pub fn with_config(config: MapperConfig) -> Self {
        Self {
            config,
            registry: MappingRegistry::new(),
            profiles: ProfileRegistry::new(),
            implicit: RwLock::new(MappingRegistry::new()),
        }
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Explicitly registered mappings
    pub fn mappings(&self) -> &MappingRegistry {
        &self.registry
    }

    /// Register a mapping from `source` to `destination`, replacing any
    /// earlier registration of the same pair
    pub fn create_map(
        &mut self,
        source: impl Into<TypeKey>,
        destination: impl Into<TypeKey>,
    ) -> MappingBuilder<'_> {
        let source = source.into();
        let destination = destination.into();
        let key = mapping_key(source.name(), destination.name());
        debug!(key = %key, "Creating mapping");

        let mapping = self.registry.register(
            key,
            &source,
            &destination,
            self.config.ignore_all_non_existing,
        );
        MappingBuilder::new(mapping, Some(&self.profiles))
    }

    /// Register a profile under its name
    pub fn add_profile(&mut self, profile: Profile) -> &mut Self {
        debug!(profile = profile.name(), "Adding profile");
        self.profiles
            .insert(profile.name().to_string(), Arc::new(profile));
        self
    }

    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name).map(|profile| profile.as_ref())
    }

    /// Run a bulk configuration function against this mapper
    pub fn initialize<F>(&mut self, configure: F) -> MappingResult<&mut Self>
    where
        F: FnOnce(&mut Mapper) -> MappingResult<()>,
    {
        configure(self)?;
        debug!(
            mappings = self.registry.len(),
            profiles = self.profiles.len(),
            "Mapper initialized"
        );
        Ok(self)
    }

    pub fn has_mapping(&self, source: impl Into<TypeKey>, destination: impl Into<TypeKey>) -> bool {
        self.mapping(source, destination).is_some()
    }

    pub fn mapping(
        &self,
        source: impl Into<TypeKey>,
        destination: impl Into<TypeKey>,
    ) -> Option<&Mapping> {
        let source = source.into();
        let destination = destination.into();
        self.registry.get(&mapping_key(source.name(), destination.name()))
    }

    fn lookup(&self, source: TypeKey, destination: TypeKey) -> MappingResult<&Mapping> {
        self.registry
            .get(&mapping_key(source.name(), destination.name()))
            .ok_or_else(|| MappingError::lookup(source.name(), destination.name()))
    }

    fn context(&self) -> EngineContext<'_> {
        EngineContext {
            registry: &self.registry,
            implicit: &self.implicit,
            config: &self.config,
        }
    }

    /// Map `source_value` synchronously
    pub fn map(
        &self,
        source: impl Into<TypeKey>,
        destination: impl Into<TypeKey>,
        source_value: &Value,
    ) -> MappingResult<Value> {
        let mapping = self.lookup(source.into(), destination.into())?;
        if mapping.is_async() {
            return Err(MappingError::Mode);
        }

        let _span = debug_span!("map", key = %mapping.key()).entered();
        sync::map_value(&self.context(), mapping, source_value, 0)
    }

    /// Map `source_value`, delivering the result to `callback` exactly once.
    ///
    /// An unknown key pair fails here, before any work starts. Failures of
    /// asynchronous steps arrive through the callback.
    pub fn map_async<F>(
        &self,
        source: impl Into<TypeKey>,
        destination: impl Into<TypeKey>,
        source_value: Value,
        callback: F,
    ) -> MappingResult<()>
    where
        F: FnOnce(MappingResult<Value>) + Send + 'static,
    {
        let mapping = self.lookup(source.into(), destination.into())?;
        debug!(key = %mapping.key(), "Dispatching asynchronous mapping");
        asynchronous::map_value(&self.context(), mapping, source_value, 0, Box::new(callback));
        Ok(())
    }

    /// [`map_async`](Self::map_async) as a future
    pub async fn map_future(
        &self,
        source: impl Into<TypeKey>,
        destination: impl Into<TypeKey>,
        source_value: Value,
    ) -> MappingResult<Value> {
        let (sender, receiver) = oneshot::channel();
        self.map_async(source, destination, source_value, move |result| {
            let _ = sender.send(result);
        })?;
        receiver.await.map_err(|_| MappingError::CompletionLost)?
    }

    /// Map between serializable types through their JSON representation
    pub fn map_into<S, D>(
        &self,
        source: impl Into<TypeKey>,
        destination: impl Into<TypeKey>,
        source_value: &S,
    ) -> MappingResult<D>
    where
        S: Serialize,
        D: DeserializeOwned,
    {
        let source_value = serde_json::to_value(source_value)?;
        let mapped = self.map(source, destination, &source_value)?;
        Ok(serde_json::from_value(mapped)?)
    }

    /// Validate every registered mapping
    pub fn assert_configuration_is_valid(&self, strict: bool) -> MappingResult<()> {
        MappingValidator::new(strict).validate(&self.registry)
    }
}

impl Default for Mapper {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper")
            .field("config", &self.config)
            .field("mappings", &self.registry.len())
            .field("profiles", &self.profiles.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member;
    use serde_json::json;

    #[test]
    fn test_mapper_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Mapper>();
    }

    #[test]
    fn test_lookup_error_names_both_keys() {
        let mapper = Mapper::new();
        let err = mapper.map("Person", "PersonDto", &json!({})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Could not find mapping with a source of Person and a destination of PersonDto"
        );
    }

    #[test]
    fn test_config_default_applies_to_new_mappings() {
        let mut mapper = Mapper::with_config(MapperConfig::new().with_ignore_all_non_existing(true));
        mapper
            .create_map("a", "b")
            .for_member("id", member(|opts| opts.map_from("key")))
            .unwrap();

        let result = mapper.map("a", "b", &json!({"key": 7, "other": 1})).unwrap();
        assert_eq!(result, json!({"id": 7}));
    }

    #[test]
    fn test_initialize_registers_profiles_and_maps() {
        let mut mapper = Mapper::new();
        mapper
            .initialize(|cfg| {
                cfg.add_profile(Profile::new("api"));
                cfg.create_map("a", "b").with_profile("api")?;
                Ok(())
            })
            .unwrap();

        assert!(mapper.has_mapping("a", "b"));
        assert!(mapper.profile("api").is_some());
        assert_eq!(mapper.mapping("a", "b").unwrap().profile().unwrap().name(), "api");
    }

    #[test]
    fn test_map_into_typed() {
        #[derive(serde::Serialize)]
        struct Person {
            name: String,
            age: u32,
        }

        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct PersonDto {
            name: String,
            adult: bool,
        }

        let mut mapper = Mapper::new();
        mapper
            .create_map("Person", "PersonDto")
            .for_member(
                "adult",
                member(|opts| {
                    let age = opts.source_object()?.get("age")?.as_u64()?;
                    Some(json!(age >= 18))
                }),
            )
            .unwrap()
            .for_member("age", member(|opts| {
                opts.ignore();
                None
            }))
            .unwrap();

        let dto: PersonDto = mapper
            .map_into(
                "Person",
                "PersonDto",
                &Person {
                    name: "Ada".to_string(),
                    age: 36,
                },
            )
            .unwrap();
        assert_eq!(
            dto,
            PersonDto {
                name: "Ada".to_string(),
                adult: true
            }
        );
    }
}
