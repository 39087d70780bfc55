//! AutoMapper - convention-based object-to-object mapping
//!
//! Provides:
//! - Fluent mapping configuration (`for_member`, `for_source_member`, converters, profiles)
//! - Automatic copying of same-named members, with naming convention translation
//! - Synchronous and callback-based asynchronous mapping engines
//! - Structural validation of registered mappings

pub mod builder;
pub mod config;
mod engine;
pub mod error;
pub mod mapper;
pub mod mapping;
pub mod naming;
pub mod options;
pub mod partial;
mod path;
pub mod profile;
pub mod property_tree;
pub mod registry;
pub mod transformation;
pub mod types;
pub mod validation;

pub use builder::MappingBuilder;
pub use config::MapperConfig;
pub use error::{MappingError, MappingResult};
pub use mapper::Mapper;
pub use mapping::{ConvertUsing, Mapping, ResolutionContext, TypeConverter, TypeConverterFunction};
pub use naming::{CamelCaseNamingConvention, NamingConvention, PascalCaseNamingConvention};
pub use options::{Completion, MemberOptions};
pub use partial::{BoundMap, PartialCreateMap, PartialMap};
pub use profile::Profile;
pub use property_tree::{DestinationProperty, PropertyEntry, PropertyTree, SourceProperty};
pub use registry::MappingRegistry;
pub use transformation::{
    MemberConfiguration, Transformation, TransformationKind, async_member, member,
};
pub use types::{TypeClass, TypeKey};
pub use validation::MappingValidator;
