//! Registered mapping records and whole-object converters

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{MappingError, MappingResult};
use crate::naming::translate_member_name;
use crate::options::Completion;
use crate::profile::Profile;
use crate::property_tree::PropertyTree;
use crate::types::TypeClass;

/// Global hook receiving `(destination object, property name, value)` for every
/// resolved property
pub type ForAllMembersFn = Arc<dyn Fn(&mut Value, &str, &Value) + Send + Sync>;

/// Input of a whole-object converter
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    pub source_value: Value,
    pub destination_value: Value,
    pub source_type_class: Option<TypeClass>,
    pub destination_type_class: Option<TypeClass>,
}

/// Converter turning a whole source object into a destination object
pub trait TypeConverter: Send + Sync {
    fn convert(&self, context: &ResolutionContext) -> Value;
}

/// Argument of `convert_using`
#[derive(Clone)]
pub enum ConvertUsing {
    /// Synchronous `(context) -> result` function
    Function(Arc<dyn Fn(&ResolutionContext) -> Value + Send + Sync>),
    /// Asynchronous `(context, completion)` function
    AsyncFunction(Arc<dyn Fn(ResolutionContext, Completion) + Send + Sync>),
    /// Already constructed converter
    Instance(Arc<dyn TypeConverter>),
    /// Converter class constructed at registration
    Class {
        name: String,
        construct: Arc<dyn Fn() -> Result<Arc<dyn TypeConverter>, String> + Send + Sync>,
    },
}

impl ConvertUsing {
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&ResolutionContext) -> Value + Send + Sync + 'static,
    {
        ConvertUsing::Function(Arc::new(f))
    }

    pub fn async_function<F>(f: F) -> Self
    where
        F: Fn(ResolutionContext, Completion) + Send + Sync + 'static,
    {
        ConvertUsing::AsyncFunction(Arc::new(f))
    }

    pub fn instance<C>(converter: C) -> Self
    where
        C: TypeConverter + 'static,
    {
        ConvertUsing::Instance(Arc::new(converter))
    }

    /// Zero-argument constructible converter class
    pub fn class<C>() -> Self
    where
        C: TypeConverter + Default + 'static,
    {
        ConvertUsing::Class {
            name: crate::types::type_name_of::<C>(),
            construct: Arc::new(|| Ok::<_, String>(Arc::new(C::default()) as Arc<dyn TypeConverter>)),
        }
    }

    /// Converter class with a fallible constructor
    pub fn factory<F>(name: impl Into<String>, construct: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn TypeConverter>, String> + Send + Sync + 'static,
    {
        ConvertUsing::Class {
            name: name.into(),
            construct: Arc::new(construct),
        }
    }

    pub(crate) fn resolve(self) -> MappingResult<TypeConverterFunction> {
        match self {
            ConvertUsing::Function(f) => Ok(TypeConverterFunction::Sync(f)),
            ConvertUsing::AsyncFunction(f) => Ok(TypeConverterFunction::Async(f)),
            ConvertUsing::Instance(converter) => Ok(from_converter(converter)),
            ConvertUsing::Class { name, construct } => match construct() {
                Ok(converter) => Ok(from_converter(converter)),
                Err(reason) => Err(MappingError::configuration(format!(
                    "The value '{}' provided for typeConverterClassOrFunction is invalid. \
                     Instantiating it as a type converter class failed: {}",
                    name, reason
                ))),
            },
        }
    }
}

impl fmt::Debug for ConvertUsing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertUsing::Function(_) => f.write_str("Function"),
            ConvertUsing::AsyncFunction(_) => f.write_str("AsyncFunction"),
            ConvertUsing::Instance(_) => f.write_str("Instance"),
            ConvertUsing::Class { name, .. } => f.debug_struct("Class").field("name", name).finish(),
        }
    }
}

fn from_converter(converter: Arc<dyn TypeConverter>) -> TypeConverterFunction {
    TypeConverterFunction::Sync(Arc::new(move |context: &ResolutionContext| converter.convert(context)))
}

/// Resolved whole-object converter stored on a mapping
#[derive(Clone)]
pub enum TypeConverterFunction {
    Sync(Arc<dyn Fn(&ResolutionContext) -> Value + Send + Sync>),
    Async(Arc<dyn Fn(ResolutionContext, Completion) + Send + Sync>),
}

impl fmt::Debug for TypeConverterFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeConverterFunction::Sync(_) => f.write_str("Sync"),
            TypeConverterFunction::Async(_) => f.write_str("Async"),
        }
    }
}

impl TypeConverterFunction {
    pub fn is_async(&self) -> bool {
        matches!(self, TypeConverterFunction::Async(_))
    }
}

/// One registered source-to-destination configuration
#[derive(Clone)]
pub struct Mapping {
    pub(crate) source_key: String,
    pub(crate) destination_key: String,
    pub(crate) key: String,
    pub(crate) properties: PropertyTree,
    pub(crate) for_all_member_mappings: Vec<ForAllMembersFn>,
    pub(crate) source_type_class: Option<TypeClass>,
    pub(crate) destination_type_class: Option<TypeClass>,
    pub(crate) type_converter_function: Option<TypeConverterFunction>,
    pub(crate) ignore_all_non_existing: bool,
    pub(crate) profile: Option<Arc<Profile>>,
    pub(crate) is_async: bool,
}

impl Mapping {
    pub(crate) fn new(
        source_key: impl Into<String>,
        destination_key: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            source_key: source_key.into(),
            destination_key: destination_key.into(),
            key: key.into(),
            properties: PropertyTree::new(),
            for_all_member_mappings: Vec::new(),
            source_type_class: None,
            destination_type_class: None,
            type_converter_function: None,
            ignore_all_non_existing: false,
            profile: None,
            is_async: false,
        }
    }

    pub fn source_key(&self) -> &str {
        &self.source_key
    }

    pub fn destination_key(&self) -> &str {
        &self.destination_key
    }

    /// Registry key
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn properties(&self) -> &PropertyTree {
        &self.properties
    }

    pub fn for_all_member_mappings(&self) -> &[ForAllMembersFn] {
        &self.for_all_member_mappings
    }

    pub fn source_type_class(&self) -> Option<&TypeClass> {
        self.source_type_class.as_ref()
    }

    pub fn destination_type_class(&self) -> Option<&TypeClass> {
        self.destination_type_class.as_ref()
    }

    pub fn type_converter_function(&self) -> Option<&TypeConverterFunction> {
        self.type_converter_function.as_ref()
    }

    pub fn ignores_all_non_existing(&self) -> bool {
        self.ignore_all_non_existing
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_deref()
    }

    /// Whether the mapping needs the asynchronous engine
    pub fn is_async(&self) -> bool {
        self.is_async
    }

    /// Destination member name for an auto-mapped source member
    pub fn destination_member_name(&self, source_member: &str) -> String {
        let conventions = self.profile.as_deref().and_then(|profile| {
            Some((
                profile.source_member_naming_convention()?,
                profile.destination_member_naming_convention()?,
            ))
        });

        match conventions {
            Some((source, destination)) => translate_member_name(source_member, source, destination),
            None => source_member.to_string(),
        }
    }

    /// Fresh destination instance
    pub(crate) fn instantiate_destination(&self) -> Value {
        match &self.destination_type_class {
            Some(class) => {
                let instance = class.instantiate();
                if instance.is_object() {
                    instance
                } else {
                    tracing::warn!(
                        class = class.name(),
                        "Type class factory did not produce an object, using an empty object"
                    );
                    Value::Object(serde_json::Map::new())
                }
            }
            None => Value::Object(serde_json::Map::new()),
        }
    }

    pub(crate) fn resolution_context(&self, source_value: Value) -> ResolutionContext {
        ResolutionContext {
            source_value,
            destination_value: self.instantiate_destination(),
            source_type_class: self.source_type_class.clone(),
            destination_type_class: self.destination_type_class.clone(),
        }
    }
}

impl fmt::Debug for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapping")
            .field("key", &self.key)
            .field("source_key", &self.source_key)
            .field("destination_key", &self.destination_key)
            .field("properties", &self.properties)
            .field("for_all_member_mappings", &self.for_all_member_mappings.len())
            .field("source_type_class", &self.source_type_class)
            .field("destination_type_class", &self.destination_type_class)
            .field("type_converter", &self.type_converter_function.is_some())
            .field("ignore_all_non_existing", &self.ignore_all_non_existing)
            .field("profile", &self.profile.as_ref().map(|p| p.name().to_string()))
            .field("is_async", &self.is_async)
            .finish()
    }
}
