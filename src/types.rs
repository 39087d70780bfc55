//! Type identities used as mapping keys and instance constructors

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

type Factory = Arc<dyn Fn() -> Value + Send + Sync>;

/// A named constructor for source or destination instances.
///
/// The factory produces a fresh instance holding every member of the type with
/// its default value. Member classes describe nested members that are instances
/// of another class rather than plain objects.
#[derive(Clone)]
pub struct TypeClass {
    name: String,
    factory: Factory,
    member_classes: BTreeMap<String, TypeClass>,
}

impl TypeClass {
    /// Create a class from a name and a zero-argument factory
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Arc::new(factory),
            member_classes: BTreeMap::new(),
        }
    }

    /// Derive a class from a Rust type: the name comes from the type name and
    /// instances are the serialized `T::default()`
    pub fn of<T>() -> Self
    where
        T: Default + Serialize + 'static,
    {
        Self::new(type_name_of::<T>(), || {
            serde_json::to_value(T::default()).unwrap_or_else(|_| Value::Object(Map::new()))
        })
    }

    /// Declare the class of a nested member
    pub fn with_member_class(mut self, member: impl Into<String>, class: TypeClass) -> Self {
        self.member_classes.insert(member.into(), class);
        self
    }

    /// Class name, used as mapping key
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Construct a fresh instance
    pub fn instantiate(&self) -> Value {
        (self.factory)()
    }

    /// Class declared for a nested member, if any
    pub fn member_class(&self, member: &str) -> Option<&TypeClass> {
        self.member_classes.get(member)
    }
}

impl fmt::Debug for TypeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeClass")
            .field("name", &self.name)
            .field("member_classes", &self.member_classes.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Identifier of one side of a mapping: a bare name or a class
#[derive(Debug, Clone)]
pub enum TypeKey {
    Name(String),
    Class(TypeClass),
}

impl TypeKey {
    /// Name used in the registry key
    pub fn name(&self) -> &str {
        match self {
            TypeKey::Name(name) => name,
            TypeKey::Class(class) => class.name(),
        }
    }

    /// Class, when the key was given as one
    pub fn class(&self) -> Option<&TypeClass> {
        match self {
            TypeKey::Name(_) => None,
            TypeKey::Class(class) => Some(class),
        }
    }
}

impl From<&str> for TypeKey {
    fn from(name: &str) -> Self {
        TypeKey::Name(name.to_string())
    }
}

impl From<String> for TypeKey {
    fn from(name: String) -> Self {
        TypeKey::Name(name)
    }
}

impl From<&String> for TypeKey {
    fn from(name: &String) -> Self {
        TypeKey::Name(name.clone())
    }
}

impl From<TypeClass> for TypeKey {
    fn from(class: TypeClass) -> Self {
        TypeKey::Class(class)
    }
}

impl From<&TypeClass> for TypeKey {
    fn from(class: &TypeClass) -> Self {
        TypeKey::Class(class.clone())
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Short name of a Rust type: module path and generic arguments are dropped
pub fn type_name_of<T: ?Sized>() -> String {
    short_type_name(std::any::type_name::<T>())
}

/// Reduce a fully qualified type name to its last path segment
pub fn short_type_name(full: &str) -> String {
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default, Serialize)]
    struct Person {
        name: String,
        age: u32,
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("app::model::Person"), "Person");
        assert_eq!(short_type_name("app::model::Wrapper<app::Inner>"), "Wrapper");
        assert_eq!(short_type_name("Plain"), "Plain");
    }

    #[test]
    fn test_class_of_rust_type() {
        let class = TypeClass::of::<Person>();
        assert_eq!(class.name(), "Person");
        assert_eq!(class.instantiate(), json!({"name": "", "age": 0}));
    }

    #[test]
    fn test_member_class() {
        let address = TypeClass::new("Address", || json!({"city": null}));
        let person = TypeClass::new("Person", || json!({"address": null}))
            .with_member_class("address", address);

        assert_eq!(person.member_class("address").unwrap().name(), "Address");
        assert!(person.member_class("name").is_none());
    }

    #[test]
    fn test_type_key_names() {
        let key: TypeKey = "source".into();
        assert_eq!(key.name(), "source");
        assert!(key.class().is_none());

        let key: TypeKey = TypeClass::of::<Person>().into();
        assert_eq!(key.to_string(), "Person");
        assert!(key.class().is_some());
    }
}
