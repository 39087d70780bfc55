//! Partial-argument forms of `create_map`, `map` and `map_async`
//!
//! Each intermediate value holds the arguments given so far and offers the
//! call that supplies the rest:
//!
//! ```ignore
//! mapper.partial_create_map("Person").to("PersonDto");
//! let to_dto = mapper.partial_map("Person").to("PersonDto");
//! let dto = to_dto.map(&person)?;
//! ```

use serde_json::Value;

use crate::builder::MappingBuilder;
use crate::error::MappingResult;
use crate::mapper::Mapper;
use crate::types::TypeKey;

/// `create_map` awaiting its destination
#[derive(Debug)]
pub struct PartialCreateMap<'a> {
    mapper: &'a mut Mapper,
    source: TypeKey,
}

impl<'a> PartialCreateMap<'a> {
    pub fn to(self, destination: impl Into<TypeKey>) -> MappingBuilder<'a> {
        self.mapper.create_map(self.source, destination)
    }
}

/// `map` / `map_async` awaiting the destination
#[derive(Debug, Clone)]
pub struct PartialMap<'a> {
    mapper: &'a Mapper,
    source: TypeKey,
}

impl<'a> PartialMap<'a> {
    pub fn to(self, destination: impl Into<TypeKey>) -> BoundMap<'a> {
        BoundMap {
            mapper: self.mapper,
            source: self.source,
            destination: destination.into(),
        }
    }
}

/// `map` / `map_async` awaiting the source value
#[derive(Debug, Clone)]
pub struct BoundMap<'a> {
    mapper: &'a Mapper,
    source: TypeKey,
    destination: TypeKey,
}

impl BoundMap<'_> {
    pub fn map(&self, source_value: &Value) -> MappingResult<Value> {
        self.mapper
            .map(self.source.clone(), self.destination.clone(), source_value)
    }

    pub fn map_async<F>(&self, source_value: Value, callback: F) -> MappingResult<()>
    where
        F: FnOnce(MappingResult<Value>) + Send + 'static,
    {
        self.mapper.map_async(
            self.source.clone(),
            self.destination.clone(),
            source_value,
            callback,
        )
    }

    pub async fn map_future(&self, source_value: Value) -> MappingResult<Value> {
        self.mapper
            .map_future(self.source.clone(), self.destination.clone(), source_value)
            .await
    }
}

impl Mapper {
    /// `create_map` with only the source given
    pub fn partial_create_map(&mut self, source: impl Into<TypeKey>) -> PartialCreateMap<'_> {
        PartialCreateMap {
            mapper: self,
            source: source.into(),
        }
    }

    /// `map` / `map_async` with only the source given
    pub fn partial_map(&self, source: impl Into<TypeKey>) -> PartialMap<'_> {
        PartialMap {
            mapper: self,
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_partial_forms_match_full_calls() {
        let mut mapper = Mapper::new();
        mapper
            .partial_create_map("a")
            .to("b")
            .for_member("kind", "b")
            .unwrap();

        let source = json!({"id": 1});
        let full = mapper.map("a", "b", &source).unwrap();
        let to_b = mapper.partial_map("a").to("b");
        assert_eq!(to_b.map(&source).unwrap(), full);
        assert_eq!(full, json!({"id": 1, "kind": "b"}));
    }

    #[test]
    fn test_partial_map_async() {
        let mut mapper = Mapper::new();
        mapper.create_map("a", "b");

        let received = Arc::new(Mutex::new(None));
        let sink = received.clone();
        mapper
            .partial_map("a")
            .to("b")
            .map_async(json!({"x": 1}), move |result| {
                *sink.lock().unwrap() = Some(result.unwrap());
            })
            .unwrap();

        assert_eq!(*received.lock().unwrap(), Some(json!({"x": 1})));
    }

    #[test]
    fn test_partial_map_unknown_pair() {
        let mapper = Mapper::new();
        assert!(mapper.partial_map("x").to("y").map(&json!({})).is_err());
    }
}
