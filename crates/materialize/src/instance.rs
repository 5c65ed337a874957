//! Model instances produced by materialization
//!
//! An instance keeps three kinds of state:
//!
//! - `data`: projected property values
//! - `relations`: relations that have been materialized and attached
//! - `embedded`: raw related payloads found on the input row, waiting to be
//!   materialized by an include (transient; cleared once includes run)

use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::container::RelationContainer;
use crate::filter::Fields;
use crate::metadata::ModelType;
use crate::value::Row;

/// Process-unique handle of an instance, used for owner back-references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(Uuid);

impl InstanceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Options passed to a model factory
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BuildOptions {
    /// Property projection
    pub fields: Option<Fields>,
    /// Run setters (defaults and type coercion) over incoming values
    pub apply_setters: bool,
    /// Data comes from storage rather than user input
    pub persisted: bool,
}

impl BuildOptions {
    /// Options for rows read back from storage: no setters, persisted
    pub fn persisted(fields: Option<Fields>) -> Self {
        Self {
            fields,
            apply_setters: false,
            persisted: true,
        }
    }
}

/// Value of an attached relation
#[derive(Debug, Clone)]
pub enum RelationValue {
    One(Box<ModelInstance>),
    Many(RelationContainer),
}

impl RelationValue {
    pub fn as_one(&self) -> Option<&ModelInstance> {
        match self {
            Self::One(instance) => Some(instance.as_ref()),
            Self::Many(_) => None,
        }
    }

    pub fn as_many(&self) -> Option<&RelationContainer> {
        match self {
            Self::Many(container) => Some(container),
            Self::One(_) => None,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::One(instance) => instance.to_json(),
            Self::Many(container) => container.to_json(),
        }
    }
}

/// Borrowed view of one entry of an instance's visible data
#[derive(Debug, Clone, Copy)]
pub enum Field<'a> {
    Value(&'a JsonValue),
    One(&'a ModelInstance),
    Many(&'a RelationContainer),
}

/// A materialized model instance
#[derive(Debug, Clone)]
pub struct ModelInstance {
    id: InstanceId,
    model: Arc<ModelType>,
    data: Row,
    relations: BTreeMap<String, RelationValue>,
    embedded: BTreeMap<String, JsonValue>,
    persisted: bool,
}

impl ModelInstance {
    /// An empty instance of `model`
    pub fn new(model: Arc<ModelType>, persisted: bool) -> Self {
        Self {
            id: InstanceId::new(),
            model,
            data: Row::new(),
            relations: BTreeMap::new(),
            embedded: BTreeMap::new(),
            persisted,
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn model(&self) -> &Arc<ModelType> {
        &self.model
    }

    pub fn model_name(&self) -> &str {
        &self.model.name
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn is_new(&self) -> bool {
        !self.persisted
    }

    pub fn property(&self, name: &str) -> Option<&JsonValue> {
        self.data.get(name)
    }

    pub fn properties(&self) -> &Row {
        &self.data
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: JsonValue) {
        self.data.insert(name.into(), value);
    }

    pub fn relation(&self, name: &str) -> Option<&RelationValue> {
        self.relations.get(name)
    }

    pub fn relation_mut(&mut self, name: &str) -> Option<&mut RelationValue> {
        self.relations.get_mut(name)
    }

    pub fn relations(&self) -> &BTreeMap<String, RelationValue> {
        &self.relations
    }

    /// Attach a materialized relation, replacing any raw value of the same name
    pub fn attach_relation(&mut self, name: impl Into<String>, value: RelationValue) {
        let name = name.into();
        self.data.remove(&name);
        self.relations.insert(name, value);
    }

    /// Raw related payload carried in on the input row
    pub fn embedded(&self, name: &str) -> Option<&JsonValue> {
        self.embedded.get(name)
    }

    pub fn set_embedded(&mut self, name: impl Into<String>, payload: JsonValue) {
        self.embedded.insert(name.into(), payload);
    }

    pub fn take_embedded(&mut self, name: &str) -> Option<JsonValue> {
        self.embedded.remove(name)
    }

    /// Drop all raw payloads that were not materialized
    pub fn clear_embedded(&mut self) -> usize {
        let dropped = self.embedded.len();
        self.embedded.clear();
        dropped
    }

    /// Remove a key from the visible data, whether property or relation
    pub fn remove(&mut self, name: &str) -> bool {
        let property = self.data.remove(name).is_some();
        let relation = self.relations.remove(name).is_some();
        property || relation
    }

    /// Look up a property or attached relation
    pub fn get(&self, name: &str) -> Option<Field<'_>> {
        if let Some(value) = self.relations.get(name) {
            return Some(match value {
                RelationValue::One(instance) => Field::One(instance.as_ref()),
                RelationValue::Many(container) => Field::Many(container),
            });
        }
        self.data.get(name).map(Field::Value)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.relations.contains_key(name) || self.data.contains_key(name)
    }

    /// Visible keys: properties then attached relations, each sorted
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data
            .keys()
            .map(String::as_str)
            .chain(self.relations.keys().map(String::as_str))
    }

    /// JSON view of the visible data with relations nested
    pub fn to_json(&self) -> JsonValue {
        let mut map = self.data.clone();
        for (name, value) in &self.relations {
            map.insert(name.clone(), value.to_json());
        }
        JsonValue::Object(map)
    }
}
