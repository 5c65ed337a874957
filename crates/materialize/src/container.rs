//! Relation containers - ordered, owner-tagged collections of related instances

use serde_json::Value as JsonValue;
use std::ops::Deref;

use crate::instance::{InstanceId, ModelInstance};

/// Materialized members of a collection relation.
///
/// `owner` identifies the instance the collection belongs to. It is a plain
/// identifier, so the container never keeps its owner alive.
#[derive(Debug, Clone)]
pub struct RelationContainer {
    owner: InstanceId,
    items: Vec<ModelInstance>,
}

impl RelationContainer {
    pub fn new(owner: InstanceId, items: Vec<ModelInstance>) -> Self {
        Self { owner, items }
    }

    /// An empty collection owned by `owner`
    pub fn empty(owner: InstanceId) -> Self {
        Self::new(owner, Vec::new())
    }

    pub fn owner(&self) -> InstanceId {
        self.owner
    }

    /// Whether `instance` owns this collection
    pub fn is_owned_by(&self, instance: &ModelInstance) -> bool {
        self.owner == instance.id()
    }

    pub fn push(&mut self, item: ModelInstance) {
        self.items.push(item);
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut ModelInstance> {
        self.items.get_mut(index)
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, ModelInstance> {
        self.items.iter_mut()
    }

    pub fn into_vec(self) -> Vec<ModelInstance> {
        self.items
    }

    /// JSON array of the members
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Array(self.items.iter().map(ModelInstance::to_json).collect())
    }
}

impl Deref for RelationContainer {
    type Target = [ModelInstance];

    fn deref(&self) -> &Self::Target {
        &self.items
    }
}

impl<'a> IntoIterator for &'a RelationContainer {
    type Item = &'a ModelInstance;
    type IntoIter = std::slice::Iter<'a, ModelInstance>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl IntoIterator for RelationContainer {
    type Item = ModelInstance;
    type IntoIter = std::vec::IntoIter<ModelInstance>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
