//! Model Metadata - property, relation and resolver definitions for model types

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{MaterializeError, MaterializeResult};
use crate::filter::Filter;
use crate::value::{Row, RELATION_CACHE_KEY};

/// Whether a relation yields one related model or many
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    Single,
    Collection,
}

/// Defines the type of relationship between models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationType {
    /// One-to-one relationship (hasOne)
    HasOne,
    /// Many-to-one relationship (belongsTo)
    BelongsTo,
    /// Embedded single document
    EmbedsOne,
    /// One-to-many relationship (hasMany)
    HasMany,
    /// One-to-many through an intermediate model
    HasManyThrough,
    /// Many-to-many relationship through a pivot table
    HasAndBelongsToMany,
    /// Array of foreign keys on the owning row
    ReferencesMany,
    /// Embedded list of documents
    EmbedsMany,
}

impl RelationType {
    pub fn cardinality(self) -> Cardinality {
        match self {
            Self::HasOne | Self::BelongsTo | Self::EmbedsOne => Cardinality::Single,
            Self::HasMany
            | Self::HasManyThrough
            | Self::HasAndBelongsToMany
            | Self::ReferencesMany
            | Self::EmbedsMany => Cardinality::Collection,
        }
    }

    /// Returns true if this relationship returns a collection
    pub fn is_collection(self) -> bool {
        self.cardinality() == Cardinality::Collection
    }
}

/// Declared type of a model property, used when setters coerce raw values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    #[default]
    Any,
    String,
    Number,
    Boolean,
    Date,
    Object,
    Array,
}

/// A single declared property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub name: String,
    pub property_type: PropertyType,
    /// Value used for new (non-persisted) instances when the row lacks one
    pub default: Option<JsonValue>,
}

impl PropertyDescriptor {
    pub fn new(name: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            name: name.into(),
            property_type,
            default: None,
        }
    }

    pub fn with_default(mut self, default: JsonValue) -> Self {
        self.default = Some(default);
        self
    }
}

/// Describes one relation owned by a model type
#[derive(Debug, Clone, PartialEq)]
pub struct RelationDescriptor {
    /// Name of the relation (key on the owning model)
    pub name: String,
    pub relation_type: RelationType,
    /// Name of the related model in the registry
    pub target: String,
    /// Filter for unscoped includes, used only when the materializer opts in
    pub default_scope: Option<Filter>,
}

impl RelationDescriptor {
    pub fn new(
        name: impl Into<String>,
        relation_type: RelationType,
        target: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            relation_type,
            target: target.into(),
            default_scope: None,
        }
    }

    pub fn has_one(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, RelationType::HasOne, target)
    }

    pub fn belongs_to(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, RelationType::BelongsTo, target)
    }

    pub fn has_many(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, RelationType::HasMany, target)
    }

    pub fn with_default_scope(mut self, scope: Filter) -> Self {
        self.default_scope = Some(scope);
        self
    }

    pub fn cardinality(&self) -> Cardinality {
        self.relation_type.cardinality()
    }

    /// Validate the relation descriptor
    pub fn validate(&self) -> MaterializeResult<()> {
        if self.name.is_empty() {
            return Err(MaterializeError::configuration(
                "Relation name cannot be empty",
            ));
        }

        if self.name == RELATION_CACHE_KEY {
            return Err(MaterializeError::configuration(format!(
                "'{}' is reserved and cannot name a relation",
                RELATION_CACHE_KEY
            )));
        }

        if self.target.is_empty() {
            return Err(MaterializeError::configuration(format!(
                "Relation '{}' must name a target model",
                self.name
            )));
        }

        Ok(())
    }
}

/// Picks the concrete model for a row.
///
/// Resolution runs once per row, on normalized data, before construction.
#[derive(Clone)]
pub enum ModelResolver {
    /// Always the declaring model
    SelfType,
    /// Tagged dispatch on a row field; unknown or missing tags resolve to the declaring model
    Discriminator {
        field: String,
        variants: BTreeMap<String, String>,
    },
    /// Arbitrary dispatch; `None` resolves to the declaring model
    Custom(fn(&Row) -> Option<String>),
}

impl fmt::Debug for ModelResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelfType => write!(f, "SelfType"),
            Self::Discriminator { field, variants } => f
                .debug_struct("Discriminator")
                .field("field", field)
                .field("variants", variants)
                .finish(),
            Self::Custom(_) => write!(f, "Custom(<fn>)"),
        }
    }
}

impl ModelResolver {
    /// Discriminator resolver built from `(tag, model name)` pairs
    pub fn discriminator<I, K, V>(field: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Discriminator {
            field: field.into(),
            variants: variants
                .into_iter()
                .map(|(tag, model)| (tag.into(), model.into()))
                .collect(),
        }
    }
}

/// A named model type: its properties, relations and resolver
#[derive(Debug, Clone)]
pub struct ModelType {
    pub name: String,
    pub properties: BTreeMap<String, PropertyDescriptor>,
    pub relations: BTreeMap<String, RelationDescriptor>,
    pub resolver: Option<ModelResolver>,
}

impl ModelType {
    /// A concrete model that always resolves to itself
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
            relations: BTreeMap::new(),
            resolver: Some(ModelResolver::SelfType),
        }
    }

    /// A model with no resolver; rows cannot be materialized into it directly
    pub fn abstract_type(name: impl Into<String>) -> Self {
        Self {
            resolver: None,
            ..Self::new(name)
        }
    }

    pub fn property(mut self, name: impl Into<String>, property_type: PropertyType) -> Self {
        let descriptor = PropertyDescriptor::new(name, property_type);
        self.properties.insert(descriptor.name.clone(), descriptor);
        self
    }

    pub fn property_descriptor(mut self, descriptor: PropertyDescriptor) -> Self {
        self.properties.insert(descriptor.name.clone(), descriptor);
        self
    }

    pub fn relation(mut self, descriptor: RelationDescriptor) -> Self {
        self.relations.insert(descriptor.name.clone(), descriptor);
        self
    }

    pub fn with_resolver(mut self, resolver: ModelResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn relation_names(&self) -> impl Iterator<Item = &str> {
        self.relations.keys().map(String::as_str)
    }

    pub fn get_relation(&self, name: &str) -> Option<&RelationDescriptor> {
        self.relations.get(name)
    }

    pub fn is_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn is_relation(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    /// Whether `name` is a declared property or relation
    pub fn declares(&self, name: &str) -> bool {
        self.is_property(name) || self.is_relation(name)
    }

    /// Name of the concrete model `row` should be materialized as
    pub fn resolve(&self, row: &Row) -> MaterializeResult<Cow<'_, str>> {
        let resolver = self.resolver.as_ref().ok_or_else(|| {
            MaterializeError::malformed(format!(
                "model '{}' has no resolver and cannot be instantiated",
                self.name
            ))
        })?;

        let resolved = match resolver {
            ModelResolver::SelfType => None,
            ModelResolver::Discriminator { field, variants } => row
                .get(field)
                .and_then(JsonValue::as_str)
                .and_then(|tag| variants.get(tag))
                .map(|model| Cow::Borrowed(model.as_str())),
            ModelResolver::Custom(resolve) => resolve(row).map(Cow::Owned),
        };

        Ok(resolved.unwrap_or(Cow::Borrowed(self.name.as_str())))
    }

    /// Validate the model definition for consistency
    pub fn validate(&self) -> MaterializeResult<()> {
        if self.name.is_empty() {
            return Err(MaterializeError::configuration("Model name cannot be empty"));
        }

        for (key, relation) in &self.relations {
            relation.validate()?;

            if key != &relation.name {
                return Err(MaterializeError::configuration(format!(
                    "Model '{}' registers relation '{}' under key '{}'",
                    self.name, relation.name, key
                )));
            }

            if self.is_property(key) {
                return Err(MaterializeError::configuration(format!(
                    "Model '{}' declares '{}' as both a property and a relation",
                    self.name, key
                )));
            }
        }

        if self.is_property(RELATION_CACHE_KEY) {
            return Err(MaterializeError::configuration(format!(
                "'{}' is reserved and cannot name a property",
                RELATION_CACHE_KEY
            )));
        }

        if let Some(ModelResolver::Discriminator { field, .. }) = &self.resolver {
            if field.is_empty() {
                return Err(MaterializeError::configuration(format!(
                    "Model '{}' has a discriminator resolver without a field",
                    self.name
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vehicle() -> ModelType {
        ModelType::new("Vehicle")
            .property("id", PropertyType::Number)
            .property("kind", PropertyType::String)
            .with_resolver(ModelResolver::discriminator(
                "kind",
                [("car", "Car"), ("truck", "Truck")],
            ))
    }

    #[test]
    fn test_relation_type_cardinality() {
        assert_eq!(RelationType::HasOne.cardinality(), Cardinality::Single);
        assert_eq!(RelationType::BelongsTo.cardinality(), Cardinality::Single);
        assert_eq!(RelationType::EmbedsOne.cardinality(), Cardinality::Single);

        assert!(RelationType::HasMany.is_collection());
        assert!(RelationType::HasAndBelongsToMany.is_collection());
        assert!(RelationType::HasManyThrough.is_collection());
        assert!(RelationType::ReferencesMany.is_collection());
        assert!(RelationType::EmbedsMany.is_collection());
    }

    #[test]
    fn test_model_type_builder() {
        let customer = ModelType::new("Customer")
            .property("id", PropertyType::Number)
            .property("name", PropertyType::String)
            .relation(RelationDescriptor::has_many("orders", "Order"));

        assert_eq!(customer.property_names().collect::<Vec<_>>(), vec!["id", "name"]);
        assert_eq!(customer.relation_names().collect::<Vec<_>>(), vec!["orders"]);
        assert!(customer.declares("orders"));
        assert!(!customer.declares("secret"));
        assert!(customer.validate().is_ok());
    }

    #[test]
    fn test_discriminator_resolution() {
        let model = vehicle();

        let car = json!({"id": 1, "kind": "car"});
        assert_eq!(model.resolve(car.as_object().unwrap()).unwrap(), "Car");

        let unknown = json!({"id": 2, "kind": "boat"});
        assert_eq!(model.resolve(unknown.as_object().unwrap()).unwrap(), "Vehicle");

        let untagged = json!({"id": 3});
        assert_eq!(model.resolve(untagged.as_object().unwrap()).unwrap(), "Vehicle");
    }

    #[test]
    fn test_custom_resolution() {
        fn by_wheels(row: &Row) -> Option<String> {
            match row.get("wheels").and_then(JsonValue::as_u64) {
                Some(w) if w > 4 => Some("Truck".to_string()),
                _ => None,
            }
        }

        let model = ModelType::new("Vehicle").with_resolver(ModelResolver::Custom(by_wheels));
        let big = json!({"wheels": 18});
        assert_eq!(model.resolve(big.as_object().unwrap()).unwrap(), "Truck");
        let small = json!({"wheels": 4});
        assert_eq!(model.resolve(small.as_object().unwrap()).unwrap(), "Vehicle");
    }

    #[test]
    fn test_abstract_type_has_no_resolver() {
        let model = ModelType::abstract_type("Shape");
        let err = model.resolve(&Row::new()).unwrap_err();
        assert!(err.is_malformed_input());
    }

    #[test]
    fn test_validation_rejects_collisions() {
        let model = ModelType::new("Customer")
            .property("orders", PropertyType::Array)
            .relation(RelationDescriptor::has_many("orders", "Order"));
        assert!(model.validate().unwrap_err().is_configuration());

        let model = ModelType::new("Customer")
            .relation(RelationDescriptor::has_many("orders", ""));
        assert!(model.validate().is_err());

        let model = ModelType::new("Customer")
            .relation(RelationDescriptor::has_many(RELATION_CACHE_KEY, "Order"));
        assert!(model.validate().is_err());
    }
}
