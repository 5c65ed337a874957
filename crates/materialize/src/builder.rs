//! Model Builder - resolve the concrete model for a row and construct it

use std::sync::Arc;

use crate::error::MaterializeResult;
use crate::factory::ModelFactory;
use crate::filter::Filter;
use crate::instance::{BuildOptions, ModelInstance};
use crate::metadata::ModelType;
use crate::normalize::RowNormalizer;
use crate::registry::ModelRegistry;
use crate::value::Row;

/// Builds one instance per raw row, with projection applied and setters off
#[derive(Clone)]
pub struct ModelBuilder {
    normalizer: RowNormalizer,
    registry: Arc<dyn ModelRegistry>,
    factory: Arc<dyn ModelFactory>,
}

impl ModelBuilder {
    pub fn new(
        normalizer: RowNormalizer,
        registry: Arc<dyn ModelRegistry>,
        factory: Arc<dyn ModelFactory>,
    ) -> Self {
        Self {
            normalizer,
            registry,
            factory,
        }
    }

    pub fn with_factory(mut self, factory: Arc<dyn ModelFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn normalizer(&self) -> &RowNormalizer {
        &self.normalizer
    }

    /// Build an instance of `model` (or the variant the row resolves to) from `raw`.
    pub fn build(
        &self,
        model: &Arc<ModelType>,
        filter: &Filter,
        raw: &Row,
    ) -> MaterializeResult<ModelInstance> {
        let normalized = self.normalizer.normalize(&model.name, raw)?;
        let concrete = self.resolve(model, &normalized)?;

        // A variant may declare keys its base does not, so normalize again for it
        let data = if Arc::ptr_eq(&concrete, model) {
            normalized
        } else {
            tracing::debug!("Resolved {} row to variant {}", model.name, concrete.name);
            self.normalizer.normalize(&concrete.name, raw)?
        };

        self.factory
            .create(concrete, data, &BuildOptions::persisted(filter.fields.clone()))
    }

    /// Concrete model for a normalized row
    pub fn resolve(
        &self,
        model: &Arc<ModelType>,
        normalized: &Row,
    ) -> MaterializeResult<Arc<ModelType>> {
        let resolved = model.resolve(normalized)?;
        if resolved == model.name {
            Ok(Arc::clone(model))
        } else {
            self.registry.definition(&resolved)
        }
    }
}

impl std::fmt::Debug for ModelBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBuilder")
            .field("normalizer", &self.normalizer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::PassthroughConnector;
    use crate::error::MaterializeError;
    use crate::factory::DefaultModelFactory;
    use crate::metadata::{ModelResolver, PropertyType};
    use crate::registry::InMemoryRegistry;
    use serde_json::{json, Value as JsonValue};

    fn registry() -> Arc<InMemoryRegistry> {
        let registry = InMemoryRegistry::new();
        registry
            .register(
                ModelType::new("Vehicle")
                    .property("id", PropertyType::Number)
                    .property("kind", PropertyType::String)
                    .with_resolver(ModelResolver::discriminator(
                        "kind",
                        [("car", "Car"), ("plane", "Plane")],
                    )),
            )
            .unwrap();
        registry
            .register(
                ModelType::new("Car")
                    .property("id", PropertyType::Number)
                    .property("kind", PropertyType::String)
                    .property("doors", PropertyType::Number),
            )
            .unwrap();
        Arc::new(registry)
    }

    fn builder(registry: Arc<InMemoryRegistry>) -> ModelBuilder {
        let normalizer = RowNormalizer::new(registry.clone(), Arc::new(PassthroughConnector));
        ModelBuilder::new(normalizer, registry, Arc::new(DefaultModelFactory))
    }

    fn row(value: JsonValue) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_build_resolves_variant() {
        let registry = registry();
        let vehicle = registry.definition("Vehicle").unwrap();
        let builder = builder(registry);

        let instance = builder
            .build(&vehicle, &Filter::new(), &row(json!({"id": 1, "kind": "car", "doors": 4})))
            .unwrap();

        assert_eq!(instance.model_name(), "Car");
        assert_eq!(instance.property("doors"), Some(&json!(4)));
        assert!(instance.is_persisted());
    }

    #[test]
    fn test_build_falls_back_to_nominal_model() {
        let registry = registry();
        let vehicle = registry.definition("Vehicle").unwrap();
        let builder = builder(registry);

        let instance = builder
            .build(&vehicle, &Filter::new(), &row(json!({"id": 2, "kind": "boat", "doors": 0})))
            .unwrap();

        assert_eq!(instance.model_name(), "Vehicle");
        assert!(!instance.contains_key("doors"));
    }

    #[test]
    fn test_build_unregistered_variant_is_configuration_error() {
        let registry = registry();
        let vehicle = registry.definition("Vehicle").unwrap();
        let builder = builder(registry);

        let err = builder
            .build(&vehicle, &Filter::new(), &row(json!({"id": 3, "kind": "plane"})))
            .unwrap_err();
        assert!(matches!(err, MaterializeError::UnknownModel(ref name) if name == "Plane"));
    }

    #[test]
    fn test_build_applies_projection() {
        let registry = registry();
        let car = registry.definition("Car").unwrap();
        let builder = builder(registry);

        let instance = builder
            .build(
                &car,
                &Filter::new().with_fields(["id"]),
                &row(json!({"id": 1, "kind": "car", "doors": 2})),
            )
            .unwrap();
        assert_eq!(instance.keys().collect::<Vec<_>>(), vec!["id"]);
    }
}
