//! Materializer - turn raw rows into model instances with their included relations
//!
//! ```ignore
//! let materializer = Materializer::new(registry, Arc::new(PassthroughConnector));
//! let filter = Filter::new().include_scoped("orders", Filter::new().include("items"));
//! let customer = materializer.materialize("Customer", &filter, &row)?.into_one();
//! ```

use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::builder::ModelBuilder;
use crate::config::MaterializeConfig;
use crate::connector::Connector;
use crate::error::{MaterializeError, MaterializeResult};
use crate::factory::{DefaultModelFactory, ModelFactory};
use crate::filter::Filter;
use crate::instance::ModelInstance;
use crate::metadata::ModelType;
use crate::normalize::RowNormalizer;
use crate::registry::ModelRegistry;
use crate::value::{as_row, json_kind, Row};

/// Result of materializing a single row or a list of rows
#[derive(Debug, Clone)]
pub enum Materialized {
    One(ModelInstance),
    Many(Vec<ModelInstance>),
}

impl Materialized {
    pub fn into_one(self) -> Option<ModelInstance> {
        match self {
            Self::One(instance) => Some(instance),
            Self::Many(_) => None,
        }
    }

    /// All instances; a single instance becomes a list of one
    pub fn into_many(self) -> Vec<ModelInstance> {
        match self {
            Self::One(instance) => vec![instance],
            Self::Many(instances) => instances,
        }
    }

    pub fn as_one(&self) -> Option<&ModelInstance> {
        match self {
            Self::One(instance) => Some(instance),
            Self::Many(_) => None,
        }
    }

    pub fn as_many(&self) -> Option<&[ModelInstance]> {
        match self {
            Self::Many(instances) => Some(instances.as_slice()),
            Self::One(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(instances) => instances.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::One(instance) => instance.to_json(),
            Self::Many(instances) => {
                JsonValue::Array(instances.iter().map(ModelInstance::to_json).collect())
            }
        }
    }
}

/// Entry point for materialization.
///
/// Holds no per-call state; one materializer can serve concurrent callers
/// as long as its registry and connector allow concurrent reads.
#[derive(Clone)]
pub struct Materializer {
    pub(crate) registry: Arc<dyn ModelRegistry>,
    pub(crate) builder: ModelBuilder,
    pub(crate) config: MaterializeConfig,
}

impl Materializer {
    /// Materializer using the default factory and configuration
    pub fn new(registry: Arc<dyn ModelRegistry>, connector: Arc<dyn Connector>) -> Self {
        let normalizer = RowNormalizer::new(Arc::clone(&registry), connector);
        let builder = ModelBuilder::new(
            normalizer,
            Arc::clone(&registry),
            Arc::new(DefaultModelFactory),
        );

        Self {
            registry,
            builder,
            config: MaterializeConfig::default(),
        }
    }

    pub fn with_factory(mut self, factory: Arc<dyn ModelFactory>) -> Self {
        self.builder = self.builder.with_factory(factory);
        self
    }

    /// Replace the configuration, rejecting one that fails `MaterializeConfig::validate`
    pub fn with_config(mut self, config: MaterializeConfig) -> MaterializeResult<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &MaterializeConfig {
        &self.config
    }

    /// Materialize `data` as `model_name`.
    ///
    /// An object yields one instance; an array yields one instance per
    /// element, in order. Anything else is malformed input.
    pub fn materialize(
        &self,
        model_name: &str,
        filter: &Filter,
        data: &JsonValue,
    ) -> MaterializeResult<Materialized> {
        let model = self.registry.definition(model_name)?;
        self.materialize_at(&model, filter, data, 0)
    }

    /// Like `materialize`, with the filter given in its loose JSON form
    pub fn materialize_json(
        &self,
        model_name: &str,
        filter: &JsonValue,
        data: &JsonValue,
    ) -> MaterializeResult<Materialized> {
        let filter = Filter::from_value(filter)?;
        self.materialize(model_name, &filter, data)
    }

    /// Materialize a single row
    pub fn materialize_row(
        &self,
        model_name: &str,
        filter: &Filter,
        row: &Row,
    ) -> MaterializeResult<ModelInstance> {
        let model = self.registry.definition(model_name)?;
        self.build_one(&model, filter, row, 0)
    }

    /// Materialize a list of rows, preserving order
    pub fn materialize_rows(
        &self,
        model_name: &str,
        filter: &Filter,
        rows: &[Row],
    ) -> MaterializeResult<Vec<ModelInstance>> {
        let model = self.registry.definition(model_name)?;
        rows.iter()
            .map(|row| self.build_one(&model, filter, row, 0))
            .collect()
    }

    pub(crate) fn materialize_at(
        &self,
        model: &Arc<ModelType>,
        filter: &Filter,
        data: &JsonValue,
        depth: usize,
    ) -> MaterializeResult<Materialized> {
        if depth > self.config.max_depth {
            return Err(MaterializeError::DepthExceeded {
                depth,
                max: self.config.max_depth,
            });
        }

        match data {
            JsonValue::Array(items) => items
                .iter()
                .map(|item| self.build_one(model, filter, as_row(item, &model.name)?, depth))
                .collect::<MaterializeResult<Vec<_>>>()
                .map(Materialized::Many),
            JsonValue::Object(row) => self
                .build_one(model, filter, row, depth)
                .map(Materialized::One),
            other => Err(MaterializeError::malformed(format!(
                "data for model '{}' must be an object or an array of objects, got {}",
                model.name,
                json_kind(other)
            ))),
        }
    }

    /// Build one instance and attach its includes
    fn build_one(
        &self,
        model: &Arc<ModelType>,
        filter: &Filter,
        row: &Row,
        depth: usize,
    ) -> MaterializeResult<ModelInstance> {
        let span = tracing::debug_span!("materialize", model = %model.name, depth);
        let _enter = span.enter();

        tracing::debug!("Filter: {:?}", filter);
        tracing::debug!("Raw data: {:?}", row);

        let instance = self.builder.build(model, filter, row)?;
        let concrete = Arc::clone(instance.model());
        let instance = self.attach_includes(&concrete, filter, instance, depth)?;

        tracing::debug!("Model: {} {}", instance.model_name(), instance.id());
        Ok(instance)
    }
}

impl std::fmt::Debug for Materializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Materializer")
            .field("builder", &self.builder)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::PassthroughConnector;
    use crate::metadata::{PropertyType, RelationDescriptor};
    use crate::registry::InMemoryRegistry;
    use serde_json::json;

    fn materializer() -> Materializer {
        let registry = InMemoryRegistry::new();
        registry
            .register(
                ModelType::new("Customer")
                    .property("id", PropertyType::Number)
                    .property("name", PropertyType::String)
                    .relation(RelationDescriptor::has_many("orders", "Order")),
            )
            .unwrap();
        registry
            .register(ModelType::new("Order").property("id", PropertyType::Number))
            .unwrap();
        Materializer::new(Arc::new(registry), Arc::new(PassthroughConnector))
    }

    #[test]
    fn test_single_row() {
        let result = materializer()
            .materialize("Customer", &Filter::new(), &json!({"id": 1, "name": "A", "x": 0}))
            .unwrap();

        assert_eq!(result.len(), 1);
        let customer = result.into_one().unwrap();
        assert_eq!(customer.to_json(), json!({"id": 1, "name": "A"}));
    }

    #[test]
    fn test_rows_preserve_order() {
        let result = materializer()
            .materialize(
                "Customer",
                &Filter::new(),
                &json!([{"id": 3}, {"id": 1}, {"id": 2}]),
            )
            .unwrap();

        assert!(result.as_one().is_none());
        assert_eq!(result.to_json(), json!([{"id": 3}, {"id": 1}, {"id": 2}]));
        assert_eq!(result.as_many().unwrap().len(), 3);
    }

    #[test]
    fn test_empty_array() {
        let result = materializer()
            .materialize("Customer", &Filter::new(), &json!([]))
            .unwrap();
        assert!(result.is_empty());
        assert!(result.into_many().is_empty());
    }

    #[test]
    fn test_malformed_data() {
        let m = materializer();
        for data in [json!("nope"), json!([1, 2]), JsonValue::Null] {
            let err = m.materialize("Customer", &Filter::new(), &data).unwrap_err();
            assert!(err.is_malformed_input());
        }
    }

    #[test]
    fn test_with_config_validates() {
        let err = materializer()
            .with_config(MaterializeConfig::default().with_max_depth(0))
            .unwrap_err();
        assert!(matches!(err, MaterializeError::Config(_)));
        assert!(err.is_configuration());

        let m = materializer()
            .with_config(MaterializeConfig::default().with_max_depth(4))
            .unwrap();
        assert_eq!(m.config().max_depth, 4);
    }

    #[test]
    fn test_unknown_model() {
        let err = materializer()
            .materialize("Ghost", &Filter::new(), &json!({}))
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_json_filter_and_row_helpers() {
        let m = materializer();
        let result = m
            .materialize_json(
                "Customer",
                &json!({"fields": ["id"], "include": "orders"}),
                &json!({"id": 1, "name": "A"}),
            )
            .unwrap();
        assert_eq!(result.to_json(), json!({"id": 1, "orders": []}));

        let rows = vec![
            json!({"id": 1}).as_object().cloned().unwrap(),
            json!({"id": 2}).as_object().cloned().unwrap(),
        ];
        let instances = m.materialize_rows("Customer", &Filter::new(), &rows).unwrap();
        assert_eq!(instances.len(), 2);

        let one = m.materialize_row("Customer", &Filter::new(), &rows[1]).unwrap();
        assert_eq!(one.property("id"), Some(&json!(2)));
    }
}
