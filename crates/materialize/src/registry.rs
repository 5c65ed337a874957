//! Model Registry - runtime lookup of model definitions by name

use dashmap::DashMap;
use std::sync::Arc;

use crate::error::{MaterializeError, MaterializeResult};
use crate::metadata::{ModelResolver, ModelType};

/// Source of model definitions.
///
/// Lookups must be safe for concurrent reads; the materializer never writes.
pub trait ModelRegistry: Send + Sync {
    /// Get the definition of a model, failing if the name is unknown
    fn definition(&self, model_name: &str) -> MaterializeResult<Arc<ModelType>>;
}

/// Thread-safe in-memory model registry
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    models: Arc<DashMap<String, Arc<ModelType>>>,
}

impl InMemoryRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model, replacing any previous definition with the same name
    pub fn register(&self, model: ModelType) -> MaterializeResult<()> {
        model.validate()?;
        tracing::debug!(
            "Registering model '{}' ({} properties, {} relations)",
            model.name,
            model.properties.len(),
            model.relations.len()
        );
        self.models.insert(model.name.clone(), Arc::new(model));
        Ok(())
    }

    /// Builder-style registration
    pub fn with_model(self, model: ModelType) -> MaterializeResult<Self> {
        self.register(model)?;
        Ok(self)
    }

    pub fn get(&self, model_name: &str) -> Option<Arc<ModelType>> {
        self.models.get(model_name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, model_name: &str) -> bool {
        self.models.contains_key(model_name)
    }

    /// Names of all registered models, sorted
    pub fn model_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.models.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn clear(&self) {
        self.models.clear();
    }

    /// Check that every relation target and discriminator variant is registered
    pub fn validate_references(&self) -> MaterializeResult<()> {
        let models: Vec<Arc<ModelType>> =
            self.models.iter().map(|entry| Arc::clone(entry.value())).collect();

        for model in &models {
            for relation in model.relations.values() {
                if !self.contains(&relation.target) {
                    return Err(MaterializeError::configuration(format!(
                        "Relation '{}.{}' targets unregistered model '{}'",
                        model.name, relation.name, relation.target
                    )));
                }
            }

            if let Some(ModelResolver::Discriminator { variants, .. }) = &model.resolver {
                if let Some(missing) = variants.values().find(|variant| !self.contains(variant)) {
                    return Err(MaterializeError::configuration(format!(
                        "Model '{}' resolves to unregistered model '{}'",
                        model.name, missing
                    )));
                }
            }
        }

        Ok(())
    }
}

impl ModelRegistry for InMemoryRegistry {
    fn definition(&self, model_name: &str) -> MaterializeResult<Arc<ModelType>> {
        self.get(model_name)
            .ok_or_else(|| MaterializeError::UnknownModel(model_name.to_string()))
    }
}
