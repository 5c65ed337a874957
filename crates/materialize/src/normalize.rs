//! Row Normalizer - reconcile raw connector rows with a model's declared keys

use std::sync::Arc;

use crate::connector::Connector;
use crate::error::MaterializeResult;
use crate::registry::ModelRegistry;
use crate::value::{Row, RELATION_CACHE_KEY};

/// Merges raw rows with their connector-normalized form and keeps only
/// declared properties and relations
#[derive(Clone)]
pub struct RowNormalizer {
    registry: Arc<dyn ModelRegistry>,
    connector: Arc<dyn Connector>,
}

impl RowNormalizer {
    pub fn new(registry: Arc<dyn ModelRegistry>, connector: Arc<dyn Connector>) -> Self {
        Self { registry, connector }
    }

    /// Normalize `raw` for `model_name`.
    ///
    /// Connector values win over raw values on key collision. Registry and
    /// connector failures are returned unchanged.
    pub fn normalize(&self, model_name: &str, raw: &Row) -> MaterializeResult<Row> {
        let definition = self.registry.definition(model_name)?;
        let from_connector = self.connector.from_row(model_name, raw)?;

        let mut merged = raw.clone();
        merged.extend(from_connector);
        merged.retain(|key, _| key != RELATION_CACHE_KEY && definition.declares(key));

        tracing::trace!(
            "Normalized {} row to keys {:?}",
            model_name,
            merged.keys().collect::<Vec<_>>()
        );
        Ok(merged)
    }
}

impl std::fmt::Debug for RowNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowNormalizer").finish_non_exhaustive()
    }
}
