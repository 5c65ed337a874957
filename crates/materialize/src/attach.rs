//! Relation Attacher - materialize included relations onto a built instance

use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::config::UnknownRelationPolicy;
use crate::container::RelationContainer;
use crate::error::{MaterializeError, MaterializeResult};
use crate::filter::Filter;
use crate::instance::{ModelInstance, RelationValue};
use crate::materializer::{Materialized, Materializer};
use crate::metadata::{Cardinality, ModelType, RelationDescriptor};
use crate::value::{is_truthy, RELATION_CACHE_KEY};

static EMPTY_FILTER: Filter = Filter {
    fields: None,
    include: Vec::new(),
};

impl Materializer {
    /// Attach every relation named by `filter.include` to `instance`.
    ///
    /// Directives run in order; a relation included twice is materialized
    /// twice and the later result wins.
    pub(crate) fn attach_includes(
        &self,
        model: &ModelType,
        filter: &Filter,
        mut instance: ModelInstance,
        depth: usize,
    ) -> MaterializeResult<ModelInstance> {
        for directive in &filter.include {
            let Some(relation) = model.get_relation(&directive.relation) else {
                self.skip_unknown_relation(model, &directive.relation)?;
                continue;
            };

            let value = self.materialize_relation(
                relation,
                directive.scope.as_ref(),
                &instance,
                depth,
            )?;

            if let Some(value) = value {
                instance.attach_relation(relation.name.clone(), value);
            }
        }

        instance.remove(RELATION_CACHE_KEY);
        let dropped = instance.clear_embedded();
        if dropped > 0 {
            tracing::trace!("Dropped {} unrequested relation payloads on {}", dropped, model.name);
        }

        Ok(instance)
    }

    /// Value to attach for one relation, or `None` when it stays absent.
    ///
    /// A falsy payload (`null`, `false`, `0`, `""`) counts as no payload.
    /// An array payload on a single relation is rejected as malformed rather
    /// than wrapped, so a single relation never holds a container.
    fn materialize_relation(
        &self,
        relation: &RelationDescriptor,
        scope: Option<&Filter>,
        instance: &ModelInstance,
        depth: usize,
    ) -> MaterializeResult<Option<RelationValue>> {
        let owner = instance.id();
        let payload = instance
            .embedded(&relation.name)
            .filter(|payload| is_truthy(payload));

        match (relation.cardinality(), payload) {
            (Cardinality::Collection, None) => {
                Ok(Some(RelationValue::Many(RelationContainer::empty(owner))))
            }
            (Cardinality::Single, None) => Ok(None),
            (Cardinality::Single, Some(JsonValue::Array(_))) => {
                Err(MaterializeError::malformed(format!(
                    "relation '{}' of model '{}' holds a single {} but the payload is an array",
                    relation.name,
                    instance.model_name(),
                    relation.target
                )))
            }
            (cardinality, Some(payload)) => {
                let related = self.materialize_related(relation, scope, payload, depth)?;
                let value = match (cardinality, related) {
                    (Cardinality::Single, Materialized::One(one)) => {
                        RelationValue::One(Box::new(one))
                    }
                    (_, related) => {
                        RelationValue::Many(RelationContainer::new(owner, related.into_many()))
                    }
                };
                Ok(Some(value))
            }
        }
    }

    /// Materialize a raw related payload as the relation's target model.
    ///
    /// Without an include scope the related model is built with no
    /// projection and no includes, unless the config opts in to the
    /// relation's default scope.
    pub fn materialize_related(
        &self,
        relation: &RelationDescriptor,
        scope: Option<&Filter>,
        payload: &JsonValue,
        depth: usize,
    ) -> MaterializeResult<Materialized> {
        let target: Arc<ModelType> = self.registry.definition(&relation.target)?;
        let filter = match scope {
            Some(scope) => scope,
            None if self.config.apply_default_scopes => {
                relation.default_scope.as_ref().unwrap_or(&EMPTY_FILTER)
            }
            None => &EMPTY_FILTER,
        };

        self.materialize_at(&target, filter, payload, depth + 1)
    }

    fn skip_unknown_relation(&self, model: &ModelType, relation: &str) -> MaterializeResult<()> {
        match self.config.unknown_relations {
            UnknownRelationPolicy::Skip => {
                tracing::debug!(
                    "Skipping include of unknown relation '{}' on {}",
                    relation,
                    model.name
                );
                Ok(())
            }
            UnknownRelationPolicy::Warn => {
                tracing::warn!(
                    "Skipping include of unknown relation '{}' on {}",
                    relation,
                    model.name
                );
                Ok(())
            }
            UnknownRelationPolicy::Error => Err(MaterializeError::UnknownRelation {
                model: model.name.clone(),
                relation: relation.to_string(),
            }),
        }
    }
}
