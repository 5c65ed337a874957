//! Model factories - construct instances from normalized row data

use serde_json::{Number, Value as JsonValue};
use std::sync::Arc;

use crate::error::MaterializeResult;
use crate::instance::{BuildOptions, ModelInstance};
use crate::metadata::{ModelType, PropertyType};
use crate::value::{is_truthy, Row, RELATION_CACHE_KEY};

/// Constructs model instances.
///
/// The materializer always calls this with `apply_setters: false` and
/// `persisted: true`; what those flags mean is up to the factory.
pub trait ModelFactory: Send + Sync {
    fn create(
        &self,
        model: Arc<ModelType>,
        data: Row,
        options: &BuildOptions,
    ) -> MaterializeResult<ModelInstance>;
}

/// Factory that stores properties as given and parks relation payloads for later attachment
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultModelFactory;

impl DefaultModelFactory {
    fn visible(options: &BuildOptions, name: &str) -> bool {
        options.fields.as_ref().map_or(true, |fields| fields.allows(name))
    }
}

impl ModelFactory for DefaultModelFactory {
    fn create(
        &self,
        model: Arc<ModelType>,
        data: Row,
        options: &BuildOptions,
    ) -> MaterializeResult<ModelInstance> {
        let mut instance = ModelInstance::new(Arc::clone(&model), options.persisted);

        for (key, value) in data {
            if key == RELATION_CACHE_KEY {
                if let JsonValue::Object(cached) = value {
                    for (relation, payload) in cached {
                        if model.is_relation(&relation) && is_truthy(&payload) {
                            instance.set_embedded(relation, payload);
                        }
                    }
                }
                continue;
            }

            if model.is_relation(&key) {
                if is_truthy(&value) {
                    instance.set_embedded(key, value);
                }
                continue;
            }

            if !Self::visible(options, &key) {
                continue;
            }

            let value = match model.properties.get(&key) {
                Some(property) if options.apply_setters => coerce(value, property.property_type),
                _ => value,
            };
            instance.set_property(key, value);
        }

        if !options.persisted {
            for property in model.properties.values() {
                if let Some(default) = &property.default {
                    if instance.property(&property.name).is_none()
                        && Self::visible(options, &property.name)
                    {
                        instance.set_property(property.name.clone(), default.clone());
                    }
                }
            }
        }

        Ok(instance)
    }
}

/// Best-effort conversion of a raw value to a declared property type.
/// Values that cannot be converted are kept unchanged.
fn coerce(value: JsonValue, property_type: PropertyType) -> JsonValue {
    match (property_type, value) {
        (PropertyType::String, JsonValue::Number(n)) => JsonValue::String(n.to_string()),
        (PropertyType::String, JsonValue::Bool(b)) => JsonValue::String(b.to_string()),
        (PropertyType::Number, JsonValue::String(s)) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                JsonValue::Number(i.into())
            } else if let Some(n) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
                JsonValue::Number(n)
            } else {
                JsonValue::String(s)
            }
        }
        (PropertyType::Boolean, JsonValue::String(s)) => match s.as_str() {
            "true" | "1" => JsonValue::Bool(true),
            "false" | "0" => JsonValue::Bool(false),
            _ => JsonValue::String(s),
        },
        (PropertyType::Boolean, JsonValue::Number(n)) => match n.as_i64() {
            Some(0) => JsonValue::Bool(false),
            Some(1) => JsonValue::Bool(true),
            _ => JsonValue::Number(n),
        },
        (_, value) => value,
    }
}
