//! Connector row normalization
//!
//! A connector knows how its storage names and encodes columns. Before a
//! row is materialized the connector turns it into property-keyed data.

use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};

use crate::error::{MaterializeError, MaterializeResult};
use crate::value::Row;

/// Storage-format specific row reconciliation
pub trait Connector: Send + Sync {
    /// Convert a raw storage row into property-keyed data for `model_name`.
    ///
    /// Fails only if the model is unknown to the connector.
    fn from_row(&self, model_name: &str, row: &Row) -> MaterializeResult<Row>;
}

/// Connector for stores whose rows already use property names
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughConnector;

impl Connector for PassthroughConnector {
    fn from_row(&self, _model_name: &str, row: &Row) -> MaterializeResult<Row> {
        Ok(row.clone())
    }
}

/// Column layout for one model
#[derive(Debug, Clone, Default)]
pub struct ColumnMapping {
    /// Column name to property name
    renames: HashMap<String, String>,
    /// Columns holding JSON encoded as text
    json_columns: HashSet<String>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map storage column `column` to model property `property`
    pub fn rename(mut self, column: impl Into<String>, property: impl Into<String>) -> Self {
        self.renames.insert(column.into(), property.into());
        self
    }

    /// Decode text in `column` as JSON
    pub fn json(mut self, column: impl Into<String>) -> Self {
        self.json_columns.insert(column.into());
        self
    }

    fn apply(&self, model_name: &str, row: &Row) -> MaterializeResult<Row> {
        let mut normalized = Row::new();

        for (column, value) in row {
            let value = match value {
                JsonValue::String(text) if self.json_columns.contains(column) => {
                    serde_json::from_str(text).map_err(|e| {
                        MaterializeError::Connector(format!(
                            "column '{}' of model '{}' holds invalid JSON: {}",
                            column, model_name, e
                        ))
                    })?
                }
                other => other.clone(),
            };

            // A mapped column beats a raw column that already uses the property name
            match self.renames.get(column) {
                Some(property) => {
                    normalized.insert(property.clone(), value);
                }
                None => {
                    normalized.entry(column.clone()).or_insert(value);
                }
            }
        }

        Ok(normalized)
    }
}

/// Connector for stores with their own column naming, e.g. snake_case SQL tables
#[derive(Debug, Clone, Default)]
pub struct ColumnMappingConnector {
    models: HashMap<String, ColumnMapping>,
}

impl ColumnMappingConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the column layout of a model
    pub fn with_model(mut self, model_name: impl Into<String>, mapping: ColumnMapping) -> Self {
        self.models.insert(model_name.into(), mapping);
        self
    }
}

impl Connector for ColumnMappingConnector {
    fn from_row(&self, model_name: &str, row: &Row) -> MaterializeResult<Row> {
        let mapping = self
            .models
            .get(model_name)
            .ok_or_else(|| MaterializeError::UnknownModel(model_name.to_string()))?;
        mapping.apply(model_name, row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: JsonValue) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_passthrough() {
        let raw = row(json!({"id": 1, "name": "A"}));
        assert_eq!(PassthroughConnector.from_row("Anything", &raw).unwrap(), raw);
    }

    #[test]
    fn test_column_mapping_renames_and_decodes() {
        let connector = ColumnMappingConnector::new().with_model(
            "Customer",
            ColumnMapping::new()
                .rename("customer_name", "name")
                .json("preferences"),
        );

        let raw = row(json!({
            "id": 1,
            "customer_name": "Ada",
            "preferences": "{\"theme\":\"dark\"}"
        }));
        let normalized = connector.from_row("Customer", &raw).unwrap();

        assert_eq!(normalized["name"], json!("Ada"));
        assert_eq!(normalized["preferences"], json!({"theme": "dark"}));
        assert_eq!(normalized["id"], json!(1));
        assert!(!normalized.contains_key("customer_name"));
    }

    #[test]
    fn test_column_mapping_rejects_bad_json() {
        let connector =
            ColumnMappingConnector::new().with_model("Customer", ColumnMapping::new().json("meta"));
        let err = connector
            .from_row("Customer", &row(json!({"meta": "{oops"})))
            .unwrap_err();
        assert!(matches!(err, MaterializeError::Connector(_)));
    }

    #[test]
    fn test_column_mapping_unknown_model() {
        let connector = ColumnMappingConnector::new();
        let err = connector.from_row("Ghost", &Row::new()).unwrap_err();
        assert!(err.is_configuration());
    }
}
