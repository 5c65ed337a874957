//! Filters - field projection and relation include directives
//!
//! Callers may describe includes in several shorthand shapes. They are
//! canonicalized into a `Vec<IncludeDirective>` once, when the filter is
//! built or parsed, and never re-interpreted downstream.
//!
//! Accepted `include` shapes:
//!
//! - `"orders"`
//! - `{"relation": "orders", "scope": {...}}`
//! - `{"orders": "items"}`, `{"orders": ["items"]}`, `{"orders": {"items": "product"}}`
//! - an array of any of the above
//!
//! Accepted `fields` shapes: `["id", "name"]` or `{"id": true, "secret": false}`.

use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;

use crate::error::{MaterializeError, MaterializeResult};
use crate::value::{is_truthy, json_kind};

/// Property projection applied at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fields {
    /// Only the named properties are visible
    Only(BTreeSet<String>),
    /// Every property except the named ones is visible
    Except(BTreeSet<String>),
}

impl Fields {
    /// Projection keeping only the given names
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(names.into_iter().map(Into::into).collect())
    }

    /// Whether a property survives the projection
    pub fn allows(&self, name: &str) -> bool {
        match self {
            Self::Only(names) => names.contains(name),
            Self::Except(names) => !names.contains(name),
        }
    }

    fn from_value(value: &JsonValue) -> MaterializeResult<Option<Self>> {
        match value {
            JsonValue::Null => Ok(None),
            JsonValue::String(name) => Ok(Some(Self::only([name.as_str()]))),
            JsonValue::Array(items) => {
                let names = items
                    .iter()
                    .map(|item| {
                        item.as_str().map(str::to_string).ok_or_else(|| {
                            MaterializeError::malformed(format!(
                                "field names must be strings, got {}",
                                json_kind(item)
                            ))
                        })
                    })
                    .collect::<MaterializeResult<BTreeSet<_>>>()?;
                Ok(Some(Self::Only(names)))
            }
            JsonValue::Object(map) => {
                let mut included = BTreeSet::new();
                let mut excluded = BTreeSet::new();
                for (name, flag) in map {
                    if is_truthy(flag) {
                        included.insert(name.clone());
                    } else {
                        excluded.insert(name.clone());
                    }
                }

                if !included.is_empty() {
                    Ok(Some(Self::Only(included)))
                } else if !excluded.is_empty() {
                    Ok(Some(Self::Except(excluded)))
                } else {
                    Ok(None)
                }
            }
            other => Err(MaterializeError::malformed(format!(
                "fields must be an array or object, got {}",
                json_kind(other)
            ))),
        }
    }
}

/// One relation to materialize, with an optional filter for the related model
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IncludeDirective {
    pub relation: String,
    pub scope: Option<Filter>,
}

impl IncludeDirective {
    pub fn new(relation: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            scope: None,
        }
    }

    pub fn with_scope(mut self, scope: Filter) -> Self {
        self.scope = Some(scope);
        self
    }
}

/// Projection and include tree for one level of materialization
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(try_from = "JsonValue")]
pub struct Filter {
    pub fields: Option<Fields>,
    pub include: Vec<IncludeDirective>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict visible properties to `names`
    pub fn with_fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(Fields::only(names));
        self
    }

    /// Include a relation without a scope
    pub fn include(mut self, relation: impl Into<String>) -> Self {
        self.include.push(IncludeDirective::new(relation));
        self
    }

    /// Include a relation, materializing it with its own filter
    pub fn include_scoped(mut self, relation: impl Into<String>, scope: Filter) -> Self {
        self.include
            .push(IncludeDirective::new(relation).with_scope(scope));
        self
    }

    /// True when the filter neither projects nor includes anything
    pub fn is_empty(&self) -> bool {
        self.fields.is_none() && self.include.is_empty()
    }

    /// Parse a loosely shaped JSON filter into its canonical form
    pub fn from_value(value: &JsonValue) -> MaterializeResult<Self> {
        let map = match value {
            JsonValue::Null => return Ok(Self::default()),
            JsonValue::Object(map) => map,
            other => {
                return Err(MaterializeError::malformed(format!(
                    "filter must be an object, got {}",
                    json_kind(other)
                )))
            }
        };

        let fields = match map.get("fields") {
            Some(value) => Fields::from_value(value)?,
            None => None,
        };
        let include = match map.get("include") {
            Some(value) => normalize_include(value)?,
            None => Vec::new(),
        };

        Ok(Self { fields, include })
    }
}

impl TryFrom<JsonValue> for Filter {
    type Error = MaterializeError;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        Self::from_value(&value)
    }
}

/// Canonicalize any accepted `include` shape into an ordered directive list
pub fn normalize_include(value: &JsonValue) -> MaterializeResult<Vec<IncludeDirective>> {
    match value {
        JsonValue::Null => Ok(Vec::new()),
        JsonValue::String(relation) => Ok(vec![IncludeDirective::new(relation.as_str())]),
        JsonValue::Array(items) => {
            let mut directives = Vec::new();
            for item in items {
                directives.extend(normalize_include(item)?);
            }
            Ok(directives)
        }
        JsonValue::Object(map) => match map.get("relation") {
            Some(JsonValue::String(relation)) => {
                let scope = match map.get("scope") {
                    Some(JsonValue::Null) | None => None,
                    Some(scope) => Some(Filter::from_value(scope)?),
                };
                Ok(vec![IncludeDirective {
                    relation: relation.clone(),
                    scope,
                }])
            }
            Some(other) => Err(MaterializeError::malformed(format!(
                "include relation must be a string, got {}",
                json_kind(other)
            ))),
            None => {
                let mut directives = Vec::with_capacity(map.len());
                for (relation, nested) in map {
                    let scope = match nested {
                        JsonValue::Null | JsonValue::Bool(_) => None,
                        nested => Some(Filter {
                            fields: None,
                            include: normalize_include(nested)?,
                        }),
                    };
                    directives.push(IncludeDirective {
                        relation: relation.clone(),
                        scope,
                    });
                }
                Ok(directives)
            }
        },
        other => Err(MaterializeError::malformed(format!(
            "include must be a string, object or array, got {}",
            json_kind(other)
        ))),
    }
}
