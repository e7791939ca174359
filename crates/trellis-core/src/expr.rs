use crate::{Error, Result};

use indexmap::IndexMap;
use std::str::FromStr;

/// A declarative, nested query expression. Entry keys are `"prop"` or
/// `"prop alias"`; declaration order is significant and preserved.
#[derive(Debug, Clone, Default)]
pub struct Expression {
    pub entries: IndexMap<String, ExprValue>,
}

/// Closed classification of expression values. The dynamic input shapes
/// (`true`, `{aggregation, field?}`, nested mapping) are decoded exactly once
/// in [`Expression::from_json`]; nothing downstream re-inspects shapes.
#[derive(Debug, Clone)]
pub enum ExprValue {
    /// Select the property's column.
    Field,

    /// Select an aggregate over a column, or over the whole row when no
    /// field is given.
    Aggregate(Aggregate),

    /// Descend into a relation.
    Nested(Expression),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub method: AggregateMethod,

    /// Target path; `None` aggregates the whole row (e.g. `COUNT(t.*)`).
    pub field: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateMethod {
    Count,
    Max,
    Min,
    Avg,
    Sum,
}

impl Expression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a scalar field selection.
    pub fn field(mut self, key: impl Into<String>) -> Self {
        self.entries.insert(key.into(), ExprValue::Field);
        self
    }

    /// Adds an aggregation selection.
    pub fn aggregate(
        mut self,
        key: impl Into<String>,
        method: AggregateMethod,
        field: Option<&str>,
    ) -> Self {
        self.entries.insert(
            key.into(),
            ExprValue::Aggregate(Aggregate {
                method,
                field: field.map(str::to_string),
            }),
        );
        self
    }

    /// Adds a nested relation selection.
    pub fn nested(mut self, key: impl Into<String>, expr: Expression) -> Self {
        self.entries.insert(key.into(), ExprValue::Nested(expr));
        self
    }

    /// Decodes an expression from its dynamic JSON shape. Any value that is
    /// neither boolean `true` (or the string `"true"`), an aggregation
    /// object, nor a nested mapping is a malformed-expression error.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(map) = value else {
            return Err(Error::malformed_expression(
                "expression must be a nested mapping",
            ));
        };

        let mut entries = IndexMap::with_capacity(map.len());
        for (key, value) in map {
            entries.insert(key.clone(), ExprValue::from_json(key, value)?);
        }

        Ok(Self { entries })
    }
}

impl ExprValue {
    fn from_json(key: &str, value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Bool(true) => Ok(Self::Field),
            serde_json::Value::String(s) if s == "true" => Ok(Self::Field),
            serde_json::Value::Object(map) => match map.get("aggregation") {
                Some(serde_json::Value::String(method)) => Ok(Self::Aggregate(Aggregate {
                    method: method.parse()?,
                    field: match map.get("field") {
                        Some(serde_json::Value::String(field)) => Some(field.clone()),
                        Some(_) => {
                            return Err(Error::malformed_expression(format!(
                                "aggregation field for `{key}` must be a path string"
                            )))
                        }
                        None => None,
                    },
                })),
                Some(_) => Err(Error::malformed_expression(format!(
                    "aggregation method for `{key}` must be a string"
                ))),
                None => Ok(Self::Nested(Expression::from_json(value)?)),
            },
            _ => Err(Error::malformed_expression(format!(
                "value for `{key}` is neither true, an aggregation, nor a nested mapping"
            ))),
        }
    }
}

impl FromStr for AggregateMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "count" => Ok(Self::Count),
            "max" => Ok(Self::Max),
            "min" => Ok(Self::Min),
            "avg" => Ok(Self::Avg),
            "sum" => Ok(Self::Sum),
            _ => Err(Error::malformed_expression(format!(
                "unknown aggregation method `{s}`"
            ))),
        }
    }
}

impl<'de> serde::Deserialize<'de> for Expression {
    fn deserialize<D>(deserializer: D) -> core::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Expression::from_json(&value).map_err(serde::de::Error::custom)
    }
}
