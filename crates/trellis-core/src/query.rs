use crate::{expr::Expression, Value};

use serde::Deserialize;

/// A complete build request: the expression plus filters, grouping,
/// ordering, and pagination.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Query {
    pub expression: Expression,

    pub filters: Vec<Filter>,

    /// Paths (canonical or alias-based) to group by, in input order.
    pub group_by: Vec<String>,

    pub order_by: Vec<OrderBy>,

    pub distinct: bool,

    pub pager: Option<Pager>,
}

/// Filters often originate from flexible client input: a filter whose field
/// resolves to no mapped property is silently dropped from the WHERE clause.
#[derive(Debug, Clone, Deserialize)]
pub struct Filter {
    /// Dotted reference; may mix declared aliases and canonical segments.
    pub field: String,

    #[serde(default)]
    pub operator: Operator,

    pub value: Value,

    /// Chain this condition with OR instead of AND.
    #[serde(default)]
    pub or: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Gt,
    Gte,
    Lt,
    Lte,
    #[default]
    Eq,
    Like,
    Between,
    #[serde(alias = "notEq")]
    Neq,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderBy {
    pub field: String,

    #[serde(default)]
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

/// `limit` rows per page; page `page_idx` translates to
/// `OFFSET limit * page_idx`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pager {
    pub limit: u64,

    #[serde(default)]
    pub page_idx: u64,
}

impl Pager {
    pub fn offset(&self) -> u64 {
        self.limit * self.page_idx
    }
}

impl Filter {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
            or: false,
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Eq, value)
    }

    pub fn or(mut self) -> Self {
        self.or = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_client_input() {
        let query: Query = serde_json::from_value(serde_json::json!({
            "expression": { "author": { "name": true } },
            "filters": [
                { "field": "author.name", "value": "ada", "operator": "like" },
                { "field": "author.age", "value": [10, 20], "operator": "between" },
                { "field": "author.status", "value": "X", "operator": "notEq", "or": true },
            ],
            "groupBy": ["author.name"],
            "orderBy": [{ "field": "author.name", "descending": true }],
            "pager": { "limit": 10, "pageIdx": 2 },
        }))
        .unwrap();

        assert_eq!(query.filters[0].operator, Operator::Like);
        assert_eq!(query.filters[1].operator, Operator::Between);
        assert_eq!(query.filters[2].operator, Operator::Neq);
        assert!(query.filters[2].or);
        assert!(query.order_by[0].descending);
        assert_eq!(query.pager.unwrap().offset(), 20);
    }

    #[test]
    fn operator_defaults_to_eq() {
        let filter: Filter = serde_json::from_value(serde_json::json!({
            "field": "author.name", "value": "ada",
        }))
        .unwrap();
        assert_eq!(filter.operator, Operator::Eq);
        assert!(!filter.or);
    }
}
