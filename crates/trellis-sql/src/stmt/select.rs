use trellis_core::{expr::AggregateMethod, query::Operator, Value};

/// A fully resolved SELECT statement. Column references are already
/// alias-qualified (`alias.column`); lowering resolves schemas and aliases
/// before this statement is constructed.
#[derive(Debug, Clone)]
pub struct Select {
    pub distinct: bool,
    pub columns: Vec<SelectExpr>,
    pub from: TableRef,
    pub joins: Vec<Join>,
    pub filters: Vec<Condition>,
    pub group_by: Vec<String>,
    pub order_by: Vec<OrderByExpr>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone)]
pub enum TableRef {
    /// `FROM name alias`
    Table { name: String, alias: String },

    /// Paginated root access: `FROM (SELECT ...) alias`
    Subquery { select: Box<Select>, alias: String },
}

#[derive(Debug, Clone)]
pub enum SelectExpr {
    /// `*`
    Wildcard,

    /// `alias.column AS "dotted.path"`
    Column { column: String, output: String },

    /// `METHOD(target) AS "dotted.path"`
    Aggregate {
        method: AggregateMethod,
        target: AggregateTarget,
        output: String,
    },
}

#[derive(Debug, Clone)]
pub enum AggregateTarget {
    /// `alias.column`
    Column(String),

    /// Whole-row aggregation: `alias.*`
    Star { alias: String },
}

#[derive(Debug, Clone)]
pub struct Join {
    pub table: String,
    pub alias: String,

    /// Alias-qualified key pair for the ON predicate.
    pub on: (String, String),
}

#[derive(Debug, Clone)]
pub struct Condition {
    /// Chain with OR instead of AND; ignored on the first condition.
    pub or: bool,
    pub column: String,
    pub operator: Operator,
    pub value: Value,
}

#[derive(Debug, Clone)]
pub struct OrderByExpr {
    pub column: String,
    pub descending: bool,
}

impl Select {
    pub fn new(from: TableRef) -> Self {
        Self {
            distinct: false,
            columns: vec![],
            from,
            joins: vec![],
            filters: vec![],
            group_by: vec![],
            order_by: vec![],
            limit: None,
            offset: None,
        }
    }
}
