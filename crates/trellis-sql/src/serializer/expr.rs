use super::{value, Formatter, ToSql};
use crate::stmt::{AggregateTarget, Condition, OrderByExpr, SelectExpr};

use trellis_core::{expr::AggregateMethod, query::Operator};

impl ToSql for &SelectExpr {
    fn to_sql(self, f: &mut Formatter<'_>) {
        match self {
            SelectExpr::Wildcard => fmt!(f, "*"),
            SelectExpr::Column { column, output } => {
                fmt!(f, column, " AS \"", output, "\"");
            }
            SelectExpr::Aggregate {
                method,
                target,
                output,
            } => {
                fmt!(f, method_sql(*method), "(", target, ") AS \"", output, "\"");
            }
        }
    }
}

impl ToSql for &AggregateTarget {
    fn to_sql(self, f: &mut Formatter<'_>) {
        match self {
            AggregateTarget::Column(column) => fmt!(f, column),
            AggregateTarget::Star { alias } => fmt!(f, alias, ".*"),
        }
    }
}

impl ToSql for &Condition {
    fn to_sql(self, f: &mut Formatter<'_>) {
        fmt!(f, &self.column, " ", operator_sql(self.operator), " ");
        value::literal(&self.value, f);
    }
}

impl ToSql for &OrderByExpr {
    fn to_sql(self, f: &mut Formatter<'_>) {
        let dir = if self.descending { " DESC" } else { " ASC" };
        fmt!(f, &self.column, dir);
    }
}

fn method_sql(method: AggregateMethod) -> &'static str {
    match method {
        AggregateMethod::Count => "COUNT",
        AggregateMethod::Max => "MAX",
        AggregateMethod::Min => "MIN",
        AggregateMethod::Avg => "AVG",
        AggregateMethod::Sum => "SUM",
    }
}

fn operator_sql(operator: Operator) -> &'static str {
    match operator {
        Operator::Gt => ">",
        Operator::Gte => ">=",
        Operator::Lt => "<",
        Operator::Lte => "<=",
        Operator::Eq => "=",
        Operator::Like => "LIKE",
        Operator::Between => "BETWEEN",
        Operator::Neq => "<>",
    }
}
