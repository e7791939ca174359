use crate::builder::TableMap;
use crate::engine;

use trellis_core::{
    expr::{ExprValue, Expression},
    path::{self, ParsedExpr, Path, PathKind},
    query::Query,
    schema::PropTy,
    Error, Result,
};

/// The parsed halves of a query: the expression's path sequence plus the
/// normalized reference paths drawn from filters, group-by, and order-by.
pub(crate) struct ParsedQuery {
    pub expr: ParsedExpr,
    pub refs: Vec<String>,
}

pub(crate) fn parse_query(tables: &TableMap, query: &Query) -> Result<ParsedQuery> {
    let expr = parse_expression(tables, &query.expression)?;

    let mut refs = Vec::new();
    for filter in &query.filters {
        refs.push(expr.normalize_fetch_path(&filter.field));
    }
    for field in &query.group_by {
        refs.push(expr.normalize_fetch_path(field));
    }
    for item in &query.order_by {
        refs.push(expr.normalize_fetch_path(&item.field));
    }

    Ok(ParsedQuery { expr, refs })
}

/// Walks the expression in declaration order, producing paths in pre-order:
/// a relation's own path precedes all of its children.
pub(crate) fn parse_expression(tables: &TableMap, expression: &Expression) -> Result<ParsedExpr> {
    let mut paths = Vec::new();
    walk(tables, expression, "", &mut paths)?;

    if paths.is_empty() {
        return Err(Error::malformed_expression(
            "expression must name a root schema",
        ));
    }

    Ok(ParsedExpr { paths })
}

fn walk(
    tables: &TableMap,
    expression: &Expression,
    parent: &str,
    out: &mut Vec<Path>,
) -> Result<()> {
    for (key, value) in &expression.entries {
        let (name, alias) = match key.split_once(' ') {
            Some((name, alias)) => (name, Some(alias.to_string())),
            None => (key.as_str(), None),
        };
        let path = if parent.is_empty() {
            name.to_string()
        } else {
            format!("{parent}.{name}")
        };

        if parent.is_empty() && !matches!(value, ExprValue::Nested(_)) {
            return Err(Error::malformed_expression(format!(
                "root value for `{name}` must be a nested mapping"
            )));
        }

        match value {
            ExprValue::Field => {
                let computed = field_is_computed(tables, &path)?;
                out.push(Path {
                    path,
                    alias,
                    kind: PathKind::Field,
                    computed,
                });
            }
            ExprValue::Aggregate(aggregate) => {
                out.push(Path {
                    path,
                    alias,
                    kind: PathKind::Aggregate(aggregate.clone()),
                    computed: false,
                });
            }
            ExprValue::Nested(nested) => {
                out.push(Path {
                    path: path.clone(),
                    alias,
                    kind: PathKind::Relation,
                    computed: false,
                });
                walk(tables, nested, &path, out)?;
            }
        }
    }

    Ok(())
}

fn field_is_computed(tables: &TableMap, path: &str) -> Result<bool> {
    let table = engine::resolve_prefix_table(tables, path::prefix(path))?;
    let name = path::last_segment(path);

    let prop = table.schema.prop_by_name(name).ok_or_else(|| {
        Error::configuration(format!(
            "unknown property `{name}` on schema `{}`",
            table.schema.name
        ))
    })?;

    match &prop.ty {
        PropTy::Computed(_) => Ok(true),
        PropTy::Model(_) | PropTy::Collection(_) => Err(Error::configuration(format!(
            "relation property `{path}` must be selected with a nested mapping"
        ))),
        PropTy::Scalar(_) => Ok(false),
    }
}
