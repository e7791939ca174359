use crate::builder::{ResolvedFilter, TableMap};
use crate::engine::{
    self,
    context::{join_paths, join_pairs, Context},
};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use trellis_core::{
    path::{self, PathKind},
    query::{Filter, Operator, OrderBy, Pager, Query},
    schema::{PropTy, ScalarTy},
    Error, Result, Value,
};
use trellis_sql::stmt;

type Hook<'a> =
    Option<&'a (dyn Fn(Vec<ResolvedFilter>, &Context) -> Vec<ResolvedFilter> + Send + Sync)>;

/// Lowers a parsed query and its context into a SELECT statement.
pub(crate) fn lower(
    tables: &TableMap,
    context: &Context,
    query: &Query,
    hook: Hook<'_>,
) -> Result<stmt::Select> {
    match query.pager {
        None => lower_normal(tables, context, query, hook),
        Some(pager) => lower_paged(tables, context, query, pager, hook),
    }
}

fn lower_normal(
    tables: &TableMap,
    context: &Context,
    query: &Query,
    hook: Hook<'_>,
) -> Result<stmt::Select> {
    Ok(stmt::Select {
        distinct: query.distinct,
        columns: select_columns(tables, context)?,
        from: root_table_ref(context)?,
        joins: joins(tables, context)?,
        filters: conditions(tables, context, &query.filters, hook)?,
        group_by: resolve_group_by(tables, context, &query.group_by)?,
        order_by: resolve_order_by(tables, context, &query.order_by)?,
        limit: None,
        offset: None,
    })
}

/// With a pager, root access becomes a paginated subquery. Filters and
/// order-by items whose resolved schema is the root schema move inside the
/// subquery; everything else stays outside, next to the joins.
fn lower_paged(
    tables: &TableMap,
    context: &Context,
    query: &Query,
    pager: Pager,
    hook: Hook<'_>,
) -> Result<stmt::Select> {
    if pager.limit == 0 {
        return Err(Error::validation("pager limit must be positive"));
    }

    let root = context.root_schema().to_string();

    let mut root_filters = Vec::new();
    let mut join_filters = Vec::new();
    for filter in &query.filters {
        let related = related(tables, context, &filter.field)?;
        if related.schema == root {
            root_filters.push(filter.clone());
        } else {
            join_filters.push(filter.clone());
        }
    }

    let mut root_order = Vec::new();
    let mut join_order = Vec::new();
    for item in &query.order_by {
        let related = related(tables, context, &item.field)?;
        if related.schema == root {
            root_order.push(item.clone());
        } else {
            join_order.push(item.clone());
        }
    }

    let root_mapping = context
        .mapping
        .get(&root)
        .ok_or_else(|| Error::configuration(format!("schema `{root}` is not part of this build")))?;

    let inner = stmt::Select {
        distinct: false,
        columns: vec![stmt::SelectExpr::Wildcard],
        from: stmt::TableRef::Table {
            name: root_mapping.table_name.clone(),
            alias: root_mapping.alias.clone(),
        },
        joins: vec![],
        filters: conditions(tables, context, &root_filters, hook)?,
        group_by: vec![],
        order_by: resolve_order_by(tables, context, &root_order)?,
        limit: Some(pager.limit),
        offset: (pager.offset() > 0).then(|| pager.offset()),
    };

    Ok(stmt::Select {
        distinct: query.distinct,
        columns: select_columns(tables, context)?,
        from: stmt::TableRef::Subquery {
            select: Box::new(inner),
            alias: root_mapping.alias.clone(),
        },
        joins: joins(tables, context)?,
        filters: conditions(tables, context, &join_filters, hook)?,
        group_by: resolve_group_by(tables, context, &query.group_by)?,
        order_by: resolve_order_by(tables, context, &join_order)?,
        limit: None,
        offset: None,
    })
}

/// A dotted reference resolved against the schema graph and the build
/// context.
struct Related {
    normalized: String,
    schema: String,
    alias: String,
    /// Storage column, when the leaf is a mapped scalar property.
    column: Option<String>,
    prop_ty: Option<PropTy>,
}

fn related(tables: &TableMap, context: &Context, raw: &str) -> Result<Related> {
    let normalized = context.parsed_expr.normalize_fetch_path(raw);
    let prefix = path::prefix(&normalized);
    if prefix.is_empty() {
        return Err(Error::configuration(format!(
            "reference `{raw}` must resolve to at least `schema.prop`"
        )));
    }

    let table = engine::resolve_prefix_table(tables, prefix)?;
    let name = path::last_segment(&normalized);
    let alias = context.alias_of(&table.schema.name)?.to_string();
    let prop_ty = table.schema.prop_by_name(name).map(|prop| prop.ty.clone());
    let column = table.scalar_column(name).map(str::to_string);

    Ok(Related {
        schema: table.schema.name.clone(),
        alias,
        column,
        prop_ty,
        normalized,
    })
}

/// Projected columns: non-computed field paths in declaration order, then
/// aggregation paths. Computed paths never reach SQL.
fn select_columns(tables: &TableMap, context: &Context) -> Result<Vec<stmt::SelectExpr>> {
    let mut fields = Vec::new();
    let mut aggregates = Vec::new();

    for p in &context.parsed_expr.paths {
        match &p.kind {
            PathKind::Field if !p.computed => {
                let related = related(tables, context, &p.path)?;
                let column = related.column.ok_or_else(|| {
                    Error::configuration(format!("property `{}` has no storage column", p.path))
                })?;
                fields.push(stmt::SelectExpr::Column {
                    column: format!("{}.{column}", related.alias),
                    output: related.normalized,
                });
            }
            PathKind::Aggregate(aggregate) => {
                let related = related(tables, context, &p.path)?;
                let target = match &aggregate.field {
                    Some(field) => {
                        let target = self::related(tables, context, field)?;
                        let column = target.column.ok_or_else(|| {
                            Error::configuration(format!(
                                "aggregation field `{field}` has no storage column"
                            ))
                        })?;
                        stmt::AggregateTarget::Column(format!("{}.{column}", target.alias))
                    }
                    None => stmt::AggregateTarget::Star {
                        alias: related.alias,
                    },
                };
                aggregates.push(stmt::SelectExpr::Aggregate {
                    method: aggregate.method,
                    target,
                    output: related.normalized,
                });
            }
            _ => {}
        }
    }

    fields.extend(aggregates);
    Ok(fields)
}

fn root_table_ref(context: &Context) -> Result<stmt::TableRef> {
    let root = context.root_schema();
    let mapping = context
        .mapping
        .get(root)
        .ok_or_else(|| Error::configuration(format!("schema `{root}` is not part of this build")))?;
    Ok(stmt::TableRef::Table {
        name: mapping.table_name.clone(),
        alias: mapping.alias.clone(),
    })
}

/// One LEFT JOIN per deduplicated adjacency pair, ON the declared key pair
/// with each side's table name rewritten to its per-build alias.
fn joins(tables: &TableMap, context: &Context) -> Result<Vec<stmt::Join>> {
    let mut seen: Vec<(String, String)> = Vec::new();
    let mut out = Vec::new();

    for join_path in join_paths(&context.parsed_expr, &context.parsed_filters) {
        for pair in join_pairs(tables, &join_path)? {
            let key = (pair.source.clone(), pair.prop.clone());
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);

            let source_table = tables.table(&pair.source)?;
            let target_table = tables.table(&pair.target)?;
            let (source_key, target_key) =
                source_table.join_keys(&pair.prop).ok_or_else(|| {
                    Error::configuration(format!(
                        "relation `{}.{}` has no join mapping",
                        pair.source, pair.prop
                    ))
                })?;

            out.push(stmt::Join {
                table: target_table.name.clone(),
                alias: context.alias_of(&pair.target)?.to_string(),
                on: (
                    rewrite_key(source_key, &source_table.name, context.alias_of(&pair.source)?),
                    rewrite_key(target_key, &target_table.name, context.alias_of(&pair.target)?),
                ),
            });
        }
    }

    Ok(out)
}

/// Rewrites the table-name qualifier of a declared join key to the
/// per-build alias: `authors.id` → `authors_x1.id`.
fn rewrite_key(key: &str, table: &str, alias: &str) -> String {
    match key.strip_prefix(table).and_then(|rest| rest.strip_prefix('.')) {
        Some(column) => format!("{alias}.{column}"),
        None => key.to_string(),
    }
}

fn conditions(
    tables: &TableMap,
    context: &Context,
    filters: &[Filter],
    hook: Hook<'_>,
) -> Result<Vec<stmt::Condition>> {
    let mut resolved = resolve_filters(tables, context, filters)?;
    if let Some(hook) = hook {
        resolved = hook(resolved, context);
    }

    Ok(resolved
        .into_iter()
        .map(|filter| stmt::Condition {
            or: filter.or,
            column: filter.column,
            operator: filter.operator,
            value: filter.value,
        })
        .collect())
}

/// Resolves filters against the context. A filter whose leaf resolves to no
/// mapped scalar property is silently dropped: filters often originate from
/// flexible client input.
fn resolve_filters(
    tables: &TableMap,
    context: &Context,
    filters: &[Filter],
) -> Result<Vec<ResolvedFilter>> {
    let mut resolved = Vec::new();

    for filter in filters {
        let Related {
            prop_ty: Some(prop_ty),
            column: Some(column),
            alias,
            ..
        } = related(tables, context, &filter.field)?
        else {
            log::debug!("dropping filter on unmapped field `{}`", filter.field);
            continue;
        };

        let scalar_ty = prop_ty.scalar_ty();
        resolved.push(ResolvedFilter {
            column: format!("{alias}.{column}"),
            operator: filter.operator,
            value: prepare_value(filter.value.clone(), scalar_ty, filter.operator),
            scalar_ty,
            or: filter.or,
        });
    }

    Ok(resolved)
}

/// Normalizes a filter value against the property's scalar type: string
/// props stringify (and wrap in `%..%` under LIKE), date props parse into
/// timestamps, and lists (BETWEEN bounds) normalize element-wise.
fn prepare_value(value: Value, scalar_ty: Option<ScalarTy>, operator: Operator) -> Value {
    match value {
        Value::List(items) => Value::List(
            items
                .into_iter()
                .map(|item| prepare_value(item, scalar_ty, operator))
                .collect(),
        ),
        value => match scalar_ty {
            Some(ScalarTy::String) => {
                let text = match value {
                    Value::String(text) => text,
                    Value::I64(n) => n.to_string(),
                    Value::F64(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    other => return other,
                };
                if operator == Operator::Like {
                    Value::String(format!("%{text}%"))
                } else {
                    Value::String(text)
                }
            }
            Some(ScalarTy::Date) => parse_date(value),
            _ => value,
        },
    }
}

/// Date filter inputs accept timestamps, epoch milliseconds, or parseable
/// datetime strings. Unparseable strings fall through to plain literal
/// rendering.
fn parse_date(value: Value) -> Value {
    match value {
        Value::I64(millis) => match Utc.timestamp_millis_opt(millis).single() {
            Some(ts) => Value::Timestamp(ts),
            None => Value::I64(millis),
        },
        Value::String(text) => match parse_date_str(&text) {
            Some(ts) => Value::Timestamp(ts),
            None => Value::String(text),
        },
        value => value,
    }
}

fn parse_date_str(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    None
}

fn resolve_group_by(
    tables: &TableMap,
    context: &Context,
    group_by: &[String],
) -> Result<Vec<String>> {
    group_by
        .iter()
        .map(|field| {
            let related = related(tables, context, field)?;
            let column = related.column.ok_or_else(|| {
                Error::configuration(format!("cannot group by unmapped field `{field}`"))
            })?;
            Ok(format!("{}.{column}", related.alias))
        })
        .collect()
}

fn resolve_order_by(
    tables: &TableMap,
    context: &Context,
    order_by: &[OrderBy],
) -> Result<Vec<stmt::OrderByExpr>> {
    order_by
        .iter()
        .map(|item| {
            let related = related(tables, context, &item.field)?;
            let column = related.column.ok_or_else(|| {
                Error::configuration(format!("cannot order by unmapped field `{}`", item.field))
            })?;
            Ok(stmt::OrderByExpr {
                column: format!("{}.{column}", related.alias),
                descending: item.descending,
            })
        })
        .collect()
}
